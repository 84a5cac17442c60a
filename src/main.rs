// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Main entry point for mcp-tinybird
use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing::{error, info};

use mcp_tinybird::backend::TinybirdClient;
use mcp_tinybird::config::Config;
use mcp_tinybird::core::session::ServerContext;
use mcp_tinybird::core::traits::AnalyticsBackend;
use mcp_tinybird::mcp::shutdown_signal;
use mcp_tinybird::mcp::sse::{create_router, SseState};
use mcp_tinybird::mcp::transport::DuplexTransport;
use mcp_tinybird::registry::CapabilityRegistry;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Serve one session over stdin/stdout
    Stdio,
    /// Serve sessions over HTTP server-sent events
    Sse,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Transport to serve
    #[arg(value_enum, default_value_t = Mode::Stdio)]
    mode: Mode,

    /// Bind address for sse mode (overrides BIND_ADDRESS)
    #[arg(long)]
    host: Option<String>,

    /// Port for sse mode (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    install_panic_hook();
    dotenv::dotenv().ok();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.bind_address = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    if let Err(e) = init_tracing(&config) {
        eprintln!("Failed to init tracing: {}", e);
    }

    info!(mode = ?cli.mode, api_url = %config.api_url, "Starting mcp-tinybird");

    let backend: Arc<dyn AnalyticsBackend> =
        Arc::new(TinybirdClient::from_config(&config).context("Failed to create backend client")?);

    let registry = CapabilityRegistry::new();
    registry.prompts().refresh(backend.as_ref()).await;
    let ctx = Arc::new(ServerContext::new(registry, backend));

    match cli.mode {
        Mode::Stdio => run_stdio(ctx).await,
        Mode::Sse => run_sse(ctx, &config).await,
    }
}

async fn run_stdio(ctx: Arc<ServerContext>) -> anyhow::Result<()> {
    let transport = DuplexTransport::stdio(ctx);
    if let Err(e) = transport.run_until(shutdown_signal()).await {
        error!("Session ended with transport error: {}", e);
    }
    info!("Stdio session finished");
    // The stdin reader sits on a blocking thread the runtime would wait for.
    std::process::exit(0);
}

async fn run_sse(ctx: Arc<ServerContext>, config: &Config) -> anyhow::Result<()> {
    let state = SseState::new(ctx);
    let hub = Arc::clone(state.hub());
    let router = create_router(state, config.body_size_limit);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, "SSE server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            hub.close_all();
        })
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("PANIC: {} at {}", message, location);
    }));
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(())
}
