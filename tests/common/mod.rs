// Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use mcp_tinybird::backend::models::{Pipe, PipeData};
use mcp_tinybird::core::errors::BackendError;
use mcp_tinybird::core::models::OutboundMessage;
use mcp_tinybird::core::session::{ServerContext, Session};
use mcp_tinybird::core::traits::{AnalyticsBackend, BackendResult};
use mcp_tinybird::registry::CapabilityRegistry;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

/// Holds `fetch_docs` until the test releases it.
#[derive(Default)]
pub struct Stall {
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory backend that records every call it receives.
#[derive(Default)]
pub struct MockBackend {
    pub calls: AtomicUsize,
    pub pipes: Vec<Pipe>,
    pub prompt_rows: Option<Value>,
    pub fail_with: Option<u16>,
    pub events: Mutex<Vec<(String, String)>>,
    pub stall: Option<Arc<Stall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipes(pipes: Vec<Pipe>) -> Self {
        Self {
            pipes,
            ..Self::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(status) => Err(BackendError::Status {
                status,
                body: "backend says no".to_string(),
            }),
            None => Ok(()),
        }
    }
}

pub fn pipe(name: &str, kind: &str) -> Pipe {
    Pipe {
        kind: kind.to_string(),
        id: format!("t_{}", name),
        name: name.to_string(),
        description: None,
        endpoint: None,
        url: None,
    }
}

#[async_trait]
impl AnalyticsBackend for MockBackend {
    async fn list_data_sources(&self) -> BackendResult<Vec<Value>> {
        self.record()?;
        Ok(vec![json!({"id": "t_ds", "name": "events", "columns": []})])
    }

    async fn get_data_source(&self, datasource_id: &str) -> BackendResult<Value> {
        self.record()?;
        Ok(json!({"id": datasource_id, "columns": []}))
    }

    async fn list_pipes(&self) -> BackendResult<Vec<Pipe>> {
        self.record()?;
        Ok(self.pipes.clone())
    }

    async fn get_pipe(&self, pipe_id: &str) -> BackendResult<Value> {
        self.record()?;
        Ok(json!({"id": pipe_id, "nodes": []}))
    }

    async fn get_pipe_data(
        &self,
        _pipe_id: &str,
        params: &[(String, String)],
    ) -> BackendResult<PipeData> {
        self.record()?;
        Ok(PipeData {
            meta: vec![json!({"name": "n", "type": "UInt64"})],
            data: vec![json!({"n": params.len()})],
        })
    }

    async fn run_select_query(&self, query: &str) -> BackendResult<Value> {
        self.record()?;
        if query.contains("FROM prompts") {
            return self
                .prompt_rows
                .clone()
                .ok_or_else(|| BackendError::Transport("no prompts".to_string()));
        }
        Ok(json!({"data": [{"q": query}]}))
    }

    async fn explain_pipe(&self, pipe_name: &str) -> BackendResult<Value> {
        self.record()?;
        Ok(json!({"pipe": pipe_name, "plan": "scan"}))
    }

    async fn push_datafile(&self, path: &Path) -> BackendResult<String> {
        self.record()?;
        Ok(format!("pushed {}", path.display()))
    }

    async fn save_event(&self, datasource_name: &str, ndjson: &str) -> BackendResult<String> {
        self.record()?;
        self.events
            .lock()
            .unwrap()
            .push((datasource_name.to_string(), ndjson.to_string()));
        Ok(r#"{"successful_rows":1,"quarantined_rows":0}"#.to_string())
    }

    async fn fetch_docs(&self) -> BackendResult<String> {
        self.record()?;
        if let Some(stall) = &self.stall {
            stall.entered.notify_one();
            stall.release.notified().await;
        }
        Ok("# Tinybird docs".to_string())
    }
}

pub fn context(backend: Arc<MockBackend>) -> Arc<ServerContext> {
    Arc::new(ServerContext::new(CapabilityRegistry::new(), backend))
}

pub fn session(ctx: Arc<ServerContext>) -> (Session, mpsc::Receiver<OutboundMessage>) {
    let (tx, rx) = mpsc::channel(64);
    (Session::new(ctx, tx), rx)
}

pub fn initialize_request(id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0"}
        }
    })
}

pub fn initialized_notification() -> Value {
    json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
}

pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

/// Drive a session through the handshake and drain the initialize response.
pub async fn active_session(
    ctx: Arc<ServerContext>,
) -> (Session, mpsc::Receiver<OutboundMessage>) {
    let (mut session, mut rx) = session(ctx);
    session.handle_message(initialize_request(0)).await.unwrap();
    session
        .handle_message(initialized_notification())
        .await
        .unwrap();
    rx.recv().await.unwrap();
    (session, rx)
}

pub fn frame_json(message: &OutboundMessage) -> Value {
    serde_json::to_value(message).unwrap()
}
