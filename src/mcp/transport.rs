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

//! Duplex transport: one session over one bidirectional byte stream.
//!
//! Stdin/stdout in production; any `AsyncRead`/`AsyncWrite` pair in tests.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, Stdin, Stdout};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::constants::sse::OUTBOUND_QUEUE_DEPTH;
use crate::core::errors::{McpError, McpResult};
use crate::core::session::{ServerContext, Session};
use crate::mcp::pipeline::{spawn_inbound_reader, spawn_outbound_writer, InboundEvent};

pub struct DuplexTransport<R, W> {
    reader: R,
    writer: W,
    ctx: Arc<ServerContext>,
}

impl DuplexTransport<Stdin, Stdout> {
    pub fn stdio(ctx: Arc<ServerContext>) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), ctx)
    }
}

impl<R, W> DuplexTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W, ctx: Arc<ServerContext>) -> Self {
        Self {
            reader,
            writer,
            ctx,
        }
    }

    /// Serve until the peer closes the stream.
    pub async fn run(self) -> McpResult<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until EOF, a transport failure or `shutdown` resolves. Frames
    /// are dispatched one at a time; queued responses are flushed before
    /// returning.
    pub async fn run_until<F>(self, shutdown: F) -> McpResult<()>
    where
        F: Future<Output = ()>,
    {
        let (in_tx, mut in_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);

        let reader_task = spawn_inbound_reader(self.reader, in_tx);
        let writer_task = spawn_outbound_writer(self.writer, out_rx);

        let mut session = Session::new(self.ctx, out_tx);
        info!(session_id = %session.id(), "Duplex session started");

        tokio::pin!(shutdown);
        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                event = in_rx.recv() => match event {
                    Some(InboundEvent::Frame(frame)) => {
                        if let Err(e) = session.handle_bytes(&frame).await {
                            if e.is_transport() {
                                break Err(e);
                            }
                            warn!(session_id = %session.id(), "Frame handling failed: {}", e);
                        }
                    }
                    Some(InboundEvent::Error(msg)) => {
                        break Err(McpError::Io(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            msg,
                        )));
                    }
                    Some(InboundEvent::Disconnect) | None => {
                        info!(session_id = %session.id(), "Peer closed the stream");
                        break Ok(());
                    }
                }
            }
        };

        session.close();
        reader_task.abort();
        // Dropping the session drops the last sender so the writer drains and exits.
        drop(session);
        let _ = writer_task.await;
        result
    }
}
