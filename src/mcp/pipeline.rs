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

//! Reader and writer tasks for byte-stream transports.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error};

use crate::core::models::OutboundMessage;
use crate::mcp::codec::McpCodec;

/// Messages arriving from the peer
#[derive(Debug)]
pub enum InboundEvent {
    /// One framed message, not yet parsed as JSON
    Frame(Bytes),
    /// Peer closed the stream (EOF)
    Disconnect,
    /// Framing or I/O failure; the stream is unusable afterwards
    Error(String),
}

/// Spawns a background task that frames the peer's byte stream
pub fn spawn_inbound_reader<R>(stream: R, tx: mpsc::Sender<InboundEvent>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut framed = FramedRead::new(stream, McpCodec::new());

        while let Some(result) = framed.next().await {
            match result {
                Ok(frame) => {
                    if tx.send(InboundEvent::Frame(frame)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    error!("Framing error: {}", e);
                    let _ = tx.send(InboundEvent::Error(e.to_string())).await;
                    return;
                }
            }
        }
        let _ = tx.send(InboundEvent::Disconnect).await;
    })
}

/// Spawns the single writer for a byte stream. It drains `rx` until every
/// sender is dropped or a write fails.
pub fn spawn_outbound_writer<W>(sink: W, mut rx: mpsc::Receiver<OutboundMessage>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut framed = FramedWrite::new(sink, McpCodec::new());

        while let Some(message) = rx.recv().await {
            if let Err(e) = framed.send(&message).await {
                error!("Failed to write outbound frame: {}", e);
                break;
            }
        }
        debug!("Outbound writer finished");
    })
}
