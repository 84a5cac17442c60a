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

//! Streaming transport: server-sent events plus a POST channel.
//!
//! `GET /sse` opens the event leg and announces the POST endpoint for the new
//! session. `POST /messages?session_id=<id>` feeds one frame to that session;
//! its response and notifications travel back over the event leg. Each POST
//! gets exactly one HTTP response through a `ResponseSlot`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::core::constants::sse::{
    ENDPOINT_EVENT, HEALTH_PATH, MESSAGES_PATH, MESSAGE_EVENT, OUTBOUND_QUEUE_DEPTH,
    SESSION_ID_PARAM, SSE_PATH,
};
use crate::core::errors::{McpError, McpResult};
use crate::core::models::{OutboundMessage, SessionId};
use crate::core::session::{ServerContext, Session};
use crate::mcp::slot::ResponseSlot;

#[derive(Clone)]
pub struct SessionHandle {
    pub session: Arc<tokio::sync::Mutex<Session>>,
    pub cancel: CancellationToken,
}

/// Open event streams keyed by session id.
#[derive(Default)]
pub struct SessionHub {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: SessionId, handle: SessionHandle) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, handle);
    }

    pub fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Remove a session and fire its cancellation token.
    pub fn remove(&self, id: &SessionId) -> bool {
        let handle = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        match handle {
            Some(handle) => {
                handle.cancel.cancel();
                if let Ok(mut session) = handle.session.try_lock() {
                    session.close();
                }
                true
            }
            None => false,
        }
    }

    /// Cancel every open stream, used on shutdown so long-lived event legs end.
    pub fn close_all(&self) {
        let ids: Vec<SessionId> = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        for id in ids {
            self.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct SseState {
    ctx: Arc<ServerContext>,
    hub: Arc<SessionHub>,
}

impl SseState {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self {
            ctx,
            hub: Arc::new(SessionHub::new()),
        }
    }

    pub fn hub(&self) -> &Arc<SessionHub> {
        &self.hub
    }
}

pub fn create_router(state: SseState, body_limit: usize) -> Router {
    Router::new()
        .route(SSE_PATH, get(handle_sse))
        .route(MESSAGES_PATH, post(handle_message))
        .route(HEALTH_PATH, get(health))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}

/// Removes the session from the hub when the event stream is dropped.
struct StreamGuard {
    hub: Arc<SessionHub>,
    id: SessionId,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.hub.remove(&self.id) {
            info!(session_id = %self.id, "Event stream closed");
        }
    }
}

async fn handle_sse(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE_DEPTH);
    let id = SessionId::generate();
    let cancel = CancellationToken::new();

    let session = Session::with_id(id, Arc::clone(&state.ctx), tx);
    state.hub.insert(
        id,
        SessionHandle {
            session: Arc::new(tokio::sync::Mutex::new(session)),
            cancel: cancel.clone(),
        },
    );
    info!(session_id = %id, "Event stream opened");

    let endpoint = format!("{}?{}={}", MESSAGES_PATH, SESSION_ID_PARAM, id);
    let first = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event(ENDPOINT_EVENT).data(endpoint))
    });

    let guard = StreamGuard {
        hub: Arc::clone(&state.hub),
        id,
    };
    let frames = stream::unfold((rx, cancel, guard), |(mut rx, cancel, guard)| async move {
        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => return None,
                message = rx.recv() => message?,
            };
            match serde_json::to_string(&message) {
                Ok(data) => {
                    let event = Event::default().event(MESSAGE_EVENT).data(data);
                    return Some((Ok(event), (rx, cancel, guard)));
                }
                Err(e) => error!(session_id = %guard.id, "Failed to encode frame: {}", e),
            }
        }
    });

    Sse::new(first.chain(frames)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    session_id: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn handle_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let (slot, rx) = ResponseSlot::new();
    let outcome = process_post(&state, query, &body, &slot).await;
    settle(&slot, outcome);

    match rx.await {
        Ok(response) => response,
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "response dropped"),
    }
}

/// Validate and dispatch one POST. Validation failures fill the slot with
/// the matching client error; dispatch failures are returned.
async fn process_post(
    state: &SseState,
    query: MessageQuery,
    body: &[u8],
    slot: &ResponseSlot,
) -> McpResult<()> {
    let Some(raw_id) = query.session_id else {
        slot.fill(error_response(StatusCode::BAD_REQUEST, "session_id is required"));
        return Ok(());
    };

    let Ok(id) = raw_id.parse::<SessionId>() else {
        slot.fill(error_response(StatusCode::BAD_REQUEST, "Invalid session ID"));
        return Ok(());
    };

    let handle = match state.hub.get(&id) {
        Some(handle) if !handle.cancel.is_cancelled() => handle,
        _ => {
            let err = McpError::NotFound(format!("session {}", id));
            slot.fill(error_response(err.status(), err.to_string()));
            return Ok(());
        }
    };

    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            let err = McpError::Parse(e.to_string());
            warn!(session_id = %id, "Unparseable POST body: {}", e);
            slot.fill(error_response(err.status(), "Could not parse message"));
            return Ok(());
        }
    };

    debug!(session_id = %id, "Dispatching POSTed frame");
    let mut session = handle.session.lock().await;
    session.handle_message(value).await
}

/// Fill the slot from the dispatch outcome: `202` when nothing was written,
/// `500` on failure. A failure after a response went out is only logged.
pub fn settle(slot: &ResponseSlot, outcome: McpResult<()>) {
    match outcome {
        Ok(()) => {
            if !slot.is_filled() {
                slot.fill(StatusCode::ACCEPTED.into_response());
            }
        }
        Err(e) => {
            let response = error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            if !slot.fill(response) {
                error!("Error after response was sent: {}", e);
            }
        }
    }
}

async fn health(State(state): State<SseState>) -> Json<Value> {
    Json(json!({ "status": "healthy", "sessions": state.hub.len() }))
}
