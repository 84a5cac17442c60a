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

//! Protocol session.
//!
//! A `Session` is bound to one physical connection. It walks the
//! `Uninitialized -> Negotiated -> Active -> Closed` state machine, dispatches
//! requests against the shared registry and backend, and writes every
//! outbound frame through the transport's single-writer queue.

use crate::backend::middleware::timed;
use crate::core::constants::{methods, resources as resource_consts, server};
use crate::core::dispatch::{McpRequest, ToolCall};
use crate::core::errors::{McpError, McpResult};
use crate::core::insights::InsightMemo;
use crate::core::models::{
    CallToolResult, Content, Implementation, IncomingMessage, InitializeParams, InitializeResult,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, OutboundMessage, PromptGetParams,
    ReadResourceResult, ResourceContents, SessionId, ToolCallParams,
};
use crate::core::traits::AnalyticsBackend;
use crate::protocol::negotiation::HandshakeManager;
use crate::registry::resources::{ResourceKind, DATASOURCE_DEFINITION_CONTEXT};
use crate::registry::CapabilityRegistry;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Negotiated,
    Active,
    Closed,
}

/// Process-wide collaborators shared by every session.
pub struct ServerContext {
    pub registry: Arc<CapabilityRegistry>,
    pub memo: Arc<InsightMemo>,
    pub backend: Arc<dyn AnalyticsBackend>,
}

impl ServerContext {
    pub fn new(registry: CapabilityRegistry, backend: Arc<dyn AnalyticsBackend>) -> Self {
        Self {
            registry: Arc::new(registry),
            memo: Arc::new(InsightMemo::new()),
            backend,
        }
    }
}

pub struct Session {
    id: SessionId,
    state: SessionState,
    protocol_version: Option<&'static str>,
    client_info: Option<Implementation>,
    ctx: Arc<ServerContext>,
    outbound: mpsc::Sender<OutboundMessage>,
    /// Notifications raised by the current handler, flushed before its response
    pending: Vec<JsonRpcNotification>,
}

impl Session {
    pub fn new(ctx: Arc<ServerContext>, outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self::with_id(SessionId::generate(), ctx, outbound)
    }

    pub fn with_id(
        id: SessionId,
        ctx: Arc<ServerContext>,
        outbound: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        Self {
            id,
            state: SessionState::Uninitialized,
            protocol_version: None,
            client_info: None,
            ctx,
            outbound,
            pending: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn protocol_version(&self) -> Option<&'static str> {
        self.protocol_version
    }

    pub fn client_info(&self) -> Option<&Implementation> {
        self.client_info.as_ref()
    }

    /// Mark the session terminal. Further frames fail with connection-closed.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            info!(session_id = %self.id, "Session closed");
            self.state = SessionState::Closed;
        }
    }

    /// Handle raw frame bytes. Invalid JSON is answered with a parse error
    /// carrying a null id.
    pub async fn handle_bytes(&mut self, frame: &[u8]) -> McpResult<()> {
        self.ensure_open()?;
        match serde_json::from_slice::<Value>(frame) {
            Ok(value) => self.handle_message(value).await,
            Err(e) => {
                warn!(session_id = %self.id, "Malformed frame: {}", e);
                let err = McpError::Parse(e.to_string());
                self.send(OutboundMessage::Response(JsonRpcResponse::failure(
                    Value::Null,
                    &err,
                )))
                .await
            }
        }
    }

    /// Handle one decoded JSON frame, writing any response and notifications
    /// to the outbound queue.
    pub async fn handle_message(&mut self, value: Value) -> McpResult<()> {
        self.ensure_open()?;

        let id = IncomingMessage::id_of(&value);
        let message = match IncomingMessage::classify(value) {
            Ok(message) => message,
            Err(e) => {
                warn!(session_id = %self.id, "Rejected frame: {}", e);
                return self
                    .send(OutboundMessage::Response(JsonRpcResponse::failure(id, &e)))
                    .await;
            }
        };

        match message {
            IncomingMessage::Request(req) => {
                let response = self.dispatch(req).await;
                self.flush_pending().await?;
                self.send(OutboundMessage::Response(response)).await
            }
            IncomingMessage::Notification(notif) => {
                self.handle_notification(notif);
                Ok(())
            }
            IncomingMessage::Response(resp) => {
                debug!(session_id = %self.id, "Ignoring client response: {}", resp);
                Ok(())
            }
        }
    }

    /// Answer one request. Handler failures become error responses.
    pub async fn dispatch(&mut self, req: JsonRpcRequest) -> JsonRpcResponse {
        self.pending.clear();
        let id = req.id.clone();
        match self.route(req).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                self.pending.clear();
                warn!(session_id = %self.id, code = e.code(), "Request failed: {}", e);
                JsonRpcResponse::failure(id, &e)
            }
        }
    }

    async fn route(&mut self, req: JsonRpcRequest) -> McpResult<Value> {
        debug!(session_id = %self.id, method = %req.method, "Dispatching request");
        let request = McpRequest::parse(&req.method, req.params)?;

        match (&request, self.state) {
            (McpRequest::Ping, _) => return Ok(json!({})),
            (McpRequest::Initialize(_), SessionState::Uninitialized) => {}
            (McpRequest::Initialize(_), _) => {
                return Err(McpError::InvalidRequest(
                    "session already initialized".to_string(),
                ))
            }
            (_, SessionState::Active) => {}
            _ => return Err(McpError::NotInitialized),
        }

        match request {
            McpRequest::Initialize(params) => self.initialize(params),
            McpRequest::Ping => Ok(json!({})),
            McpRequest::ListTools => Ok(json!({ "tools": self.ctx.registry.list_tools() })),
            McpRequest::CallTool(params) => {
                let result = self.call_tool(params).await?;
                Ok(serde_json::to_value(result)?)
            }
            McpRequest::ListResources => {
                Ok(json!({ "resources": self.ctx.registry.list_resources() }))
            }
            McpRequest::ReadResource(params) => {
                let result = self.read_resource(&params.uri)?;
                Ok(serde_json::to_value(result)?)
            }
            McpRequest::ListPrompts => Ok(json!({ "prompts": self.ctx.registry.list_prompts() })),
            McpRequest::GetPrompt(params) => self.get_prompt(params),
        }
    }

    fn initialize(&mut self, params: InitializeParams) -> McpResult<Value> {
        let version = HandshakeManager::negotiate(&params.protocol_version);
        info!(
            session_id = %self.id,
            requested = %params.protocol_version,
            negotiated = version,
            client = ?params.client_info.as_ref().map(|c| &c.name),
            "Session negotiated"
        );

        self.protocol_version = Some(version);
        self.client_info = params.client_info;
        self.state = SessionState::Negotiated;

        let result = InitializeResult {
            protocol_version: version.to_string(),
            capabilities: self.ctx.registry.capabilities(),
            server_info: Implementation {
                name: server::NAME.to_string(),
                version: server::VERSION.to_string(),
            },
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_notification(&mut self, notif: JsonRpcNotification) {
        match notif.method.as_str() {
            methods::NOTIFICATION_INITIALIZED => {
                if self.state == SessionState::Negotiated {
                    self.state = SessionState::Active;
                    info!(session_id = %self.id, "Session active");
                } else {
                    debug!(
                        session_id = %self.id,
                        state = ?self.state,
                        "Ignoring initialized notification"
                    );
                }
            }
            methods::NOTIFICATION_CANCELLED => {
                debug!(session_id = %self.id, "Client cancelled a request");
            }
            other => {
                debug!(session_id = %self.id, method = other, "Ignoring unknown notification");
            }
        }
    }

    async fn call_tool(&mut self, params: ToolCallParams) -> McpResult<CallToolResult> {
        let kind = self.ctx.registry.resolve_tool(&params.name)?;
        let call = ToolCall::decode(kind, params.arguments)?;
        info!(session_id = %self.id, tool = %params.name, "Calling tool");

        let text = self.execute(call).await?;
        Ok(CallToolResult {
            content: vec![Content::text(text)],
            is_error: false,
        })
    }

    async fn execute(&mut self, call: ToolCall) -> McpResult<String> {
        let backend = Arc::clone(&self.ctx.backend);
        let text = match call {
            ToolCall::ListDataSources => {
                let sources = timed("list_data_sources", backend.list_data_sources()).await?;
                serde_json::to_string(&sources)?
            }
            ToolCall::GetDataSource { datasource_id } => {
                let source =
                    timed("get_data_source", backend.get_data_source(&datasource_id)).await?;
                source.to_string()
            }
            ToolCall::ListPipes => {
                let pipes = timed("list_pipes", backend.list_pipes()).await?;
                let endpoints: Vec<_> = pipes.into_iter().filter(|p| p.is_endpoint()).collect();
                serde_json::to_string(&endpoints)?
            }
            ToolCall::GetPipe { pipe_id } => {
                timed("get_pipe", backend.get_pipe(&pipe_id)).await?.to_string()
            }
            ToolCall::RequestPipeData { pipe_id, params } => {
                let data = timed("get_pipe_data", backend.get_pipe_data(&pipe_id, &params)).await?;
                serde_json::to_string(&data)?
            }
            ToolCall::RunSelectQuery { select_query } => {
                timed("run_select_query", backend.run_select_query(&select_query))
                    .await?
                    .to_string()
            }
            ToolCall::AppendInsight { insight } => {
                let memo = self.ctx.memo.append(insight);
                debug!(session_id = %self.id, bytes = memo.len(), "Memo updated");
                self.pending
                    .push(JsonRpcNotification::resource_updated(resource_consts::INSIGHTS_URI));
                "Insight added to memo".to_string()
            }
            ToolCall::LlmsDocs => timed("fetch_docs", backend.fetch_docs()).await?,
            ToolCall::AnalyzePipe { pipe_name } => {
                timed("explain_pipe", backend.explain_pipe(&pipe_name))
                    .await?
                    .to_string()
            }
            ToolCall::PushDatafile { files } => {
                timed("push_datafile", backend.push_datafile(Path::new(&files))).await?
            }
            ToolCall::SaveEvent {
                datasource_name,
                data,
            } => timed("save_event", backend.save_event(&datasource_name, &data)).await?,
        };
        Ok(text)
    }

    fn read_resource(&self, uri: &str) -> McpResult<ReadResourceResult> {
        let kind = ResourceKind::resolve(uri)?;
        let text = match kind {
            ResourceKind::Insights => self.ctx.memo.render(),
            ResourceKind::DatasourceContext => DATASOURCE_DEFINITION_CONTEXT.to_string(),
        };
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: kind.uri(),
                mime_type: kind.mime_type().to_string(),
                text,
            }],
        })
    }

    fn get_prompt(&self, params: PromptGetParams) -> McpResult<Value> {
        info!(session_id = %self.id, prompt = %params.name, "Rendering prompt");
        let result = self
            .ctx
            .registry
            .prompts()
            .get(&params.name, params.arguments.as_ref())?;
        Ok(serde_json::to_value(result)?)
    }

    async fn flush_pending(&mut self) -> McpResult<()> {
        for notif in std::mem::take(&mut self.pending) {
            self.send(OutboundMessage::Notification(notif)).await?;
        }
        Ok(())
    }

    async fn send(&mut self, message: OutboundMessage) -> McpResult<()> {
        if self.outbound.send(message).await.is_err() {
            error!(session_id = %self.id, "Outbound queue closed");
            self.close();
            return Err(McpError::ConnectionClosed);
        }
        Ok(())
    }

    fn ensure_open(&self) -> McpResult<()> {
        if self.state == SessionState::Closed {
            return Err(McpError::ConnectionClosed);
        }
        Ok(())
    }
}
