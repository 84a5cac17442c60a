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

//! Error types for the MCP server.
//!
//! `McpError` covers protocol, backend and transport failures. Each variant
//! maps to a JSON-RPC error code (for the peer) and an HTTP status (for the
//! streaming transport's POST channel).

use crate::core::constants::jsonrpc;
use axum::http::StatusCode;
use thiserror::Error;

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur while serving a session
#[derive(Error, Debug)]
pub enum McpError {
    /// Frame was not valid JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Frame was JSON but not a valid request for the current state
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Missing or malformed arguments
    #[error("Bad request: {0}")]
    InvalidParams(String),

    /// call-tool for a name the registry does not know
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Resource or prompt lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Prompt template references an argument nobody supplied
    #[error("Template render error: {0}")]
    TemplateRender(String),

    /// Request arrived before the handshake completed
    #[error("Session not initialized")]
    NotInitialized,

    /// Session is closed; no further dispatch
    #[error("Connection closed")]
    ConnectionClosed,

    /// External analytics service failure
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O Error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures talking to the analytics backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Non-2xx response
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request exceeded the client timeout
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Connection-level failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// 2xx response that could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),

    /// Local input for the call could not be prepared (e.g. unreadable datafile)
    #[error("invalid input: {0}")]
    Input(String),
}

impl McpError {
    /// Convert error to JSON-RPC error code
    pub fn code(&self) -> i32 {
        match self {
            McpError::Parse(_) => jsonrpc::ERROR_PARSE,
            McpError::InvalidRequest(_) | McpError::NotInitialized => {
                jsonrpc::ERROR_INVALID_REQUEST
            }
            McpError::MethodNotFound(_) => jsonrpc::ERROR_METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::UnknownTool(_) => jsonrpc::ERROR_INVALID_PARAMS,
            McpError::NotFound(_) => jsonrpc::ERROR_NOT_FOUND,
            McpError::TemplateRender(_)
            | McpError::Configuration(_)
            | McpError::Json(_) => jsonrpc::ERROR_INTERNAL,
            McpError::ConnectionClosed | McpError::Backend(_) | McpError::Io(_) => {
                jsonrpc::ERROR_SERVER
            }
        }
    }

    /// HTTP status used when this error terminates a POST on the streaming transport
    pub fn status(&self) -> StatusCode {
        match self {
            McpError::Parse(_) | McpError::InvalidRequest(_) | McpError::InvalidParams(_) => {
                StatusCode::BAD_REQUEST
            }
            McpError::NotFound(_) => StatusCode::NOT_FOUND,
            McpError::ConnectionClosed => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the failure means the physical connection is gone
    pub fn is_transport(&self) -> bool {
        matches!(self, McpError::ConnectionClosed | McpError::Io(_))
    }
}
