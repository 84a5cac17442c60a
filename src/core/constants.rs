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

//! mcp-tinybird Constants - Single source of truth for all configuration values.
//!
//! This module centralizes protocol method names, error codes, URIs and
//! configuration keys so the transports and the session agree on them.

/// JSON-RPC 2.0 Error Codes
pub mod jsonrpc {
    /// Backend or transport failure (server error range)
    pub const ERROR_SERVER: i32 = -32000;
    /// Resource or prompt not found (MCP convention)
    pub const ERROR_NOT_FOUND: i32 = -32002;
    /// Invalid request (standard JSON-RPC)
    pub const ERROR_INVALID_REQUEST: i32 = -32600;
    /// Method not found (standard JSON-RPC)
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params (standard JSON-RPC)
    pub const ERROR_INVALID_PARAMS: i32 = -32602;
    /// Internal error (standard JSON-RPC)
    pub const ERROR_INTERNAL: i32 = -32603;
    /// Parse error (standard JSON-RPC)
    pub const ERROR_PARSE: i32 = -32700;
}

/// Server identity reported during initialization
pub mod server {
    pub const NAME: &str = "mcp-tinybird";
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_API_URL: &str = "TB_API_URL";
    pub const ENV_ADMIN_TOKEN: &str = "TB_ADMIN_TOKEN";
    pub const ENV_DOCS_URL: &str = "TB_DOCS_URL";
    pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TB_REQUEST_TIMEOUT_SECS";
    pub const ENV_BIND_ADDRESS: &str = "BIND_ADDRESS";
    pub const ENV_PORT: &str = "PORT";
    pub const ENV_BODY_SIZE_LIMIT: &str = "BODY_SIZE_LIMIT_BYTES";
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

    pub const DEFAULT_API_URL: &str = "https://api.tinybird.co";
    pub const DEFAULT_DOCS_URL: &str = "https://www.tinybird.co/docs/llms.txt";
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3001;
    /// Backend request ceiling in seconds
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_BODY_SIZE_LIMIT: usize = 4 * 1024 * 1024;
}

/// MCP Protocol Methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";

    pub const NOTIFICATION_INITIALIZED: &str = "notifications/initialized";
    pub const NOTIFICATION_CANCELLED: &str = "notifications/cancelled";
    pub const NOTIFICATION_RESOURCE_UPDATED: &str = "notifications/resources/updated";
}

/// Resource URIs
pub mod resources {
    pub const SCHEME: &str = "tinybird";
    pub const INSIGHTS_PATH: &str = "insights";
    pub const DATASOURCE_CONTEXT_PATH: &str = "datasource-definition-context";
    pub const INSIGHTS_URI: &str = "tinybird://insights";
}

/// Prompt names
pub mod prompts {
    pub const DEFAULT_PROMPT_NAME: &str = "tinybird-default";
    /// Latest revision of every prompt stored in the workspace
    pub const REMOTE_PROMPTS_QUERY: &str =
        "SELECT * FROM prompts ORDER BY name, timestamp DESC LIMIT 1 BY name";
}

/// Streaming transport routes
pub mod sse {
    pub const SSE_PATH: &str = "/sse";
    pub const MESSAGES_PATH: &str = "/messages";
    pub const HEALTH_PATH: &str = "/health";
    pub const SESSION_ID_PARAM: &str = "session_id";
    pub const ENDPOINT_EVENT: &str = "endpoint";
    pub const MESSAGE_EVENT: &str = "message";
    /// Outbound frames buffered per event stream before senders wait
    pub const OUTBOUND_QUEUE_DEPTH: usize = 64;
}

/// Transport Limits (DoS Protection)
pub mod limits {
    /// Maximum allowed JSON-RPC message size (10 MB)
    pub const MAX_MESSAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    /// Maximum LSP-style header block size
    pub const MAX_HEADER_BYTES: usize = 4096;
}
