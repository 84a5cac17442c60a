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

//! Typed request dispatch.
//!
//! `McpRequest` is the closed set of methods a session answers; `ToolCall`
//! carries the decoded arguments of one tool invocation.

use crate::core::constants::methods;
use crate::core::errors::{McpError, McpResult};
use crate::core::models::{InitializeParams, PromptGetParams, ResourceReadParams, ToolCallParams};
use crate::registry::tools::ToolKind;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub enum McpRequest {
    Initialize(InitializeParams),
    Ping,
    ListTools,
    CallTool(ToolCallParams),
    ListResources,
    ReadResource(ResourceReadParams),
    ListPrompts,
    GetPrompt(PromptGetParams),
}

impl McpRequest {
    pub fn parse(method: &str, params: Option<Value>) -> McpResult<Self> {
        match method {
            methods::INITIALIZE => Ok(Self::Initialize(decode_params(params)?)),
            methods::PING => Ok(Self::Ping),
            methods::TOOLS_LIST => Ok(Self::ListTools),
            methods::TOOLS_CALL => Ok(Self::CallTool(decode_params(params)?)),
            methods::RESOURCES_LIST => Ok(Self::ListResources),
            methods::RESOURCES_READ => Ok(Self::ReadResource(decode_params(params)?)),
            methods::PROMPTS_LIST => Ok(Self::ListPrompts),
            methods::PROMPTS_GET => Ok(Self::GetPrompt(decode_params(params)?)),
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Initialize(_) => methods::INITIALIZE,
            Self::Ping => methods::PING,
            Self::ListTools => methods::TOOLS_LIST,
            Self::CallTool(_) => methods::TOOLS_CALL,
            Self::ListResources => methods::RESOURCES_LIST,
            Self::ReadResource(_) => methods::RESOURCES_READ,
            Self::ListPrompts => methods::PROMPTS_LIST,
            Self::GetPrompt(_) => methods::PROMPTS_GET,
        }
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    let params = params.ok_or_else(|| McpError::InvalidParams("missing params".into()))?;
    serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))
}

/// One tool invocation with decoded arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListDataSources,
    GetDataSource { datasource_id: String },
    ListPipes,
    GetPipe { pipe_id: String },
    RequestPipeData { pipe_id: String, params: Vec<(String, String)> },
    RunSelectQuery { select_query: String },
    AppendInsight { insight: String },
    LlmsDocs,
    AnalyzePipe { pipe_name: String },
    PushDatafile { files: String },
    SaveEvent { datasource_name: String, data: String },
}

#[derive(Deserialize)]
struct DataSourceArgs {
    datasource_id: String,
}

#[derive(Deserialize)]
struct PipeArgs {
    pipe_id: String,
}

#[derive(Deserialize)]
struct PipeDataArgs {
    pipe_id: String,
    #[serde(default)]
    params: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct SelectArgs {
    select_query: String,
}

#[derive(Deserialize)]
struct InsightArgs {
    insight: String,
}

#[derive(Deserialize)]
struct ExplainArgs {
    pipe_name: String,
}

#[derive(Deserialize)]
struct DatafileArgs {
    files: String,
}

#[derive(Deserialize)]
struct EventArgs {
    datasource_name: String,
    data: Value,
}

impl ToolCall {
    /// Decode arguments for an already resolved tool.
    pub fn decode(kind: ToolKind, arguments: Option<Value>) -> McpResult<Self> {
        let args = arguments.unwrap_or_else(|| Value::Object(Map::new()));
        let call = match kind {
            ToolKind::ListDataSources => Self::ListDataSources,
            ToolKind::ListPipes => Self::ListPipes,
            ToolKind::LlmsDocs => Self::LlmsDocs,
            ToolKind::GetDataSource => {
                let a: DataSourceArgs = decode_args(args)?;
                Self::GetDataSource {
                    datasource_id: a.datasource_id,
                }
            }
            ToolKind::GetPipe => {
                let a: PipeArgs = decode_args(args)?;
                Self::GetPipe { pipe_id: a.pipe_id }
            }
            ToolKind::RequestPipeData => {
                let a: PipeDataArgs = decode_args(args)?;
                let params = a
                    .params
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(k, v)| (k, query_value(v)))
                    .collect();
                Self::RequestPipeData {
                    pipe_id: a.pipe_id,
                    params,
                }
            }
            ToolKind::RunSelectQuery => {
                let a: SelectArgs = decode_args(args)?;
                Self::RunSelectQuery {
                    select_query: a.select_query,
                }
            }
            ToolKind::AppendInsight => {
                let a: InsightArgs = decode_args(args)?;
                Self::AppendInsight { insight: a.insight }
            }
            ToolKind::AnalyzePipe => {
                let a: ExplainArgs = decode_args(args)?;
                Self::AnalyzePipe {
                    pipe_name: a.pipe_name,
                }
            }
            ToolKind::PushDatafile => {
                let a: DatafileArgs = decode_args(args)?;
                Self::PushDatafile { files: a.files }
            }
            ToolKind::SaveEvent => {
                let a: EventArgs = decode_args(args)?;
                let data = match a.data {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                Self::SaveEvent {
                    datasource_name: a.datasource_name,
                    data,
                }
            }
        };
        Ok(call)
    }
}

fn decode_args<T: DeserializeOwned>(args: Value) -> McpResult<T> {
    serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn query_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
