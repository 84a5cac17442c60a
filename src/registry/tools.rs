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

//! Tool catalog.

use crate::core::models::ToolDescriptor;
use serde_json::{json, Value};

/// Every tool the server can execute. The registry maps names to these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListDataSources,
    GetDataSource,
    ListPipes,
    GetPipe,
    RequestPipeData,
    RunSelectQuery,
    AppendInsight,
    LlmsDocs,
    AnalyzePipe,
    PushDatafile,
    SaveEvent,
}

impl ToolKind {
    pub const ALL: [ToolKind; 11] = [
        ToolKind::ListDataSources,
        ToolKind::GetDataSource,
        ToolKind::ListPipes,
        ToolKind::GetPipe,
        ToolKind::RequestPipeData,
        ToolKind::RunSelectQuery,
        ToolKind::AppendInsight,
        ToolKind::LlmsDocs,
        ToolKind::AnalyzePipe,
        ToolKind::PushDatafile,
        ToolKind::SaveEvent,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ListDataSources => "list-data-sources",
            Self::GetDataSource => "get-data-source",
            Self::ListPipes => "list-pipes",
            Self::GetPipe => "get-pipe",
            Self::RequestPipeData => "request-pipe-data",
            Self::RunSelectQuery => "run-select-query",
            Self::AppendInsight => "append-insight",
            Self::LlmsDocs => "llms-tinybird-docs",
            Self::AnalyzePipe => "analyze-pipe",
            Self::PushDatafile => "push-datafile",
            Self::SaveEvent => "save-event",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::ListDataSources => "List all Data Sources in the Tinybird Workspace",
            Self::GetDataSource => {
                "Get details of a Data Source in the Tinybird Workspace, such as the schema"
            }
            Self::ListPipes => "List all Pipe Endpoints in the Tinybird Workspace",
            Self::GetPipe => {
                "Get details of a Pipe Endpoint in the Tinybird Workspace, such as the SQL of \
                 its nodes and the Data Sources they read from"
            }
            Self::RequestPipeData => {
                "Request data from a Pipe Endpoint in the Tinybird Workspace, with optional parameters"
            }
            Self::RunSelectQuery => {
                "Run a SELECT query against the Tinybird Workspace. It may read Data Sources or Pipe Endpoints"
            }
            Self::AppendInsight => "Add a business insight to the memo",
            Self::LlmsDocs => {
                "Tinybird product description and documentation, including the API reference, \
                 in an LLM friendly format"
            }
            Self::AnalyzePipe => "Explain the query plan of a Pipe Endpoint",
            Self::PushDatafile => "Push a .datasource or .pipe file to the Workspace",
            Self::SaveEvent => {
                "Send an event to a Data Source in Tinybird. The data is sent as NDJSON and must \
                 match the Data Source schema"
            }
        }
    }

    fn input_schema(&self) -> Value {
        match self {
            Self::ListDataSources | Self::ListPipes | Self::LlmsDocs => empty_schema(),
            Self::GetDataSource => string_args(&[("datasource_id", None)]),
            Self::GetPipe => string_args(&[("pipe_id", None)]),
            Self::RequestPipeData => json!({
                "type": "object",
                "properties": {
                    "pipe_id": { "type": "string" },
                    "params": { "type": "object", "properties": {} }
                },
                "required": ["pipe_id"]
            }),
            Self::RunSelectQuery => string_args(&[("select_query", None)]),
            Self::AppendInsight => string_args(&[(
                "insight",
                Some("Business insight discovered from data analysis"),
            )]),
            Self::AnalyzePipe => string_args(&[("pipe_name", Some("The Pipe Endpoint name"))]),
            Self::PushDatafile => string_args(&[("files", Some("The datafile local path"))]),
            Self::SaveEvent => json!({
                "type": "object",
                "properties": {
                    "datasource_name": {
                        "type": "string",
                        "description": "The name of the Data Source in Tinybird"
                    },
                    "data": {
                        "type": "string",
                        "description": "A JSON object converted to one NDJSON line, with one key per Data Source column"
                    }
                },
                "required": ["datasource_name", "data"]
            }),
        }
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn string_args(args: &[(&str, Option<&str>)]) -> Value {
    let mut properties = serde_json::Map::new();
    for (name, description) in args {
        let mut prop = json!({ "type": "string" });
        if let Some(desc) = description {
            prop["description"] = json!(desc);
        }
        properties.insert(name.to_string(), prop);
    }
    let required: Vec<&str> = args.iter().map(|(name, _)| *name).collect();
    json!({ "type": "object", "properties": properties, "required": required })
}
