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

//! Prompt store and template rendering.
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal braces.
//! The store is loaded once at startup from the workspace `prompts` data
//! source, and the built-in `tinybird-default` prompt is appended when the
//! workspace does not define one of that name.

use crate::backend::models::{QueryRows, RemotePrompt};
use crate::core::constants::prompts::{DEFAULT_PROMPT_NAME, REMOTE_PROMPTS_QUERY};
use crate::core::errors::{McpError, McpResult};
use crate::core::models::{
    Content, GetPromptResult, PromptArgument, PromptDescriptor, PromptMessage,
};
use crate::core::traits::AnalyticsBackend;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{info, warn};

const DEFAULT_PROMPT_DESCRIPTION: &str =
    "A prompt to get insights from the Data Sources and Pipe Endpoints in the Tinybird Workspace";

const DEFAULT_PROMPT_TEMPLATE: &str = r#"
Tinybird is a real-time analytics platform. Data Sources hold the data, like tables, and Pipes are SQL transformations over them that can be published as REST endpoints. Use the "llms-tinybird-docs" tool for the full product documentation.

You are helping a business user get insights out of their Tinybird Workspace. Assume they know nothing about how the data is structured. The topic they picked is: {topic}.

<mcp>
Resources:
"tinybird://insights" is a memo of business insights. It is updated every time the "append-insight" tool is used.

Tools:
"list-data-sources" and "get-data-source" describe the Data Sources and their schemas.
"list-pipes" and "get-pipe" describe the Pipe Endpoints and the SQL of their nodes.
"request-pipe-data" calls a Pipe Endpoint, optionally with parameters.
"run-select-query" runs a SELECT over Data Sources or Pipe Endpoints.
"append-insight" records an insight in the memo.
"save-event" sends an event to a Data Source, for example a new prompt to the prompts Data Source.

The SQL dialect is ClickHouse. Only use SELECT statements, never end a query with a semicolon and never add a FORMAT clause.
</mcp>

<demo-instructions>
1. The topic is: {topic}. Explain what it covers and which insights could be worth exploring.
2. Inspect the data without asking first: read the Data Source schemas and the existing Pipe Endpoints. Fall back to "run-select-query" when no endpoint fits.
3. Summarize what you found and offer the user a few next steps as multiple choice, in plain language.
4. For the chosen step, run the query, comment on the result and save every insight with "append-insight". Offer another option and repeat.
5. When the user is ready, build a dashboard artifact with tables and charts tied to the topic.
6. Finish by telling the user the memo at tinybird://insights is up to date and present it in an artifact.
</demo-instructions>
"#;

/// Ordered set of prompts with unique names.
#[derive(Debug)]
pub struct PromptStore {
    prompts: RwLock<Vec<PromptDescriptor>>,
}

impl Default for PromptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptStore {
    /// Store holding only the built-in prompt
    pub fn new() -> Self {
        Self {
            prompts: RwLock::new(vec![default_prompt()]),
        }
    }

    pub fn list(&self) -> Vec<PromptDescriptor> {
        self.prompts.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the set with remote prompts, keeping the last definition of
    /// each name, then append the built-in prompt if it was not overridden.
    pub fn load_remote(&self, remote: Vec<RemotePrompt>) {
        let mut merged: Vec<PromptDescriptor> = Vec::with_capacity(remote.len() + 1);
        for row in remote {
            let prompt = PromptDescriptor {
                arguments: row
                    .arguments
                    .iter()
                    .map(|name| PromptArgument {
                        name: name.clone(),
                        description: name.clone(),
                        required: true,
                    })
                    .collect(),
                name: row.name,
                description: row.description,
                template: row.prompt,
            };
            match merged.iter_mut().find(|p| p.name == prompt.name) {
                Some(existing) => *existing = prompt,
                None => merged.push(prompt),
            }
        }

        if !merged.iter().any(|p| p.name == DEFAULT_PROMPT_NAME) {
            merged.push(default_prompt());
        }

        *self.prompts.write().unwrap_or_else(|e| e.into_inner()) = merged;
    }

    /// Fetch remote prompts from the backend. Failures degrade to the
    /// built-in prompt only.
    pub async fn refresh(&self, backend: &dyn AnalyticsBackend) {
        info!("Listing prompts");
        let rows = match backend.run_select_query(REMOTE_PROMPTS_QUERY).await {
            Ok(body) => match serde_json::from_value::<QueryRows<Value>>(body) {
                Ok(rows) => rows.data,
                Err(e) => {
                    warn!("Unexpected prompts response shape: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Failed to list remote prompts: {}", e);
                Vec::new()
            }
        };

        // A malformed row only costs that prompt.
        let remote: Vec<RemotePrompt> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<RemotePrompt>(row) {
                Ok(prompt) => Some(prompt),
                Err(e) => {
                    warn!("Skipping malformed prompt row: {}", e);
                    None
                }
            })
            .collect();
        info!(count = remote.len(), "Found remote prompts");
        self.load_remote(remote);
    }

    /// Render a prompt by name.
    pub fn get(
        &self,
        name: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> McpResult<GetPromptResult> {
        let prompt = self
            .prompts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| McpError::NotFound(format!("unknown prompt: {}", name)))?;

        let supplied = arguments.cloned().unwrap_or_default();

        // Declared arguments always have a value; missing ones render empty.
        let mut declared = Map::new();
        for arg in &prompt.arguments {
            let value = supplied.get(&arg.name).map(value_text).unwrap_or_default();
            declared.insert(arg.name.clone(), Value::String(value));
        }

        let mut values: HashMap<String, String> = supplied
            .iter()
            .map(|(k, v)| (k.clone(), value_text(v)))
            .collect();
        for (k, v) in &declared {
            values.insert(k.clone(), value_text(v));
        }

        let text = render(&prompt.template, &values)?;

        Ok(GetPromptResult {
            description: format!("Demo template for {}", Value::Object(declared)),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: Content::text(text.trim()),
            }],
        })
    }
}

fn default_prompt() -> PromptDescriptor {
    PromptDescriptor {
        name: DEFAULT_PROMPT_NAME.to_string(),
        description: DEFAULT_PROMPT_DESCRIPTION.to_string(),
        arguments: vec![PromptArgument {
            name: "topic".to_string(),
            description: "The topic of the data you want to explore".to_string(),
            required: true,
        }],
        template: DEFAULT_PROMPT_TEMPLATE.to_string(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Substitute `{name}` placeholders.
pub fn render(template: &str, values: &HashMap<String, String>) -> McpResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    if n == '{' {
                        break;
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(McpError::TemplateRender(
                        "unbalanced '{' in template".to_string(),
                    ));
                }
                let key = name.trim();
                let value = values.get(key).ok_or_else(|| {
                    McpError::TemplateRender(format!("no value for placeholder '{}'", key))
                })?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(McpError::TemplateRender(
                    "single '}' encountered in template".to_string(),
                ));
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}
