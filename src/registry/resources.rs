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

//! Resource catalog and `tinybird://` URI resolution.

use crate::core::constants::resources;
use crate::core::errors::{McpError, McpResult};
use crate::core::models::ResourceDescriptor;

const TEXT_PLAIN: &str = "text/plain";

/// Reference material for writing `.datasource` files.
pub const DATASOURCE_DEFINITION_CONTEXT: &str = r#"<context>
Answers MUST follow the Tinybird datafile syntax. Do not use dashes in .datasource file names.
Check the documentation with the llms-tinybird-docs tool when a push fails.

Column definitions can carry a jsonpath that extracts the value from incoming JSON events.
The schema syntax is close to, but not the same as, ClickHouse SQL.

```
DESCRIPTION >
    Raw analytics events

SCHEMA >
    `timestamp` DateTime `json:$.timestamp`,
    `session_id` String `json:$.session_id`,
    `action` LowCardinality(String) `json:$.action`,
    `payload` String `json:$.payload`

ENGINE "MergeTree"
ENGINE_PARTITION_KEY "toYYYYMM(timestamp)"
ENGINE_SORTING_KEY "action, timestamp"
ENGINE_TTL "timestamp + toIntervalDay(60)"
```

Supported ENGINE values:

- MergeTree
- ReplacingMergeTree
- SummingMergeTree
- AggregatingMergeTree
- CollapsingMergeTree
- VersionedCollapsingMergeTree
- Null
</context>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Insights,
    DatasourceContext,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Insights, ResourceKind::DatasourceContext];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Insights => resources::INSIGHTS_PATH,
            Self::DatasourceContext => resources::DATASOURCE_CONTEXT_PATH,
        }
    }

    pub fn uri(&self) -> String {
        format!("{}://{}", resources::SCHEME, self.path())
    }

    pub fn descriptor(&self) -> ResourceDescriptor {
        let (name, description) = match self {
            Self::Insights => (
                "Insights from Tinybird",
                "A living document of discovered insights",
            ),
            Self::DatasourceContext => (
                "Context for datasource definition",
                "Syntax and context to build .datasource datafiles",
            ),
        };
        ResourceDescriptor {
            uri: self.uri(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: TEXT_PLAIN.to_string(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        TEXT_PLAIN
    }

    /// Resolve a URI. Any other scheme or path is "not found".
    pub fn resolve(uri: &str) -> McpResult<Self> {
        let (scheme, path) = uri
            .split_once("://")
            .ok_or_else(|| McpError::NotFound(format!("invalid resource URI: {}", uri)))?;

        if scheme != resources::SCHEME {
            return Err(McpError::NotFound(format!(
                "unsupported URI scheme: {}",
                scheme
            )));
        }

        Self::ALL
            .into_iter()
            .find(|kind| kind.path() == path)
            .ok_or_else(|| McpError::NotFound(format!("unknown resource: {}", uri)))
    }
}
