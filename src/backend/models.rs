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

//! Structured views of backend responses.
//!
//! Only the fields the server inspects are typed; everything else travels
//! through as `serde_json::Value`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipe {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Pipe {
    pub fn is_endpoint(&self) -> bool {
        self.kind == "endpoint"
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PipeList {
    #[serde(default)]
    pub pipes: Vec<Pipe>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataSourceList {
    #[serde(default)]
    pub datasources: Vec<Value>,
}

/// Rows returned by a pipe endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipeData {
    #[serde(default)]
    pub meta: Vec<Value>,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// One row of the `prompts` data source
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePrompt {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub arguments: Vec<String>,
}

/// Nullable columns come back as JSON `null`; treat them like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Subset of a `FORMAT JSON` SQL response
#[derive(Debug, Deserialize)]
pub(crate) struct QueryRows<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Kind of datafile accepted by `push-datafile`, decided by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatafileKind {
    DataSource,
    Pipe,
}

impl DatafileKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "datasource" => Some(Self::DataSource),
            "pipe" => Some(Self::Pipe),
            _ => None,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::DataSource => "v0/datasources",
            Self::Pipe => "v0/pipes",
        }
    }
}
