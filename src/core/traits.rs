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

//! Analytics backend seam.
//!
//! The session only talks to the backend through this trait so tests can
//! substitute an in-memory implementation.

use crate::backend::models::{Pipe, PipeData};
use crate::core::errors::BackendError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait AnalyticsBackend: Send + Sync {
    /// All data sources with their columns
    async fn list_data_sources(&self) -> BackendResult<Vec<Value>>;

    async fn get_data_source(&self, datasource_id: &str) -> BackendResult<Value>;

    /// All pipes, unfiltered
    async fn list_pipes(&self) -> BackendResult<Vec<Pipe>>;

    async fn get_pipe(&self, pipe_id: &str) -> BackendResult<Value>;

    async fn get_pipe_data(
        &self,
        pipe_id: &str,
        params: &[(String, String)],
    ) -> BackendResult<PipeData>;

    /// Run a read-only SQL query; `FORMAT JSON` is appended by the implementation.
    async fn run_select_query(&self, query: &str) -> BackendResult<Value>;

    async fn explain_pipe(&self, pipe_name: &str) -> BackendResult<Value>;

    /// Upload a local `.datasource` or `.pipe` file.
    async fn push_datafile(&self, path: &Path) -> BackendResult<String>;

    /// Append NDJSON rows to a data source through the events API.
    async fn save_event(&self, datasource_name: &str, ndjson: &str) -> BackendResult<String>;

    /// Unauthenticated fetch of the LLM-oriented documentation index.
    async fn fetch_docs(&self) -> BackendResult<String>;
}
