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

//! HTTP client for the Tinybird REST API.
//!
//! Every authenticated call carries the admin token as the `token` query
//! parameter. Non-2xx responses become `BackendError::Status` with the
//! response body attached.

use crate::backend::models::{DataSourceList, DatafileKind, Pipe, PipeData, PipeList};
use crate::config::Config;
use crate::core::errors::{BackendError, McpError, McpResult};
use crate::core::traits::{AnalyticsBackend, BackendResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("mcp-tinybird/", env!("CARGO_PKG_VERSION"));

pub struct TinybirdClient {
    http: Client,
    api_url: String,
    token: Option<String>,
    docs_url: String,
    timeout_secs: u64,
}

impl TinybirdClient {
    pub fn new(
        api_url: &str,
        token: Option<String>,
        docs_url: &str,
        timeout_secs: u64,
    ) -> McpResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                McpError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        if token.is_none() {
            warn!("No Tinybird token configured; authenticated calls will be rejected");
        }

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            docs_url: docs_url.to_string(),
            timeout_secs,
        })
    }

    pub fn from_config(config: &Config) -> McpResult<Self> {
        Self::new(
            &config.api_url,
            config.admin_token.clone(),
            &config.docs_url,
            config.request_timeout_secs,
        )
    }

    /// `endpoint` is a fixed API path; each `tail` entry is pushed as one
    /// percent-encoded path segment.
    fn url(&self, endpoint: &str, tail: &[&str]) -> BackendResult<Url> {
        let mut url = Url::parse(&self.api_url).map_err(|e| {
            BackendError::Input(format!("invalid API URL {}: {}", self.api_url, e))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                BackendError::Input(format!("API URL cannot carry a path: {}", self.api_url))
            })?;
            path.pop_if_empty();
            path.extend(endpoint.split('/'));
            for segment in tail {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.query(&[("token", token.as_str())]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout_secs)
            } else {
                BackendError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn text(&self, request: RequestBuilder) -> BackendResult<String> {
        let response = self.send(request).await?;
        response.text().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.timeout_secs)
            } else {
                BackendError::Decode(e.to_string())
            }
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(String, String)],
    ) -> BackendResult<T> {
        debug!(path = url.path(), "GET");
        let request = self.authed(self.http.get(url).query(params));
        let body = self.text(request).await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Peer-supplied names become single path segments; dot segments would be
/// collapsed by the URL parser and address a different endpoint.
fn path_id(id: &str) -> BackendResult<&str> {
    match id {
        "" | "." | ".." => Err(BackendError::Input(format!(
            "invalid resource name: '{}'",
            id
        ))),
        _ => Ok(id),
    }
}

fn attrs(value: &str) -> Vec<(String, String)> {
    vec![("attrs".to_string(), value.to_string())]
}

#[async_trait]
impl AnalyticsBackend for TinybirdClient {
    async fn list_data_sources(&self) -> BackendResult<Vec<Value>> {
        let list: DataSourceList = self
            .get_json(self.url("v0/datasources", &[])?, &attrs("id,name,description,columns"))
            .await?;
        Ok(list.datasources)
    }

    async fn get_data_source(&self, datasource_id: &str) -> BackendResult<Value> {
        let url = self.url("v0/datasources", &[path_id(datasource_id)?])?;
        self.get_json(url, &attrs("columns")).await
    }

    async fn list_pipes(&self) -> BackendResult<Vec<Pipe>> {
        let list: PipeList = self
            .get_json(self.url("v0/pipes", &[])?, &attrs("id,name,description,type,endpoint"))
            .await?;
        Ok(list.pipes)
    }

    async fn get_pipe(&self, pipe_id: &str) -> BackendResult<Value> {
        let url = self.url("v0/pipes", &[path_id(pipe_id)?])?;
        self.get_json(url, &[]).await
    }

    async fn get_pipe_data(
        &self,
        pipe_id: &str,
        params: &[(String, String)],
    ) -> BackendResult<PipeData> {
        let segment = format!("{}.json", path_id(pipe_id)?);
        let url = self.url("v0/pipes", &[segment.as_str()])?;
        self.get_json(url, params).await
    }

    async fn run_select_query(&self, query: &str) -> BackendResult<Value> {
        let params = vec![("q".to_string(), format!("{} FORMAT JSON", query))];
        self.get_json(self.url("v0/sql", &[])?, &params).await
    }

    async fn explain_pipe(&self, pipe_name: &str) -> BackendResult<Value> {
        let url = self.url("v0/pipes", &[path_id(pipe_name)?, "explain"])?;
        self.get_json(url, &[]).await
    }

    async fn push_datafile(&self, path: &Path) -> BackendResult<String> {
        let kind = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(DatafileKind::from_extension)
            .ok_or_else(|| {
                BackendError::Input(format!(
                    "{} is not a .datasource or .pipe file",
                    path.display()
                ))
            })?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| BackendError::Input(format!("invalid file name: {}", path.display())))?
            .to_string();
        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BackendError::Input(format!("{}: {}", path.display(), e)))?;

        debug!(endpoint = kind.endpoint(), name = %name, "Pushing datafile");
        let request = self.authed(
            self.http
                .post(self.url(kind.endpoint(), &[])?)
                .query(&[("name", name.as_str())])
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(body),
        );
        self.text(request).await
    }

    async fn save_event(&self, datasource_name: &str, ndjson: &str) -> BackendResult<String> {
        let request = self.authed(
            self.http
                .post(self.url("v0/events", &[])?)
                .query(&[("name", datasource_name)])
                .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
                .body(ndjson.to_string()),
        );
        self.text(request).await
    }

    async fn fetch_docs(&self) -> BackendResult<String> {
        self.text(self.http.get(&self.docs_url)).await
    }
}
