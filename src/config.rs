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

use crate::core::constants::config as keys;
use crate::core::errors::McpError;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub admin_token: Option<String>,
    pub docs_url: String,
    pub request_timeout_secs: u64,
    pub bind_address: String,
    pub port: u16,
    pub body_size_limit: usize,
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    pub fn from_env() -> Result<Self, McpError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, McpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
        };

        Ok(Self {
            api_url: text(keys::ENV_API_URL, defaults.api_url),
            admin_token: lookup(keys::ENV_ADMIN_TOKEN).filter(|v| !v.is_empty()),
            docs_url: text(keys::ENV_DOCS_URL, defaults.docs_url),
            request_timeout_secs: parse_number(
                keys::ENV_REQUEST_TIMEOUT_SECS,
                lookup(keys::ENV_REQUEST_TIMEOUT_SECS),
                defaults.request_timeout_secs,
            )?,
            bind_address: text(keys::ENV_BIND_ADDRESS, defaults.bind_address),
            port: parse_number(keys::ENV_PORT, lookup(keys::ENV_PORT), defaults.port)?,
            body_size_limit: parse_number(
                keys::ENV_BODY_SIZE_LIMIT,
                lookup(keys::ENV_BODY_SIZE_LIMIT),
                defaults.body_size_limit,
            )?,
            log_level: text(keys::ENV_LOG_LEVEL, defaults.log_level),
            log_format: text(keys::ENV_LOG_FORMAT, defaults.log_format),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, McpError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse::<T>().map_err(|_| {
            McpError::Configuration(format!("{} must be a number, got '{}'", key, v))
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: keys::DEFAULT_API_URL.to_string(),
            admin_token: None,
            docs_url: keys::DEFAULT_DOCS_URL.to_string(),
            request_timeout_secs: keys::DEFAULT_REQUEST_TIMEOUT_SECS,
            bind_address: keys::DEFAULT_BIND_ADDRESS.to_string(),
            port: keys::DEFAULT_PORT,
            body_size_limit: keys::DEFAULT_BODY_SIZE_LIMIT,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, "https://api.tinybird.co");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.port, 3001);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("TB_API_URL", "http://localhost:8001"),
            ("TB_ADMIN_TOKEN", "p.abc"),
            ("PORT", "9000"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8001");
        assert_eq!(config.admin_token.as_deref(), Some("p.abc"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = Config::from_lookup(lookup(&[("TB_REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, McpError::Configuration(_)));
    }

    #[test]
    fn test_token_never_serialized() {
        let config = Config::from_lookup(lookup(&[("TB_ADMIN_TOKEN", "secret")])).unwrap();
        let out = serde_json::to_string(&config).unwrap();
        assert!(!out.contains("secret"));
    }
}
