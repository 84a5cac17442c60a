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

//! Protocol version negotiation.
//!
//! The server echoes any version it supports and otherwise answers with the
//! latest one, leaving the client to decide whether to continue.

use tracing::info;

/// Supported protocol revisions, oldest first.
pub const SUPPORTED_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", "2025-06-18"];

pub const LATEST_VERSION: &str = SUPPORTED_VERSIONS[SUPPORTED_VERSIONS.len() - 1];

pub struct HandshakeManager;

impl HandshakeManager {
    /// Pick the protocol version to answer `initialize` with.
    pub fn negotiate(client_version: &str) -> &'static str {
        match SUPPORTED_VERSIONS.iter().find(|v| **v == client_version) {
            Some(version) => version,
            None => {
                info!(
                    "Unknown version '{}', answering with {}",
                    client_version, LATEST_VERSION
                );
                LATEST_VERSION
            }
        }
    }
}
