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

//! mcp-tinybird: an MCP server for a Tinybird workspace.
//!
//! Exposes workspace data sources, pipes and queries as MCP tools, an
//! insight memo and datafile reference as resources, and workspace prompts,
//! over either stdio or server-sent events.

pub mod backend;
pub mod config;
pub mod core;
pub mod mcp;
pub mod protocol;
pub mod registry;
