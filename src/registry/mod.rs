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

//! Capability registry.
//!
//! Holds the tool, resource and prompt catalogs shared by every session and
//! derives the capability flags advertised during negotiation.

pub mod prompts;
pub mod resources;
pub mod tools;

use crate::core::errors::{McpError, McpResult};
use crate::core::models::{
    ListChangedCapability, PromptDescriptor, ResourceDescriptor, ResourcesCapability,
    ServerCapabilities, ToolDescriptor,
};
use prompts::PromptStore;
use resources::ResourceKind;
use std::collections::HashMap;
use tools::ToolKind;

#[derive(Debug)]
pub struct CapabilityRegistry {
    tools: Vec<ToolDescriptor>,
    tool_index: HashMap<String, ToolKind>,
    resources: Vec<ResourceDescriptor>,
    prompts: PromptStore,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::with_tools(&ToolKind::ALL)
    }

    /// Registry exposing only the given tools
    pub fn with_tools(kinds: &[ToolKind]) -> Self {
        let tools = kinds.iter().map(ToolKind::descriptor).collect();
        let tool_index = kinds
            .iter()
            .map(|kind| (kind.name().to_string(), *kind))
            .collect();
        Self {
            tools,
            tool_index,
            resources: ResourceKind::ALL.iter().map(ResourceKind::descriptor).collect(),
            prompts: PromptStore::new(),
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.clone()
    }

    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.resources.clone()
    }

    pub fn list_prompts(&self) -> Vec<PromptDescriptor> {
        self.prompts.list()
    }

    pub fn prompts(&self) -> &PromptStore {
        &self.prompts
    }

    pub fn resolve_tool(&self, name: &str) -> McpResult<ToolKind> {
        self.tool_index
            .get(name)
            .copied()
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))
    }

    /// Capability flags; a section is present only when its catalog is non-empty.
    pub fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: (!self.tools.is_empty()).then(ListChangedCapability::default),
            resources: (!self.resources.is_empty()).then(ResourcesCapability::default),
            prompts: (!self.prompts.list().is_empty()).then(ListChangedCapability::default),
        }
    }
}
