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

//! Insight memo backing the `tinybird://insights` resource.
//!
//! One memo lives for the whole process and is shared by every session, so
//! an insight appended over one connection is visible to all readers.

use std::sync::RwLock;

const EMPTY_MEMO: &str = "No insights have been discovered yet.";

/// Append-only, ordered list of insights.
#[derive(Debug, Default)]
pub struct InsightMemo {
    entries: RwLock<Vec<String>>,
}

impl InsightMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one insight and return the memo as rendered after the append.
    pub fn append(&self, insight: impl Into<String>) -> String {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(insight.into());
        synthesize(&entries)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the entries in append order
    pub fn entries(&self) -> Vec<String> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn render(&self) -> String {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        synthesize(&entries)
    }
}

fn synthesize(entries: &[String]) -> String {
    if entries.is_empty() {
        return EMPTY_MEMO.to_string();
    }

    let lines = entries
        .iter()
        .map(|insight| format!("- {}", insight))
        .collect::<Vec<_>>()
        .join("\n");

    let mut memo = String::from("📊 Analysis Memo 📊\n\nKey Insights Discovered:\n\n");
    memo.push_str(&lines);

    if entries.len() > 1 {
        memo.push_str("\nSummary:\n");
        memo.push_str(&format!(
            "Analysis has revealed {} key insights.",
            entries.len()
        ));
    }

    memo
}
