// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call/result counters driving the circuit breaker's "call/result gap"
//! tripwire.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three orchestration-relevant tool names the circuit breaker watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Team,
    Pipeline,
    Subagent,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::Team, ToolKind::Pipeline, ToolKind::Subagent];

    /// Stable string form, used as the `Counters` map key since `serde_json`
    /// objects require string keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Team => "team",
            ToolKind::Pipeline => "pipeline",
            ToolKind::Subagent => "subagent",
        }
    }
}

/// Per tool-kind call/result counts. `gap = calls - results`, saturating at
/// zero so out-of-order results (a `recordToolResult` observed before its
/// matching `recordToolCall` completes, across processes) never drive the
/// gap negative or panic on underflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterPair {
    pub calls: u64,
    pub results: u64,
}

impl CounterPair {
    pub fn gap(&self) -> u64 {
        self.calls.saturating_sub(self.results)
    }
}

/// Counters for all recognized tool kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub by_kind: HashMap<String, CounterPair>,
}

impl Counters {
    pub fn record_call(&mut self, kind: ToolKind) {
        self.by_kind.entry(kind.as_str().to_string()).or_default().calls += 1;
    }

    pub fn record_result(&mut self, kind: ToolKind) {
        self.by_kind.entry(kind.as_str().to_string()).or_default().results += 1;
    }

    /// The fleet-wide maximum gap across all tool kinds — what the circuit
    /// breaker's gap guard actually compares against the threshold.
    pub fn max_gap(&self) -> u64 {
        self.by_kind.values().map(CounterPair::gap).max().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.by_kind.clear();
    }
}
