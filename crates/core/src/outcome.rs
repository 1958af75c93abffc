// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-child outcome, as attached to a team card or pipeline step result.

use crate::governor::GovernorSummary;
use crate::health::HealthSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSource {
    User,
    Project,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRunStatus {
    Pending,
    Running,
    Ok,
    /// Completed on a retryable reason after exhausting attempts, kept
    /// because its output cleared `min_degraded_output_length` — a
    /// best-effort result, not a clean success.
    Degraded,
    Failed,
}

impl AgentRunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentRunStatus::Ok | AgentRunStatus::Degraded | AgentRunStatus::Failed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default)]
    pub cache_read: u64,
    #[serde(default)]
    pub cache_write: u64,
    #[serde(default)]
    pub cost_usd: f64,
    #[serde(default)]
    pub context_tokens: u64,
    #[serde(default)]
    pub turns: u32,
    #[serde(default)]
    pub tool_calls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub agent: String,
    pub source: AgentSource,
    pub status: AgentRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governor: Option<GovernorSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
}

impl AgentRunResult {
    pub fn pending(agent: impl Into<String>, source: AgentSource) -> Self {
        Self {
            agent: agent.into(),
            source,
            status: AgentRunStatus::Pending,
            output: None,
            error: None,
            usage: Usage::default(),
            governor: None,
            health: None,
            step_index: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = AgentRunStatus::Running;
    }

    pub fn mark_ok(&mut self, output: impl Into<String>) {
        self.status = AgentRunStatus::Ok;
        self.output = Some(output.into());
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = AgentRunStatus::Failed;
        self.error = Some(error.into());
    }

    pub fn mark_degraded(&mut self, output: impl Into<String>, reason: impl Into<String>) {
        self.status = AgentRunStatus::Degraded;
        self.output = Some(output.into());
        self.error = Some(reason.into());
    }

    pub fn mark_skipped(&mut self) {
        self.status = AgentRunStatus::Failed;
        self.error = Some("skipped".to_string());
    }
}
