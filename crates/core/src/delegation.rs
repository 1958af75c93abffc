// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shape of one delegation attempt's outcome — produced by the
//! delegation runner (C6), consumed by the recovery coordinator (C7). Lives
//! in `corral-core` rather than `corral-runner` so the recovery crate can
//! classify outcomes without depending on the runner crate that produces
//! them.

use crate::governor::GovernorSummary;
use crate::health::HealthSnapshot;
use serde::{Deserialize, Serialize};

/// Which watchdog, if any, caused a child to be aborted. Priority order
/// when more than one watchdog would fire on the same tick is
/// `Signal > Health > Policy`; the runner picks the first non-none message
/// in that order, so at most one origin is ever recorded per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortOrigin {
    Signal,
    Health,
    Policy,
}

/// Result of one `runDelegatedCommand` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegatedOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub aborted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_origin: Option<AbortOrigin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    pub health: HealthSnapshot,
    /// The governor's terminal summary for this one attempt. `retries` is
    /// always `0` here — only the recovery coordinator (C7), which counts
    /// attempts across retries, knows the true retry count; callers that
    /// attach this to an `AgentRunResult` overwrite `retries` once the
    /// coordinator's loop settles.
    #[serde(default)]
    pub governor: GovernorSummary,
}

impl DelegatedOutcome {
    /// A natural exit (no watchdog fired) with the given code.
    pub fn exited(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>, health: HealthSnapshot) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            aborted: false,
            abort_origin: None,
            abort_reason: None,
            health,
            governor: GovernorSummary::default(),
        }
    }

    pub fn is_clean_exit(&self) -> bool {
        !self.aborted && self.exit_code == Some(0)
    }
}
