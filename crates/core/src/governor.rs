// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shapes shared between the adaptive governor and the result it attaches
//! to a run for observability.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernorMode {
    Observe,
    Warn,
    Enforce,
}

/// Elapsed-wall-time tier selecting how strict the low-progress budget is.
/// Deeper bands have stricter thresholds and smaller strike budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernorBand {
    /// 0-5 minutes elapsed.
    Opening,
    /// 5-15 minutes elapsed.
    MidRun,
    /// 15-45 minutes elapsed.
    LongRun,
    /// 45+ minutes elapsed.
    Overtime,
}

impl GovernorBand {
    pub fn for_elapsed(elapsed: std::time::Duration) -> Self {
        let mins = elapsed.as_secs() / 60;
        match mins {
            0..=4 => GovernorBand::Opening,
            5..=14 => GovernorBand::MidRun,
            15..=44 => GovernorBand::LongRun,
            _ => GovernorBand::Overtime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripwireKind {
    LoopDetected,
    RetryChurn,
    CostBudgetExceeded,
    TokenBudgetExceeded,
    EmergencyFuse,
}

/// Windowed low-progress aggregate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GovernorScore {
    pub score: f64,
    pub threshold: f64,
    pub strikes: u32,
    pub band: GovernorBand,
}

impl GovernorScore {
    pub fn is_below_threshold(&self) -> bool {
        self.score < self.threshold
    }
}

/// Terminal observability payload attached to `AgentRunResult`. The
/// governor itself only ever sees one attempt; `retries` is filled in by
/// the recovery coordinator handing back how many attempts it took, since
/// the governor has no visibility into retries across attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GovernorSummary {
    pub mode: Option<GovernorMode>,
    pub final_band: Option<GovernorBand>,
    pub strikes_used: u32,
    pub strike_budget: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tripwire: Option<TripwireKind>,
    pub retries: u32,
    pub elapsed_ms: u64,
}
