// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dashboard-state snapshots the team (C8) and pipeline (C9) executors
//! emit to their caller after every update (spec §4.7 step 4, §4.8 step
//! 6). These are plain observability payloads — the core never reads
//! them back, it only produces them; the (out-of-scope) terminal
//! dashboard is the consumer.

use corral_core::AgentRunStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamCardState {
    pub agent: String,
    pub status: AgentRunStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamDashboard {
    pub team: String,
    pub goal: String,
    pub cards: Vec<TeamCardState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStepState {
    pub index: usize,
    pub agent: String,
    pub status: AgentRunStatus,
}

/// A pipeline's dashboard carries the full step graph plus which step is
/// currently active, so a terminal UI can highlight it (spec §4.8 step 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDashboard {
    pub pipeline: String,
    pub goal: String,
    pub steps: Vec<PipelineStepState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_step: Option<usize>,
}

/// A sink for dashboard-state snapshots. The executors call `emit` after
/// every card/step transition; production callers wire this to whatever
/// renders the terminal dashboard, tests collect snapshots into a `Vec`.
pub trait DashboardSink<T>: Send + Sync {
    fn emit(&self, snapshot: T);
}

impl<T, F: Fn(T) + Send + Sync> DashboardSink<T> for F {
    fn emit(&self, snapshot: T) {
        self(snapshot)
    }
}

/// A sink that does nothing; the default for callers that don't care
/// about dashboard updates.
pub struct NullSink;

impl<T> DashboardSink<T> for NullSink {
    fn emit(&self, _snapshot: T) {}
}
