// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress markers parsed from a child's event stream, and the health
//! snapshot the monitor maintains from them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMarkerKind {
    ToolStart,
    ToolEnd,
    Assistant,
    AssistantError,
    Other,
}

impl ProgressMarkerKind {
    /// Markers counted toward "meaningful progress" per the spec's
    /// definition: any marker of these kinds producing a new fingerprint.
    pub fn is_progress_bearing(&self) -> bool {
        matches!(
            self,
            ProgressMarkerKind::ToolStart | ProgressMarkerKind::ToolEnd | ProgressMarkerKind::Assistant
        )
    }
}

/// Emitted per parsed child event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMarker {
    pub kind: ProgressMarkerKind,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub fingerprint: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthClassification {
    Healthy,
    Slow,
    Stalled,
    Wedged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub run_id: crate::ids::RunId,
    pub agent: String,
    pub ts_ms: u64,
    pub last_event_at_ms: u64,
    pub last_meaningful_progress_at_ms: u64,
    pub last_action: String,
    pub turns: u32,
    pub tool_calls: u32,
    pub assistant_chars: u64,
    pub progress_fingerprint: u64,
    pub classification: HealthClassification,
}

impl HealthSnapshot {
    /// Invariant from spec §3: `last_meaningful_progress_at_ms <=
    /// last_event_at_ms <= ts_ms`.
    pub fn is_well_ordered(&self) -> bool {
        self.last_meaningful_progress_at_ms <= self.last_event_at_ms && self.last_event_at_ms <= self.ts_ms
    }
}
