// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-pressure snapshot shape, as emitted by the (external) pressure
//! telemetry watchdog and consumed by the admission controller's pressure
//! guard.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureSeverity {
    Ok,
    Warn,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureSnapshot {
    pub ts_ms: u64,
    pub severity: PressureSeverity,
    pub node_count: u32,
    pub node_rss_mb: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_processes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasons: Option<Vec<String>>,
}

impl PressureSnapshot {
    pub fn is_critical(&self) -> bool {
        self.severity == PressureSeverity::Critical
    }

    pub fn is_fresh(&self, now_ms: u64, freshness_ttl_ms: u64) -> bool {
        now_ms.saturating_sub(self.ts_ms) <= freshness_ttl_ms
    }
}
