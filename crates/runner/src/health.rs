// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C4 — Health Monitor. Classifies a delegated child's progress from
//! fingerprint deltas and tool-phase timing. Grounded in
//! `oj_adapters::agent::watcher`'s incremental, offset-tracked log parser:
//! the monitor only ever reacts to *new* markers, never re-scans history.

use corral_core::{HealthClassification, HealthPolicy, HealthSnapshot, ProgressMarker, RunId};

/// Which phase of tool execution the child is currently in, as tracked
/// from the most recent `tool_start` not yet matched by a `tool_end`.
/// Different abort thresholds apply to each per spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolPhase {
    /// No tool currently open.
    None,
    /// A tool is open; not yet known to be long-running.
    Active { short_latency: bool },
}

/// A set of known short-latency tool name substrings. Real deployments
/// would source this from the agent catalog's tool metadata (out of
/// scope here); a conservative built-in list keeps the monitor usable
/// standalone, matching the spec's Open Question that thresholds (and,
/// implicitly, this classification) are empirically tuned and should be
/// parameterized rather than hardcoded in tests.
const SHORT_LATENCY_TOOLS: &[&str] = &["read", "grep", "glob", "ls", "list"];

fn is_short_latency(tool_name: &str) -> bool {
    let lower = tool_name.to_ascii_lowercase();
    SHORT_LATENCY_TOOLS.iter().any(|t| lower.contains(t))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Per-child health monitor. One instance lives for the lifetime of a
/// single delegated attempt; the delegation runner (C6) feeds it every
/// parsed marker and the watchdog ticks it on an interval.
pub struct HealthMonitor {
    policy: HealthPolicy,
    run_id: RunId,
    agent: String,
    last_event_at_ms: u64,
    last_meaningful_progress_at_ms: u64,
    last_action: String,
    turns: u32,
    tool_calls: u32,
    assistant_chars: u64,
    progress_fingerprint: u64,
    tool_phase: ToolPhase,
    unchanged_ticks: u32,
}

impl HealthMonitor {
    pub fn new(policy: HealthPolicy, run_id: RunId, agent: impl Into<String>, started_at_ms: u64) -> Self {
        Self {
            policy,
            run_id,
            agent: agent.into(),
            last_event_at_ms: started_at_ms,
            last_meaningful_progress_at_ms: started_at_ms,
            last_action: "spawned".to_string(),
            turns: 0,
            tool_calls: 0,
            assistant_chars: 0,
            progress_fingerprint: 0,
            tool_phase: ToolPhase::None,
            unchanged_ticks: 0,
        }
    }

    /// Feed one parsed marker. `now_ms` must be monotonically
    /// non-decreasing across calls (the spec's `lastEventAt` invariant).
    pub fn on_marker(&mut self, marker: &ProgressMarker, now_ms: u64) {
        use corral_core::ProgressMarkerKind as K;

        self.last_event_at_ms = now_ms;

        match marker.kind {
            K::ToolStart => {
                self.tool_calls += 1;
                let short = marker.tool_name.as_deref().is_some_and(is_short_latency);
                self.tool_phase = ToolPhase::Active { short_latency: short };
                self.last_action = marker.action.clone();
            }
            K::ToolEnd => {
                self.tool_phase = ToolPhase::None;
                self.last_action = marker.action.clone();
            }
            K::Assistant | K::AssistantError => {
                self.turns += 1;
                self.assistant_chars += marker.action.len() as u64;
                self.last_action = truncate(&marker.action, 120);
            }
            K::Other => {
                self.last_action = marker.action.clone();
            }
        }

        if marker.kind.is_progress_bearing() {
            if marker.fingerprint != self.progress_fingerprint {
                self.last_meaningful_progress_at_ms = now_ms;
                self.unchanged_ticks = 0;
            } else {
                self.unchanged_ticks += 1;
            }
            self.progress_fingerprint = marker.fingerprint;
        }
    }

    /// Recompute the classification tier at the given instant. Called by
    /// the watchdog on its tick interval and once more at termination.
    pub fn classify(&self, now_ms: u64) -> HealthClassification {
        let since_progress_ms = now_ms.saturating_sub(self.last_meaningful_progress_at_ms);

        let abort_threshold_ms = match self.tool_phase {
            ToolPhase::Active { short_latency: true } => self.policy.abort_quick_tool.as_millis() as u64,
            ToolPhase::Active { short_latency: false } => self.policy.abort_active_tool.as_millis() as u64,
            ToolPhase::None => self.policy.abort_no_progress.as_millis() as u64,
        };

        if since_progress_ms >= abort_threshold_ms {
            let stuck_same_phase = matches!(self.tool_phase, ToolPhase::Active { .. });
            if stuck_same_phase && self.unchanged_ticks >= self.policy.wedged_tick_threshold {
                return HealthClassification::Wedged;
            }
            return HealthClassification::Stalled;
        }

        if since_progress_ms >= self.policy.warn_no_progress.as_millis() as u64 {
            return HealthClassification::Slow;
        }

        HealthClassification::Healthy
    }

    pub fn snapshot(&self, now_ms: u64) -> HealthSnapshot {
        HealthSnapshot {
            run_id: self.run_id.clone(),
            agent: self.agent.clone(),
            ts_ms: now_ms,
            last_event_at_ms: self.last_event_at_ms,
            last_meaningful_progress_at_ms: self.last_meaningful_progress_at_ms,
            last_action: self.last_action.clone(),
            turns: self.turns,
            tool_calls: self.tool_calls,
            assistant_chars: self.assistant_chars,
            progress_fingerprint: self.progress_fingerprint,
            classification: self.classify(now_ms),
        }
    }

    /// Watchdog tick contract: `None` if healthy/slow, or an abort message
    /// of the form `stall:<classification>:<detail>` once stalled/wedged —
    /// unless `warn_only` is set, in which case the monitor never demands
    /// an abort (it still classifies, for telemetry).
    pub fn watchdog_tick(&self, now_ms: u64) -> Option<String> {
        if self.policy.warn_only {
            return None;
        }
        match self.classify(now_ms) {
            HealthClassification::Stalled => Some(format!("stall:stalled:{}", self.last_action)),
            HealthClassification::Wedged => Some(format!("stall:wedged:{}", self.last_action)),
            HealthClassification::Healthy | HealthClassification::Slow => None,
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
