// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C5 — Adaptive Governor. A rolling-window low-progress scorer plus a
//! handful of tripwires evaluated independently of score, exactly as
//! described for the teacher's job-level monitor in
//! `oj_engine::monitor::build_action_effects`, generalized from a
//! job-nudge/escalate ladder to a per-run continue/warn/abort tick.

use corral_core::{GovernorBand, GovernorMode, GovernorPolicy, GovernorScore, GovernorSummary, TripwireKind};
use std::collections::VecDeque;
use std::time::Duration;

const WINDOW: Duration = Duration::from_secs(5 * 60);
const VERIFICATION_PATTERNS: &[&str] = &["test", "lint", "typecheck", "tsc", "build", "check"];
const RETRY_CHURN_TRIPWIRE_COUNT: u32 = 4;
const LOOP_DETECTION_SAMPLES: usize = 6;
const LOOP_DETECTION_NOVELTY_CEILING: f64 = 0.2;

/// What the watchdog should do this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum GovernorTick {
    Continue,
    Warn { reason: String, tripwire: Option<TripwireKind> },
    Abort { reason: String, tripwire: Option<TripwireKind> },
}

struct Signature {
    at_ms: u64,
    tool_name: String,
}

/// Per-run governor state. Fed every marker the delegation runner observes;
/// ticked on the same watchdog interval as the health monitor.
pub struct Governor {
    policy: GovernorPolicy,
    started_at_ms: u64,
    window: VecDeque<Signature>,
    assistant_chars_at_last_tick: u64,
    assistant_chars_total: u64,
    verification_seen_in_window: bool,
    last_failed_tool_signature: Option<String>,
    consecutive_identical_failures: u32,
    last_activity_at_ms: u64,
    strikes: u32,
    cost_usd: f64,
    tokens: u64,
    tripwire_hit: Option<TripwireKind>,
}

impl Governor {
    pub fn new(policy: GovernorPolicy, started_at_ms: u64) -> Self {
        Self {
            policy,
            started_at_ms,
            window: VecDeque::new(),
            assistant_chars_at_last_tick: 0,
            assistant_chars_total: 0,
            verification_seen_in_window: false,
            last_failed_tool_signature: None,
            consecutive_identical_failures: 0,
            last_activity_at_ms: started_at_ms,
            strikes: 0,
            cost_usd: 0.0,
            tokens: 0,
            tripwire_hit: None,
        }
    }

    /// Feed one parsed marker. Mirrors the health monitor's per-marker
    /// contract so the delegation runner can drive both from one loop.
    pub fn on_marker(&mut self, marker: &corral_core::ProgressMarker, now_ms: u64) {
        use corral_core::ProgressMarkerKind as K;

        self.last_activity_at_ms = now_ms;
        self.evict_stale(now_ms);

        match marker.kind {
            K::ToolStart => {
                if let Some(tool_name) = &marker.tool_name {
                    if VERIFICATION_PATTERNS.iter().any(|p| tool_name.to_ascii_lowercase().contains(p)) {
                        self.verification_seen_in_window = true;
                    }
                    self.window.push_back(Signature { at_ms: now_ms, tool_name: tool_name.clone() });
                }
            }
            K::ToolEnd => {
                let failed = marker.action.starts_with("tool_end_error:");
                let signature = marker.tool_name.clone().unwrap_or_default();
                if failed {
                    if self.last_failed_tool_signature.as_deref() == Some(signature.as_str()) {
                        self.consecutive_identical_failures += 1;
                    } else {
                        self.consecutive_identical_failures = 1;
                        self.last_failed_tool_signature = Some(signature);
                    }
                } else {
                    self.consecutive_identical_failures = 0;
                    self.last_failed_tool_signature = None;
                }
            }
            K::Assistant => {
                self.assistant_chars_total += marker.action.len() as u64;
            }
            K::AssistantError | K::Other => {}
        }
    }

    pub fn record_usage(&mut self, cost_usd_delta: f64, tokens_delta: u64) {
        self.cost_usd += cost_usd_delta;
        self.tokens += tokens_delta;
    }

    fn evict_stale(&mut self, now_ms: u64) {
        while let Some(front) = self.window.front() {
            if now_ms.saturating_sub(front.at_ms) > WINDOW.as_millis() as u64 {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn novelty_ratio(&self) -> f64 {
        if self.window.is_empty() {
            return 1.0;
        }
        let distinct = self.window.iter().map(|s| s.tool_name.as_str()).collect::<std::collections::HashSet<_>>().len();
        distinct as f64 / self.window.len() as f64
    }

    fn band(&self, now_ms: u64) -> GovernorBand {
        GovernorBand::for_elapsed(Duration::from_millis(now_ms.saturating_sub(self.started_at_ms)))
    }

    fn threshold_for(band: GovernorBand) -> f64 {
        match band {
            GovernorBand::Opening => 0.15,
            GovernorBand::MidRun => 0.3,
            GovernorBand::LongRun => 0.4,
            GovernorBand::Overtime => 0.5,
        }
    }

    fn strike_budget_for(band: GovernorBand) -> u32 {
        match band {
            GovernorBand::Opening => 6,
            GovernorBand::MidRun => 4,
            GovernorBand::LongRun => 3,
            GovernorBand::Overtime => 2,
        }
    }

    /// Recompute the windowed score without mutating strike state.
    pub fn score(&self, now_ms: u64) -> GovernorScore {
        let band = self.band(now_ms);
        let novelty = self.novelty_ratio();
        let assistant_growth = {
            let delta = self.assistant_chars_total.saturating_sub(self.assistant_chars_at_last_tick);
            (delta as f64 / 200.0).min(1.0)
        };
        let verification_bonus = if self.verification_seen_in_window { 0.3 } else { 0.0 };
        let retry_penalty = (self.consecutive_identical_failures as f64) * 0.2;
        let idle_ms = now_ms.saturating_sub(self.last_activity_at_ms);
        let idle_penalty = (idle_ms as f64 / self.policy.tick_interval.as_millis().max(1) as f64 / 10.0).min(0.5);

        let raw = novelty * 0.4 + assistant_growth * 0.3 + verification_bonus - retry_penalty - idle_penalty;
        GovernorScore {
            score: raw.clamp(0.0, 1.0),
            threshold: Self::threshold_for(band),
            strikes: self.strikes,
            band,
        }
    }

    fn direct_tripwire(&self, now_ms: u64) -> Option<TripwireKind> {
        let elapsed = now_ms.saturating_sub(self.started_at_ms);
        if Duration::from_millis(elapsed) >= self.policy.emergency_fuse {
            return Some(TripwireKind::EmergencyFuse);
        }
        if self.consecutive_identical_failures >= RETRY_CHURN_TRIPWIRE_COUNT {
            return Some(TripwireKind::RetryChurn);
        }
        if self.window.len() >= LOOP_DETECTION_SAMPLES && self.novelty_ratio() <= LOOP_DETECTION_NOVELTY_CEILING {
            return Some(TripwireKind::LoopDetected);
        }
        if let Some(budget) = self.policy.cost_budget_usd {
            if self.cost_usd >= budget {
                return Some(TripwireKind::CostBudgetExceeded);
            }
        }
        if let Some(budget) = self.policy.token_budget {
            if self.tokens >= budget {
                return Some(TripwireKind::TokenBudgetExceeded);
            }
        }
        None
    }

    /// Evaluate one tick, advancing strike/decay state. Idempotent within
    /// a tick is not guaranteed — call once per watchdog interval.
    pub fn tick(&mut self, now_ms: u64) -> GovernorTick {
        self.evict_stale(now_ms);
        let score = self.score(now_ms);
        self.assistant_chars_at_last_tick = self.assistant_chars_total;

        if score.is_below_threshold() {
            self.strikes += 1;
        } else if self.strikes > 0 {
            self.strikes -= 1;
        }

        if let Some(tripwire) = self.direct_tripwire(now_ms) {
            self.tripwire_hit = Some(tripwire);
            let reason = format!("tripwire:{tripwire:?}");
            if tripwire == TripwireKind::EmergencyFuse {
                return GovernorTick::Abort { reason, tripwire: Some(tripwire) };
            }
            return match self.policy.mode {
                GovernorMode::Enforce => GovernorTick::Abort { reason, tripwire: Some(tripwire) },
                GovernorMode::Warn => GovernorTick::Warn { reason, tripwire: Some(tripwire) },
                GovernorMode::Observe => GovernorTick::Continue,
            };
        }

        let budget = Self::strike_budget_for(score.band);
        if self.strikes > budget {
            let reason = format!("low_progress:strikes={}/{}", self.strikes, budget);
            return match self.policy.mode {
                GovernorMode::Enforce => GovernorTick::Abort { reason, tripwire: None },
                GovernorMode::Warn => GovernorTick::Warn { reason, tripwire: None },
                GovernorMode::Observe => GovernorTick::Continue,
            };
        }

        GovernorTick::Continue
    }

    pub fn summary(&self, now_ms: u64, retries: u32) -> GovernorSummary {
        let score = self.score(now_ms);
        GovernorSummary {
            mode: Some(self.policy.mode),
            final_band: Some(score.band),
            strikes_used: self.strikes,
            strike_budget: Self::strike_budget_for(score.band),
            tripwire: self.tripwire_hit,
            retries,
            elapsed_ms: now_ms.saturating_sub(self.started_at_ms),
        }
    }
}

#[cfg(test)]
#[path = "governor_tests.rs"]
mod tests;
