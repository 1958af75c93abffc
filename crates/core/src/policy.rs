// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy knobs. Plain `Copy` structs with spec-suggested defaults; the
//! (out-of-scope) launcher/config loader constructs these from its own YAML
//! and hands them in by value. Nothing in `corral-*` reads a config file
//! itself.

use std::time::Duration;

/// Knobs for C2/C3 (persistent admission state, admission controller).
#[derive(Debug, Clone, Copy)]
pub struct AdmissionPolicy {
    pub max_in_flight_runs: u32,
    pub max_in_flight_slots: u32,
    pub max_depth: u32,
    pub run_lease_ttl: Duration,
    pub slot_lease_ttl: Duration,
    pub breaker_cooldown: Duration,
    pub gap_threshold: u64,
    pub gap_reset_quiet: Duration,
    pub lock_wait: Duration,
    pub lock_stale: Duration,
    pub pressure_freshness_ttl: Duration,
    pub event_log_max_bytes: u64,
    pub event_log_max_backups: u32,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            max_in_flight_runs: 8,
            max_in_flight_slots: 16,
            max_depth: 2,
            run_lease_ttl: Duration::from_secs(30 * 60),
            slot_lease_ttl: Duration::from_secs(15 * 60),
            breaker_cooldown: Duration::from_secs(60),
            gap_threshold: 50,
            gap_reset_quiet: Duration::from_secs(5 * 60),
            lock_wait: Duration::from_secs(5),
            lock_stale: Duration::from_secs(30),
            pressure_freshness_ttl: Duration::from_secs(15),
            event_log_max_bytes: 10 * 1024 * 1024,
            event_log_max_backups: 3,
        }
    }
}

/// Knobs for C4 (health monitor).
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    pub warn_no_progress: Duration,
    pub abort_no_progress: Duration,
    pub abort_quick_tool: Duration,
    pub abort_active_tool: Duration,
    pub wedged_tick_threshold: u32,
    pub tick_interval: Duration,
    pub warn_only: bool,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            warn_no_progress: Duration::from_secs(90),
            abort_no_progress: Duration::from_secs(5 * 60),
            abort_quick_tool: Duration::from_secs(60),
            abort_active_tool: Duration::from_secs(10 * 60),
            wedged_tick_threshold: 3,
            tick_interval: Duration::from_secs(10),
            warn_only: false,
        }
    }
}

/// Knobs for C5 (adaptive governor).
#[derive(Debug, Clone, Copy)]
pub struct GovernorPolicy {
    pub mode: crate::governor::GovernorMode,
    pub emergency_fuse: Duration,
    pub cost_budget_usd: Option<f64>,
    pub token_budget: Option<u64>,
    pub tick_interval: Duration,
}

impl Default for GovernorPolicy {
    fn default() -> Self {
        Self {
            mode: crate::governor::GovernorMode::Enforce,
            emergency_fuse: Duration::from_secs(4 * 60 * 60),
            cost_budget_usd: None,
            token_budget: None,
            tick_interval: Duration::from_secs(10),
        }
    }
}

/// Knobs for C7 (recovery / quorum coordinator).
#[derive(Debug, Clone, Copy)]
pub struct RecoveryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub allow_degraded: bool,
    pub min_degraded_output_length: usize,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            allow_degraded: true,
            min_degraded_output_length: 200,
        }
    }
}

/// Grace window the delegation runner waits between a polite termination
/// signal and a forceful kill.
#[derive(Debug, Clone, Copy)]
pub struct RunnerPolicy {
    pub kill_grace: Duration,
    pub max_line_bytes: usize,
}

impl Default for RunnerPolicy {
    fn default() -> Self {
        Self {
            kill_grace: Duration::from_secs(5),
            max_line_bytes: 1024 * 1024,
        }
    }
}
