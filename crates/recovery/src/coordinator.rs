// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C7 — Recovery / Quorum Coordinator. Turns one attempt's classified
//! reason into `{retry(delay), complete, fail}`, with exponential
//! backoff + jitter grounded in the teacher's `rand`-based
//! `generate_short_random` (there, jittering a tmux session-name suffix;
//! here, jittering a retry delay).

use crate::reason::Reason;
use corral_core::RecoveryPolicy;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    Retry { delay: Duration },
    Complete,
    /// Completed on a retryable reason after exhausting `max_attempts`,
    /// kept because the output cleared `min_degraded_output_length`.
    CompleteDegraded,
    Fail { reason: Reason },
}

/// One run's recovery bookkeeping across attempts. Stateless beyond the
/// attempt counter; the coordinator never inspects the child's stdout
/// itself, only the caller-supplied output length for the degraded check.
#[derive(Debug, Default)]
pub struct RecoveryCoordinator {
    attempts: u32,
}

impl RecoveryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Decide what to do after one attempt. `output_len` is the byte
    /// length of whatever output the attempt produced, used only for the
    /// final-attempt degraded-completion check.
    pub fn decide(&mut self, policy: &RecoveryPolicy, reason: Reason, output_len: usize) -> RecoveryAction {
        self.attempts += 1;

        if reason == Reason::Ok {
            return RecoveryAction::Complete;
        }

        if !reason.is_retryable() {
            return RecoveryAction::Fail { reason };
        }

        if self.attempts < policy.max_attempts {
            let delay = backoff_with_jitter(policy, self.attempts);
            return RecoveryAction::Retry { delay };
        }

        if policy.allow_degraded && output_len >= policy.min_degraded_output_length {
            return RecoveryAction::CompleteDegraded;
        }

        RecoveryAction::Fail { reason }
    }
}

fn backoff_with_jitter(policy: &RecoveryPolicy, attempt: u32) -> Duration {
    let exp = policy.base_backoff.saturating_mul(1u32 << attempt.min(16).saturating_sub(1));
    let capped = exp.min(policy.max_backoff);
    let jitter_factor = rand::rng().random_range(0.5..1.5);
    Duration::from_secs_f64((capped.as_secs_f64() * jitter_factor).max(0.0))
}

/// Result of evaluating a cross-model quorum round. Not every caller uses
/// this; team/pipeline members that spawn one attempt each skip it
/// entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum QuorumDecision {
    Continue,
    Finalize { output: String },
    Fail { reason: String },
}

/// Evaluates whether enough of `attempt`'s siblings agree to finalize.
/// `agreeing` is how many prior attempts (including this one) produced an
/// output judged equivalent to `output` by the caller; `needed` is the
/// quorum size.
pub fn evaluate_quorum(output: &str, agreeing: usize, needed: usize, attempt: u32, max_attempts: u32) -> QuorumDecision {
    if agreeing >= needed {
        return QuorumDecision::Finalize { output: output.to_string() };
    }
    if attempt >= max_attempts {
        return QuorumDecision::Fail { reason: "quorum_not_reached".to_string() };
    }
    QuorumDecision::Continue
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
