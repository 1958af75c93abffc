// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classifies one delegated attempt's outcome into the reason taxonomy the
//! recovery policy (§4.6) dispatches on.

use corral_core::{AbortOrigin, DelegatedOutcome, HealthClassification};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Ok,
    TransientIo,
    StallNoProgress,
    StallSameToolPhase,
    PolicyAbort,
    AdmissionReject,
    NonzeroExit,
}

impl Reason {
    /// Retryable reasons get another attempt (bounded by `max_attempts`);
    /// non-retryable reasons fail immediately regardless of attempts left.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Reason::TransientIo | Reason::StallNoProgress | Reason::StallSameToolPhase | Reason::NonzeroExit
        )
    }
}

/// Classify a completed (possibly aborted) attempt. `spawn_io_error`
/// distinguishes an attempt that never got a child running (e.g. ENOENT,
/// EAGAIN) from a properly-exited-but-nonzero child — the former is
/// transient, the latter is the child's own verdict on its work.
pub fn classify(outcome: &DelegatedOutcome, spawn_io_error: bool) -> Reason {
    if spawn_io_error {
        return Reason::TransientIo;
    }

    if outcome.aborted {
        return match outcome.abort_origin {
            Some(AbortOrigin::Signal) => Reason::PolicyAbort,
            Some(AbortOrigin::Policy) => Reason::PolicyAbort,
            Some(AbortOrigin::Health) => match outcome.health.classification {
                HealthClassification::Wedged => Reason::StallSameToolPhase,
                _ => Reason::StallNoProgress,
            },
            None => Reason::PolicyAbort,
        };
    }

    match outcome.exit_code {
        Some(0) => Reason::Ok,
        Some(_) => Reason::NonzeroExit,
        None => Reason::TransientIo,
    }
}

#[cfg(test)]
#[path = "reason_tests.rs"]
mod tests;
