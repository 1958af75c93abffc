// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! corral-recovery: the recovery / quorum coordinator (C7). Classifies a
//! delegated attempt's outcome, decides retry/complete/fail, and
//! optionally arbitrates cross-model quorum rounds.

pub mod coordinator;
pub mod reason;

pub use coordinator::{evaluate_quorum, QuorumDecision, RecoveryAction, RecoveryCoordinator};
pub use reason::{classify, Reason};
