// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §7's "configuration errors" and "capability-policy violations": the
//! two failure classes that never acquire a lease and never spawn a
//! child, surfaced as a null result plus a UI warning rather than a
//! per-card failure.

use corral_core::Rejection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunGuardError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),
    #[error("unknown pipeline: {0}")]
    UnknownPipeline(String),
    #[error("team {0} has no members")]
    EmptyTeam(String),
    #[error("pipeline {0} has no steps")]
    EmptyPipeline(String),
    #[error("no agents discovered in the requested scope")]
    NoAgentsInScope,
    #[error("unknown agent: {0}")]
    UnknownAgent(String),
    #[error("pipeline {0} is build-only and the current workflow target does not permit it")]
    CapabilityDenied(String),
    #[error("admission rejected the run: {0}")]
    Admission(#[from] Rejection),
}
