// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run and slot leases: the two units of fleet capacity the admission
//! controller grants and tracks in `AdmissionState`.

use crate::ids::{LeaseId, RunId};
use serde::{Deserialize, Serialize};

/// What kind of invocation a `RunLease` was granted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Team,
    Pipeline,
    Subagent,
}

/// Permission for one team/pipeline/subagent invocation to hold fleet
/// resources. Deduplicated on `idempotency_key`: a second preflight with a
/// matching key returns the existing lease rather than allocating a new
/// one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLease {
    pub lease_id: LeaseId,
    pub run_id: RunId,
    pub idempotency_key: String,
    pub kind: RunKind,
    pub depth: u32,
    pub requested_parallelism: u32,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl RunLease {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

/// Permission to spawn one child process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotLease {
    pub lease_id: LeaseId,
    pub run_id: RunId,
    pub depth: u32,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl SlotLease {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
