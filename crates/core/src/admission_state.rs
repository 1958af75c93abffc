// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The persisted admission document: the one piece of state shared by every
//! co-resident launcher process on the host, always mutated under the file
//! lock described in `corral_admission::lockfile`.

use crate::circuit::CircuitState;
use crate::counters::Counters;
use crate::ids::{LeaseId, RunId};
use crate::lease::{RunLease, SlotLease};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bumped whenever the on-disk shape changes incompatibly. A state file
/// written by an older binary with a lower version is treated like a fresh
/// start (logged, not fatal) rather than refused outright — a corrupt or
/// stale admission file should never wedge every launcher on the host.
pub const ADMISSION_STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub updated_at_ms: u64,
    #[serde(default)]
    pub runs: HashMap<RunId, RunLease>,
    #[serde(default)]
    pub slots: HashMap<LeaseId, SlotLease>,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub counters_last_updated_at_ms: u64,
    #[serde(default)]
    pub circuit: CircuitState,
}

fn default_version() -> u32 {
    ADMISSION_STATE_VERSION
}

impl Default for AdmissionState {
    fn default() -> Self {
        Self {
            version: ADMISSION_STATE_VERSION,
            updated_at_ms: 0,
            runs: HashMap::new(),
            slots: HashMap::new(),
            counters: Counters::default(),
            counters_last_updated_at_ms: 0,
            circuit: CircuitState::default(),
        }
    }
}

impl AdmissionState {
    /// Drop expired leases. Returns the number of leases pruned, for the
    /// admission event log.
    pub fn prune_expired(&mut self, now_ms: u64) -> usize {
        let runs_before = self.runs.len();
        self.runs.retain(|_, lease| !lease.is_expired(now_ms));
        let slots_before = self.slots.len();
        self.slots.retain(|_, lease| !lease.is_expired(now_ms));
        (runs_before - self.runs.len()) + (slots_before - self.slots.len())
    }

    pub fn find_run_by_idempotency_key(&self, key: &str) -> Option<&RunLease> {
        self.runs.values().find(|lease| lease.idempotency_key == key)
    }

    pub fn active_run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn active_slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl AdmissionState {
    pub fn with_circuit(mut self, circuit: CircuitState) -> Self {
        self.circuit = circuit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::RunKind;

    fn lease(id: &str, expires_at_ms: u64) -> RunLease {
        RunLease {
            lease_id: LeaseId::new(id),
            run_id: RunId::new(id),
            idempotency_key: id.to_string(),
            kind: RunKind::Team,
            depth: 0,
            requested_parallelism: 1,
            created_at_ms: 0,
            expires_at_ms,
        }
    }

    #[test]
    fn prune_expired_removes_only_stale_leases() {
        let mut state = AdmissionState::default();
        state.runs.insert(RunId::new("fresh"), lease("fresh", 1_000));
        state.runs.insert(RunId::new("stale"), lease("stale", 100));

        let pruned = state.prune_expired(500);

        assert_eq!(pruned, 1);
        assert_eq!(state.runs.len(), 1);
        assert!(state.runs.contains_key(&RunId::new("fresh")));
    }

    #[test]
    fn idempotency_lookup_finds_existing_lease() {
        let mut state = AdmissionState::default();
        state.runs.insert(RunId::new("r1"), lease("key-a", 1_000));

        let found = state.find_run_by_idempotency_key("key-a");
        assert!(found.is_some());
        assert!(state.find_run_by_idempotency_key("key-b").is_none());
    }
}
