// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C3 — Admission Controller. The fleet-wide fail-closed gate: grants and
//! releases run/slot leases, trips and heals the circuit breaker, and
//! tracks call/result counters.

use crate::event_log::{self, EventLogConfig, EventRecord};
use crate::lockfile;
use crate::pressure_reader::PressureReader;
use crate::state_file;
use corral_core::{
    Admit, AdmissionPolicy, AdmissionState, CircuitReason, Clock, IdGen, LeaseId, RejectCode,
    Rejection, RunKind, RunLease, SlotLease, ToolKind,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PreflightRunRequest {
    pub run_id: corral_core::RunId,
    pub idempotency_key: String,
    pub kind: RunKind,
    pub depth: u32,
    pub requested_parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct AcquireSlotRequest {
    pub run_id: corral_core::RunId,
    pub depth: u32,
    pub agent: String,
}

#[derive(Debug, Clone)]
pub struct RunGrant {
    pub lease_id: LeaseId,
    pub run_id: corral_core::RunId,
    pub deduped: bool,
}

#[derive(Debug, Clone)]
pub struct SlotGrant {
    pub lease_id: LeaseId,
    pub run_id: corral_core::RunId,
    pub depth: u32,
}

#[derive(Debug, Clone)]
pub struct AdmissionStatus {
    pub now_ms: u64,
    pub active_runs: usize,
    pub active_slots: usize,
    pub max_gap: u64,
    pub circuit: corral_core::CircuitState,
    pub pressure: Option<corral_core::PressureSnapshot>,
}

pub struct AdmissionController<C: Clock, G: IdGen> {
    state_path: PathBuf,
    event_log_path: PathBuf,
    policy: AdmissionPolicy,
    pressure: PressureReader,
    clock: C,
    id_gen: G,
}

impl<C: Clock, G: IdGen> AdmissionController<C, G> {
    pub fn new(
        state_path: impl Into<PathBuf>,
        event_log_path: impl Into<PathBuf>,
        pressure_log_path: impl Into<PathBuf>,
        policy: AdmissionPolicy,
        clock: C,
        id_gen: G,
    ) -> Self {
        Self {
            state_path: state_path.into(),
            event_log_path: event_log_path.into(),
            policy,
            pressure: PressureReader::new(pressure_log_path),
            clock,
            id_gen,
        }
    }

    pub fn get_policy(&self) -> AdmissionPolicy {
        self.policy
    }

    pub fn get_status(&self) -> AdmissionStatus {
        let now_ms = self.clock.epoch_ms();
        let state = state_file::read_state(&self.state_path).unwrap_or_default();
        AdmissionStatus {
            now_ms,
            active_runs: state.active_run_count(),
            active_slots: state.active_slot_count(),
            max_gap: state.counters.max_gap(),
            circuit: state.circuit,
            pressure: self.pressure.current_pressure(now_ms, self.policy.pressure_freshness_ttl.as_millis() as u64),
        }
    }

    /// §4.2 preflight algorithm. Runs entirely under the state lock, except
    /// the event-log append which happens just after release (a log write
    /// failure must never prevent the admission decision itself from
    /// committing).
    pub fn preflight_run(&self, req: PreflightRunRequest) -> Admit<RunGrant> {
        let now_ms = self.clock.epoch_ms();
        let pressure = self.pressure.current_pressure(now_ms, self.policy.pressure_freshness_ttl.as_millis() as u64);

        let outcome = lockfile::with_locked_state(
            &self.state_path,
            self.policy.lock_wait,
            self.policy.lock_stale,
            state_file::read_state,
            state_file::write_state,
            |state: &mut AdmissionState| -> Admit<RunGrant> {
                state.prune_expired(now_ms);
                let _ = state.circuit.try_close(now_ms);

                if let Some(reject) = self.immediate_guards(state, req.depth, now_ms, pressure.as_ref()) {
                    return Admit::Reject(reject);
                }

                let run_lease_ttl_ms = self.policy.run_lease_ttl.as_millis() as u64;

                if state.active_run_count() as u32 >= self.policy.max_in_flight_runs {
                    // Dedup check still applies even at cap: a retrying
                    // caller with the same idempotency key must not be
                    // turned away just because the fleet happens to be
                    // full of *other* runs.
                    if let Some(run_id) = state.find_run_by_idempotency_key(&req.idempotency_key).map(|l| l.run_id.clone()) {
                        return extend_and_grant(state, run_id, now_ms, run_lease_ttl_ms)
                            .unwrap_or_else(|| Admit::Reject(Rejection::new(RejectCode::StateError, "lease vanished under lock")));
                    }
                    return Admit::Reject(Rejection::new(RejectCode::RunCapReached, "run cap reached"));
                }

                if req.requested_parallelism > self.policy.max_in_flight_slots {
                    return Admit::Reject(Rejection::new(RejectCode::SlotCapReached, "requested parallelism exceeds slot cap"));
                }

                if let Some(run_id) = state.find_run_by_idempotency_key(&req.idempotency_key).map(|l| l.run_id.clone()) {
                    return extend_and_grant(state, run_id, now_ms, run_lease_ttl_ms)
                        .unwrap_or_else(|| Admit::Reject(Rejection::new(RejectCode::StateError, "lease vanished under lock")));
                }

                let lease_id = LeaseId::new(self.id_gen.next());
                let lease = RunLease {
                    lease_id: lease_id.clone(),
                    run_id: req.run_id.clone(),
                    idempotency_key: req.idempotency_key.clone(),
                    kind: req.kind,
                    depth: req.depth,
                    requested_parallelism: req.requested_parallelism,
                    created_at_ms: now_ms,
                    expires_at_ms: now_ms + self.policy.run_lease_ttl.as_millis() as u64,
                };
                state.runs.insert(req.run_id.clone(), lease);
                state.updated_at_ms = now_ms;

                Admit::Allow(RunGrant { lease_id, run_id: req.run_id.clone(), deduped: false })
            },
        );

        let grant = match outcome {
            Ok(admit) => admit,
            Err(e) => Admit::Reject(Rejection::new(RejectCode::StateError, e.to_string())),
        };

        self.log_preflight_outcome(&req, now_ms, &grant);
        grant
    }

    pub fn end_run(&self, grant: &RunGrant, status: corral_core::AgentRunStatus) {
        let now_ms = self.clock.epoch_ms();
        let run_id = grant.run_id.clone();
        let _ = lockfile::with_locked_state(
            &self.state_path,
            self.policy.lock_wait,
            self.policy.lock_stale,
            state_file::read_state,
            state_file::write_state,
            |state: &mut AdmissionState| {
                state.runs.remove(&run_id);
                state.updated_at_ms = now_ms;
            },
        );
        self.log(&EventRecord::RunEnd { ts_ms: now_ms, run_id: grant.run_id.as_str(), status: status_str(status) });
    }

    pub fn acquire_slot(&self, req: AcquireSlotRequest) -> Admit<SlotGrant> {
        let now_ms = self.clock.epoch_ms();
        let pressure = self.pressure.current_pressure(now_ms, self.policy.pressure_freshness_ttl.as_millis() as u64);
        let run_lease_ttl_ms = self.policy.run_lease_ttl.as_millis() as u64;
        let slot_lease_ttl_ms = self.policy.slot_lease_ttl.as_millis() as u64;

        let outcome = lockfile::with_locked_state(
            &self.state_path,
            self.policy.lock_wait,
            self.policy.lock_stale,
            state_file::read_state,
            state_file::write_state,
            |state: &mut AdmissionState| -> Admit<SlotGrant> {
                state.prune_expired(now_ms);
                let _ = state.circuit.try_close(now_ms);

                if let Some(reject) = self.immediate_guards(state, req.depth, now_ms, pressure.as_ref()) {
                    return Admit::Reject(reject);
                }

                if state.active_slot_count() as u32 >= self.policy.max_in_flight_slots {
                    return Admit::Reject(Rejection::new(RejectCode::SlotCapReached, "slot cap reached"));
                }

                if let Some(lease) = state.runs.get_mut(&req.run_id) {
                    lease.expires_at_ms = now_ms + run_lease_ttl_ms;
                }

                let lease_id = LeaseId::new(self.id_gen.next());
                let lease = SlotLease {
                    lease_id: lease_id.clone(),
                    run_id: req.run_id.clone(),
                    depth: req.depth,
                    created_at_ms: now_ms,
                    expires_at_ms: now_ms + slot_lease_ttl_ms,
                };
                state.slots.insert(lease_id.clone(), lease);
                state.updated_at_ms = now_ms;

                Admit::Allow(SlotGrant { lease_id, run_id: req.run_id.clone(), depth: req.depth })
            },
        );

        let grant = match outcome {
            Ok(admit) => admit,
            Err(e) => Admit::Reject(Rejection::new(RejectCode::StateError, e.to_string())),
        };

        match &grant {
            Admit::Allow(g) => self.log(&EventRecord::SlotAllowed { ts_ms: now_ms, run_id: g.run_id.as_str(), lease_id: g.lease_id.as_str() }),
            Admit::Reject(r) => self.log(&EventRecord::SlotDenied { ts_ms: now_ms, run_id: req.run_id.as_str(), code: r.code.as_str(), reason: &r.reason }),
        }

        grant
    }

    pub fn release_slot(&self, grant: &SlotGrant, status: corral_core::AgentRunStatus) {
        let now_ms = self.clock.epoch_ms();
        let lease_id = grant.lease_id.clone();
        let _ = lockfile::with_locked_state(
            &self.state_path,
            self.policy.lock_wait,
            self.policy.lock_stale,
            state_file::read_state,
            state_file::write_state,
            |state: &mut AdmissionState| {
                state.slots.remove(&lease_id);
                state.updated_at_ms = now_ms;
            },
        );
        self.log(&EventRecord::SlotRelease { ts_ms: now_ms, lease_id: grant.lease_id.as_str(), status: status_str(status) });
    }

    /// Invoked before any delegate-spawning tool call; checks only the
    /// depth guard (pressure/circuit are checked at the owning run's own
    /// preflight, not re-checked per tool call).
    pub fn evaluate_tool_gate(&self, depth: u32) -> Result<(), Rejection> {
        if depth > self.policy.max_depth {
            let now_ms = self.clock.epoch_ms();
            self.log(&EventRecord::ToolGateDenied { ts_ms: now_ms, depth, code: RejectCode::DepthExceeded.as_str() });
            return Err(Rejection::new(RejectCode::DepthExceeded, format!("depth {depth} exceeds max {}", self.policy.max_depth)));
        }
        Ok(())
    }

    pub fn record_tool_call(&self, tool: ToolKind) {
        let now_ms = self.clock.epoch_ms();
        let gap_threshold = self.policy.gap_threshold;
        let breaker_cooldown_ms = self.policy.breaker_cooldown.as_millis() as u64;

        let _ = lockfile::with_locked_state(
            &self.state_path,
            self.policy.lock_wait,
            self.policy.lock_stale,
            state_file::read_state,
            state_file::write_state,
            |state: &mut AdmissionState| {
                state.counters.record_call(tool);
                state.counters_last_updated_at_ms = now_ms;
                if state.counters.max_gap() > gap_threshold {
                    state.circuit.trip(CircuitReason::CallResultGap, format!("gap {} > {}", state.counters.max_gap(), gap_threshold), now_ms, breaker_cooldown_ms);
                }
            },
        );
        self.log(&EventRecord::CounterCall { ts_ms: now_ms, tool: tool.as_str() });
    }

    pub fn record_tool_result(&self, tool: ToolKind) {
        let now_ms = self.clock.epoch_ms();
        let _ = lockfile::with_locked_state(
            &self.state_path,
            self.policy.lock_wait,
            self.policy.lock_stale,
            state_file::read_state,
            state_file::write_state,
            |state: &mut AdmissionState| {
                state.counters.record_result(tool);
                let _ = state.circuit.try_close(now_ms);
            },
        );
        self.log(&EventRecord::CounterResult { ts_ms: now_ms, tool: tool.as_str() });
    }

    /// Step 2 of the preflight algorithm: depth guard, pressure guard,
    /// counter decay, gap guard, and the open-circuit check. Shared between
    /// `preflight_run` and `acquire_slot`.
    fn immediate_guards(
        &self,
        state: &mut AdmissionState,
        depth: u32,
        now_ms: u64,
        pressure: Option<&corral_core::PressureSnapshot>,
    ) -> Option<Rejection> {
        if depth > self.policy.max_depth {
            return Some(Rejection::new(RejectCode::DepthExceeded, format!("depth {depth} exceeds max {}", self.policy.max_depth)));
        }

        if pressure.is_some_and(|p| p.is_critical()) {
            state.circuit.trip(
                CircuitReason::HostPressure,
                "host pressure critical",
                now_ms,
                self.policy.breaker_cooldown.as_millis() as u64,
            );
            warn!("admission: circuit opened, host pressure critical");
            self.log(&EventRecord::CircuitOpen { ts_ms: now_ms, reason: "host_pressure", cooldown_until_ms: state.circuit.cooldown_until_ms.unwrap_or(now_ms) });
            return Some(
                Rejection::new(RejectCode::CircuitOpenHostPressure, "host pressure critical")
                    .with_retry_after_ms(state.circuit.retry_after_ms(now_ms)),
            );
        }

        let quiet_elapsed = now_ms.saturating_sub(state.counters_last_updated_at_ms);
        if state.counters.max_gap() > self.policy.gap_threshold
            && quiet_elapsed >= self.policy.gap_reset_quiet.as_millis() as u64
        {
            state.counters.reset();
            state.counters_last_updated_at_ms = now_ms;
            self.log(&EventRecord::CounterReset { ts_ms: now_ms });
        }

        if state.counters.max_gap() > self.policy.gap_threshold {
            state.circuit.trip(
                CircuitReason::CallResultGap,
                format!("gap {} exceeds {}", state.counters.max_gap(), self.policy.gap_threshold),
                now_ms,
                self.policy.breaker_cooldown.as_millis() as u64,
            );
            self.log(&EventRecord::CircuitOpen { ts_ms: now_ms, reason: "call_result_gap", cooldown_until_ms: state.circuit.cooldown_until_ms.unwrap_or(now_ms) });
            return Some(
                Rejection::new(RejectCode::CircuitOpenCallResultGap, "call/result gap exceeds threshold")
                    .with_retry_after_ms(state.circuit.retry_after_ms(now_ms)),
            );
        }

        if state.circuit.is_open() {
            return Some(
                Rejection::new(RejectCode::CircuitOpen, "circuit open")
                    .with_retry_after_ms(state.circuit.retry_after_ms(now_ms)),
            );
        }

        None
    }

    fn log(&self, record: &EventRecord<'_>) {
        let config = EventLogConfig { max_bytes: self.policy.event_log_max_bytes, max_backups: self.policy.event_log_max_backups };
        if let Err(e) = event_log::append(&self.event_log_path, config, record) {
            warn!(error = %e, "admission: failed to append event log record");
        }
    }

    fn log_preflight_outcome(&self, req: &PreflightRunRequest, now_ms: u64, grant: &Admit<RunGrant>) {
        match grant {
            Admit::Allow(g) => {
                info!(run_id = %g.run_id, lease_id = %g.lease_id, deduped = g.deduped, "admission: run allowed");
                self.log(&EventRecord::RunAllowed { ts_ms: now_ms, run_id: g.run_id.as_str(), lease_id: g.lease_id.as_str(), deduped: g.deduped });
            }
            Admit::Reject(r) => {
                self.log(&EventRecord::RunDenied { ts_ms: now_ms, run_id: req.run_id.as_str(), code: r.code.as_str(), reason: &r.reason });
            }
        }
    }
}

fn extend_and_grant(state: &mut AdmissionState, run_id: corral_core::RunId, now_ms: u64, ttl_ms: u64) -> Option<Admit<RunGrant>> {
    let lease = state.runs.get_mut(&run_id)?;
    lease.expires_at_ms = now_ms + ttl_ms;
    let lease_id = lease.lease_id.clone();
    Some(Admit::Allow(RunGrant { lease_id, run_id, deduped: true }))
}

fn status_str(status: corral_core::AgentRunStatus) -> &'static str {
    match status {
        corral_core::AgentRunStatus::Pending => "pending",
        corral_core::AgentRunStatus::Running => "running",
        corral_core::AgentRunStatus::Ok => "ok",
        corral_core::AgentRunStatus::Degraded => "degraded",
        corral_core::AgentRunStatus::Failed => "failed",
    }
}

#[allow(clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::{FakeClock, SequentialIdGen};
    use std::time::Duration;

    fn test_policy() -> AdmissionPolicy {
        AdmissionPolicy {
            max_in_flight_runs: 2,
            max_in_flight_slots: 2,
            max_depth: 1,
            run_lease_ttl: Duration::from_secs(60),
            slot_lease_ttl: Duration::from_secs(60),
            breaker_cooldown: Duration::from_secs(30),
            gap_threshold: 5,
            gap_reset_quiet: Duration::from_secs(300),
            lock_wait: Duration::from_secs(1),
            lock_stale: Duration::from_secs(30),
            pressure_freshness_ttl: Duration::from_secs(15),
            event_log_max_bytes: 1024 * 1024,
            event_log_max_backups: 2,
        }
    }

    fn make_controller(dir: &tempfile::TempDir) -> AdmissionController<FakeClock, SequentialIdGen> {
        AdmissionController::new(
            dir.path().join("state.json"),
            dir.path().join("event.log"),
            dir.path().join("pressure.ndjson"),
            test_policy(),
            FakeClock::new(),
            SequentialIdGen::new("lease"),
        )
    }

    #[test]
    fn preflight_grants_a_fresh_lease() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = make_controller(&dir);

        let grant = ctl.preflight_run(PreflightRunRequest {
            run_id: corral_core::RunId::new("r1"),
            idempotency_key: "key-1".into(),
            kind: RunKind::Team,
            depth: 0,
            requested_parallelism: 2,
        });

        match grant {
            Admit::Allow(g) => assert!(!g.deduped),
            Admit::Reject(r) => panic!("expected allow, got {r:?}"),
        }
    }

    #[test]
    fn depth_guard_rejects_over_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = make_controller(&dir);

        let grant = ctl.preflight_run(PreflightRunRequest {
            run_id: corral_core::RunId::new("r1"),
            idempotency_key: "key-1".into(),
            kind: RunKind::Subagent,
            depth: 2,
            requested_parallelism: 1,
        });

        match grant {
            Admit::Reject(r) => assert_eq!(r.code, RejectCode::DepthExceeded),
            Admit::Allow(_) => panic!("expected reject"),
        }
    }

    #[test]
    fn idempotent_preflight_dedupes_to_same_lease() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = make_controller(&dir);

        let req = || PreflightRunRequest {
            run_id: corral_core::RunId::new("r1"),
            idempotency_key: "same-key".into(),
            kind: RunKind::Team,
            depth: 0,
            requested_parallelism: 1,
        };

        let first = ctl.preflight_run(req()).into_result().unwrap();
        let second = ctl.preflight_run(req()).into_result().unwrap();

        assert_eq!(first.lease_id, second.lease_id);
        assert!(second.deduped);
    }

    #[test]
    fn run_cap_reached_rejects_new_runs() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = make_controller(&dir);

        for i in 0..2 {
            let grant = ctl.preflight_run(PreflightRunRequest {
                run_id: corral_core::RunId::new(format!("r{i}")),
                idempotency_key: format!("key-{i}"),
                kind: RunKind::Team,
                depth: 0,
                requested_parallelism: 1,
            });
            assert!(grant.is_allow());
        }

        let third = ctl.preflight_run(PreflightRunRequest {
            run_id: corral_core::RunId::new("r2"),
            idempotency_key: "key-2".into(),
            kind: RunKind::Team,
            depth: 0,
            requested_parallelism: 1,
        });

        match third {
            Admit::Reject(r) => assert_eq!(r.code, RejectCode::RunCapReached),
            Admit::Allow(_) => panic!("expected reject"),
        }
    }

    #[test]
    fn end_run_removes_the_lease_freeing_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = make_controller(&dir);

        let grant = ctl
            .preflight_run(PreflightRunRequest {
                run_id: corral_core::RunId::new("r1"),
                idempotency_key: "key-1".into(),
                kind: RunKind::Team,
                depth: 0,
                requested_parallelism: 1,
            })
            .into_result()
            .unwrap();

        ctl.end_run(&grant, corral_core::AgentRunStatus::Ok);

        assert_eq!(ctl.get_status().active_runs, 0);
    }

    #[test]
    fn tool_call_result_gap_trips_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = make_controller(&dir);

        for _ in 0..10 {
            ctl.record_tool_call(ToolKind::Subagent);
        }

        let grant = ctl.preflight_run(PreflightRunRequest {
            run_id: corral_core::RunId::new("r1"),
            idempotency_key: "key-1".into(),
            kind: RunKind::Team,
            depth: 0,
            requested_parallelism: 1,
        });

        match grant {
            Admit::Reject(r) => assert_eq!(r.code, RejectCode::CircuitOpenCallResultGap),
            Admit::Allow(_) => panic!("expected circuit-open reject"),
        }
    }

    #[test]
    fn tool_gate_denies_beyond_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = make_controller(&dir);

        assert!(ctl.evaluate_tool_gate(0).is_ok());
        assert!(ctl.evaluate_tool_gate(1).is_ok());
        let err = ctl.evaluate_tool_gate(2).unwrap_err();
        assert_eq!(err.code, RejectCode::DepthExceeded);
    }
}
