// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between the executors (C8/C9) and the delegation runner (C6).
//! Mirrors the teacher's `AgentAdapter` trait: production code spawns a
//! real child through `corral-runner`, tests substitute a fake that
//! returns scripted outcomes without touching a process table.

use crate::catalog::AgentDescriptor;
use crate::spawn::{build_delegation_config, DelegationContext};
use async_trait::async_trait;
use corral_core::{Clock, DelegatedOutcome, GovernorPolicy, HealthPolicy, ProgressMarker, RunId, RunnerPolicy};
use corral_runner::{run_delegated_command, CancelToken, Governor, HealthMonitor};
use std::path::PathBuf;
use std::time::Duration;

/// One member/step's delegated attempt, fully parameterized so the
/// executor never constructs a `DelegationConfig` itself.
pub struct AttemptRequest<'a> {
    pub agent: &'a AgentDescriptor,
    pub task: String,
    pub depth: u32,
    pub caller: &'static str,
    pub parent_run_id: &'a RunId,
    pub parent_agent: &'a str,
    pub label: String,
    pub cancel: CancelToken,
    /// A pipeline step's declared working directory, if any.
    pub cwd: Option<PathBuf>,
}

/// `DelegatedOutcome` already carries the attempting governor's terminal
/// summary (`.governor`, populated by C6 just before it returns), so one
/// attempt's whole result — outcome plus observability — is the single
/// value this trait returns; no separate wrapper is needed.
#[async_trait]
pub trait AttemptRunner: Send + Sync {
    async fn run_attempt(&self, request: AttemptRequest<'_>) -> DelegatedOutcome;
}

/// Production `AttemptRunner`: builds the child's argv/env via
/// [`build_delegation_config`], wires a fresh health monitor and governor
/// per attempt (each attempt gets its own elapsed-time clock per the
/// recovery coordinator's retry semantics), and delegates to C6.
pub struct DelegationAttemptRunner<C: Clock> {
    pub clock: C,
    pub health_policy: HealthPolicy,
    pub governor_policy: GovernorPolicy,
    pub runner_policy: RunnerPolicy,
    pub watchdog_interval: Duration,
}

#[async_trait]
impl<C: Clock> AttemptRunner for DelegationAttemptRunner<C> {
    async fn run_attempt(&self, request: AttemptRequest<'_>) -> DelegatedOutcome {
        let now_ms = self.clock.epoch_ms();
        let run_id = request.parent_run_id.clone();
        let agent_name = request.agent.name.clone();
        let config = build_delegation_config(DelegationContext {
            agent: request.agent,
            task: request.task,
            depth: request.depth,
            caller: request.caller,
            parent_run_id: request.parent_run_id,
            parent_agent: request.parent_agent,
            label: request.label,
            cwd: request.cwd,
        });

        let health = HealthMonitor::new(self.health_policy, run_id, agent_name, now_ms);
        let governor = Governor::new(self.governor_policy, now_ms);

        run_delegated_command(
            config,
            &self.clock,
            self.runner_policy,
            health,
            governor,
            self.watchdog_interval,
            request.cancel,
            |_marker: &ProgressMarker| {},
        )
        .await
    }
}

/// `spawn_failed` is the only abort reason the delegation runner produces
/// before a child ever ran, so it is the one case the recovery
/// coordinator's `classify` should treat as transient I/O rather than a
/// policy abort, even though the runner tags it `AbortOrigin::Policy`
/// (there is no child to attribute a health/policy watchdog abort to).
pub fn is_spawn_io_error(outcome: &DelegatedOutcome) -> bool {
    outcome.aborted && outcome.abort_reason.as_deref() == Some("spawn_failed")
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted `AttemptRunner`: returns queued outcomes in order, one per
    /// call, keyed by agent name. Panics (test-only) if a call arrives for
    /// an agent with no queued outcome, which usually means the executor
    /// under test invoked an agent it shouldn't have.
    #[derive(Default)]
    pub struct ScriptedAttemptRunner {
        outcomes: Mutex<std::collections::HashMap<String, VecDeque<DelegatedOutcome>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAttemptRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, agent: impl Into<String>, outcome: DelegatedOutcome) -> &Self {
            self.outcomes.lock().unwrap_or_else(|e| e.into_inner()).entry(agent.into()).or_default().push_back(outcome);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    #[async_trait]
    impl AttemptRunner for ScriptedAttemptRunner {
        async fn run_attempt(&self, request: AttemptRequest<'_>) -> DelegatedOutcome {
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(request.agent.name.clone());
            let mut outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());
            outcomes
                .get_mut(&request.agent.name)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| panic!("no scripted outcome queued for agent {}", request.agent.name))
        }
    }
}
