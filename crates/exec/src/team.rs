// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C8 — Team Executor. Bounded parallel fan-out over a team's declared
//! members, sharing one run lease and acquiring one slot per member.
//! Concurrency is bounded with a [`tokio::sync::Semaphore`] sized to the
//! granted parallelism; each member runs in its own [`tokio::task::JoinSet`]
//! task so a slow member never blocks the others, while declared member
//! order is restored afterward regardless of completion order.

use crate::attempt::AttemptRunner;
use crate::attempt_loop::{run_member_with_recovery, MemberRun};
use crate::catalog::{AgentDiscovery, RunCatalog, Scope};
use crate::dashboard::{DashboardSink, TeamCardState, TeamDashboard};
use crate::error::RunGuardError;
use crate::idempotency;
use crate::spawn::team_task;
use corral_admission::{AcquireSlotRequest, AdmissionController, PreflightRunRequest};
use corral_core::{AgentRunResult, AgentRunStatus, Clock, GovernorPolicy, IdGen, RecoveryPolicy, RunId, RunKind};
use corral_runner::CancelToken;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{warn, Instrument};

/// Input to one team execution (spec §4.7).
pub struct TeamExecutionRequest {
    pub team: String,
    pub goal: String,
    pub scope: Scope,
    pub concurrency: u32,
    /// The caller's own depth; members run at `depth + 1`.
    pub depth: u32,
    pub parent_agent: String,
    pub cancel: CancelToken,
}

#[derive(Debug, Clone)]
pub struct TeamExecutionResult {
    pub team: String,
    pub goal: String,
    pub results: Vec<AgentRunResult>,
}

/// Collaborators the team executor needs: the admission controller (C3),
/// the team/agent catalog, and whatever spawns one member's attempt (C7+C6
/// in production, [`crate::attempt::fake::ScriptedAttemptRunner`] in tests).
pub struct TeamExecutor<C: Clock, G: IdGen, A: AttemptRunner> {
    pub admission: Arc<AdmissionController<C, G>>,
    pub catalog: Arc<dyn RunCatalog>,
    pub discovery: Arc<dyn AgentDiscovery>,
    pub attempts: Arc<A>,
    pub recovery_policy: RecoveryPolicy,
    pub governor_policy: GovernorPolicy,
    pub id_gen: G,
}

impl<C: Clock, G: IdGen + 'static, A: AttemptRunner + 'static> TeamExecutor<C, G, A> {
    pub async fn execute(
        &self,
        request: TeamExecutionRequest,
        dashboard: &(dyn DashboardSink<TeamDashboard>),
    ) -> Result<TeamExecutionResult, RunGuardError> {
        let team_def = self.catalog.team(&request.team).ok_or_else(|| RunGuardError::UnknownTeam(request.team.clone()))?;
        if team_def.members.is_empty() {
            return Err(RunGuardError::EmptyTeam(request.team.clone()));
        }

        let catalog_agents = self.discovery.discover(request.scope);
        if catalog_agents.is_empty() {
            return Err(RunGuardError::NoAgentsInScope);
        }

        let mut members = Vec::with_capacity(team_def.members.len());
        for name in &team_def.members {
            let agent = catalog_agents
                .iter()
                .find(|a| &a.name == name)
                .cloned()
                .ok_or_else(|| RunGuardError::UnknownAgent(name.clone()))?;
            members.push(agent);
        }

        let policy = self.admission.get_policy();
        let requested_parallelism = request.concurrency.min(policy.max_in_flight_slots).max(1);
        let idempotency_key = idempotency::compute(
            None,
            &request.team,
            &request.goal,
            request.depth,
            request.scope,
            requested_parallelism,
            &self.governor_policy,
        );
        let run_id = RunId::new(self.id_gen.next());

        let grant = self
            .admission
            .preflight_run(PreflightRunRequest {
                run_id: run_id.clone(),
                idempotency_key,
                kind: RunKind::Team,
                depth: request.depth,
                requested_parallelism,
            })
            .into_result()?;

        let mut cards: Vec<AgentRunResult> = members.iter().map(|a| AgentRunResult::pending(a.name.clone(), a.source)).collect();
        emit_team_dashboard(dashboard, &request.team, &request.goal, &cards);

        let semaphore = Arc::new(Semaphore::new(requested_parallelism as usize));
        let mut join_set: JoinSet<(usize, AgentRunResult)> = JoinSet::new();
        let child_depth = request.depth + 1;
        let task = team_task(&request.team, &request.goal);

        for (index, agent) in members.into_iter().enumerate() {
            let admission = Arc::clone(&self.admission);
            let attempts = Arc::clone(&self.attempts);
            let recovery_policy = self.recovery_policy;
            let run_id = run_id.clone();
            let parent_agent = request.parent_agent.clone();
            let task = task.clone();
            let cancel = request.cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            let span = tracing::info_span!("team_member", team = %request.team, agent = %agent.name);

            join_set.spawn(
                async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_closed) => {
                            let mut card = AgentRunResult::pending(agent.name.clone(), agent.source);
                            card.mark_failed("team semaphore closed unexpectedly".to_string());
                            return (index, card);
                        }
                    };

                    let slot = admission.acquire_slot(AcquireSlotRequest {
                        run_id: run_id.clone(),
                        depth: child_depth,
                        agent: agent.name.clone(),
                    });
                    let slot = match slot.into_result() {
                        Ok(slot) => slot,
                        Err(rejection) => {
                            let mut card = AgentRunResult::pending(agent.name.clone(), agent.source);
                            card.mark_failed(rejection.to_string());
                            return (index, card);
                        }
                    };

                    let card = run_member_with_recovery(
                        attempts.as_ref(),
                        &recovery_policy,
                        MemberRun {
                            agent: &agent,
                            task,
                            depth: child_depth,
                            caller: "team",
                            parent_run_id: &run_id,
                            parent_agent: &parent_agent,
                            cwd: None,
                            cancel,
                        },
                    )
                    .await;

                    admission.release_slot(&slot, card.status);
                    (index, card)
                }
                .instrument(span),
            );
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, card)) => {
                    cards[index] = card;
                    emit_team_dashboard(dashboard, &request.team, &request.goal, &cards);
                }
                Err(join_err) => warn!(error = %join_err, "team: a member task panicked"),
            }
        }

        let any_failed = cards.iter().any(|c| c.status == AgentRunStatus::Failed);
        self.admission.end_run(&grant, if any_failed { AgentRunStatus::Failed } else { AgentRunStatus::Ok });

        Ok(TeamExecutionResult { team: request.team, goal: request.goal, results: cards })
    }
}

fn emit_team_dashboard(dashboard: &(dyn DashboardSink<TeamDashboard>), team: &str, goal: &str, cards: &[AgentRunResult]) {
    dashboard.emit(TeamDashboard {
        team: team.to_string(),
        goal: goal.to_string(),
        cards: cards.iter().map(|c| TeamCardState { agent: c.agent.clone(), status: c.status }).collect(),
    });
}

#[cfg(test)]
#[path = "team_tests.rs"]
mod tests;
