// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C9 — Pipeline Executor. A sequential chain, one step at a time, with
//! `$INPUT`/`$ORIGINAL` substitution; the first failing step marks every
//! remaining step `failed[reason=skipped]` and returns immediately.

use crate::attempt::AttemptRunner;
use crate::attempt_loop::{run_member_with_recovery, MemberRun};
use crate::catalog::{AgentDiscovery, RunCatalog, Scope, WorkflowTarget};
use crate::dashboard::{DashboardSink, PipelineDashboard, PipelineStepState};
use crate::error::RunGuardError;
use crate::idempotency;
use crate::spawn::pipeline_step_prompt;
use corral_admission::{AcquireSlotRequest, AdmissionController, PreflightRunRequest};
use corral_core::{AgentRunResult, AgentRunStatus, Clock, GovernorPolicy, IdGen, RecoveryPolicy, RunId, RunKind};
use corral_runner::CancelToken;
use std::sync::Arc;

/// Input to one pipeline execution (spec §4.8).
pub struct PipelineExecutionRequest {
    pub pipeline: String,
    pub goal: String,
    pub scope: Scope,
    pub depth: u32,
    pub parent_agent: String,
    pub workflow_target: WorkflowTarget,
    pub cancel: CancelToken,
}

#[derive(Debug, Clone)]
pub struct PipelineExecutionResult {
    pub pipeline: String,
    pub goal: String,
    pub checkpoints: Vec<String>,
    pub results: Vec<AgentRunResult>,
}

pub struct PipelineExecutor<C: Clock, G: IdGen, A: AttemptRunner> {
    pub admission: Arc<AdmissionController<C, G>>,
    pub catalog: Arc<dyn RunCatalog>,
    pub discovery: Arc<dyn AgentDiscovery>,
    pub attempts: Arc<A>,
    pub recovery_policy: RecoveryPolicy,
    pub governor_policy: GovernorPolicy,
    pub id_gen: G,
}

impl<C: Clock, G: IdGen, A: AttemptRunner> PipelineExecutor<C, G, A> {
    pub async fn execute(
        &self,
        request: PipelineExecutionRequest,
        dashboard: &(dyn DashboardSink<PipelineDashboard>),
    ) -> Result<PipelineExecutionResult, RunGuardError> {
        let pipeline_def = self
            .catalog
            .pipeline(&request.pipeline)
            .ok_or_else(|| RunGuardError::UnknownPipeline(request.pipeline.clone()))?;
        if pipeline_def.steps.is_empty() {
            return Err(RunGuardError::EmptyPipeline(request.pipeline.clone()));
        }
        if pipeline_def.build_only && !request.workflow_target.permits_build_only() {
            return Err(RunGuardError::CapabilityDenied(request.pipeline.clone()));
        }

        let catalog_agents = self.discovery.discover(request.scope);
        if catalog_agents.is_empty() {
            return Err(RunGuardError::NoAgentsInScope);
        }

        let mut steps = Vec::with_capacity(pipeline_def.steps.len());
        for step in &pipeline_def.steps {
            let agent = catalog_agents
                .iter()
                .find(|a| a.name == step.agent)
                .cloned()
                .ok_or_else(|| RunGuardError::UnknownAgent(step.agent.clone()))?;
            steps.push((agent, step.clone()));
        }

        let idempotency_key = idempotency::compute(None, &request.pipeline, &request.goal, request.depth, request.scope, 1, &self.governor_policy);
        let run_id = RunId::new(self.id_gen.next());

        let grant = self
            .admission
            .preflight_run(PreflightRunRequest {
                run_id: run_id.clone(),
                idempotency_key,
                kind: RunKind::Pipeline,
                depth: request.depth,
                requested_parallelism: 1,
            })
            .into_result()?;

        let mut cards: Vec<AgentRunResult> = steps
            .iter()
            .enumerate()
            .map(|(index, (agent, _))| {
                let mut card = AgentRunResult::pending(agent.name.clone(), agent.source);
                card.step_index = Some(index);
                card
            })
            .collect();

        emit_pipeline_dashboard(dashboard, &request.pipeline, &request.goal, &cards, Some(0));

        let child_depth = request.depth + 1;
        let mut previous_output = request.goal.clone();
        let mut failed = false;

        for (index, (agent, step)) in steps.iter().enumerate() {
            if failed {
                cards[index].mark_skipped();
                cards[index].step_index = Some(index);
                continue;
            }

            cards[index].mark_running();
            emit_pipeline_dashboard(dashboard, &request.pipeline, &request.goal, &cards, Some(index));

            let slot = self.admission.acquire_slot(AcquireSlotRequest {
                run_id: run_id.clone(),
                depth: child_depth,
                agent: agent.name.clone(),
            });
            let slot = match slot.into_result() {
                Ok(slot) => slot,
                Err(rejection) => {
                    cards[index].mark_failed(rejection.to_string());
                    failed = true;
                    emit_pipeline_dashboard(dashboard, &request.pipeline, &request.goal, &cards, Some(index));
                    continue;
                }
            };

            let prompt = pipeline_step_prompt(&step.prompt, &previous_output, &request.goal);

            let mut card = run_member_with_recovery(
                self.attempts.as_ref(),
                &self.recovery_policy,
                MemberRun {
                    agent,
                    task: prompt,
                    depth: child_depth,
                    caller: "pipeline",
                    parent_run_id: &run_id,
                    parent_agent: &request.parent_agent,
                    cwd: step.cwd.clone(),
                    cancel: request.cancel.clone(),
                },
            )
            .await;
            card.step_index = Some(index);

            self.admission.release_slot(&slot, card.status);

            if card.status == AgentRunStatus::Failed {
                failed = true;
            }
            if let Some(output) = &card.output {
                previous_output = output.clone();
            }
            cards[index] = card;

            let next_active = if failed { Some(index) } else { (index + 1 < steps.len()).then_some(index + 1) };
            emit_pipeline_dashboard(dashboard, &request.pipeline, &request.goal, &cards, next_active);
        }

        self.admission.end_run(&grant, if failed { AgentRunStatus::Failed } else { AgentRunStatus::Ok });

        Ok(PipelineExecutionResult {
            pipeline: request.pipeline,
            goal: request.goal,
            checkpoints: pipeline_def.checkpoints,
            results: cards,
        })
    }
}

fn emit_pipeline_dashboard(
    dashboard: &(dyn DashboardSink<PipelineDashboard>),
    pipeline: &str,
    goal: &str,
    cards: &[AgentRunResult],
    active_step: Option<usize>,
) {
    dashboard.emit(PipelineDashboard {
        pipeline: pipeline.to_string(),
        goal: goal.to_string(),
        steps: cards
            .iter()
            .enumerate()
            .map(|(index, c)| PipelineStepState { index, agent: c.agent.clone(), status: c.status })
            .collect(),
        active_step,
    });
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
