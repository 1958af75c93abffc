// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One member/step's full attempt-and-retry loop (C7 driving C6), shared
//! by the team (C8) and pipeline (C9) executors so the retry/backoff/
//! degraded-completion logic lives in exactly one place.

use crate::attempt::{is_spawn_io_error, AttemptRequest, AttemptRunner};
use crate::catalog::AgentDescriptor;
use crate::output::final_assistant_text;
use corral_core::{AgentRunResult, RecoveryPolicy, RunId};
use corral_recovery::{classify, RecoveryAction, RecoveryCoordinator};
use corral_runner::CancelToken;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything one attempt loop needs beyond the agent itself. Grouped so
/// `run_member_with_recovery`'s signature doesn't grow a parameter every
/// time a caller needs to thread through one more piece of context.
pub struct MemberRun<'a> {
    pub agent: &'a AgentDescriptor,
    pub task: String,
    pub depth: u32,
    pub caller: &'static str,
    pub parent_run_id: &'a RunId,
    pub parent_agent: &'a str,
    pub cwd: Option<PathBuf>,
    pub cancel: CancelToken,
}

/// Runs one member/step to a terminal `AgentRunResult`, retrying through
/// the recovery coordinator (§4.6) until it completes, completes
/// degraded, or fails outright. Cancellation is checked between retries,
/// not mid-attempt — an in-flight child's own cancellation is C6's job.
pub async fn run_member_with_recovery<A: AttemptRunner>(
    attempts: &A,
    recovery_policy: &RecoveryPolicy,
    run: MemberRun<'_>,
) -> AgentRunResult {
    let mut card = AgentRunResult::pending(run.agent.name.clone(), run.agent.source);
    card.mark_running();
    let mut coordinator = RecoveryCoordinator::new();

    loop {
        let outcome = attempts
            .run_attempt(AttemptRequest {
                agent: run.agent,
                task: run.task.clone(),
                depth: run.depth,
                caller: run.caller,
                parent_run_id: run.parent_run_id,
                parent_agent: run.parent_agent,
                label: run.agent.name.clone(),
                cancel: run.cancel.clone(),
                cwd: run.cwd.clone(),
            })
            .await;

        let spawn_io_error = is_spawn_io_error(&outcome);
        let reason = classify(&outcome, spawn_io_error);
        card.health = Some(outcome.health.clone());

        let mut governor = outcome.governor.clone();
        let action = coordinator.decide(recovery_policy, reason, outcome.stdout.len());
        governor.retries = coordinator.attempts().saturating_sub(1);
        card.governor = Some(governor);

        match action {
            RecoveryAction::Complete => {
                card.mark_ok(final_assistant_text(&outcome.stdout).unwrap_or_default());
                info!(agent = %run.agent.name, attempts = coordinator.attempts(), "attempt: completed");
                return card;
            }
            RecoveryAction::CompleteDegraded => {
                card.mark_degraded(
                    final_assistant_text(&outcome.stdout).unwrap_or_default(),
                    format!("degraded completion after {reason:?}, {} attempts", coordinator.attempts()),
                );
                warn!(agent = %run.agent.name, attempts = coordinator.attempts(), ?reason, "attempt: completed degraded");
                return card;
            }
            RecoveryAction::Fail { reason } => {
                card.mark_failed(format!("{reason:?}"));
                warn!(agent = %run.agent.name, attempts = coordinator.attempts(), ?reason, "attempt: failed");
                return card;
            }
            RecoveryAction::Retry { delay } => {
                if run.cancel.is_cancelled() {
                    card.mark_failed("cancelled");
                    return card;
                }
                info!(agent = %run.agent.name, attempt = coordinator.attempts(), delay_ms = delay.as_millis() as u64, ?reason, "attempt: retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
