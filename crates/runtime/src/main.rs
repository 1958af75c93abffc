// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! corral: the one process entry point that wires the admission
//! controller (C1-C3), the delegation runner (C4-C6), the recovery
//! coordinator (C7) and a team or pipeline executor (C8/C9) into a single
//! fleet run, for local manual exercising. Mirrors
//! `oj-daemon::main::setup_logging`'s `tracing-subscriber` wiring, but
//! unlike `ojd` this is not a long-running daemon: one invocation drives
//! one team or pipeline to completion and exits.

mod catalog;
mod config;

use std::sync::Arc;
use std::time::Duration;

use corral_admission::AdmissionController;
use corral_core::{AdmissionPolicy, AgentRunStatus, GovernorPolicy, HealthPolicy, RecoveryPolicy, RunnerPolicy, SystemClock, UuidIdGen};
use corral_exec::{
    DelegationAttemptRunner, PipelineDashboard, PipelineExecutionRequest, PipelineExecutionResult, PipelineExecutor, RunGuardError, Scope,
    TeamDashboard, TeamExecutionRequest, TeamExecutionResult, TeamExecutor, WorkflowTarget,
};
use corral_runner::CancelHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::catalog::DemoCatalog;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--help" | "-h" | "help" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-V" | "-v" => {
                println!("corral {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            _ => {}
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((mode, name, goal)) = parse_args(&args) else {
        print_usage();
        std::process::exit(1);
    };

    setup_logging();

    // Master-only tool gate (spec §9): team/pipeline entry points are
    // callable only when the caller identity indicates master. A delegated
    // child carries its spawner's identity in CORRAL_CALLER; rejected here,
    // before the admission controller is ever constructed, not at admission.
    let caller = caller_from_env();
    if caller != "master" {
        error!(caller = %caller, "team/pipeline entry points are master-only; delegated caller rejected at the tool gate");
        std::process::exit(1);
    }
    let depth = depth_from_env();

    let paths = config::resolve()?;
    let admission = Arc::new(AdmissionController::new(
        paths.state_path,
        paths.event_log_path,
        paths.pressure_log_path,
        AdmissionPolicy::default(),
        SystemClock::new(),
        UuidIdGen,
    ));
    let catalog = Arc::new(DemoCatalog);
    let attempts = Arc::new(DelegationAttemptRunner {
        clock: SystemClock::new(),
        health_policy: HealthPolicy::default(),
        governor_policy: GovernorPolicy::default(),
        runner_policy: RunnerPolicy::default(),
        watchdog_interval: Duration::from_secs(10),
    });

    let (cancel_handle, cancel) = CancelHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, cancelling in-flight children");
            cancel_handle.cancel();
        }
    });

    match mode.as_str() {
        "team" => {
            let executor = TeamExecutor {
                admission,
                catalog: catalog.clone(),
                discovery: catalog,
                attempts,
                recovery_policy: RecoveryPolicy::default(),
                governor_policy: GovernorPolicy::default(),
                id_gen: UuidIdGen,
            };
            let dashboard = |snapshot: TeamDashboard| info!(dashboard = %serde_json::to_string(&snapshot).unwrap_or_default(), "team dashboard");
            let result = executor
                .execute(
                    TeamExecutionRequest { team: name, goal, scope: Scope::Both, concurrency: 3, depth, parent_agent: "master".to_string(), cancel },
                    &dashboard,
                )
                .await;
            report_team(result);
        }
        "pipeline" => {
            let executor = PipelineExecutor {
                admission,
                catalog: catalog.clone(),
                discovery: catalog,
                attempts,
                recovery_policy: RecoveryPolicy::default(),
                governor_policy: GovernorPolicy::default(),
                id_gen: UuidIdGen,
            };
            let dashboard = |snapshot: PipelineDashboard| info!(dashboard = %serde_json::to_string(&snapshot).unwrap_or_default(), "pipeline dashboard");
            let result = executor
                .execute(
                    PipelineExecutionRequest {
                        pipeline: name,
                        goal,
                        scope: Scope::Both,
                        depth,
                        parent_agent: "master".to_string(),
                        workflow_target: workflow_target_from_env(),
                        cancel,
                    },
                    &dashboard,
                )
                .await;
            report_pipeline(result);
        }
        _ => unreachable!("parse_args only returns team or pipeline"),
    }

    Ok(())
}

fn report_team(result: Result<TeamExecutionResult, RunGuardError>) {
    match result {
        Ok(team) => {
            let mut any_failed = false;
            for card in &team.results {
                info!(agent = %card.agent, status = ?card.status, output = ?card.output, error = ?card.error, "member result");
                any_failed |= card.status == AgentRunStatus::Failed;
            }
            std::process::exit(i32::from(any_failed));
        }
        Err(err) => {
            error!(error = %err, "team run rejected");
            std::process::exit(1);
        }
    }
}

fn report_pipeline(result: Result<PipelineExecutionResult, RunGuardError>) {
    match result {
        Ok(pipeline) => {
            let mut any_failed = false;
            for (index, card) in pipeline.results.iter().enumerate() {
                info!(step = index, agent = %card.agent, status = ?card.status, output = ?card.output, error = ?card.error, "step result");
                any_failed |= card.status == AgentRunStatus::Failed;
            }
            std::process::exit(i32::from(any_failed));
        }
        Err(err) => {
            error!(error = %err, "pipeline run rejected");
            std::process::exit(1);
        }
    }
}

/// The identity of whoever spawned this process, per the `CORRAL_CALLER`
/// env var `crates/exec/src/spawn.rs` writes into a delegated child's
/// environment. Absent entirely, this is a true top-level invocation.
fn caller_from_env() -> String {
    std::env::var("CORRAL_CALLER").unwrap_or_else(|_| "master".to_string())
}

/// The nesting depth this process was spawned at, per `CORRAL_DEPTH`.
/// Absent or unparseable, this is depth 0 (a top-level invocation).
fn depth_from_env() -> u32 {
    std::env::var("CORRAL_DEPTH").ok().and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn workflow_target_from_env() -> WorkflowTarget {
    match std::env::var("CORRAL_WORKFLOW_TARGET").as_deref() {
        Ok("meta") => WorkflowTarget::Meta,
        Ok("build") => WorkflowTarget::Build,
        Ok("ops") => WorkflowTarget::Ops,
        Ok("daybook") => WorkflowTarget::Daybook,
        Ok("slice") => WorkflowTarget::Slice,
        _ => WorkflowTarget::Unknown,
    }
}

fn parse_args(args: &[String]) -> Option<(String, String, String)> {
    if args.len() < 3 {
        return None;
    }
    let mode = args[0].clone();
    if mode != "team" && mode != "pipeline" {
        return None;
    }
    let name = args[1].clone();
    let goal = args[2..].join(" ");
    Some((mode, name, goal))
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_usage() {
    println!("corral {}", env!("CARGO_PKG_VERSION"));
    println!("Drives one team or pipeline run to completion against the demo catalog.");
    println!();
    println!("USAGE:");
    println!("    corral <team|pipeline> <name> <goal...>");
    println!();
    println!("    corral team core ship the thing");
    println!("    corral pipeline release write a poem");
    println!();
    println!("ENVIRONMENT:");
    println!("    CORRAL_STATE_DIR         overrides the admission state directory");
    println!("    CORRAL_WORKFLOW_TARGET   build|meta|ops|daybook|slice (pipeline capability check)");
    println!("    CORRAL_DEPTH             nesting depth this invocation was spawned at (default: 0)");
    println!("    CORRAL_CALLER            spawning caller identity; only \"master\" may run team/pipeline");
    println!("    RUST_LOG                 tracing filter (default: info)");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}
