// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the argv/env for one delegated child, per spec §6: a JSON event
//! stream, no session persistence, no auto-loaded extensions, optional
//! tool/model/system-prompt flags, and the orchestration-metadata
//! environment (depth, caller identity, parent run id, parent agent name)
//! children use to self-gate in the admission controller's depth guard.

use crate::catalog::AgentDescriptor;
use corral_core::RunId;
use corral_runner::DelegationConfig;
use std::path::PathBuf;

/// Orchestration metadata injected into every delegated child's
/// environment. `caller` is one of `"team"`, `"pipeline"`, or `"master"`
/// per spec §9's master-only-tools note.
#[derive(Debug, Clone)]
pub struct DelegationContext<'a> {
    pub agent: &'a AgentDescriptor,
    pub task: String,
    pub depth: u32,
    pub caller: &'static str,
    pub parent_run_id: &'a RunId,
    pub parent_agent: &'a str,
    pub label: String,
    /// A pipeline step's declared working directory, if any (team members
    /// never set this).
    pub cwd: Option<PathBuf>,
}

pub fn build_delegation_config(ctx: DelegationContext<'_>) -> DelegationConfig {
    let mut argv = vec![
        "claude".to_string(),
        "--print".to_string(),
        "--output-format".to_string(),
        "stream-json".to_string(),
        "--no-session-persistence".to_string(),
        "--no-auto-extensions".to_string(),
    ];
    if let Some(model) = &ctx.agent.model {
        argv.push("--model".to_string());
        argv.push(model.clone());
    }
    if !ctx.agent.tools.is_empty() {
        argv.push("--allowed-tools".to_string());
        argv.push(ctx.agent.tools.join(","));
    }
    if !ctx.agent.system_prompt.is_empty() {
        argv.push("--append-system-prompt".to_string());
        argv.push(ctx.agent.system_prompt.clone());
    }
    argv.push(ctx.task);

    let env = vec![
        ("CORRAL_DEPTH".to_string(), ctx.depth.to_string()),
        ("CORRAL_CALLER".to_string(), ctx.caller.to_string()),
        ("CORRAL_PARENT_RUN_ID".to_string(), ctx.parent_run_id.as_str().to_string()),
        ("CORRAL_PARENT_AGENT".to_string(), ctx.parent_agent.to_string()),
    ];

    DelegationConfig { label: ctx.label, argv, cwd: ctx.cwd, env }
}

/// The constant team task-string template from spec §4.7.
pub fn team_task(team: &str, goal: &str) -> String {
    format!("Team: {team}\nGoal: {goal}")
}

/// Substitutes `$INPUT` (the previous step's output, or the original goal
/// for the first step) and `$ORIGINAL` (the goal, unchanged across every
/// step) into a pipeline step's prompt template. A plain two-token
/// literal replace, not a general templating engine: the spec fixes these
/// two substitution points, it does not ask for arbitrary named
/// variables.
pub fn pipeline_step_prompt(template: &str, input: &str, original: &str) -> String {
    template.replace("$INPUT", input).replace("$ORIGINAL", original)
}
