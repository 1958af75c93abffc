// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The configuration loader and agent-discovery collaborators are out of
//! scope for the `corral-*` crate family (they resolve team/pipeline
//! definitions and the agent catalog from project files the core never
//! touches). This module stands in for both with a small hardcoded
//! catalog so this binary has something to run against for local manual
//! exercising — it is not a config-file loader.

use corral_core::AgentSource;
use corral_exec::{AgentDescriptor, AgentDiscovery, PipelineDefinition, PipelineStep, RunCatalog, Scope, TeamDefinition};

pub struct DemoCatalog;

impl DemoCatalog {
    fn agents() -> Vec<AgentDescriptor> {
        vec![
            AgentDescriptor {
                name: "planner".to_string(),
                source: AgentSource::Project,
                model: None,
                tools: vec![],
                system_prompt: "You are the planner. Break the goal into concrete steps.".to_string(),
            },
            AgentDescriptor {
                name: "worker".to_string(),
                source: AgentSource::Project,
                model: None,
                tools: vec![],
                system_prompt: "You are the worker. Carry out the assigned step.".to_string(),
            },
            AgentDescriptor {
                name: "reviewer".to_string(),
                source: AgentSource::Project,
                model: None,
                tools: vec![],
                system_prompt: "You are the reviewer. Point out anything the worker missed.".to_string(),
            },
        ]
    }
}

impl AgentDiscovery for DemoCatalog {
    fn discover(&self, scope: Scope) -> Vec<AgentDescriptor> {
        Self::agents().into_iter().filter(|a| scope.matches(a.source)).collect()
    }
}

impl RunCatalog for DemoCatalog {
    fn team(&self, name: &str) -> Option<TeamDefinition> {
        match name {
            "core" => Some(TeamDefinition { members: vec!["planner".to_string(), "worker".to_string(), "reviewer".to_string()] }),
            _ => None,
        }
    }

    fn pipeline(&self, name: &str) -> Option<PipelineDefinition> {
        match name {
            "release" => Some(PipelineDefinition {
                description: Some("draft then review".to_string()),
                checkpoints: vec!["draft".to_string(), "review".to_string()],
                steps: vec![
                    PipelineStep { agent: "worker".to_string(), prompt: "Draft against $ORIGINAL".to_string(), cwd: None },
                    PipelineStep { agent: "reviewer".to_string(), prompt: "Review $INPUT against $ORIGINAL".to_string(), cwd: None },
                ],
                build_only: false,
            }),
            _ => None,
        }
    }
}
