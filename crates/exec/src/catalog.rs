// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative shapes the team/pipeline executors consume from their
//! collaborators (spec §6): team/pipeline definitions from the
//! configuration loader, the agent catalog from the agent-discovery
//! collaborator, and the launcher's workflow target for the pipeline
//! capability check. Nothing in this module parses a config file itself —
//! callers hand in already-resolved values.

use corral_core::AgentSource;
use std::path::PathBuf;

/// One team's member list, keyed by team name in the caller's map.
#[derive(Debug, Clone, Default)]
pub struct TeamDefinition {
    pub members: Vec<String>,
}

/// One step of a pipeline's declarative definition.
#[derive(Debug, Clone)]
pub struct PipelineStep {
    pub agent: String,
    pub prompt: String,
    pub cwd: Option<PathBuf>,
}

/// One pipeline's declarative definition, keyed by pipeline name in the
/// caller's map.
#[derive(Debug, Clone, Default)]
pub struct PipelineDefinition {
    pub description: Option<String>,
    pub checkpoints: Vec<String>,
    pub steps: Vec<PipelineStep>,
    /// Marks a pipeline as build-only for the §4.8 capability policy
    /// check: it may only run when the launcher's current workflow target
    /// permits build pipelines.
    pub build_only: bool,
}

/// One entry from the agent-discovery collaborator's catalog.
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    pub name: String,
    pub source: AgentSource,
    pub model: Option<String>,
    pub tools: Vec<String>,
    pub system_prompt: String,
}

/// Which agent sources to discover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    User,
    Project,
    Both,
}

impl Scope {
    pub fn matches(&self, source: AgentSource) -> bool {
        match self {
            Scope::User => source == AgentSource::User,
            Scope::Project => source == AgentSource::Project,
            Scope::Both => matches!(source, AgentSource::User | AgentSource::Project),
        }
    }
}

/// Launcher-exposed workflow target, consulted only by the pipeline
/// executor's capability policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowTarget {
    Meta,
    Build,
    Ops,
    Daybook,
    Slice,
    Unknown,
}

impl WorkflowTarget {
    /// Build-only pipelines are only permitted when the current target is
    /// itself `build`; every other target (including `unknown`) is
    /// treated conservatively as not permitting them.
    pub fn permits_build_only(&self) -> bool {
        matches!(self, WorkflowTarget::Build)
    }
}

/// Agent-discovery collaborator: resolves the catalog of agents available
/// in a given scope. A synchronous lookup, not an I/O-bound trait, since
/// discovery itself (reading agent definition files) is the caller's
/// concern; the core only filters by scope.
pub trait AgentDiscovery: Send + Sync {
    fn discover(&self, scope: Scope) -> Vec<AgentDescriptor>;

    fn find(&self, scope: Scope, name: &str) -> Option<AgentDescriptor> {
        self.discover(scope).into_iter().find(|a| a.name == name)
    }
}

/// Configuration-loader collaborator: resolves team/pipeline definitions
/// by name.
pub trait RunCatalog: Send + Sync {
    fn team(&self, name: &str) -> Option<TeamDefinition>;
    fn pipeline(&self, name: &str) -> Option<PipelineDefinition>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Default)]
    pub struct FakeCatalog {
        pub agents: Vec<AgentDescriptor>,
        pub teams: HashMap<String, TeamDefinition>,
        pub pipelines: HashMap<String, PipelineDefinition>,
    }

    impl FakeCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_agent(mut self, descriptor: AgentDescriptor) -> Self {
            self.agents.push(descriptor);
            self
        }

        pub fn with_team(mut self, name: impl Into<String>, members: Vec<&str>) -> Self {
            self.teams.insert(name.into(), TeamDefinition { members: members.into_iter().map(String::from).collect() });
            self
        }

        pub fn with_pipeline(mut self, name: impl Into<String>, def: PipelineDefinition) -> Self {
            self.pipelines.insert(name.into(), def);
            self
        }
    }

    impl AgentDiscovery for FakeCatalog {
        fn discover(&self, scope: Scope) -> Vec<AgentDescriptor> {
            self.agents.iter().filter(|a| scope.matches(a.source)).cloned().collect()
        }
    }

    impl RunCatalog for FakeCatalog {
        fn team(&self, name: &str) -> Option<TeamDefinition> {
            self.teams.get(name).cloned()
        }

        fn pipeline(&self, name: &str) -> Option<PipelineDefinition> {
            self.pipelines.get(name).cloned()
        }
    }
}
