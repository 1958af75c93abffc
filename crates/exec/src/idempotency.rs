// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Computes the `idempotencyKey` fingerprint (spec §3): a deterministic
//! hash over cwd + target + normalized goal + depth + scope + parallelism
//! + governor knobs. A duplicate preflight within `runLeaseTtl` with a
//! matching key dedupes to the existing lease rather than allocating a
//! new one (`AdmissionController::preflight_run`).
//!
//! Grounded in the same fingerprint idiom as `corral-runner::events`'s
//! `FingerprintState` (Open Question 2 in `DESIGN.md`): a
//! `DefaultHasher`, deterministic within one compiled binary, hashed over
//! a normalized tuple of caller-visible parameters.

use crate::catalog::Scope;
use corral_core::GovernorPolicy;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Normalizes a goal string for fingerprinting: trims surrounding
/// whitespace and collapses internal runs of whitespace to a single
/// space, so two callers who differ only in incidental formatting
/// dedupe to the same run.
fn normalize_goal(goal: &str) -> String {
    goal.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[allow(clippy::too_many_arguments)]
pub fn compute(
    cwd: Option<&Path>,
    target: &str,
    goal: &str,
    depth: u32,
    scope: Scope,
    requested_parallelism: u32,
    governor_policy: &GovernorPolicy,
) -> String {
    let mut hasher = DefaultHasher::new();
    cwd.map(|p| p.to_string_lossy().into_owned()).hash(&mut hasher);
    target.hash(&mut hasher);
    normalize_goal(goal).hash(&mut hasher);
    depth.hash(&mut hasher);
    scope_tag(scope).hash(&mut hasher);
    requested_parallelism.hash(&mut hasher);
    governor_mode_tag(governor_policy.mode).hash(&mut hasher);
    governor_policy.emergency_fuse.as_secs().hash(&mut hasher);
    governor_policy.cost_budget_usd.map(|c| c.to_bits()).hash(&mut hasher);
    governor_policy.token_budget.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn scope_tag(scope: Scope) -> &'static str {
    match scope {
        Scope::User => "user",
        Scope::Project => "project",
        Scope::Both => "both",
    }
}

/// `GovernorMode` doesn't derive `Hash`, so the idempotency fingerprint
/// hashes its discriminant directly.
fn governor_mode_tag(mode: corral_core::GovernorMode) -> u8 {
    match mode {
        corral_core::GovernorMode::Observe => 0,
        corral_core::GovernorMode::Warn => 1,
        corral_core::GovernorMode::Enforce => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn policy() -> GovernorPolicy {
        GovernorPolicy {
            mode: corral_core::GovernorMode::Enforce,
            emergency_fuse: Duration::from_secs(14400),
            cost_budget_usd: None,
            token_budget: None,
            tick_interval: Duration::from_secs(10),
        }
    }

    #[test]
    fn identical_inputs_hash_identically() {
        let a = compute(None, "core", "ship it", 0, Scope::Both, 3, &policy());
        let b = compute(None, "core", "ship it", 0, Scope::Both, 3, &policy());
        assert_eq!(a, b);
    }

    #[test]
    fn goal_whitespace_normalizes_to_the_same_key() {
        let a = compute(None, "core", "ship   it", 0, Scope::Both, 3, &policy());
        let b = compute(None, "core", "  ship it  ", 0, Scope::Both, 3, &policy());
        assert_eq!(a, b);
    }

    #[test]
    fn different_depth_hashes_differently() {
        let a = compute(None, "core", "ship it", 0, Scope::Both, 3, &policy());
        let b = compute(None, "core", "ship it", 1, Scope::Both, 3, &policy());
        assert_ne!(a, b);
    }

    #[test]
    fn different_target_hashes_differently() {
        let a = compute(None, "core", "ship it", 0, Scope::Both, 3, &policy());
        let b = compute(None, "other", "ship it", 0, Scope::Both, 3, &policy());
        assert_ne!(a, b);
    }
}
