// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newtype identifiers for the admission/run/lease/agent lifecycle.

use crate::define_id;

define_id! {
    /// Identifies one team/pipeline/subagent invocation, caller-supplied.
    pub struct RunId;
}

define_id! {
    /// Identifies one granted lease (run or slot); always server-assigned.
    pub struct LeaseId;
}

define_id! {
    /// Identifies one agent role invocation within a run (a team member or
    /// pipeline step).
    pub struct AgentRunId;
}
