// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured admission rejections. The admission controller never lets an
//! I/O or policy failure escape as an exception; every guard failure comes
//! back as one of these.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectCode {
    DepthExceeded,
    CircuitOpen,
    CircuitOpenHostPressure,
    CircuitOpenCallResultGap,
    RunCapReached,
    SlotCapReached,
    StateError,
}

impl RejectCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepthExceeded => "DEPTH_EXCEEDED",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::CircuitOpenHostPressure => "CIRCUIT_OPEN_HOST_PRESSURE",
            Self::CircuitOpenCallResultGap => "CIRCUIT_OPEN_CALL_RESULT_GAP",
            Self::RunCapReached => "RUN_CAP_REACHED",
            Self::SlotCapReached => "SLOT_CAP_REACHED",
            Self::StateError => "STATE_ERROR",
        }
    }
}

impl std::fmt::Display for RejectCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rejected admission attempt, carrying enough context for the caller to
/// translate it into a per-card error (team) or an immediate abort
/// (pipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    pub code: RejectCode,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Rejection {
    pub fn new(code: RejectCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            retry_after_ms: None,
            details: None,
        }
    }

    pub fn with_retry_after_ms(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.reason)
    }
}

impl std::error::Error for Rejection {}

/// Outcome of a preflight/acquire call: either a grant or a structured
/// rejection. Kept as its own enum rather than `Result<Grant, Rejection>`
/// in the public contract so call sites read like the spec's
/// `Allow{grant} | Reject{...}` shape.
#[derive(Debug, Clone)]
pub enum Admit<T> {
    Allow(T),
    Reject(Rejection),
}

impl<T> Admit<T> {
    pub fn is_allow(&self) -> bool {
        matches!(self, Admit::Allow(_))
    }

    pub fn into_result(self) -> Result<T, Rejection> {
        match self {
            Admit::Allow(t) => Ok(t),
            Admit::Reject(r) => Err(r),
        }
    }
}
