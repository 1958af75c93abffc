// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet-wide circuit breaker state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitReason {
    HostPressure,
    CallResultGap,
    Manual,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitState {
    pub status: CircuitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<CircuitReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until_ms: Option<u64>,
    #[serde(default)]
    pub trips: u64,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self {
            status: CircuitStatus::Closed,
            reason: None,
            details: None,
            opened_at_ms: None,
            cooldown_until_ms: None,
            trips: 0,
        }
    }
}

impl CircuitState {
    pub fn is_open(&self) -> bool {
        self.status == CircuitStatus::Open
    }

    /// Trip the breaker open. Idempotent re-trips (e.g. pressure is still
    /// critical on the next evaluation) refresh the cooldown window rather
    /// than double-counting `trips`.
    pub fn trip(&mut self, reason: CircuitReason, details: impl Into<String>, now_ms: u64, cooldown_ms: u64) {
        let was_open = self.is_open();
        self.status = CircuitStatus::Open;
        self.reason = Some(reason);
        self.details = Some(details.into());
        self.opened_at_ms = Some(now_ms);
        self.cooldown_until_ms = Some(now_ms + cooldown_ms);
        if !was_open {
            self.trips += 1;
        }
    }

    /// Attempt to heal. Only succeeds if the cooldown has elapsed; the
    /// caller is still responsible for checking that the triggering
    /// condition no longer holds before calling this.
    pub fn try_close(&mut self, now_ms: u64) -> bool {
        if !self.is_open() {
            return true;
        }
        let Some(cooldown_until) = self.cooldown_until_ms else {
            return false;
        };
        if now_ms >= cooldown_until {
            self.status = CircuitStatus::Closed;
            self.reason = None;
            self.details = None;
            self.opened_at_ms = None;
            self.cooldown_until_ms = None;
            true
        } else {
            false
        }
    }

    pub fn retry_after_ms(&self, now_ms: u64) -> u64 {
        self.cooldown_until_ms.map(|c| c.saturating_sub(now_ms)).unwrap_or(0)
    }
}
