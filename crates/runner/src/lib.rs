// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! corral-runner: the delegation runner (C6) and the two watchdogs it
//! wires together, the health monitor (C4) and the adaptive governor (C5).

pub mod cancel;
pub mod delegation;
pub mod events;
pub mod governor;
pub mod health;

pub use cancel::{CancelHandle, CancelToken};
pub use delegation::{run_delegated_command, DelegationConfig};
pub use events::{AssistantMessage, ChildEvent, ContentBlock, FingerprintState, MessageUsage};
pub use governor::{Governor, GovernorTick};
pub use health::HealthMonitor;
