// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! corral-admission: C1 Pressure Reader, C2 Persistent Admission State, C3
//! Admission Controller — the fleet-wide fail-closed gate.

pub mod controller;
pub mod error;
pub mod event_log;
pub mod lockfile;
pub mod pressure_reader;
pub mod state_file;

pub use controller::{
    AcquireSlotRequest, AdmissionController, AdmissionStatus, PreflightRunRequest, RunGrant, SlotGrant,
};
pub use error::AdmissionError;
pub use event_log::{EventLogConfig, EventRecord};
pub use pressure_reader::PressureReader;
