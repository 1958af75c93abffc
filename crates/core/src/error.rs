// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type shared by the two I/O-touching boundaries every `corral-*`
//! crate wraps: reading the persisted admission state and the host
//! pressure log. Component-specific errors (admission, runner, recovery,
//! exec) wrap this with `#[from]` rather than duplicate it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateIoError {
    #[error("io error reading/writing {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt state at {path}: {source}")]
    Corrupt {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("lock wait exceeded for {path}")]
    LockTimeout { path: std::path::PathBuf },
}
