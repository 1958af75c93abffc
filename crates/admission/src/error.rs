// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("lock error: {0}")]
    Lock(#[from] crate::lockfile::LockError),
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),
}
