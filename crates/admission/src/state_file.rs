// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read/write the persisted `AdmissionState` document. Writes go through a
//! temp file + rename so a crash mid-write never leaves a half-written
//! document for the next reader.

use corral_core::AdmissionState;
use std::io;
use std::path::Path;

pub fn read_state(path: &Path) -> io::Result<AdmissionState> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(AdmissionState::default()),
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(AdmissionState::default()),
        Err(e) => Err(e),
    }
}

pub fn write_state(path: &Path, state: &AdmissionState) -> io::Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    std::fs::write(&tmp_path, bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
