// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission-state directory resolution. Mirrors the teacher's
//! `oj-daemon::lifecycle::state_dir`: an env var override for test
//! isolation takes priority, then `XDG_STATE_HOME`, then a fixed
//! `HOME`-relative fallback.

use std::io;
use std::path::PathBuf;

pub struct Paths {
    pub state_path: PathBuf,
    pub event_log_path: PathBuf,
    pub pressure_log_path: PathBuf,
}

/// Resolves the state directory and ensures it exists.
pub fn resolve() -> io::Result<Paths> {
    let dir = state_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(Paths {
        state_path: dir.join("state.json"),
        event_log_path: dir.join("event.log"),
        pressure_log_path: dir.join("pressure.ndjson"),
    })
}

fn state_dir() -> io::Result<PathBuf> {
    if let Ok(dir) = std::env::var("CORRAL_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("corral"));
    }
    let home = std::env::var("HOME").map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME is not set"))?;
    Ok(PathBuf::from(home).join(".local/state/corral"))
}
