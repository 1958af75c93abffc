// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NDJSON admission event log, rotated by size rather than time since it is
//! appended to by many short-lived launcher processes rather than one
//! long-running daemon.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub struct EventLogConfig {
    pub max_bytes: u64,
    pub max_backups: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventRecord<'a> {
    RunAllowed {
        ts_ms: u64,
        run_id: &'a str,
        lease_id: &'a str,
        deduped: bool,
    },
    RunDenied {
        ts_ms: u64,
        run_id: &'a str,
        code: &'a str,
        reason: &'a str,
    },
    RunEnd {
        ts_ms: u64,
        run_id: &'a str,
        status: &'a str,
    },
    SlotAllowed {
        ts_ms: u64,
        run_id: &'a str,
        lease_id: &'a str,
    },
    SlotDenied {
        ts_ms: u64,
        run_id: &'a str,
        code: &'a str,
        reason: &'a str,
    },
    SlotRelease {
        ts_ms: u64,
        lease_id: &'a str,
        status: &'a str,
    },
    ToolGateDenied {
        ts_ms: u64,
        depth: u32,
        code: &'a str,
    },
    CounterCall {
        ts_ms: u64,
        tool: &'a str,
    },
    CounterResult {
        ts_ms: u64,
        tool: &'a str,
    },
    CounterReset {
        ts_ms: u64,
    },
    CircuitOpen {
        ts_ms: u64,
        reason: &'a str,
        cooldown_until_ms: u64,
    },
    StateError {
        ts_ms: u64,
        detail: &'a str,
    },
}

/// Append `record` as one NDJSON line, rotating the log first if the next
/// write would push it over `config.max_bytes`.
///
/// Rotation scheme: `event.log` -> `event.log.1` -> ... ->
/// `event.log.<max_backups>`, oldest dropped.
pub fn append(path: &Path, config: EventLogConfig, record: &EventRecord<'_>) -> std::io::Result<()> {
    let line = serde_json::to_string(record).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let incoming_len = line.len() as u64 + 1;

    if let Ok(meta) = std::fs::metadata(path) {
        if meta.len() + incoming_len > config.max_bytes {
            rotate(path, config.max_backups)?;
        }
    }

    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(f, "{line}")?;
    Ok(())
}

fn rotate(path: &Path, max_backups: u32) -> std::io::Result<()> {
    let oldest = backup_path(path, max_backups);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for n in (1..max_backups).rev() {
        let from = backup_path(path, n);
        let to = backup_path(path, n + 1);
        if from.exists() {
            std::fs::rename(&from, &to)?;
        }
    }
    if path.exists() {
        std::fs::rename(path, backup_path(path, 1))?;
    }
    Ok(())
}

fn backup_path(path: &Path, n: u32) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(format!(".{n}"));
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_shifts_backups_and_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.log");
        std::fs::write(&path, b"old-content").unwrap();
        std::fs::write(backup_path(&path, 1), b"gen-1").unwrap();
        std::fs::write(backup_path(&path, 2), b"gen-2").unwrap();

        rotate(&path, 2).unwrap();

        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(backup_path(&path, 1)).unwrap(), "old-content");
        assert_eq!(std::fs::read_to_string(backup_path(&path, 2)).unwrap(), "gen-1");
        assert!(!backup_path(&path, 3).exists());
    }

    #[test]
    fn append_writes_one_ndjson_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.log");
        let config = EventLogConfig { max_bytes: 1024 * 1024, max_backups: 3 };

        append(&path, config, &EventRecord::RunEnd { ts_ms: 1, run_id: "r1", status: "ok" }).unwrap();
        append(&path, config, &EventRecord::RunEnd { ts_ms: 2, run_id: "r2", status: "failed" }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().next().unwrap().contains("\"run_id\":\"r1\""));
    }

    #[test]
    fn append_rotates_when_over_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.log");
        std::fs::write(&path, vec![b'x'; 100]).unwrap();
        let config = EventLogConfig { max_bytes: 50, max_backups: 2 };

        append(&path, config, &EventRecord::RunEnd { ts_ms: 1, run_id: "r1", status: "ok" }).unwrap();

        assert!(backup_path(&path, 1).exists());
    }
}
