// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C1 — Pressure Reader. Tails the host-pressure watchdog's NDJSON log and
//! returns its freshest sample, or none. Never raises: any I/O or parse
//! failure is swallowed and treated the same as "no signal".

use corral_core::PressureSnapshot;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Only the last `tail_bytes` of the file are read, so a large or
/// long-lived pressure log never costs an unbounded read on every
/// admission check.
const DEFAULT_TAIL_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone)]
pub struct PressureReader {
    log_path: PathBuf,
    tail_bytes: u64,
}

impl PressureReader {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self { log_path: log_path.into(), tail_bytes: DEFAULT_TAIL_BYTES }
    }

    pub fn with_tail_bytes(mut self, tail_bytes: u64) -> Self {
        self.tail_bytes = tail_bytes;
        self
    }

    /// Returns the most recent snapshot fresh within `freshness_ttl_ms`, or
    /// `None` if the file is absent, empty, truncated, unparsable, or every
    /// candidate is stale.
    pub fn current_pressure(&self, now_ms: u64, freshness_ttl_ms: u64) -> Option<PressureSnapshot> {
        match self.try_read_latest(now_ms, freshness_ttl_ms) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(path = %self.log_path.display(), error = %e, "pressure reader: treating as no signal");
                None
            }
        }
    }

    fn try_read_latest(&self, now_ms: u64, freshness_ttl_ms: u64) -> std::io::Result<Option<PressureSnapshot>> {
        let tail = read_tail(&self.log_path, self.tail_bytes)?;
        if tail.is_empty() {
            return Ok(None);
        }

        let mut latest: Option<PressureSnapshot> = None;
        for line in tail.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(snapshot) = serde_json::from_str::<PressureSnapshot>(line) else {
                continue;
            };
            if latest.as_ref().is_none_or(|l| snapshot.ts_ms >= l.ts_ms) {
                latest = Some(snapshot);
            }
        }

        Ok(latest.filter(|s| s.is_fresh(now_ms, freshness_ttl_ms)))
    }
}

fn read_tail(path: &Path, tail_bytes: u64) -> std::io::Result<String> {
    use std::io::{Read, Seek, SeekFrom};

    let mut f = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(e),
    };
    let len = f.metadata()?.len();
    if len > tail_bytes {
        f.seek(SeekFrom::Start(len - tail_bytes))?;
    }
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(dir: &tempfile::TempDir, lines: &[&str]) -> PathBuf {
        let path = dir.path().join("pressure.ndjson");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let reader = PressureReader::new(dir.path().join("missing.ndjson"));
        assert!(reader.current_pressure(1_000, 5_000).is_none());
    }

    #[test]
    fn empty_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(&dir, &[]);
        let reader = PressureReader::new(path);
        assert!(reader.current_pressure(1_000, 5_000).is_none());
    }

    #[test]
    fn returns_freshest_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            &dir,
            &[
                r#"{"ts_ms":100,"severity":"ok","node_count":1,"node_rss_mb":10}"#,
                r#"{"ts_ms":900,"severity":"critical","node_count":1,"node_rss_mb":20}"#,
            ],
        );
        let reader = PressureReader::new(path);

        let snapshot = reader.current_pressure(1_000, 5_000).unwrap();
        assert!(snapshot.is_critical());
        assert_eq!(snapshot.ts_ms, 900);
    }

    #[test]
    fn stale_snapshot_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(&dir, &[r#"{"ts_ms":100,"severity":"critical","node_count":1,"node_rss_mb":20}"#]);
        let reader = PressureReader::new(path);

        assert!(reader.current_pressure(10_000, 1_000).is_none());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            &dir,
            &[
                "not json",
                r#"{"ts_ms":500,"severity":"warn","node_count":1,"node_rss_mb":15}"#,
            ],
        );
        let reader = PressureReader::new(path);

        let snapshot = reader.current_pressure(1_000, 5_000).unwrap();
        assert_eq!(snapshot.ts_ms, 500);
    }
}
