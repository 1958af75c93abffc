// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive-create + staleness-aware spin lock guarding the admission
//! state file. One sibling `<state-file>.lock` path per state file; held
//! for the duration of a single read-modify-write.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("timed out waiting for lock at {0}")]
    Timeout(PathBuf),
    #[error("io error acquiring lock at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read state at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Held for the lifetime of one state mutation. Dropping it removes the
/// lock file unconditionally, so every path — including early returns on
/// error — releases the lock.
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Spin-acquire the lock file next to `state_path`, backing off with a
/// short sleep between attempts, up to `wait`. A lock file whose mtime is
/// older than `stale` is treated as orphaned (its holder crashed without
/// cleaning up) and removed so the next attempt can proceed.
pub fn acquire(state_path: &Path, wait: Duration, stale: Duration) -> Result<LockGuard, LockError> {
    let lock_path = lock_path_for(state_path);
    let deadline = Instant::now() + wait;
    let mut backoff = Duration::from_millis(5);

    loop {
        match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(mut f) => {
                let _ = write!(f, "{}\n{}", std::process::id(), epoch_ms_now());
                return Ok(LockGuard { path: lock_path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if is_stale(&lock_path, stale) {
                    let _ = fs::remove_file(&lock_path);
                    continue;
                }
                if Instant::now() >= deadline {
                    return Err(LockError::Timeout(lock_path));
                }
                thread::sleep(backoff);
                backoff = (backoff * 2).min(Duration::from_millis(100));
            }
            Err(source) => return Err(LockError::Io { path: lock_path, source }),
        }
    }
}

fn lock_path_for(state_path: &Path) -> PathBuf {
    let mut os = state_path.as_os_str().to_owned();
    os.push(".lock");
    PathBuf::from(os)
}

fn is_stale(lock_path: &Path, stale: Duration) -> bool {
    let Ok(meta) = fs::metadata(lock_path) else {
        // Disappeared between our AlreadyExists and this check — treat as
        // not stale; the retry loop will just try to create it again.
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    match modified.elapsed() {
        Ok(elapsed) => elapsed > stale,
        Err(_) => false,
    }
}

fn epoch_ms_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Load-modify-store helper: acquires the lock, re-reads the state file
/// from disk, runs `f` against the freshly-read state, and if `f` returns
/// `Some`, writes the result back atomically (temp file + rename) before
/// releasing the lock.
///
/// `read` is trusted to already distinguish "file absent" (a legitimate
/// default) from "file present but unparseable" — the latter must come
/// back as `Err` here rather than be papered over, since silently
/// resetting a corrupt state file would discard every outstanding lease
/// and circuit/counter state and let admission proceed as if the host
/// were idle, the opposite of fail-closed.
pub fn with_locked_state<T, S, F>(
    state_path: &Path,
    wait: Duration,
    stale: Duration,
    read: impl FnOnce(&Path) -> std::io::Result<S>,
    write: impl FnOnce(&Path, &S) -> std::io::Result<()>,
    f: F,
) -> Result<T, LockError>
where
    F: FnOnce(&mut S) -> T,
{
    let _guard = acquire(state_path, wait, stale)?;
    let mut state = read(state_path).map_err(|source| LockError::Read { path: state_path.to_path_buf(), source })?;
    let result = f(&mut state);
    if let Err(source) = write(state_path, &state) {
        return Err(LockError::Io { path: state_path.to_path_buf(), source });
    }
    Ok(result)
}
