// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction so lease TTLs, circuit cooldowns, and governor windows
//! can be driven deterministically in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of time. Production code uses [`SystemClock`]; tests use
/// [`FakeClock`] so lease expiry, cooldowns, and window math run without
/// sleeping.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, for interval/timer math (`Duration` since an
    /// arbitrary fixed point).
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, for persisted
    /// timestamps (lease `created_at`, step history, event log entries).
    fn epoch_ms(&self) -> u64;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A controllable clock for tests. Starts at the moment of construction and
/// only moves forward when [`FakeClock::advance`] is called.
#[derive(Debug, Clone)]
pub struct FakeClock {
    origin: Instant,
    elapsed_ms: Arc<AtomicU64>,
    epoch_origin_ms: u64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            epoch_origin_ms: 1_700_000_000_000,
        }
    }

    /// Build a clock whose epoch origin is pinned to a specific millisecond
    /// value, for tests that assert on exact timestamps.
    pub fn at_epoch_ms(epoch_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
            epoch_origin_ms: epoch_ms,
        }
    }

    /// Move the clock forward. Clones of this `FakeClock` observe the
    /// advance immediately (the elapsed counter is shared).
    pub fn advance(&self, by: Duration) {
        self.elapsed_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn epoch_ms(&self) -> u64 {
        self.epoch_origin_ms + self.elapsed().as_millis() as u64
    }
}
