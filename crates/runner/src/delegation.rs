// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C6 — Delegation Runner. Spawns one child, wires C4 (health) and C5
//! (governor) as watchdogs alongside an external signal origin, and
//! collects a [`DelegatedOutcome`]. Grounded in
//! `oj_adapters::subprocess::run_with_timeout`, generalized from a
//! one-shot `Command::output()` call to a long-lived piped child with a
//! streaming stdout reader, and in `oj_engine::executor`'s
//! `Effect::Shell` spawn-and-stream-output pattern.

use crate::cancel::CancelToken;
use crate::events::FingerprintState;
use crate::governor::{Governor, GovernorTick};
use crate::health::HealthMonitor;
use corral_core::{AbortOrigin, Clock, DelegatedOutcome, ProgressMarker, RunnerPolicy};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct DelegationConfig {
    pub label: String,
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

/// Run one delegated child to completion or abort.
///
/// `health` and `governor` arrive pre-constructed (their `started_at_ms`
/// is the caller's concern, since only the caller knows whether this is a
/// fresh attempt or a recovery retry sharing a run's elapsed clock).
/// `on_marker` lets the caller fold markers into its own result structure
/// (e.g. admission counters) the same tick the monitors see them.
pub async fn run_delegated_command<C: Clock>(
    config: DelegationConfig,
    clock: &C,
    runner_policy: RunnerPolicy,
    mut health: HealthMonitor,
    mut governor: Governor,
    watchdog_interval: Duration,
    mut cancel: CancelToken,
    mut on_marker: impl FnMut(&ProgressMarker),
) -> DelegatedOutcome {
    let label = config.label.clone();

    let Some((program, rest)) = config.argv.split_first() else {
        return abort_before_spawn(&health, &governor, clock.epoch_ms(), "empty_argv");
    };

    let mut cmd = Command::new(program);
    cmd.args(rest).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    if let Some(cwd) = &config.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &config.env {
        cmd.env(key, value);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(label = %label, error = %err, "failed to spawn delegated child");
            return abort_before_spawn(&health, &governor, clock.epoch_ms(), "spawn_failed");
        }
    };

    let Some(stdout) = child.stdout.take() else {
        return abort_before_spawn(&health, &governor, clock.epoch_ms(), "stdout_not_piped");
    };
    let Some(stderr) = child.stderr.take() else {
        return abort_before_spawn(&health, &governor, clock.epoch_ms(), "stderr_not_piped");
    };

    let stderr_task = tokio::spawn(async move {
        let mut capped = AsyncReadExt::take(stderr, 64 * 1024);
        let mut buf = Vec::new();
        let _ = capped.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    });

    info!(label = %label, pid = ?child.id(), "delegated child spawned");

    let mut reader = BufReader::new(stdout);
    let mut stdout_text = String::new();
    let mut warned_truncated = false;
    let mut fingerprint = FingerprintState::new();

    let mut ticker = tokio::time::interval(watchdog_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut abort: Option<(AbortOrigin, String)> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                abort = Some((AbortOrigin::Signal, "external_cancellation".to_string()));
                break;
            }

            _ = ticker.tick() => {
                let now_ms = clock.epoch_ms();
                if let Some(reason) = health.watchdog_tick(now_ms) {
                    abort = Some((AbortOrigin::Health, reason));
                    break;
                }
                if let GovernorTick::Abort { reason, .. } = governor.tick(now_ms) {
                    abort = Some((AbortOrigin::Policy, reason));
                    break;
                }
            }

            line = next_line_capped(&mut reader, runner_policy.max_line_bytes) => {
                match line {
                    Ok(Some((text, truncated))) => {
                        if truncated && !warned_truncated {
                            warn!(label = %label, max_bytes = runner_policy.max_line_bytes, "delegated child emitted a line past the byte cap; splitting into fragments");
                            warned_truncated = true;
                        }
                        stdout_text.push_str(&text);
                        stdout_text.push('\n');
                        if !truncated {
                            let now_ms = clock.epoch_ms();
                            observe_stdout_line(&mut fingerprint, &mut health, &mut governor, now_ms, &text, &mut on_marker);
                        }
                    }
                    Ok(None) => {
                        // EOF on stdout; keep waiting for the child to actually exit.
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                    Err(err) => {
                        warn!(label = %label, error = %err, "error reading delegated child stdout");
                    }
                }
            }

            status = child.wait() => {
                let exit_code = status.ok().and_then(|s| s.code());
                drain_residual(&mut reader, runner_policy.max_line_bytes, &mut stdout_text).await;
                let stderr_text = stderr_task.await.unwrap_or_default();
                let now_ms = clock.epoch_ms();
                let snapshot = health.snapshot(now_ms);
                let governor_summary = governor.summary(now_ms, 0);
                return DelegatedOutcome {
                    exit_code,
                    stdout: stdout_text,
                    stderr: stderr_text,
                    aborted: false,
                    abort_origin: None,
                    abort_reason: None,
                    health: snapshot,
                    governor: governor_summary,
                };
            }
        }
    }

    let (origin, reason) = abort.unwrap_or((AbortOrigin::Policy, "unknown".to_string()));
    terminate(&mut child, runner_policy.kill_grace).await;
    let stderr_text = stderr_task.await.unwrap_or_default();
    let now_ms = clock.epoch_ms();
    let snapshot = health.snapshot(now_ms);

    warn!(label = %label, origin = ?origin, reason = %reason, "delegated child aborted");

    let governor_summary = governor.summary(now_ms, 0);
    DelegatedOutcome {
        exit_code: None,
        stdout: stdout_text,
        stderr: stderr_text,
        aborted: true,
        abort_origin: Some(origin),
        abort_reason: Some(reason),
        health: snapshot,
        governor: governor_summary,
    }
}

fn abort_before_spawn(health: &HealthMonitor, governor: &Governor, now_ms: u64, reason: &str) -> DelegatedOutcome {
    DelegatedOutcome {
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
        aborted: true,
        abort_origin: Some(AbortOrigin::Policy),
        abort_reason: Some(reason.to_string()),
        health: health.snapshot(now_ms),
        governor: governor.summary(now_ms, 0),
    }
}

/// Sends a polite interrupt, waits up to `grace`, then forcibly kills.
#[cfg(unix)]
async fn terminate(child: &mut tokio::process::Child, grace: Duration) {
    if let Some(pid) = child.id() {
        let pid = nix::unistd::Pid::from_raw(pid as i32);
        let _ = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGINT);
    }
    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut tokio::process::Child, grace: Duration) {
    let _ = child.start_kill();
    let _ = tokio::time::timeout(grace, child.wait()).await;
}

/// One logical stdout line, byte-capped. Returns `(text, truncated)`; a
/// `truncated` fragment has no trailing newline in the source stream yet —
/// the caller will receive the remainder as a further fragment or, once a
/// newline finally appears, a final untruncated fragment.
async fn next_line_capped<R>(reader: &mut R, max_bytes: usize) -> std::io::Result<Option<(String, bool)>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(if buf.is_empty() { None } else { Some((bytes_to_text(buf), false)) });
        }
        if let Some(pos) = available.iter().position(|&b| b == b'\n') {
            buf.extend_from_slice(&available[..pos]);
            reader.consume(pos + 1);
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            return Ok(Some((bytes_to_text(buf), false)));
        }

        let remaining = max_bytes.saturating_sub(buf.len());
        if remaining == 0 {
            return Ok(Some((bytes_to_text(buf), true)));
        }
        let take = available.len().min(remaining);
        buf.extend_from_slice(&available[..take]);
        let consumed = take;
        reader.consume(consumed);
        if buf.len() >= max_bytes {
            return Ok(Some((bytes_to_text(buf), true)));
        }
    }
}

async fn drain_residual<R>(reader: &mut R, max_bytes: usize, into: &mut String)
where
    R: AsyncBufRead + Unpin,
{
    while let Ok(Some((text, _))) = next_line_capped(reader, max_bytes).await {
        into.push_str(&text);
        into.push('\n');
    }
}

fn bytes_to_text(buf: Vec<u8>) -> String {
    String::from_utf8_lossy(&buf).into_owned()
}

/// Feeds one stdout line through the fingerprint parser and both watchdogs,
/// folding the resulting marker into the caller's own bookkeeping. Kept
/// separate from the select loop above so the marker path is unit-testable
/// without spawning a real child.
pub fn observe_stdout_line(
    fingerprint: &mut FingerprintState,
    health: &mut HealthMonitor,
    governor: &mut Governor,
    now_ms: u64,
    line: &str,
    mut on_marker: impl FnMut(&ProgressMarker),
) -> ProgressMarker {
    let marker = fingerprint.observe(line);
    health.on_marker(&marker, now_ms);
    governor.on_marker(&marker, now_ms);
    on_marker(&marker);
    marker
}

#[cfg(test)]
#[path = "delegation_tests.rs"]
mod tests;
