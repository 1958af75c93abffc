use super::*;
use corral_core::{GovernorMode, GovernorPolicy, HealthPolicy, RunId, RunnerPolicy, SystemClock};

fn fast_health_policy() -> HealthPolicy {
    HealthPolicy {
        warn_no_progress: Duration::from_millis(10),
        abort_no_progress: Duration::from_millis(20),
        abort_quick_tool: Duration::from_millis(20),
        abort_active_tool: Duration::from_millis(20),
        wedged_tick_threshold: 2,
        tick_interval: Duration::from_millis(20),
        warn_only: false,
    }
}

fn lenient_health_policy() -> HealthPolicy {
    HealthPolicy {
        warn_no_progress: Duration::from_secs(60),
        abort_no_progress: Duration::from_secs(60),
        abort_quick_tool: Duration::from_secs(60),
        abort_active_tool: Duration::from_secs(60),
        wedged_tick_threshold: 5,
        tick_interval: Duration::from_secs(60),
        warn_only: false,
    }
}

fn governor_policy() -> GovernorPolicy {
    GovernorPolicy {
        mode: GovernorMode::Enforce,
        emergency_fuse: Duration::from_secs(4 * 60 * 60),
        cost_budget_usd: None,
        token_budget: None,
        tick_interval: Duration::from_secs(60),
    }
}

fn config(argv: &[&str]) -> DelegationConfig {
    DelegationConfig {
        label: "test".to_string(),
        argv: argv.iter().map(|s| s.to_string()).collect(),
        cwd: None,
        env: Vec::new(),
    }
}

#[tokio::test]
async fn clean_exit_carries_stdout_and_no_abort() {
    let clock = SystemClock::new();
    let health = HealthMonitor::new(lenient_health_policy(), RunId::new("r1"), "worker", clock.epoch_ms());
    let governor = Governor::new(governor_policy(), clock.epoch_ms());
    let (_handle, cancel) = crate::cancel::CancelHandle::new();

    let line = r#"{"type":"message_end","message":{"role":"assistant","content":[{"type":"text","text":"done"}]}}"#;
    let outcome = run_delegated_command(
        config(&["sh", "-c", &format!("echo '{line}'")]),
        &clock,
        RunnerPolicy::default(),
        health,
        governor,
        Duration::from_secs(60),
        cancel,
        |_marker| {},
    )
    .await;

    assert!(!outcome.aborted);
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.is_clean_exit());
    assert!(outcome.stdout.contains("done") || outcome.stdout.contains("message_end"));
}

#[tokio::test]
async fn nonzero_exit_is_reported_without_abort() {
    let clock = SystemClock::new();
    let health = HealthMonitor::new(lenient_health_policy(), RunId::new("r1"), "worker", clock.epoch_ms());
    let governor = Governor::new(governor_policy(), clock.epoch_ms());
    let (_handle, cancel) = crate::cancel::CancelHandle::new();

    let outcome = run_delegated_command(
        config(&["false"]),
        &clock,
        RunnerPolicy::default(),
        health,
        governor,
        Duration::from_secs(60),
        cancel,
        |_marker| {},
    )
    .await;

    assert!(!outcome.aborted);
    assert_eq!(outcome.exit_code, Some(1));
    assert!(!outcome.is_clean_exit());
}

#[tokio::test]
async fn health_stall_aborts_a_silent_child() {
    let clock = SystemClock::new();
    let health = HealthMonitor::new(fast_health_policy(), RunId::new("r1"), "worker", clock.epoch_ms());
    let governor = Governor::new(governor_policy(), clock.epoch_ms());
    let (_handle, cancel) = crate::cancel::CancelHandle::new();

    let outcome = run_delegated_command(
        config(&["sleep", "10"]),
        &clock,
        RunnerPolicy::default(),
        health,
        governor,
        Duration::from_millis(20),
        cancel,
        |_marker| {},
    )
    .await;

    assert!(outcome.aborted);
    assert_eq!(outcome.abort_origin, Some(AbortOrigin::Health));
}

#[tokio::test]
async fn external_cancellation_aborts_with_signal_origin() {
    let clock = SystemClock::new();
    let health = HealthMonitor::new(lenient_health_policy(), RunId::new("r1"), "worker", clock.epoch_ms());
    let governor = Governor::new(governor_policy(), clock.epoch_ms());
    let (handle, cancel) = crate::cancel::CancelHandle::new();
    handle.cancel();

    let outcome = run_delegated_command(
        config(&["sleep", "10"]),
        &clock,
        RunnerPolicy::default(),
        health,
        governor,
        Duration::from_secs(60),
        cancel,
        |_marker| {},
    )
    .await;

    assert!(outcome.aborted);
    assert_eq!(outcome.abort_origin, Some(AbortOrigin::Signal));
}

#[tokio::test]
async fn empty_argv_reports_a_policy_abort_without_spawning() {
    let clock = SystemClock::new();
    let health = HealthMonitor::new(lenient_health_policy(), RunId::new("r1"), "worker", clock.epoch_ms());
    let governor = Governor::new(governor_policy(), clock.epoch_ms());
    let (_handle, cancel) = crate::cancel::CancelHandle::new();

    let outcome = run_delegated_command(
        config(&[]),
        &clock,
        RunnerPolicy::default(),
        health,
        governor,
        Duration::from_secs(60),
        cancel,
        |_marker| {},
    )
    .await;

    assert!(outcome.aborted);
    assert_eq!(outcome.abort_origin, Some(AbortOrigin::Policy));
}

#[test]
fn observe_stdout_line_feeds_both_watchdogs() {
    let mut fingerprint = FingerprintState::new();
    let mut health = HealthMonitor::new(lenient_health_policy(), RunId::new("r1"), "worker", 0);
    let mut governor = Governor::new(governor_policy(), 0);
    let mut observed = Vec::new();

    let marker = observe_stdout_line(
        &mut fingerprint,
        &mut health,
        &mut governor,
        0,
        r#"{"type":"tool_execution_start","toolCallId":"c1","toolName":"bash"}"#,
        |m| observed.push(m.action.clone()),
    );

    assert_eq!(marker.action, "tool_start:bash");
    assert_eq!(observed, vec!["tool_start:bash".to_string()]);
    assert_eq!(health.snapshot(0).tool_calls, 1);
}
