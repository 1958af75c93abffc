use super::*;
use corral_core::{GovernorMode, ProgressMarker, ProgressMarkerKind};

fn policy(mode: GovernorMode) -> GovernorPolicy {
    GovernorPolicy {
        mode,
        emergency_fuse: std::time::Duration::from_secs(4 * 60 * 60),
        cost_budget_usd: None,
        token_budget: None,
        tick_interval: std::time::Duration::from_secs(10),
    }
}

fn tool_start(name: &str) -> ProgressMarker {
    ProgressMarker {
        kind: ProgressMarkerKind::ToolStart,
        action: format!("tool_start:{name}"),
        tool_name: Some(name.to_string()),
        fingerprint: 0,
    }
}

fn tool_end_failed(name: &str) -> ProgressMarker {
    ProgressMarker {
        kind: ProgressMarkerKind::ToolEnd,
        action: format!("tool_end_error:{name}"),
        tool_name: Some(name.to_string()),
        fingerprint: 0,
    }
}

#[test]
fn fresh_run_continues() {
    let mut gov = Governor::new(policy(GovernorMode::Enforce), 0);
    assert_eq!(gov.tick(1_000), GovernorTick::Continue);
}

#[test]
fn emergency_fuse_always_aborts_regardless_of_mode() {
    for mode in [GovernorMode::Observe, GovernorMode::Warn, GovernorMode::Enforce] {
        let mut gov = Governor::new(policy(mode), 0);
        let tick = gov.tick(4 * 60 * 60 * 1000 + 1);
        assert!(matches!(tick, GovernorTick::Abort { tripwire: Some(TripwireKind::EmergencyFuse), .. }));
    }
}

#[test]
fn observe_mode_never_aborts_on_strikes_or_non_fuse_tripwires() {
    let mut gov = Governor::new(policy(GovernorMode::Observe), 0);
    for i in 0..10 {
        gov.on_marker(&tool_end_failed("bash"), i * 1_000);
        let tick = gov.tick(i * 1_000);
        assert!(!matches!(tick, GovernorTick::Abort { .. }));
    }
}

#[test]
fn retry_churn_tripwire_trips_after_repeated_identical_failures() {
    let mut gov = Governor::new(policy(GovernorMode::Enforce), 0);
    let mut last = GovernorTick::Continue;
    for i in 0..RETRY_CHURN_TRIPWIRE_COUNT {
        gov.on_marker(&tool_end_failed("bash"), u64::from(i) * 1_000);
        last = gov.tick(u64::from(i) * 1_000);
    }
    assert!(matches!(last, GovernorTick::Abort { tripwire: Some(TripwireKind::RetryChurn), .. }));
}

#[test]
fn warn_mode_downgrades_tripwire_abort_to_warn() {
    let mut gov = Governor::new(policy(GovernorMode::Warn), 0);
    for i in 0..RETRY_CHURN_TRIPWIRE_COUNT {
        gov.on_marker(&tool_end_failed("bash"), u64::from(i) * 1_000);
    }
    let tick = gov.tick(RETRY_CHURN_TRIPWIRE_COUNT as u64 * 1_000);
    assert!(matches!(tick, GovernorTick::Warn { tripwire: Some(TripwireKind::RetryChurn), .. }));
}

#[test]
fn loop_detection_trips_when_same_tool_repeats_with_no_novelty() {
    let mut gov = Governor::new(policy(GovernorMode::Enforce), 0);
    for i in 0..(LOOP_DETECTION_SAMPLES as u64) {
        gov.on_marker(&tool_start("bash"), i * 1_000);
    }
    let tick = gov.tick(LOOP_DETECTION_SAMPLES as u64 * 1_000);
    assert!(matches!(tick, GovernorTick::Abort { tripwire: Some(TripwireKind::LoopDetected), .. }));
}

#[test]
fn distinct_tool_signatures_avoid_loop_detection() {
    let mut gov = Governor::new(policy(GovernorMode::Enforce), 0);
    let tools = ["bash", "read", "grep", "glob", "write", "edit"];
    for (i, tool) in tools.iter().enumerate() {
        gov.on_marker(&tool_start(tool), i as u64 * 1_000);
    }
    let tick = gov.tick(tools.len() as u64 * 1_000);
    assert!(!matches!(tick, GovernorTick::Abort { tripwire: Some(TripwireKind::LoopDetected), .. }));
}

#[test]
fn cost_budget_exceeded_trips_when_configured() {
    let mut p = policy(GovernorMode::Enforce);
    p.cost_budget_usd = Some(1.0);
    let mut gov = Governor::new(p, 0);
    gov.record_usage(1.5, 0);
    let tick = gov.tick(1_000);
    assert!(matches!(tick, GovernorTick::Abort { tripwire: Some(TripwireKind::CostBudgetExceeded), .. }));
}

#[test]
fn band_gets_stricter_with_elapsed_time() {
    let gov = Governor::new(policy(GovernorMode::Enforce), 0);
    assert_eq!(gov.score(0).band, GovernorBand::Opening);
    assert_eq!(gov.score(10 * 60 * 1000).band, GovernorBand::MidRun);
    assert_eq!(gov.score(30 * 60 * 1000).band, GovernorBand::LongRun);
    assert_eq!(gov.score(60 * 60 * 1000).band, GovernorBand::Overtime);
}

#[test]
fn summary_reports_final_band_and_retries() {
    let gov = Governor::new(policy(GovernorMode::Enforce), 0);
    let summary = gov.summary(5_000, 2);
    assert_eq!(summary.retries, 2);
    assert_eq!(summary.elapsed_ms, 5_000);
    assert_eq!(summary.final_band, Some(GovernorBand::Opening));
}
