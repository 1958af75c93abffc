use super::*;
use corral_core::{ProgressMarkerKind, RunId};
use std::time::Duration;

fn policy() -> HealthPolicy {
    HealthPolicy {
        warn_no_progress: Duration::from_secs(90),
        abort_no_progress: Duration::from_secs(300),
        abort_quick_tool: Duration::from_secs(60),
        abort_active_tool: Duration::from_secs(600),
        wedged_tick_threshold: 2,
        tick_interval: Duration::from_secs(10),
        warn_only: false,
    }
}

fn marker(kind: ProgressMarkerKind, action: &str, tool_name: Option<&str>, fingerprint: u64) -> ProgressMarker {
    ProgressMarker {
        kind,
        action: action.to_string(),
        tool_name: tool_name.map(str::to_string),
        fingerprint,
    }
}

#[test]
fn snapshot_is_well_ordered() {
    let monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 1_000);
    let snap = monitor.snapshot(1_000);
    assert!(snap.is_well_ordered());
    assert_eq!(snap.classification, HealthClassification::Healthy);
}

#[test]
fn classifies_healthy_when_recent_progress() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::Assistant, "hi", None, 1), 100);
    assert_eq!(monitor.classify(200), HealthClassification::Healthy);
}

#[test]
fn classifies_slow_past_warn_threshold() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::Assistant, "hi", None, 1), 0);
    assert_eq!(monitor.classify(95_000), HealthClassification::Slow);
}

#[test]
fn classifies_stalled_past_no_tool_abort_threshold() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::Assistant, "hi", None, 1), 0);
    assert_eq!(monitor.classify(300_000), HealthClassification::Stalled);
}

#[test]
fn classifies_stalled_quickly_for_short_latency_tool() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::ToolStart, "tool_start:grep", Some("grep"), 1), 0);
    // still below the generic no-tool threshold but past the quick-tool one
    assert_eq!(monitor.classify(61_000), HealthClassification::Stalled);
}

#[test]
fn wedged_requires_unchanged_fingerprint_across_consecutive_ticks_in_same_phase() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    // same tool call repeated three times with an *unchanged* fingerprint
    monitor.on_marker(&marker(ProgressMarkerKind::ToolStart, "tool_start:bash", Some("bash"), 7), 0);
    monitor.on_marker(&marker(ProgressMarkerKind::ToolStart, "tool_start:bash", Some("bash"), 7), 1);
    monitor.on_marker(&marker(ProgressMarkerKind::ToolStart, "tool_start:bash", Some("bash"), 7), 2);

    assert_eq!(monitor.classify(700_000), HealthClassification::Wedged);
}

#[test]
fn stalled_not_wedged_when_fingerprint_keeps_changing() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::ToolStart, "tool_start:bash", Some("bash"), 1), 0);
    // never repeats an identical fingerprint, so never accrues unchanged_ticks
    assert_eq!(monitor.classify(700_000), HealthClassification::Stalled);
}

#[test]
fn warn_only_mode_never_demands_abort() {
    let mut warn_policy = policy();
    warn_policy.warn_only = true;
    let mut monitor = HealthMonitor::new(warn_policy, RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::Assistant, "hi", None, 1), 0);

    assert_eq!(monitor.classify(700_000), HealthClassification::Stalled);
    assert_eq!(monitor.watchdog_tick(700_000), None);
}

#[test]
fn watchdog_tick_reports_stall_message_with_classification_prefix() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::Assistant, "hi", None, 1), 0);
    let msg = monitor.watchdog_tick(300_000).expect("should demand abort");
    assert!(msg.starts_with("stall:stalled:"));
}

#[test]
fn other_markers_never_update_meaningful_progress_or_fingerprint() {
    let mut monitor = HealthMonitor::new(policy(), RunId::new("r1"), "worker", 0);
    monitor.on_marker(&marker(ProgressMarkerKind::Other, "event:malformed_json", None, 999), 50);
    let snap = monitor.snapshot(50);
    assert_eq!(snap.last_meaningful_progress_at_ms, 0);
    assert_eq!(snap.progress_fingerprint, 0);
}
