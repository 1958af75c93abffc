use super::*;
use corral_core::{HealthClassification, HealthSnapshot, RunId};

fn health(classification: HealthClassification) -> HealthSnapshot {
    HealthSnapshot {
        run_id: RunId::new("r1"),
        agent: "worker".to_string(),
        ts_ms: 0,
        last_event_at_ms: 0,
        last_meaningful_progress_at_ms: 0,
        last_action: "spawned".to_string(),
        turns: 0,
        tool_calls: 0,
        assistant_chars: 0,
        progress_fingerprint: 0,
        classification,
    }
}

fn outcome(exit_code: Option<i32>, aborted: bool, origin: Option<AbortOrigin>, classification: HealthClassification) -> DelegatedOutcome {
    DelegatedOutcome {
        exit_code,
        stdout: String::new(),
        stderr: String::new(),
        aborted,
        abort_origin: origin,
        abort_reason: None,
        health: health(classification),
        governor: Default::default(),
    }
}

#[test]
fn clean_exit_classifies_ok() {
    let o = outcome(Some(0), false, None, HealthClassification::Healthy);
    assert_eq!(classify(&o, false), Reason::Ok);
}

#[test]
fn nonzero_exit_classifies_nonzero_exit() {
    let o = outcome(Some(1), false, None, HealthClassification::Healthy);
    assert_eq!(classify(&o, false), Reason::NonzeroExit);
}

#[test]
fn missing_exit_code_without_abort_is_transient_io() {
    let o = outcome(None, false, None, HealthClassification::Healthy);
    assert_eq!(classify(&o, false), Reason::TransientIo);
}

#[test]
fn spawn_io_error_overrides_everything_as_transient() {
    let o = outcome(Some(0), false, None, HealthClassification::Healthy);
    assert_eq!(classify(&o, true), Reason::TransientIo);
}

#[test]
fn health_abort_wedged_classifies_same_tool_phase_stall() {
    let o = outcome(None, true, Some(AbortOrigin::Health), HealthClassification::Wedged);
    assert_eq!(classify(&o, false), Reason::StallSameToolPhase);
}

#[test]
fn health_abort_stalled_classifies_no_progress_stall() {
    let o = outcome(None, true, Some(AbortOrigin::Health), HealthClassification::Stalled);
    assert_eq!(classify(&o, false), Reason::StallNoProgress);
}

#[test]
fn policy_abort_origin_classifies_policy_abort() {
    let o = outcome(None, true, Some(AbortOrigin::Policy), HealthClassification::Healthy);
    assert_eq!(classify(&o, false), Reason::PolicyAbort);
}

#[test]
fn signal_abort_origin_classifies_policy_abort() {
    let o = outcome(None, true, Some(AbortOrigin::Signal), HealthClassification::Healthy);
    assert_eq!(classify(&o, false), Reason::PolicyAbort);
}

#[test]
fn retryable_reasons_are_marked_retryable() {
    assert!(Reason::TransientIo.is_retryable());
    assert!(Reason::StallNoProgress.is_retryable());
    assert!(Reason::StallSameToolPhase.is_retryable());
    assert!(Reason::NonzeroExit.is_retryable());
    assert!(!Reason::PolicyAbort.is_retryable());
    assert!(!Reason::AdmissionReject.is_retryable());
    assert!(!Reason::Ok.is_retryable());
}
