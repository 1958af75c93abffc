use super::*;

#[test]
fn parses_tool_execution_start() {
    let line = r#"{"type":"tool_execution_start","toolCallId":"c1","toolName":"bash"}"#;
    match parse_line(line).unwrap() {
        ChildEvent::ToolExecutionStart { tool_name, .. } => assert_eq!(tool_name, "bash"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn parses_message_end_and_extracts_text() {
    let line = r#"{"type":"message_end","message":{"role":"assistant","content":[{"type":"text","text":"done"}]}}"#;
    match parse_line(line).unwrap() {
        ChildEvent::MessageEnd { message } => assert_eq!(message.text(), "done"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn unrecognized_type_is_other() {
    let line = r#"{"type":"some_future_event","foo":1}"#;
    assert!(matches!(parse_line(line).unwrap(), ChildEvent::Other));
}

#[test]
fn malformed_json_is_an_error_not_a_panic() {
    assert!(parse_line("not json").is_err());
}

#[test]
fn fingerprint_state_marks_malformed_line_as_opaque_marker() {
    let mut state = FingerprintState::new();
    let marker = state.observe("not json");
    assert_eq!(marker.action, "event:malformed_json");
    assert_eq!(marker.kind, ProgressMarkerKind::Other);
}

#[test]
fn fingerprint_unchanged_on_repeated_identical_tool_call() {
    let mut state = FingerprintState::new();
    let start = r#"{"type":"tool_execution_start","toolCallId":"c1","toolName":"bash"}"#;
    let end = r#"{"type":"tool_execution_end","toolCallId":"c1","toolName":"bash"}"#;

    let m1 = state.observe(start);
    let m2 = state.observe(end);
    assert_ne!(m1.fingerprint, m2.fingerprint, "phase transition must change fingerprint");

    let fp_after_first_cycle = m2.fingerprint;
    let m3 = state.observe(start);
    let m4 = state.observe(end);
    assert_eq!(m4.fingerprint, fp_after_first_cycle, "identical retry cycle must repeat the fingerprint");
    assert_ne!(m3.fingerprint, fp_after_first_cycle);
}

#[test]
fn fingerprint_changes_on_new_assistant_text() {
    let mut state = FingerprintState::new();
    let msg = |text: &str| format!(r#"{{"type":"message_end","message":{{"role":"assistant","content":[{{"type":"text","text":"{text}"}}]}}}}"#);

    let m1 = state.observe(&msg("hello"));
    let m2 = state.observe(&msg("hello world"));
    assert_ne!(m1.fingerprint, m2.fingerprint);
}

#[test]
fn progress_bearing_kinds_exclude_other() {
    assert!(ProgressMarkerKind::ToolStart.is_progress_bearing());
    assert!(ProgressMarkerKind::ToolEnd.is_progress_bearing());
    assert!(ProgressMarkerKind::Assistant.is_progress_bearing());
    assert!(!ProgressMarkerKind::Other.is_progress_bearing());
}
