// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extracts a completed attempt's `output` (spec §3's `AgentRunResult`,
//! testable property 7: "a child that exits 0 and emitted at least one
//! `message_end` assistant event yields status `ok` and `output` equal to
//! that final assistant text"). The delegation runner (C6) never
//! interprets stdout beyond line-splitting, so this reconstruction lives
//! here, at the executor layer that owns the result it attaches to.

use corral_runner::events::{parse_line, ChildEvent};

/// Scans the raw newline-delimited stdout a delegated attempt produced
/// and returns the text of the last non-error assistant `message_end`
/// event, or `None` if the child never emitted one.
pub fn final_assistant_text(stdout: &str) -> Option<String> {
    let mut last = None;
    for line in stdout.lines() {
        if let Ok(ChildEvent::MessageEnd { message }) = parse_line(line) {
            if message.error_message.is_none() {
                last = Some(message.text());
            }
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_final_assistant_message() {
        let stdout = [
            r#"{"type":"tool_execution_start","toolCallId":"c1","toolName":"bash"}"#,
            r#"{"type":"tool_execution_end","toolCallId":"c1","toolName":"bash"}"#,
            r#"{"type":"message_end","message":{"role":"assistant","content":[{"type":"text","text":"X"}]}}"#,
        ]
        .join("\n");
        assert_eq!(final_assistant_text(&stdout).as_deref(), Some("X"));
    }

    #[test]
    fn ignores_an_error_message_end() {
        let stdout = r#"{"type":"message_end","message":{"role":"assistant","content":[],"errorMessage":"boom"}}"#;
        assert_eq!(final_assistant_text(stdout), None);
    }

    #[test]
    fn returns_none_with_no_assistant_events() {
        assert_eq!(final_assistant_text("not json\n{\"type\":\"other_thing\"}"), None);
    }

    #[test]
    fn keeps_the_last_of_several_messages() {
        let stdout = [
            r#"{"type":"message_end","message":{"role":"assistant","content":[{"type":"text","text":"first"}]}}"#,
            r#"{"type":"message_end","message":{"role":"assistant","content":[{"type":"text","text":"final"}]}}"#,
        ]
        .join("\n");
        assert_eq!(final_assistant_text(&stdout).as_deref(), Some("final"));
    }
}
