// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses the newline-delimited JSON event stream emitted by the external
//! agent binary (spec §6) into [`ProgressMarker`]s the health monitor (C4)
//! consumes, and extracts the final assistant message an `ok` outcome
//! reports as its `output`.

use corral_core::{ProgressMarker, ProgressMarkerKind};
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ChildEvent {
    #[serde(rename = "tool_execution_start")]
    ToolExecutionStart {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default)]
        args: Option<serde_json::Value>,
    },
    #[serde(rename = "tool_execution_end")]
    ToolExecutionEnd {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default, rename = "isError")]
        is_error: Option<bool>,
    },
    #[serde(rename = "message_end")]
    MessageEnd { message: AssistantMessage },
    /// Catch-all for any other recognized-but-uninterpreted `type`.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub usage: Option<MessageUsage>,
    #[serde(default, rename = "stopReason")]
    pub stop_reason: Option<String>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageUsage {
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default, rename = "cacheRead")]
    pub cache_read: u64,
    #[serde(default, rename = "cacheWrite")]
    pub cache_write: u64,
    #[serde(default, rename = "costUsd")]
    pub cost_usd: f64,
    #[serde(default, rename = "contextTokens")]
    pub context_tokens: u64,
}

impl AssistantMessage {
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Parse one stdout line into a child event. Malformed JSON is not an
/// error the caller needs to propagate — it becomes a synthetic
/// `event:malformed_json` marker per spec §6, observed by the health
/// monitor but otherwise ignored.
pub fn parse_line(line: &str) -> Result<ChildEvent, serde_json::Error> {
    serde_json::from_str(line)
}

/// Running fingerprint state: the tuple (last tool name, last tool phase,
/// cumulative assistant chars, last meaningful stdout excerpt) hashed into
/// a single opaque `u64`, per the Open Question resolution in
/// `DESIGN.md`. Deliberately excludes a raw per-line counter — a repeated
/// identical tool call (retry churn) must hash to the *same* fingerprint
/// so the wedged/stalled classifier can see it, not a fresh one every
/// line. Any genuinely new observable (a new tool, a phase transition, or
/// new assistant text) changes the fingerprint; the hash algorithm is
/// otherwise unspecified and never exposed to callers.
#[derive(Debug, Default)]
pub struct FingerprintState {
    last_tool_name: Option<String>,
    last_tool_phase: ToolPhase,
    assistant_chars: u64,
    last_excerpt: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
enum ToolPhase {
    #[default]
    None,
    Open,
    Closed,
}

impl FingerprintState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one parsed line, produce the marker the health monitor (and
    /// the admission controller's counters, if it's a `subagent` tool
    /// call) observes. Returns `None` for a fully-ignored opaque event
    /// (there is always a marker, even for malformed JSON or `Other`).
    pub fn observe(&mut self, line: &str) -> ProgressMarker {
        let marker = match parse_line(line) {
            Ok(ChildEvent::ToolExecutionStart { tool_name, .. }) => {
                self.last_tool_name = Some(tool_name.clone());
                self.last_tool_phase = ToolPhase::Open;
                ProgressMarker {
                    kind: ProgressMarkerKind::ToolStart,
                    action: format!("tool_start:{tool_name}"),
                    tool_name: Some(tool_name),
                    fingerprint: 0,
                }
            }
            Ok(ChildEvent::ToolExecutionEnd { tool_name, is_error, .. }) => {
                self.last_tool_phase = ToolPhase::Closed;
                let action = if is_error.unwrap_or(false) {
                    format!("tool_end_error:{tool_name}")
                } else {
                    format!("tool_end:{tool_name}")
                };
                self.last_excerpt = action.clone();
                ProgressMarker {
                    kind: ProgressMarkerKind::ToolEnd,
                    action,
                    tool_name: Some(tool_name),
                    fingerprint: 0,
                }
            }
            Ok(ChildEvent::MessageEnd { message }) => {
                let text = message.text();
                let kind = if message.error_message.is_some() {
                    ProgressMarkerKind::AssistantError
                } else {
                    ProgressMarkerKind::Assistant
                };
                self.assistant_chars += text.len() as u64;
                self.last_excerpt = excerpt(&text);
                ProgressMarker {
                    kind,
                    action: text,
                    tool_name: None,
                    fingerprint: 0,
                }
            }
            Ok(ChildEvent::Other) => ProgressMarker {
                kind: ProgressMarkerKind::Other,
                action: "other".to_string(),
                tool_name: None,
                fingerprint: 0,
            },
            Err(_) => ProgressMarker {
                kind: ProgressMarkerKind::Other,
                action: "event:malformed_json".to_string(),
                tool_name: None,
                fingerprint: 0,
            },
        };

        ProgressMarker { fingerprint: self.fingerprint(), ..marker }
    }

    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.last_tool_name.hash(&mut hasher);
        self.last_tool_phase.hash(&mut hasher);
        self.assistant_chars.hash(&mut hasher);
        self.last_excerpt.hash(&mut hasher);
        hasher.finish()
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 200;
    if text.len() <= MAX {
        text.to_string()
    } else {
        text.chars().take(MAX).collect()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
