//! Bidirectional mapping between the rich message model and the wire format.
//!
//! The mapping round-trips for every part type except pruned tool outputs,
//! which render as a fixed status object by design. Unknown wire content is
//! degraded to a placeholder text part rather than dropped, so conversion
//! never changes the message count.

use serde_json::{json, Value};

use crate::message::{MessagePart, RichMessage};
use crate::wire::{WireContent, WireMessage, WirePart, WireRole};

/// Marker substituted for content kinds the rich model cannot represent.
pub const UNSUPPORTED_CONTENT_MARKER: &str = "[unsupported content]";

/// Status text substituted for a pruned tool output on the way back out.
pub const COMPACTED_OUTPUT_MESSAGE: &str =
    "Tool output was cleared during context compaction. Re-run the tool if the result is needed again.";

/// Convert one wire message into the rich model.
pub fn to_rich(message: &WireMessage, session_id: &str) -> RichMessage {
    match message.role {
        WireRole::User => RichMessage::user_with_parts(session_id, user_parts(&message.content)),
        WireRole::Assistant => {
            RichMessage::assistant(session_id, assistant_parts(&message.content))
        }
        WireRole::Tool => RichMessage::tool(session_id, tool_parts(&message.content)),
    }
}

/// Convert a whole wire transcript, preserving order.
pub fn to_rich_batch(messages: &[WireMessage], session_id: &str) -> Vec<RichMessage> {
    messages
        .iter()
        .map(|message| to_rich(message, session_id))
        .collect()
}

/// Convert one rich message back to the wire format.
pub fn to_wire(message: &RichMessage) -> WireMessage {
    match message {
        RichMessage::User(user) => WireMessage {
            role: WireRole::User,
            content: WireContent::Text(joined_text(&user.parts)),
        },
        RichMessage::Assistant(assistant) => WireMessage {
            role: WireRole::Assistant,
            content: WireContent::Parts(
                assistant
                    .parts
                    .iter()
                    .filter_map(outbound_part)
                    .collect(),
            ),
        },
        RichMessage::Tool(tool) => WireMessage {
            role: WireRole::Tool,
            content: WireContent::Parts(tool.parts.iter().filter_map(outbound_part).collect()),
        },
    }
}

/// Convert a whole rich transcript back to the wire format.
pub fn to_wire_batch(messages: &[RichMessage]) -> Vec<WireMessage> {
    messages.iter().map(to_wire).collect()
}

fn user_parts(content: &WireContent) -> Vec<MessagePart> {
    match content {
        WireContent::Text(text) => vec![MessagePart::text(text.clone())],
        WireContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                WirePart::Text { text } => MessagePart::text(text.clone()),
                other => degraded_part("user", other),
            })
            .collect(),
    }
}

fn assistant_parts(content: &WireContent) -> Vec<MessagePart> {
    match content {
        WireContent::Text(text) => vec![MessagePart::text(text.clone())],
        WireContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                WirePart::Text { text } => MessagePart::text(text.clone()),
                WirePart::Reasoning { text } => MessagePart::reasoning(text.clone()),
                WirePart::ToolCall {
                    tool_call_id,
                    tool_name,
                    input,
                } => MessagePart::tool_call(tool_call_id.clone(), tool_name.clone(), input.clone()),
                other => degraded_part("assistant", other),
            })
            .collect(),
    }
}

fn tool_parts(content: &WireContent) -> Vec<MessagePart> {
    match content {
        WireContent::Text(text) => {
            // A bare string in a tool message has lost its call linkage; keep
            // the content anyway so nothing disappears from the transcript.
            tracing::warn!("tool message carried plain text content without a call id");
            vec![MessagePart::tool_result(
                "",
                "unknown",
                Value::String(text.clone()),
            )]
        }
        WireContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                WirePart::ToolResult {
                    tool_call_id,
                    tool_name,
                    output,
                } => MessagePart::tool_result(
                    tool_call_id.clone(),
                    tool_name.clone(),
                    output.clone(),
                ),
                other => degraded_part("tool", other),
            })
            .collect(),
    }
}

/// Degrade an out-of-place or unknown wire part to a recognizable text
/// placeholder so the message keeps its part count.
fn degraded_part(role: &str, part: &WirePart) -> MessagePart {
    let kind = match part {
        WirePart::Text { .. } => "text",
        WirePart::Reasoning { .. } => "reasoning",
        WirePart::ToolCall { .. } => "tool-call",
        WirePart::ToolResult { .. } => "tool-result",
        WirePart::Unknown => "unknown",
    };
    tracing::warn!(role, kind, "degrading unsupported wire content to a text placeholder");
    MessagePart::text(format!("{UNSUPPORTED_CONTENT_MARKER} ({kind})"))
}

fn joined_text(parts: &[MessagePart]) -> String {
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } | MessagePart::Reasoning { text } => Some(text.as_str()),
            MessagePart::CompactionMarker { summary, .. } => Some(summary.as_str()),
            _ => None,
        })
        .collect();
    texts.join("\n")
}

fn outbound_part(part: &MessagePart) -> Option<WirePart> {
    match part {
        MessagePart::Text { text } => Some(WirePart::Text { text: text.clone() }),
        MessagePart::Reasoning { text } => Some(WirePart::Reasoning { text: text.clone() }),
        MessagePart::ToolCall {
            tool_call_id,
            tool_name,
            input,
        } => Some(WirePart::ToolCall {
            tool_call_id: tool_call_id.clone(),
            tool_name: tool_name.clone(),
            input: input.clone(),
        }),
        MessagePart::ToolResult {
            tool_call_id,
            tool_name,
            output,
            compacted_at,
            ..
        } => {
            let output = if compacted_at.is_some() {
                json!({
                    "status": "compacted",
                    "message": COMPACTED_OUTPUT_MESSAGE,
                })
            } else {
                output.clone()
            };
            Some(WirePart::ToolResult {
                tool_call_id: tool_call_id.clone(),
                tool_name: tool_name.clone(),
                output,
            })
        }
        // The provider has no concept of a compaction marker; send its
        // summary as plain text.
        MessagePart::CompactionMarker { summary, .. } => Some(WirePart::Text {
            text: summary.clone(),
        }),
        // Internal-only boundary marker.
        MessagePart::StepStart => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn user_string_content_becomes_text_part() {
        let wire = WireMessage::user("Hello there");
        let rich = to_rich(&wire, "s1");

        assert!(rich.is_user());
        assert_eq!(rich.parts().len(), 1);
        assert!(matches!(
            &rich.parts()[0],
            MessagePart::Text { text } if text == "Hello there"
        ));
    }

    #[test]
    fn user_text_parts_join_with_newline_on_the_way_back() {
        let wire = WireMessage {
            role: WireRole::User,
            content: WireContent::Parts(vec![
                WirePart::Text {
                    text: "line one".to_string(),
                },
                WirePart::Text {
                    text: "line two".to_string(),
                },
            ]),
        };
        let back = to_wire(&to_rich(&wire, "s1"));

        assert_eq!(
            back.content,
            WireContent::Text("line one\nline two".to_string())
        );
    }

    #[test]
    fn assistant_round_trip_preserves_part_sequence() {
        let wire = WireMessage::assistant(vec![
            WirePart::Reasoning {
                text: "thinking it through".to_string(),
            },
            WirePart::Text {
                text: "I'll search for that".to_string(),
            },
            WirePart::ToolCall {
                tool_call_id: "c1".to_string(),
                tool_name: "search".to_string(),
                input: json!({"q": "rust enums"}),
            },
        ]);

        let back = to_wire(&to_rich(&wire, "s1"));
        assert_eq!(back, wire);
    }

    #[test]
    fn tool_round_trip_preserves_output() {
        let wire = WireMessage::tool(vec![WirePart::ToolResult {
            tool_call_id: "c1".to_string(),
            tool_name: "bash".to_string(),
            output: json!({"stdout": "file1\nfile2", "exit_code": 0}),
        }]);

        let back = to_wire(&to_rich(&wire, "s1"));
        assert_eq!(back, wire);
    }

    #[test]
    fn unknown_content_degrades_to_placeholder_without_losing_count() {
        let wire: WireMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "look at this"},
                {"type": "image", "url": "https://example.com/a.png"}
            ]
        }))
        .unwrap();

        let rich = to_rich(&wire, "s1");
        assert_eq!(rich.parts().len(), 2);
        assert!(matches!(
            &rich.parts()[1],
            MessagePart::Text { text } if text.contains(UNSUPPORTED_CONTENT_MARKER)
        ));
    }

    #[test]
    fn compacted_tool_result_renders_status_object() {
        let mut part = MessagePart::tool_result("c1", "bash", json!("huge output"));
        part.clear_tool_output(Utc::now(), 1000);
        let rich = RichMessage::tool("s1", vec![part]);

        let wire = to_wire(&rich);
        match wire.content {
            WireContent::Parts(parts) => match &parts[0] {
                WirePart::ToolResult { output, .. } => {
                    assert_eq!(output["status"], "compacted");
                    assert_eq!(output["message"], COMPACTED_OUTPUT_MESSAGE);
                }
                other => panic!("expected tool result, got {other:?}"),
            },
            WireContent::Text(_) => panic!("expected parts"),
        }
    }

    #[test]
    fn step_start_is_dropped_on_the_way_out() {
        let rich = RichMessage::assistant(
            "s1",
            vec![
                MessagePart::StepStart,
                MessagePart::text("actual content"),
            ],
        );
        let wire = to_wire(&rich);
        match wire.content {
            WireContent::Parts(parts) => {
                assert_eq!(parts.len(), 1);
                assert!(matches!(&parts[0], WirePart::Text { text } if text == "actual content"));
            }
            WireContent::Text(_) => panic!("expected parts"),
        }
    }

    #[test]
    fn compaction_marker_renders_as_plain_text() {
        let rich = RichMessage::assistant(
            "s1",
            vec![MessagePart::CompactionMarker {
                summary: "We set up the project and fixed two bugs.".to_string(),
                compacted_at: Utc::now(),
                messages_compacted: 12,
                original_tokens: 30_000,
            }],
        );
        let wire = to_wire(&rich);
        match wire.content {
            WireContent::Parts(parts) => {
                assert_eq!(
                    parts[0],
                    WirePart::Text {
                        text: "We set up the project and fixed two bugs.".to_string()
                    }
                );
            }
            WireContent::Text(_) => panic!("expected parts"),
        }
    }

    #[test]
    fn batch_conversion_preserves_message_count() {
        let wire = vec![
            WireMessage::user("u1"),
            WireMessage::assistant(vec![WirePart::Text {
                text: "a1".to_string(),
            }]),
            WireMessage::tool(vec![WirePart::ToolResult {
                tool_call_id: "c1".to_string(),
                tool_name: "bash".to_string(),
                output: json!("r1"),
            }]),
        ];

        let rich = to_rich_batch(&wire, "s1");
        assert_eq!(rich.len(), 3);
        assert_eq!(to_wire_batch(&rich).len(), 3);
    }
}
