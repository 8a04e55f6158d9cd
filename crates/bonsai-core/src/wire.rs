//! External wire format shared with the model provider and the message store.
//!
//! Mirrors the provider's chat shape: a role plus either a plain string or a
//! typed content-part array. The engine never sends this format anywhere
//! itself; it only converts to and from it (see [`crate::convert`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Assistant,
    Tool,
}

/// Message content: a bare string or a structured part array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

/// One element of a structured content array.
///
/// `Unknown` absorbs content kinds this engine does not model (images,
/// files, provider extensions) so that deserialization never fails on them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WirePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        output: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: WireContent,
}

impl WireMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: WireRole::User,
            content: WireContent::Text(text.into()),
        }
    }

    pub fn assistant(parts: Vec<WirePart>) -> Self {
        Self {
            role: WireRole::Assistant,
            content: WireContent::Parts(parts),
        }
    }

    pub fn tool(parts: Vec<WirePart>) -> Self {
        Self {
            role: WireRole::Tool,
            content: WireContent::Parts(parts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_part_uses_camel_case_fields() {
        let part = WirePart::ToolCall {
            tool_call_id: "c1".to_string(),
            tool_name: "search".to_string(),
            input: json!({"q": "rust"}),
        };
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["type"], "tool-call");
        assert_eq!(value["toolCallId"], "c1");
        assert_eq!(value["toolName"], "search");
    }

    #[test]
    fn string_content_deserializes_as_text() {
        let msg: WireMessage =
            serde_json::from_value(json!({"role": "user", "content": "hello"})).unwrap();
        assert_eq!(msg.role, WireRole::User);
        assert_eq!(msg.content, WireContent::Text("hello".to_string()));
    }

    #[test]
    fn unknown_part_kind_deserializes_without_error() {
        let msg: WireMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": [
                {"type": "text", "text": "here is a picture"},
                {"type": "image", "url": "https://example.com/cat.png"}
            ]
        }))
        .unwrap();

        match msg.content {
            WireContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[1], WirePart::Unknown);
            }
            WireContent::Text(_) => panic!("expected parts"),
        }
    }

    #[test]
    fn wire_message_round_trips() {
        let msg = WireMessage::tool(vec![WirePart::ToolResult {
            tool_call_id: "c1".to_string(),
            tool_name: "bash".to_string(),
            output: json!({"stdout": "ok"}),
        }]);
        let encoded = serde_json::to_string(&msg).unwrap();
        let decoded: WireMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }
}
