//! Rich message model for the compaction engine.
//!
//! Transcripts are sequences of role-tagged messages, each owning an ordered
//! list of typed parts. The part list is the unit the token accountant counts
//! and the pruner mutates; everything else treats messages as read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Fixed placeholder installed in place of a pruned tool output.
pub const PRUNED_OUTPUT_PLACEHOLDER: &str =
    "[Old tool output cleared to free context space]";

/// One typed unit of message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        output: Value,
        /// Set when the output has been cleared by the pruner. Once set, the
        /// part is immutable and `output` holds the fixed placeholder.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        compacted_at: Option<DateTime<Utc>>,
        /// Token count of the original output, recorded for audit.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_tokens: Option<u32>,
    },
    /// Internal step boundary marker, never sent to the provider.
    StepStart,
    /// Audit record of a previous summarization pass.
    CompactionMarker {
        summary: String,
        compacted_at: DateTime<Utc>,
        messages_compacted: usize,
        original_tokens: u32,
    },
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning { text: text.into() }
    }

    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self::ToolCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: Value,
    ) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            output,
            compacted_at: None,
            original_tokens: None,
        }
    }

    /// Whether this is a tool result whose output was already cleared.
    pub fn is_compacted_tool_result(&self) -> bool {
        matches!(
            self,
            Self::ToolResult {
                compacted_at: Some(_),
                ..
            }
        )
    }

    /// Clear a tool result's output to the fixed placeholder, stamping the
    /// compaction time and recording the original token count.
    ///
    /// Returns `false` (and leaves the part untouched) when the part is not a
    /// tool result or was already cleared, so repeated pruning passes are
    /// idempotent.
    pub fn clear_tool_output(&mut self, now: DateTime<Utc>, tokens_before: u32) -> bool {
        match self {
            Self::ToolResult {
                output,
                compacted_at,
                original_tokens,
                ..
            } if compacted_at.is_none() => {
                *output = Value::String(PRUNED_OUTPUT_PLACEHOLDER.to_string());
                *compacted_at = Some(now);
                *original_tokens = Some(tokens_before);
                true
            }
            _ => false,
        }
    }
}

/// A user turn. `parts` holds text content only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserMessage {
    pub id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    /// Cached part-derived token count; recomputable at any time and only
    /// trustworthy until the next part mutation.
    pub tokens: u32,
    pub parts: Vec<MessagePart>,
    /// Marks the synthetic user message that introduces a summary.
    #[serde(default)]
    pub is_compaction_trigger: bool,
}

/// An assistant turn: text, reasoning, and tool calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantMessage {
    pub id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub tokens: u32,
    pub parts: Vec<MessagePart>,
    /// Marks a synthetic summary message produced by a compaction pass.
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A tool turn carrying tool results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolMessage {
    pub id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub tokens: u32,
    pub parts: Vec<MessagePart>,
}

/// One transcript entry, tagged by role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RichMessage {
    User(UserMessage),
    Assistant(AssistantMessage),
    Tool(ToolMessage),
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

impl RichMessage {
    pub fn user(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::User(UserMessage {
            id: generate_id(),
            session_id: session_id.into(),
            created_at: Utc::now(),
            tokens: 0,
            parts: vec![MessagePart::text(text)],
            is_compaction_trigger: false,
        })
    }

    pub fn user_with_parts(session_id: impl Into<String>, parts: Vec<MessagePart>) -> Self {
        Self::User(UserMessage {
            id: generate_id(),
            session_id: session_id.into(),
            created_at: Utc::now(),
            tokens: 0,
            parts,
            is_compaction_trigger: false,
        })
    }

    pub fn assistant(session_id: impl Into<String>, parts: Vec<MessagePart>) -> Self {
        Self::Assistant(AssistantMessage {
            id: generate_id(),
            session_id: session_id.into(),
            created_at: Utc::now(),
            tokens: 0,
            parts,
            is_summary: false,
            finish_reason: None,
            error: None,
        })
    }

    pub fn tool(session_id: impl Into<String>, parts: Vec<MessagePart>) -> Self {
        Self::Tool(ToolMessage {
            id: generate_id(),
            session_id: session_id.into(),
            created_at: Utc::now(),
            tokens: 0,
            parts,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User(m) => &m.id,
            Self::Assistant(m) => &m.id,
            Self::Tool(m) => &m.id,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::User(m) => &m.session_id,
            Self::Assistant(m) => &m.session_id,
            Self::Tool(m) => &m.session_id,
        }
    }

    pub fn parts(&self) -> &[MessagePart] {
        match self {
            Self::User(m) => &m.parts,
            Self::Assistant(m) => &m.parts,
            Self::Tool(m) => &m.parts,
        }
    }

    pub fn parts_mut(&mut self) -> &mut Vec<MessagePart> {
        match self {
            Self::User(m) => &mut m.parts,
            Self::Assistant(m) => &mut m.parts,
            Self::Tool(m) => &mut m.parts,
        }
    }

    pub fn tokens(&self) -> u32 {
        match self {
            Self::User(m) => m.tokens,
            Self::Assistant(m) => m.tokens,
            Self::Tool(m) => m.tokens,
        }
    }

    pub fn set_tokens(&mut self, tokens: u32) {
        match self {
            Self::User(m) => m.tokens = tokens,
            Self::Assistant(m) => m.tokens = tokens,
            Self::Tool(m) => m.tokens = tokens,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// Whether this is an assistant message flagged as a compaction summary.
    pub fn is_summary(&self) -> bool {
        matches!(self, Self::Assistant(m) if m.is_summary)
    }
}
