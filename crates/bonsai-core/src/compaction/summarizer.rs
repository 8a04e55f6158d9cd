//! Conversation summarization into a synthetic trigger/summary pair.
//!
//! When pruning is not enough, older messages are replaced by an
//! LLM-generated summary packaged as an ordinary user/assistant exchange, so
//! downstream code that walks messages needs no special cases.

use std::sync::Arc;

use async_trait::async_trait;

use crate::compaction::counter::TokenAccountant;
use crate::compaction::pruner::protection_boundary;
use crate::compaction::types::{CompactionConfig, CompactionError, CompactionOutcome};
use crate::message::{AssistantMessage, MessagePart, RichMessage, UserMessage};

/// Instruction for the summarization call.
pub const SUMMARIZATION_SYSTEM_PROMPT: &str = "You summarize conversations so they can continue \
in a smaller context window. Capture what was accomplished, the current state of the work, user \
preferences, open next steps, and concrete technical identifiers (file paths, function names, \
error messages, URLs). Be specific and concrete. Keep the summary brief.";

/// Text of the synthetic user message that introduces a summary.
pub const COMPACTION_TRIGGER_TEXT: &str = "What have we accomplished in our conversation so \
far? Summarize the key points so we can continue where we left off.";

/// Output cap for the summary itself.
const SUMMARY_MAX_OUTPUT_TOKENS: u32 = 2_000;

/// Rendered tool results are truncated to this many characters.
const TOOL_RESULT_RENDER_LIMIT: usize = 500;

/// External text-generation provider used for summarization. Swappable; the
/// engine needs a single one-shot call with an output cap.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, CompactionError>;
}

/// Produces the trigger/summary pair and the compacted transcript.
pub struct TranscriptSummarizer {
    generator: Arc<dyn TextGenerator>,
    accountant: Arc<TokenAccountant>,
}

impl TranscriptSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, accountant: Arc<TokenAccountant>) -> Self {
        Self {
            generator,
            accountant,
        }
    }

    /// Summarize a transcript, retaining the most recent
    /// `config.min_turns_to_keep` turns verbatim.
    ///
    /// Provider failures propagate; the caller owns the fallback policy. A
    /// transcript with nothing outside the retention window is a no-op: no
    /// provider call is made and the returned pair is `None`.
    pub async fn compact(
        &self,
        messages: &[RichMessage],
        session_id: &str,
        config: &CompactionConfig,
    ) -> Result<CompactionOutcome, CompactionError> {
        let tokens_before = self.accountant.count_total(messages);
        let boundary = protection_boundary(messages, config.min_turns_to_keep);
        if boundary == 0 {
            return Ok(noop_outcome(messages));
        }

        let rendered = render_transcript(messages);
        if rendered.trim().is_empty() {
            return Ok(noop_outcome(messages));
        }

        let summary = self
            .generator
            .generate(SUMMARIZATION_SYSTEM_PROMPT, &rendered, SUMMARY_MAX_OUTPUT_TOKENS)
            .await?;

        if summary.trim().is_empty() {
            // Never replace real history with nothing.
            tracing::warn!("provider returned an empty summary, skipping compaction");
            return Ok(noop_outcome(messages));
        }

        let retained = &messages[boundary..];

        let mut trigger = RichMessage::User(UserMessage {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            created_at: chrono::Utc::now(),
            tokens: 0,
            parts: vec![MessagePart::text(COMPACTION_TRIGGER_TEXT)],
            is_compaction_trigger: true,
        });
        let mut summary_msg = RichMessage::Assistant(AssistantMessage {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            created_at: chrono::Utc::now(),
            tokens: 0,
            parts: vec![MessagePart::text(summary)],
            is_summary: true,
            finish_reason: None,
            error: None,
        });
        let trigger_tokens = self.accountant.count_message(&trigger);
        trigger.set_tokens(trigger_tokens);
        let summary_tokens = self.accountant.count_message(&summary_msg);
        summary_msg.set_tokens(summary_tokens);

        let mut compacted = Vec::with_capacity(2 + retained.len());
        compacted.push(trigger.clone());
        compacted.push(summary_msg.clone());
        compacted.extend_from_slice(retained);

        let tokens_after = self.accountant.count_total(&compacted);
        let messages_compacted = messages.len() - retained.len();

        tracing::debug!(
            messages_compacted,
            tokens_before,
            tokens_after,
            "compacted transcript with generated summary"
        );

        Ok(CompactionOutcome {
            messages: compacted,
            trigger_message: Some(trigger),
            summary_message: Some(summary_msg),
            messages_compacted,
            tokens_saved: tokens_before.saturating_sub(tokens_after),
        })
    }
}

fn noop_outcome(messages: &[RichMessage]) -> CompactionOutcome {
    CompactionOutcome {
        messages: messages.to_vec(),
        trigger_message: None,
        summary_message: None,
        messages_compacted: 0,
        tokens_saved: 0,
    }
}

/// Whether a message carries anything worth summarizing. Errored assistant
/// messages with no text or tool-call content are noise.
fn has_summary_value(message: &RichMessage) -> bool {
    match message {
        RichMessage::Assistant(assistant) if assistant.error.is_some() => {
            assistant.parts.iter().any(|part| {
                matches!(
                    part,
                    MessagePart::Text { .. } | MessagePart::ToolCall { .. }
                )
            })
        }
        _ => true,
    }
}

/// Render the transcript to the flat text form sent to the provider.
fn render_transcript(messages: &[RichMessage]) -> String {
    let mut out = String::new();

    for message in messages.iter().filter(|m| has_summary_value(m)) {
        let role = match message {
            RichMessage::User(_) => "USER",
            RichMessage::Assistant(_) => "ASSISTANT",
            RichMessage::Tool(_) => "TOOL",
        };
        out.push_str(role);
        out.push_str(":\n");

        for part in message.parts() {
            match part {
                MessagePart::Text { text } | MessagePart::Reasoning { text } => {
                    out.push_str(text);
                    out.push('\n');
                }
                MessagePart::ToolCall {
                    tool_name, input, ..
                } => {
                    out.push_str(&format!("[Called {tool_name} with: {input}]\n"));
                }
                MessagePart::ToolResult {
                    tool_name,
                    output,
                    compacted_at,
                    ..
                } => {
                    if compacted_at.is_some() {
                        out.push_str(&format!("[{tool_name} result: cleared]\n"));
                    } else {
                        let rendered = truncate_chars(&output.to_string(), TOOL_RESULT_RENDER_LIMIT);
                        out.push_str(&format!("[{tool_name} result: {rendered}]\n"));
                    }
                }
                MessagePart::CompactionMarker { .. } => {
                    out.push_str("[Previous conversation summary]\n");
                }
                MessagePart::StepStart => {}
            }
        }
        out.push('\n');
    }

    out
}

/// Truncate at a character boundary, appending an ellipsis when shortened.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}
