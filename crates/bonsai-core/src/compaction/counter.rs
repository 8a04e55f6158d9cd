//! Token accounting over the rich message model.
//!
//! One tokenizer is used for every part type so the budget arithmetic stays
//! coherent. Counting never fails: unknown models resolve to conservative
//! default limits and the accountant never mutates a message.

use std::sync::Arc;

use crate::compaction::limits::{ModelLimits, ModelLimitsRegistry};
use crate::message::{MessagePart, RichMessage, PRUNED_OUTPUT_PLACEHOLDER};

/// Fixed per-message overhead modeling the wire-protocol envelope (role,
/// separators) the provider bills for.
pub const MESSAGE_OVERHEAD_TOKENS: u32 = 4;

/// Fixed cost of an internal step boundary marker.
pub const STEP_START_TOKENS: u32 = 2;

/// Overflow triggers at this fraction of the usable budget, leaving headroom
/// for the next turn's growth before the next check fires.
pub const DEFAULT_OVERFLOW_THRESHOLD: f64 = 0.90;

/// Trait for token counting implementations.
pub trait Tokenizer: Send + Sync {
    fn count(&self, text: &str) -> u32;
}

/// Character-based token estimation: chars divided by a per-token ratio,
/// inflated by a safety margin. Intentionally conservative so budgets are
/// never underestimated.
#[derive(Debug, Clone)]
pub struct HeuristicTokenizer {
    chars_per_token: f64,
    safety_margin: f64,
}

impl HeuristicTokenizer {
    pub fn new(chars_per_token: f64, safety_margin: f64) -> Self {
        Self {
            chars_per_token,
            safety_margin,
        }
    }

    /// Default parameters: chars/4 plus a 10% margin.
    pub fn with_defaults() -> Self {
        Self::new(4.0, 1.1)
    }
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as f64;
        ((chars / self.chars_per_token) * self.safety_margin).ceil() as u32
    }
}

/// Result of an overflow check against a model's usable budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverflowCheck {
    pub is_overflow: bool,
    pub current_tokens: u32,
    /// Usable input budget: context limit minus the output reserve.
    pub available_tokens: u32,
    pub model_limit: u32,
    pub output_reserve: u32,
}

impl OverflowCheck {
    /// Percentage of the usable budget currently consumed.
    pub fn usage_percentage(&self) -> f64 {
        if self.available_tokens == 0 {
            return 0.0;
        }
        (self.current_tokens as f64 / self.available_tokens as f64) * 100.0
    }
}

/// Counts tokens for parts, messages, and whole transcripts, and answers
/// overflow questions against the model-limit registry.
pub struct TokenAccountant {
    tokenizer: Arc<dyn Tokenizer>,
    limits: ModelLimitsRegistry,
    overflow_threshold: f64,
}

impl TokenAccountant {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            tokenizer,
            limits: ModelLimitsRegistry::new(),
            overflow_threshold: DEFAULT_OVERFLOW_THRESHOLD,
        }
    }

    /// Accountant with the heuristic tokenizer and built-in limits.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(HeuristicTokenizer::with_defaults()))
    }

    pub fn with_limits(mut self, limits: ModelLimitsRegistry) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_overflow_threshold(mut self, threshold: f64) -> Self {
        self.overflow_threshold = threshold;
        self
    }

    pub fn count_text(&self, text: &str) -> u32 {
        self.tokenizer.count(text)
    }

    /// Count one part. Cleared tool results cost only their placeholder.
    pub fn count_part(&self, part: &MessagePart) -> u32 {
        match part {
            MessagePart::Text { text } | MessagePart::Reasoning { text } => {
                self.tokenizer.count(text)
            }
            MessagePart::ToolCall {
                tool_name, input, ..
            } => self
                .tokenizer
                .count(tool_name)
                .saturating_add(self.tokenizer.count(&input.to_string())),
            MessagePart::ToolResult {
                output,
                compacted_at,
                ..
            } => {
                if compacted_at.is_some() {
                    self.tokenizer.count(PRUNED_OUTPUT_PLACEHOLDER)
                } else {
                    self.tokenizer.count(&output.to_string())
                }
            }
            MessagePart::StepStart => STEP_START_TOKENS,
            MessagePart::CompactionMarker { summary, .. } => self.tokenizer.count(summary),
        }
    }

    /// Count one message: parts sum plus the fixed envelope overhead.
    pub fn count_message(&self, message: &RichMessage) -> u32 {
        message
            .parts()
            .iter()
            .fold(0u32, |acc, part| acc.saturating_add(self.count_part(part)))
            .saturating_add(MESSAGE_OVERHEAD_TOKENS)
    }

    pub fn count_total(&self, messages: &[RichMessage]) -> u32 {
        messages
            .iter()
            .fold(0u32, |acc, m| acc.saturating_add(self.count_message(m)))
    }

    /// Resolve limits for a model, honoring a session-specific context
    /// length override when present.
    pub fn model_limits(&self, model_id: &str, session_override: Option<u32>) -> ModelLimits {
        let mut limits = self.limits.resolve(model_id);
        if let Some(context_limit) = session_override {
            limits.context_limit = context_limit;
        }
        limits
    }

    /// Check a transcript against a model's usable budget.
    ///
    /// The reserve defaults to the model's own output ceiling unless the
    /// caller supplies one.
    pub fn check_overflow(
        &self,
        messages: &[RichMessage],
        model_id: &str,
        output_reserve: Option<u32>,
        session_override: Option<u32>,
    ) -> OverflowCheck {
        let limits = self.model_limits(model_id, session_override);
        let reserve = output_reserve.unwrap_or(limits.max_output);
        let available = limits.context_limit.saturating_sub(reserve);
        let current = self.count_total(messages);
        let threshold = (available as f64 * self.overflow_threshold) as u32;

        OverflowCheck {
            is_overflow: current > threshold,
            current_tokens: current,
            available_tokens: available,
            model_limit: limits.context_limit,
            output_reserve: reserve,
        }
    }
}
