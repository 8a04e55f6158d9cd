//! Shared types for the compaction pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::RichMessage;

/// Default minimum token savings for a prune pass to be worth applying.
pub const DEFAULT_PRUNE_MINIMUM: u32 = 20_000;
/// Default token allowance of recent tool outputs protected from pruning.
pub const DEFAULT_PRUNE_PROTECT: u32 = 40_000;
/// Default token reserve for the model's next response.
pub const DEFAULT_OUTPUT_RESERVE: u32 = 4_096;
/// Default number of most recent turns never touched by pruning or compaction.
pub const DEFAULT_MIN_TURNS_TO_KEEP: usize = 2;

/// Policy knobs for the pruning and summarization passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// A prune pass saving fewer tokens than this is discarded.
    pub prune_minimum: u32,
    /// Token budget of most-recent tool outputs the pruner must not touch.
    pub prune_protect: u32,
    /// Tokens reserved for the model's output when checking overflow.
    pub output_reserve: u32,
    /// Most recent turns kept verbatim by both passes.
    pub min_turns_to_keep: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            prune_minimum: DEFAULT_PRUNE_MINIMUM,
            prune_protect: DEFAULT_PRUNE_PROTECT,
            output_reserve: DEFAULT_OUTPUT_RESERVE,
            min_turns_to_keep: DEFAULT_MIN_TURNS_TO_KEEP,
        }
    }
}

/// Result of a prune pass. When the pass was discarded for saving too little,
/// `messages` is an unchanged copy and all counters are zero.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub messages: Vec<RichMessage>,
    pub outputs_pruned: usize,
    pub tokens_saved: u32,
    /// Names of the tools whose outputs were cleared, deduplicated.
    pub pruned_tools: Vec<String>,
}

/// Non-mutating estimate of what a prune pass could reclaim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneSavings {
    /// Tokens that would be reclaimed by clearing everything past the
    /// protect budget.
    pub prunable_tokens: u32,
    /// Total tokens of all unprotected, not-yet-cleared tool outputs.
    pub total_tool_tokens: u32,
    /// Number of outputs that would be cleared.
    pub outputs_count: usize,
}

/// Result of a summarization pass.
///
/// `trigger_message` and `summary_message` are `None` when the pass was a
/// no-op (nothing outside the retention window to summarize); `messages` is
/// then an unchanged copy.
#[derive(Debug, Clone)]
pub struct CompactionOutcome {
    pub messages: Vec<RichMessage>,
    pub trigger_message: Option<RichMessage>,
    pub summary_message: Option<RichMessage>,
    pub messages_compacted: usize,
    pub tokens_saved: u32,
}

/// Pipeline phase reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreparePhase {
    CheckingOverflow,
    Pruning,
    Summarizing,
}

impl PreparePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckingOverflow => "checking-overflow",
            Self::Pruning => "pruning",
            Self::Summarizing => "summarizing",
        }
    }
}

/// Token counts at each pipeline stage. Stages that did not run repeat the
/// previous stage's count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenReport {
    pub before: u32,
    pub after_prune: u32,
    pub after_compact: u32,
    #[serde(rename = "final")]
    pub final_tokens: u32,
}

impl TokenReport {
    /// Report for a pipeline that changed nothing.
    pub fn flat(tokens: u32) -> Self {
        Self {
            before: tokens,
            after_prune: tokens,
            after_compact: tokens,
            final_tokens: tokens,
        }
    }
}

/// Counters for caller-side debugging and telemetry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DebugCounters {
    pub pruned_outputs: usize,
    pub compacted_messages: usize,
    pub removed_tools: Vec<String>,
}

/// Full report from one context-preparation invocation.
#[derive(Debug, Clone)]
pub struct ContextPrepareResult {
    pub messages: Vec<RichMessage>,
    pub was_pruned: bool,
    pub was_compacted: bool,
    pub tokens: TokenReport,
    pub debug: DebugCounters,
}

#[derive(Debug, Error)]
pub enum CompactionError {
    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_policy_constants() {
        let config = CompactionConfig::default();
        assert_eq!(config.prune_minimum, 20_000);
        assert_eq!(config.prune_protect, 40_000);
        assert_eq!(config.output_reserve, 4_096);
        assert_eq!(config.min_turns_to_keep, 2);
    }

    #[test]
    fn token_report_serializes_final_field_name() {
        let report = TokenReport::flat(100);
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(value["final"], 100);
        assert_eq!(value["before"], 100);
    }

    #[test]
    fn phase_names_are_kebab_case() {
        assert_eq!(PreparePhase::CheckingOverflow.as_str(), "checking-overflow");
        assert_eq!(PreparePhase::Pruning.as_str(), "pruning");
        assert_eq!(PreparePhase::Summarizing.as_str(), "summarizing");
    }
}
