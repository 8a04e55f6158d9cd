//! Context-compaction engine: keeps a growing conversation inside a language
//! model's context-window budget.
//!
//! The pipeline is check → prune → re-check → summarize. Token accounting is
//! exact over a typed message/part model, pruning reversibly clears old tool
//! outputs behind a recency and token protection window, and summarization
//! replaces older history with a synthetic trigger/summary turn.

pub mod compaction;
pub mod convert;
pub mod message;
pub mod store;
pub mod wire;

pub use compaction::counter::{
    HeuristicTokenizer, OverflowCheck, TokenAccountant, Tokenizer,
};
pub use compaction::limits::{ModelLimits, ModelLimitsRegistry};
pub use compaction::preparation::{ContextPreparer, PrepareOptions, PreparedForLlm};
pub use compaction::pruner::{estimate_prune_savings, needs_pruning, prune_tool_outputs};
pub use compaction::summarizer::{TextGenerator, TranscriptSummarizer};
pub use compaction::types::{
    CompactionConfig, CompactionError, CompactionOutcome, ContextPrepareResult, DebugCounters,
    PreparePhase, PruneOutcome, PruneSavings, TokenReport,
};
pub use convert::{to_rich, to_rich_batch, to_wire, to_wire_batch};
pub use message::{
    AssistantMessage, MessagePart, RichMessage, ToolMessage, UserMessage,
    PRUNED_OUTPUT_PLACEHOLDER,
};
pub use store::{JsonlTranscriptStore, TranscriptStore};
pub use wire::{WireContent, WireMessage, WirePart, WireRole};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
