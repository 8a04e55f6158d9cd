//! Context compaction: token accounting, tool-output pruning, and
//! LLM-assisted summarization behind a single preparation entry point.
//!
//! # Key Components
//!
//! - [`types`]: configuration, reports, and the error type
//! - [`counter`]: tokenizer seam and the token accountant
//! - [`limits`]: model context-window limits registry
//! - [`pruner`]: reversible eviction of old tool outputs
//! - [`summarizer`]: irreversible summarization into a trigger/summary pair
//! - [`preparation`]: the orchestrator sequencing check, prune, summarize

pub mod counter;
pub mod limits;
pub mod preparation;
pub mod pruner;
pub mod summarizer;
pub mod types;

pub use counter::{HeuristicTokenizer, OverflowCheck, TokenAccountant, Tokenizer};
pub use limits::{ModelLimits, ModelLimitsRegistry};
pub use preparation::{ContextPreparer, PrepareOptions, PreparedForLlm};
pub use pruner::{estimate_prune_savings, needs_pruning, prune_tool_outputs};
pub use summarizer::{TextGenerator, TranscriptSummarizer};
pub use types::{
    CompactionConfig, CompactionError, CompactionOutcome, ContextPrepareResult, DebugCounters,
    PreparePhase, PruneOutcome, PruneSavings, TokenReport,
};
