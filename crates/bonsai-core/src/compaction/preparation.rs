//! Context preparation: the single entry point sequencing overflow check,
//! prune, re-check, and summarization.
//!
//! The pipeline is linear with no branching loops. The common path is the
//! cheap early return when the transcript is under budget; the expensive
//! summarization step only runs when pruning could not resolve the overflow.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::compaction::counter::TokenAccountant;
use crate::compaction::pruner::{needs_pruning, prune_tool_outputs};
use crate::compaction::summarizer::{TextGenerator, TranscriptSummarizer};
use crate::compaction::types::{
    CompactionConfig, CompactionError, ContextPrepareResult, DebugCounters, PreparePhase,
    TokenReport,
};
use crate::convert::{to_rich_batch, to_wire_batch};
use crate::wire::WireMessage;

/// Caller-side telemetry hook fired at each phase transition. Must not
/// affect control flow.
pub type ProgressCallback = Box<dyn Fn(PreparePhase) + Send + Sync>;

/// Per-invocation options. All request-scoped state travels through this
/// struct; the engine keeps nothing at process scope.
pub struct PrepareOptions {
    pub session_id: String,
    pub model_id: String,
    /// Session-specific context length overriding the static model table.
    pub session_context_length: Option<u32>,
    pub config: CompactionConfig,
    /// Run the pipeline even when the transcript is under budget.
    pub force: bool,
    /// Cancels the summarization call; the transcript is only committed
    /// after the provider call fully resolves.
    pub cancel_token: CancellationToken,
    pub on_progress: Option<ProgressCallback>,
}

impl PrepareOptions {
    pub fn new(session_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            model_id: model_id.into(),
            session_context_length: None,
            config: CompactionConfig::default(),
            force: false,
            cancel_token: CancellationToken::new(),
            on_progress: None,
        }
    }

    pub fn with_config(mut self, config: CompactionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_session_context_length(mut self, length: u32) -> Self {
        self.session_context_length = Some(length);
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_progress(
        mut self,
        callback: impl Fn(PreparePhase) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    fn progress(&self, phase: PreparePhase) {
        if let Some(callback) = &self.on_progress {
            callback(phase);
        }
    }
}

/// Prepared transcript in wire form plus the full report.
pub struct PreparedForLlm {
    pub messages: Vec<WireMessage>,
    pub report: ContextPrepareResult,
}

/// Sequences the compaction pipeline for one transcript.
pub struct ContextPreparer {
    accountant: Arc<TokenAccountant>,
    summarizer: TranscriptSummarizer,
}

impl ContextPreparer {
    pub fn new(accountant: Arc<TokenAccountant>, generator: Arc<dyn TextGenerator>) -> Self {
        let summarizer = TranscriptSummarizer::new(generator, accountant.clone());
        Self {
            accountant,
            summarizer,
        }
    }

    /// Run the pipeline over a wire transcript, returning the rich-model
    /// result and a report.
    ///
    /// Summarization failures fall back to the pruned-but-unsummarized
    /// transcript; only cancellation surfaces as an error, with the caller's
    /// transcript left unmodified.
    pub async fn prepare_context(
        &self,
        wire_messages: &[WireMessage],
        options: &PrepareOptions,
    ) -> Result<ContextPrepareResult, CompactionError> {
        let messages = to_rich_batch(wire_messages, &options.session_id);
        let config = &options.config;

        options.progress(PreparePhase::CheckingOverflow);
        let check = self.accountant.check_overflow(
            &messages,
            &options.model_id,
            Some(config.output_reserve),
            options.session_context_length,
        );
        let tokens_before = check.current_tokens;

        if !check.is_overflow && !options.force {
            return Ok(ContextPrepareResult {
                messages,
                was_pruned: false,
                was_compacted: false,
                tokens: TokenReport::flat(tokens_before),
                debug: DebugCounters::default(),
            });
        }

        tracing::debug!(
            session_id = %options.session_id,
            current = check.current_tokens,
            available = check.available_tokens,
            usage_percent = check.usage_percentage(),
            force = options.force,
            "context needs preparation"
        );

        let mut working = messages;
        let mut was_pruned = false;
        let mut debug = DebugCounters::default();
        let mut after_prune = tokens_before;

        if needs_pruning(&working, config, &self.accountant) {
            options.progress(PreparePhase::Pruning);
            let outcome = prune_tool_outputs(&working, config, &self.accountant);
            if outcome.outputs_pruned > 0 {
                was_pruned = true;
                debug.pruned_outputs = outcome.outputs_pruned;
                debug.removed_tools = outcome.pruned_tools;
                working = outcome.messages;
                after_prune = self.accountant.count_total(&working);
            }
        }

        let recheck = self.accountant.check_overflow(
            &working,
            &options.model_id,
            Some(config.output_reserve),
            options.session_context_length,
        );
        if !recheck.is_overflow && !options.force {
            return Ok(ContextPrepareResult {
                messages: working,
                was_pruned,
                was_compacted: false,
                tokens: TokenReport {
                    before: tokens_before,
                    after_prune,
                    after_compact: after_prune,
                    final_tokens: after_prune,
                },
                debug,
            });
        }

        options.progress(PreparePhase::Summarizing);
        let compacted = tokio::select! {
            biased;
            _ = options.cancel_token.cancelled() => {
                return Err(CompactionError::Cancelled);
            }
            outcome = self.summarizer.compact(&working, &options.session_id, config) => outcome,
        };

        let (working, was_compacted, after_compact) = match compacted {
            Ok(outcome) if outcome.summary_message.is_some() => {
                debug.compacted_messages = outcome.messages_compacted;
                let after = self.accountant.count_total(&outcome.messages);
                (outcome.messages, true, after)
            }
            Ok(outcome) => (outcome.messages, false, after_prune),
            Err(error) => {
                // A functional but possibly over-budget transcript beats a
                // hard failure; surface the problem through telemetry only.
                tracing::warn!(
                    session_id = %options.session_id,
                    %error,
                    "summarization failed, returning unsummarized transcript"
                );
                return Ok(ContextPrepareResult {
                    messages: working,
                    was_pruned,
                    was_compacted: false,
                    tokens: TokenReport {
                        before: tokens_before,
                        after_prune,
                        after_compact: after_prune,
                        final_tokens: after_prune,
                    },
                    debug,
                });
            }
        };

        Ok(ContextPrepareResult {
            messages: working,
            was_pruned,
            was_compacted,
            tokens: TokenReport {
                before: tokens_before,
                after_prune,
                after_compact,
                final_tokens: after_compact,
            },
            debug,
        })
    }

    /// [`Self::prepare_context`] with the final conversion back to wire
    /// format applied, for callers that do not need the rich model.
    pub async fn prepare_context_for_llm(
        &self,
        wire_messages: &[WireMessage],
        options: &PrepareOptions,
    ) -> Result<PreparedForLlm, CompactionError> {
        let report = self.prepare_context(wire_messages, options).await?;
        let messages = to_wire_batch(&report.messages);
        Ok(PreparedForLlm { messages, report })
    }
}
