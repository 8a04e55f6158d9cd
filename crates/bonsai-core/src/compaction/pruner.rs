//! Reversible eviction of old tool outputs.
//!
//! A backward scan protects the most recent turns and a token allowance of
//! recent tool outputs; everything older is cleared to a placeholder. The
//! pass is two-phase: candidates and savings are computed against the
//! immutable input, and mutation is applied to a fresh copy only when the
//! savings clear the configured minimum.

use chrono::Utc;

use crate::compaction::counter::TokenAccountant;
use crate::compaction::types::{CompactionConfig, PruneOutcome, PruneSavings};
use crate::message::{MessagePart, RichMessage};

/// Index of the first protected message: everything from the
/// `min_turns`-th most recent user message onward is untouchable.
///
/// Returns `messages.len()` when nothing is protected and `0` when there are
/// fewer user turns than the protection window asks for.
pub(crate) fn protection_boundary(messages: &[RichMessage], min_turns: usize) -> usize {
    if min_turns == 0 {
        return messages.len();
    }
    let mut turns = 0;
    for (i, message) in messages.iter().enumerate().rev() {
        if message.is_user() {
            turns += 1;
            if turns >= min_turns {
                return i;
            }
        }
    }
    0
}

struct PruneCandidate {
    message_index: usize,
    part_index: usize,
    tool_name: String,
    tokens: u32,
}

/// Scan the unprotected region newest-to-oldest, accumulating tool-output
/// tokens and collecting the parts past the protect budget.
///
/// The scan stops at a prior summary message: content before an existing
/// summary has already been accounted for and is never re-scanned.
fn scan_candidates(
    messages: &[RichMessage],
    config: &CompactionConfig,
    accountant: &TokenAccountant,
) -> (Vec<PruneCandidate>, u32) {
    let boundary = protection_boundary(messages, config.min_turns_to_keep);
    let mut candidates = Vec::new();
    let mut total_tool_tokens: u32 = 0;

    for index in (0..boundary).rev() {
        let message = &messages[index];
        if message.is_summary() {
            break;
        }
        let RichMessage::Tool(tool) = message else {
            continue;
        };

        for (part_index, part) in tool.parts.iter().enumerate().rev() {
            match part {
                MessagePart::ToolResult {
                    compacted_at: None,
                    tool_name,
                    ..
                } => {
                    let tokens = accountant.count_part(part);
                    total_tool_tokens = total_tool_tokens.saturating_add(tokens);
                    if total_tool_tokens > config.prune_protect {
                        candidates.push(PruneCandidate {
                            message_index: index,
                            part_index,
                            tool_name: tool_name.clone(),
                            tokens,
                        });
                    }
                }
                MessagePart::ToolResult { .. } => {
                    // Already cleared by an earlier pass.
                }
                other => {
                    tracing::warn!(
                        part = ?other,
                        "skipping non-result part in tool message during prune scan"
                    );
                }
            }
        }
    }

    (candidates, total_tool_tokens)
}

/// Clear old tool outputs, returning a new transcript and a report.
///
/// The input is never mutated. A pass that would save fewer than
/// `config.prune_minimum` tokens is discarded wholesale: the returned
/// transcript is an unchanged copy and every counter is zero.
pub fn prune_tool_outputs(
    messages: &[RichMessage],
    config: &CompactionConfig,
    accountant: &TokenAccountant,
) -> PruneOutcome {
    let (candidates, _) = scan_candidates(messages, config, accountant);
    let placeholder_tokens =
        accountant.count_text(crate::message::PRUNED_OUTPUT_PLACEHOLDER);

    let tokens_saved: u32 = candidates
        .iter()
        .map(|c| c.tokens.saturating_sub(placeholder_tokens))
        .sum();

    if candidates.is_empty() || tokens_saved < config.prune_minimum {
        return PruneOutcome {
            messages: messages.to_vec(),
            outputs_pruned: 0,
            tokens_saved: 0,
            pruned_tools: Vec::new(),
        };
    }

    let mut pruned = messages.to_vec();
    let now = Utc::now();
    let mut pruned_tools: Vec<String> = Vec::new();

    for candidate in &candidates {
        let message = &mut pruned[candidate.message_index];
        let Some(part) = message.parts_mut().get_mut(candidate.part_index) else {
            continue;
        };
        if part.clear_tool_output(now, candidate.tokens)
            && !pruned_tools.contains(&candidate.tool_name)
        {
            pruned_tools.push(candidate.tool_name.clone());
        }
    }

    // Refresh the cached token counts on every message we touched.
    for candidate in &candidates {
        let recount = accountant.count_message(&pruned[candidate.message_index]);
        pruned[candidate.message_index].set_tokens(recount);
    }

    pruned_tools.sort();

    tracing::debug!(
        outputs = candidates.len(),
        tokens_saved,
        "pruned old tool outputs"
    );

    PruneOutcome {
        messages: pruned,
        outputs_pruned: candidates.len(),
        tokens_saved,
        pruned_tools,
    }
}

/// Whether a prune pass is worth attempting: the unprotected tool-output
/// mass must exceed the protect budget by at least the minimum savings.
pub fn needs_pruning(
    messages: &[RichMessage],
    config: &CompactionConfig,
    accountant: &TokenAccountant,
) -> bool {
    let (_, total_tool_tokens) = scan_candidates(messages, config, accountant);
    total_tool_tokens > config.prune_protect.saturating_add(config.prune_minimum)
}

/// Non-mutating estimate of what a prune pass could reclaim.
pub fn estimate_prune_savings(
    messages: &[RichMessage],
    config: &CompactionConfig,
    accountant: &TokenAccountant,
) -> PruneSavings {
    let (candidates, total_tool_tokens) = scan_candidates(messages, config, accountant);
    let placeholder_tokens =
        accountant.count_text(crate::message::PRUNED_OUTPUT_PLACEHOLDER);

    PruneSavings {
        prunable_tokens: candidates
            .iter()
            .map(|c| c.tokens.saturating_sub(placeholder_tokens))
            .sum(),
        total_tool_tokens,
        outputs_count: candidates.len(),
    }
}
