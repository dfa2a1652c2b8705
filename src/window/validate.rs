//! Validation stage: defensive backstop on the flattened selection.
//!
//! Grouping and selection already keep tool exchanges atomic in the
//! normal path. This pass re-checks the invariant on the final sequence
//! so that malformed input (two assistant turns sharing a call id, stale
//! results spliced into a transcript) can never leak a broken tool-call
//! contract to the model.

use crate::{Message, MessageRole};
use std::collections::HashSet;
use tracing::debug;

/// Re-scan a chronologically-ordered turn sequence and drop anything
/// that violates the tool-calling contract.
///
/// An assistant turn with tool calls survives only if every declared id
/// is answered inside the contiguous run of tool-result turns that
/// immediately follows it; a surviving assistant carries along every
/// result in that run answering one of its ids, duplicates included. A
/// failing assistant is dropped together with its trailing matching
/// results. Any tool-result not consumed this way has no issuer in the
/// output and is dropped as an orphan.
pub fn validate_window(turns: Vec<Message>) -> Vec<Message> {
    let mut kept: Vec<Message> = Vec::with_capacity(turns.len());
    let mut i = 0;

    while i < turns.len() {
        let turn = &turns[i];

        if turn.has_tool_calls() {
            let required: HashSet<&str> = turn.call_ids().collect();

            // Contiguous run of tool-result turns after the assistant.
            let mut run_end = i + 1;
            while run_end < turns.len() && turns[run_end].role == MessageRole::Tool {
                run_end += 1;
            }
            let run = &turns[i + 1..run_end];

            let answered: HashSet<&str> = run
                .iter()
                .filter_map(|t| t.tool_call_id.as_deref())
                .filter(|id| required.contains(id))
                .collect();

            if answered == required {
                kept.push(turn.clone());
                for result in run {
                    if result
                        .tool_call_id
                        .as_deref()
                        .is_some_and(|id| required.contains(id))
                    {
                        kept.push(result.clone());
                    }
                }
            } else {
                debug!(
                    "dropping assistant turn with {} unanswered tool call(s)",
                    required.len() - answered.len(),
                );
            }

            // Results in the run answering some other assistant have no
            // issuer adjacent to them here; they fall away with the run.
            i = run_end;
            continue;
        }

        if turn.role == MessageRole::Tool {
            debug!(
                "dropping orphan tool result (id {:?})",
                turn.tool_call_id.as_deref(),
            );
            i += 1;
            continue;
        }

        kept.push(turn.clone());
        i += 1;
    }

    kept
}
