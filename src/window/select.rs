//! Selection stage: greedy newest-first packing under budgets.
//!
//! Groups are considered from most recent to oldest. A group is taken
//! whole or not at all; once a group is refused for budget, the scan
//! stops — older content is strictly lower priority, so there is no
//! gap-filling past a refusal.

use super::budget::SizeEstimator;
use super::group::Group;
use tracing::trace;

/// Default maximum number of turns in a window, excluding the system turn.
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Default approximate-size budget for the whole window.
pub const DEFAULT_MAX_UNITS: usize = 100_000;

/// Default approximate-size ceiling for a single turn.
pub const DEFAULT_TURN_CEILING: usize = 30_000;

/// Budgets for the selection stage.
#[derive(Debug, Clone)]
pub struct SelectionLimits {
    /// Maximum number of turns, excluding the system turn.
    pub max_turns: usize,
    /// Maximum approximate size of the window, in estimator units.
    pub max_units: usize,
    /// Ceiling for any single turn. A group containing a turn above the
    /// ceiling is skipped so one oversized result can't crowd out the
    /// rest of the window — unless it would be the only group, in which
    /// case it is taken anyway.
    pub turn_ceiling: usize,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_units: DEFAULT_MAX_UNITS,
            turn_ceiling: DEFAULT_TURN_CEILING,
        }
    }
}

/// Walk groups newest to oldest, greedily accepting whole groups under
/// the budgets, then restore chronological order.
///
/// `reserved_units` is charged against the size budget before any group
/// is accepted; the system prompt's cost goes here so the window and the
/// prompt fit the budget together.
///
/// Incomplete tool groups are never selected, regardless of budget. The
/// newest selectable group is accepted even if it busts a budget, so a
/// history that has any sendable content always yields a non-empty
/// window.
pub fn select_groups(
    groups: &[Group],
    limits: &SelectionLimits,
    estimator: &SizeEstimator,
    reserved_units: usize,
) -> Vec<Group> {
    let mut accepted: Vec<Group> = Vec::new();
    let mut turn_count = 0usize;
    let mut units = reserved_units;

    for group in groups.iter().rev() {
        if group.has_tool_calls() && !group.is_complete() {
            trace!("skipping incomplete tool group ({} turns)", group.len());
            continue;
        }

        let group_units = estimator.turns_units(group.turns());

        if accepted.is_empty() {
            turn_count += group.len();
            units += group_units;
            accepted.push(group.clone());
            continue;
        }

        let oversized = group
            .turns()
            .iter()
            .any(|t| estimator.turn_units(t) > limits.turn_ceiling);
        if oversized {
            trace!("skipping group with oversized turn (~{group_units} units)");
            continue;
        }

        if turn_count + group.len() > limits.max_turns || units + group_units > limits.max_units {
            break;
        }

        turn_count += group.len();
        units += group_units;
        accepted.push(group.clone());
    }

    accepted.reverse();
    accepted
}
