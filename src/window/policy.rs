//! End-to-end window assembly: strip, group, select, validate, prepend.

use super::budget::{SizeEstimator, WindowStats};
use super::group::{Group, group_turns};
use super::select::{SelectionLimits, select_groups};
use super::validate::validate_window;
use crate::{Message, MessageRole};
use tracing::debug;

/// Policy for building bounded, contract-valid conversation windows.
///
/// Each call to [`window()`](Self::window) is an independent, pure
/// transformation of the full history: the system turn is always kept,
/// the output fits the turn-count and approximate-size budgets, and no
/// tool exchange is ever split. The caller keeps appending to the full
/// history; the policy is applied fresh before every model request.
///
/// # Example
///
/// ```
/// use context_window::{Message, WindowPolicy};
///
/// let policy = WindowPolicy::new()
///     .with_max_turns(10)
///     .with_max_units(100_000)
///     .with_turn_ceiling(30_000);
///
/// let history: Vec<Message> = (0..50).map(|i| Message::user(format!("turn {i}"))).collect();
/// let window = policy.window("You are a research agent.", &history);
///
/// assert_eq!(window.len(), 11); // system turn + the 10 most recent
/// ```
#[derive(Debug, Clone, Default)]
pub struct WindowPolicy {
    limits: SelectionLimits,
    estimator: SizeEstimator,
}

impl WindowPolicy {
    /// Create a policy with the documented defaults: 10 turns, 100,000
    /// units, 30,000-unit per-turn ceiling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of turns (excluding the system turn).
    pub fn with_max_turns(mut self, n: usize) -> Self {
        self.limits.max_turns = n;
        self
    }

    /// Set the approximate-size budget for the whole window.
    pub fn with_max_units(mut self, units: usize) -> Self {
        self.limits.max_units = units;
        self
    }

    /// Set the approximate-size ceiling for a single turn.
    pub fn with_turn_ceiling(mut self, units: usize) -> Self {
        self.limits.turn_ceiling = units;
        self
    }

    /// Replace the size estimator (e.g. with a calibrated ratio).
    pub fn with_estimator(mut self, estimator: SizeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// The selection budgets this policy applies.
    pub fn limits(&self) -> &SelectionLimits {
        &self.limits
    }

    /// Build the window: the system turn followed by the most recent
    /// groups that fit the budgets, in chronological order.
    ///
    /// System turns inside `history` are stripped; the system instruction
    /// is taken from `system_prompt` alone and its size is charged
    /// against the budget. If nothing else survives, the window is just
    /// the system turn.
    pub fn window(&self, system_prompt: &str, history: &[Message]) -> Vec<Message> {
        self.window_with_stats(system_prompt, history).0
    }

    /// Same as [`window()`](Self::window), additionally returning a
    /// [`WindowStats`] snapshot of what was kept.
    pub fn window_with_stats(
        &self,
        system_prompt: &str,
        history: &[Message],
    ) -> (Vec<Message>, WindowStats) {
        let stripped: Vec<Message> = history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect();

        let groups = group_turns(&stripped);
        let reserved = self.estimator.prompt_units(system_prompt);
        let selected = select_groups(&groups, &self.limits, &self.estimator, reserved);

        let flat: Vec<Message> = selected.into_iter().flat_map(Group::into_turns).collect();
        let validated = validate_window(flat);

        let stats = WindowStats {
            input_turns: stripped.len(),
            kept_turns: validated.len(),
            estimated_units: reserved + self.estimator.turns_units(&validated),
            max_units: self.limits.max_units,
        };
        debug!("{}", stats.to_log_string());

        let mut window = Vec::with_capacity(validated.len() + 1);
        window.push(Message::system(system_prompt));
        window.extend(validated);
        (window, stats)
    }
}
