//! Approximate size estimation for budget comparisons.
//!
//! Budget checks don't need exact token counts, only a cheap cost that is
//! monotonic in content length and consistent across calls, so that the
//! same history always trims the same way. The default maps characters to
//! units at a fixed ratio; callers with a calibrated ratio for their
//! model can override it.

use crate::Message;

/// Default characters per size unit (≈ one token for English text).
pub const DEFAULT_CHARS_PER_UNIT: f64 = 4.0;

/// Deterministic cost function over turn content.
///
/// A turn's cost is its content length divided by the configured
/// characters-per-unit ratio, rounded down; turns without content cost
/// nothing. The estimate is intentionally approximate — only monotonicity
/// and stability matter for budget comparisons.
#[derive(Debug, Clone)]
pub struct SizeEstimator {
    chars_per_unit: f64,
}

impl Default for SizeEstimator {
    fn default() -> Self {
        Self {
            chars_per_unit: DEFAULT_CHARS_PER_UNIT,
        }
    }
}

impl SizeEstimator {
    /// Create an estimator with the default ratio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the characters-per-unit ratio. Must be positive.
    pub fn with_chars_per_unit(mut self, ratio: f64) -> Self {
        self.chars_per_unit = ratio;
        self
    }

    /// Approximate size of one turn.
    pub fn turn_units(&self, turn: &Message) -> usize {
        turn.content
            .as_ref()
            .map_or(0, |content| (content.len() as f64 / self.chars_per_unit) as usize)
    }

    /// Approximate total size of a slice of turns.
    pub fn turns_units(&self, turns: &[Message]) -> usize {
        turns.iter().map(|t| self.turn_units(t)).sum()
    }

    /// Approximate size of a raw prompt string (the system prompt counts
    /// against the window budget too).
    pub fn prompt_units(&self, text: &str) -> usize {
        (text.len() as f64 / self.chars_per_unit) as usize
    }
}

/// Snapshot of what a window build kept and how much of the size budget
/// it consumed.
#[derive(Debug, Clone)]
pub struct WindowStats {
    /// Non-system turns in the input history.
    pub input_turns: usize,
    /// Turns in the output window, excluding the system turn.
    pub kept_turns: usize,
    /// Estimated size of the output, including the system prompt.
    pub estimated_units: usize,
    /// The size budget the window was built against.
    pub max_units: usize,
}

impl WindowStats {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "window: kept {}/{} turns, ~{} units ({} max)",
            self.kept_turns, self.input_turns, self.estimated_units, self.max_units,
        )
    }
}
