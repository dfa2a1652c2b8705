//! Conversation window assembly: grouping, selection, and validation.
//!
//! A request to a tool-calling model is bounded two ways: by a maximum
//! turn count and by an approximate size budget. This module turns the
//! full conversation history into a suffix that fits both bounds while
//! keeping tool exchanges intact:
//!
//! 1. **[`group`]** — partitions turns into atomic groups. An assistant
//!    turn that issued tool calls and the tool-result turns answering it
//!    form one group that is included or excluded as a whole.
//!
//! 2. **[`select`]** — walks groups newest to oldest, greedily accepting
//!    whole groups under the budgets. Tool groups with unanswered calls
//!    are never selected; groups containing a single oversized turn are
//!    skipped so one huge result can't crowd out the rest of the window.
//!
//! 3. **[`validate`]** — a defensive re-scan of the flattened selection
//!    that drops any assistant turn whose calls are not all answered in
//!    the output, and any tool-result turn left without its issuer.
//!
//! 4. **[`budget`]** — the pluggable [`SizeEstimator`] cost function and
//!    the [`WindowStats`] usage snapshot.
//!
//! [`WindowPolicy`] wires the stages together and prepends the system
//! turn, which is always kept.

pub mod budget;
pub mod group;
pub mod policy;
pub mod select;
pub mod validate;

// Re-export commonly used items at the module level.
pub use budget::{DEFAULT_CHARS_PER_UNIT, SizeEstimator, WindowStats};
pub use group::{Group, group_turns};
pub use policy::WindowPolicy;
pub use select::{SelectionLimits, select_groups};
pub use validate::validate_window;
