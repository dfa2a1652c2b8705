//! Grouping stage: partition the turn sequence into atomic units.
//!
//! The tool-calling contract says an assistant turn that issued tool
//! calls must be sent with all of its tool-result turns or not at all.
//! Grouping makes that unit explicit up front, so the later stages reason
//! about whole groups instead of individual turns and can never split an
//! exchange across the selection boundary.

use crate::{Message, MessageRole};
use std::collections::HashSet;

/// An atomic unit of the conversation: a single non-tool-invoking turn,
/// or an assistant turn with tool calls plus the tool-result turns
/// answering it.
#[derive(Debug, Clone)]
pub struct Group {
    turns: Vec<Message>,
    complete: bool,
}

impl Group {
    fn simple(turn: Message) -> Self {
        Self {
            turns: vec![turn],
            complete: true,
        }
    }

    /// Turns in this group, in conversation order.
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Number of turns in the group.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Whether the group starts with an assistant turn that issued tool
    /// calls.
    pub fn has_tool_calls(&self) -> bool {
        self.turns.first().is_some_and(Message::has_tool_calls)
    }

    /// A tool group is complete iff every declared call id was answered.
    /// Simple groups are always complete.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Consume the group, yielding its turns.
    pub fn into_turns(self) -> Vec<Message> {
        self.turns
    }
}

/// In-progress tool group during the forward scan.
struct OpenGroup {
    turns: Vec<Message>,
    declared: HashSet<String>,
    pending: HashSet<String>,
}

impl OpenGroup {
    fn start(assistant: Message) -> Self {
        let declared: HashSet<String> = assistant.call_ids().map(str::to_owned).collect();
        Self {
            pending: declared.clone(),
            declared,
            turns: vec![assistant],
        }
    }

    fn close(self) -> Group {
        Group {
            turns: self.turns,
            // An assistant declaring calls with no usable ids has nothing
            // to wait for and closes complete.
            complete: self.pending.is_empty(),
        }
    }
}

/// Partition a turn sequence into groups, covering every input turn
/// exactly once with no gaps or overlaps.
///
/// Expects system turns to be stripped beforehand — the system turn is
/// handled separately and always kept. A tool-result whose id matches no
/// declared call visible in the scan is an orphan: it closes the open
/// group (whatever its completeness) and stands alone as a simple group.
pub fn group_turns(turns: &[Message]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut open: Option<OpenGroup> = None;

    for turn in turns {
        if turn.has_tool_calls() {
            if let Some(g) = open.take() {
                groups.push(g.close());
            }
            open = Some(OpenGroup::start(turn.clone()));
            continue;
        }

        if turn.role == MessageRole::Tool {
            if let Some(g) = open.as_mut()
                && let Some(id) = turn.tool_call_id.as_deref()
                && g.declared.contains(id)
            {
                // First answer for an id satisfies it; later duplicates
                // stay in the group but do not re-trigger matching.
                g.pending.remove(id);
                g.turns.push(turn.clone());
                continue;
            }

            if let Some(g) = open.take() {
                groups.push(g.close());
            }
            groups.push(Group::simple(turn.clone()));
            continue;
        }

        // User turn or plain assistant reply.
        if let Some(g) = open.take() {
            groups.push(g.close());
        }
        groups.push(Group::simple(turn.clone()));
    }

    if let Some(g) = open.take() {
        groups.push(g.close());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;

    fn call(id: &str) -> ToolCall {
        ToolCall::new(id, "search", "{}")
    }

    #[test]
    fn simple_turns_each_form_a_group() {
        let turns = vec![
            Message::user("hi"),
            Message::assistant_text("hello"),
            Message::user("thanks"),
        ];
        let groups = group_turns(&turns);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.is_complete() && g.len() == 1));
        assert!(groups.iter().all(|g| !g.has_tool_calls()));
    }

    #[test]
    fn tool_exchange_forms_one_complete_group() {
        let turns = vec![
            Message::user("look this up"),
            Message::assistant_tool_calls(vec![call("t1"), call("t2")]),
            Message::tool_result("t1", "first"),
            Message::tool_result("t2", "second"),
            Message::assistant_text("done"),
        ];
        let groups = group_turns(&turns);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].len(), 3);
        assert!(groups[1].has_tool_calls());
        assert!(groups[1].is_complete());
    }

    #[test]
    fn missing_result_marks_group_incomplete() {
        let turns = vec![
            Message::assistant_tool_calls(vec![call("t1"), call("t2")]),
            Message::tool_result("t1", "only one"),
        ];
        let groups = group_turns(&turns);
        assert_eq!(groups.len(), 1);
        assert!(!groups[0].is_complete());
    }

    #[test]
    fn next_assistant_closes_incomplete_group() {
        let turns = vec![
            Message::assistant_tool_calls(vec![call("t1")]),
            Message::assistant_text("gave up"),
        ];
        let groups = group_turns(&turns);
        assert_eq!(groups.len(), 2);
        assert!(!groups[0].is_complete());
        assert!(groups[1].is_complete());
    }

    #[test]
    fn orphan_result_closes_group_and_stands_alone() {
        let turns = vec![
            Message::assistant_tool_calls(vec![call("t1")]),
            Message::tool_result("t1", "answer"),
            Message::tool_result("stale", "leftover from elsewhere"),
        ];
        let groups = group_turns(&turns);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].is_complete());
        assert_eq!(groups[1].len(), 1);
        assert!(groups[1].is_complete());
        assert!(!groups[1].has_tool_calls());
    }

    #[test]
    fn duplicate_results_stay_in_group_without_rematching() {
        let turns = vec![
            Message::assistant_tool_calls(vec![call("t1")]),
            Message::tool_result("t1", "answer"),
            Message::tool_result("t1", "retry of same call"),
        ];
        let groups = group_turns(&turns);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
        assert!(groups[0].is_complete());
    }

    #[test]
    fn calls_without_ids_are_complete_immediately() {
        let turns = vec![Message::assistant_tool_calls(vec![ToolCall::new("", "search", "{}")])];
        let groups = group_turns(&turns);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].is_complete());
    }

    #[test]
    fn result_without_id_is_an_orphan() {
        let mut orphan = Message::tool_result("x", "out");
        orphan.tool_call_id = None;
        let turns = vec![
            Message::assistant_tool_calls(vec![call("t1")]),
            orphan,
            Message::tool_result("t1", "answer"),
        ];
        let groups = group_turns(&turns);
        // The id-less result closes the tool group early, so the real
        // answer that follows is itself an orphan.
        assert_eq!(groups.len(), 3);
        assert!(!groups[0].is_complete());
    }

    #[test]
    fn covers_every_turn_exactly_once() {
        let turns = vec![
            Message::user("a"),
            Message::assistant_tool_calls(vec![call("t1")]),
            Message::tool_result("t1", "b"),
            Message::assistant_text("c"),
            Message::tool_result("stray", "d"),
        ];
        let groups = group_turns(&turns);
        let total: usize = groups.iter().map(Group::len).sum();
        assert_eq!(total, turns.len());
    }
}
