//! Bounded, tool-call-safe conversation windows for LLM agents.
//!
//! As an agent loop runs, the full conversation history grows without
//! bound, but each request to the model must fit a maximum turn count and
//! an approximate size budget. [`WindowPolicy`] selects a suffix of the
//! history that fits both budgets, always keeps the system instruction,
//! and never violates the tool-calling contract: an assistant turn that
//! issued tool calls is sent with *all* of its tool-result turns, or not
//! at all.
//!
//! The transformation is pure and deterministic. It never calls a model,
//! never executes tools, and holds no state between invocations. The
//! caller owns the full, untruncated history and appends each exchange to
//! it; this crate only decides what subset of that history to send.
//!
//! # Example
//!
//! ```
//! use context_window::{Message, WindowPolicy};
//!
//! let history = vec![
//!     Message::user("What's in src/main.rs?"),
//!     Message::assistant_text("It's the CLI entry point."),
//! ];
//!
//! let policy = WindowPolicy::new();
//! let window = policy.window("You are a coding assistant.", &history);
//!
//! assert_eq!(window.len(), 3); // system turn + both history turns
//! ```
//!
//! # Pipeline
//!
//! [`WindowPolicy::window`] runs three sequential stages over the history
//! (system turns stripped out first, then re-prepended at the end):
//!
//! 1. **[`window::group`]** — partitions turns into atomic groups: a
//!    single non-tool-invoking turn, or an assistant turn with tool calls
//!    plus the tool-result turns answering it.
//! 2. **[`window::select`]** — walks groups newest to oldest, greedily
//!    accepting whole groups under the turn-count and size budgets and
//!    skipping tool groups with unanswered calls.
//! 3. **[`window::validate`]** — a defensive re-scan that drops any
//!    assistant turn whose calls are not all answered in the output, and
//!    any tool-result turn left without its issuing assistant turn.
//!
//! If nothing survives, the window is just the system turn — callers
//! should treat that as "ask the model with no history", not an error.

pub mod window;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use window::WindowPolicy;

// ── Message types ──────────────────────────────────────────────────

/// Role of a turn in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// One turn of the conversation, in OpenAI chat-completions shape.
///
/// Serialization skips absent optional fields, so a window built from
/// these is directly usable as the `messages` array of a request payload.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Message {
    pub role: MessageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Whether this is an assistant turn that issued at least one tool call.
    pub fn has_tool_calls(&self) -> bool {
        self.role == MessageRole::Assistant
            && self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }

    /// Ids of the tool calls this turn declared. Empty ids are skipped:
    /// a call without an id has nothing to wait for.
    pub fn call_ids(&self) -> impl Iterator<Item = &str> {
        self.tool_calls
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|call| call.id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Normalize a loosely-shaped JSON message into a [`Message`].
    ///
    /// Agent frontends and persisted transcripts are not always
    /// wire-exact: tool calls may be flat `{id, name, arguments}` objects
    /// instead of the nested function-calling shape, arguments may be
    /// objects instead of JSON strings, the role may be missing entirely.
    /// This constructor folds all of that into the canonical shape so the
    /// windowing stages never branch on raw shape again.
    ///
    /// Never fails: an unknown role becomes `user`, non-string content is
    /// rendered as its JSON text, and tool-call entries without a usable
    /// id are dropped.
    pub fn from_value(value: &Value) -> Self {
        let role = match value.get("role").and_then(Value::as_str) {
            Some("system") => MessageRole::System,
            Some("assistant") => MessageRole::Assistant,
            Some("tool") => MessageRole::Tool,
            _ => MessageRole::User,
        };

        let content = match value.get("content") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        let tool_calls = value
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| calls.iter().filter_map(normalize_tool_call).collect::<Vec<_>>())
            .filter(|calls: &Vec<ToolCall>| !calls.is_empty());

        let tool_call_id = value
            .get("tool_call_id")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Self {
            role,
            content,
            tool_calls,
            tool_call_id,
        }
    }
}

fn normalize_tool_call(value: &Value) -> Option<ToolCall> {
    let id = value.get("id").and_then(Value::as_str)?;
    if id.is_empty() {
        return None;
    }

    let function = value.get("function");
    let name = function
        .and_then(|f| f.get("name"))
        .or_else(|| value.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let arguments = function
        .and_then(|f| f.get("arguments"))
        .or_else(|| value.get("arguments"))
        .or_else(|| value.get("args"));
    let arguments = match arguments {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Some(ToolCall::new(id, name, arguments))
}

// ── Tool call types ────────────────────────────────────────────────

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A tool invocation declared by an assistant turn (OpenAI
/// function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    /// Create a function tool call. `CallType` is always `Function` in
    /// the current API, so there's no reason to specify it manually.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_constructors() {
        let sys = Message::system("hello");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.content.as_deref(), Some("hello"));

        let user = Message::user("world");
        assert_eq!(user.role, MessageRole::User);

        let assist = Message::assistant_text("reply");
        assert_eq!(assist.role, MessageRole::Assistant);
        assert_eq!(assist.content.as_deref(), Some("reply"));

        let tool = Message::tool_result("call-1", "result");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn has_tool_calls_requires_assistant_with_calls() {
        let assist = Message::assistant_tool_calls(vec![ToolCall::new("t1", "search", "{}")]);
        assert!(assist.has_tool_calls());

        let empty = Message::assistant_tool_calls(vec![]);
        assert!(!empty.has_tool_calls());

        assert!(!Message::user("hi").has_tool_calls());
        assert!(!Message::tool_result("t1", "out").has_tool_calls());
    }

    #[test]
    fn call_ids_skips_empty_ids() {
        let assist = Message::assistant_tool_calls(vec![
            ToolCall::new("t1", "search", "{}"),
            ToolCall::new("", "extract", "{}"),
        ]);
        let ids: Vec<&str> = assist.call_ids().collect();
        assert_eq!(ids, vec!["t1"]);
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn from_value_nested_wire_shape() {
        let msg = Message::from_value(&json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [
                {"id": "t1", "type": "function",
                 "function": {"name": "search", "arguments": "{\"q\":\"rust\"}"}}
            ]
        }));
        assert!(msg.has_tool_calls());
        let calls = msg.tool_calls.unwrap();
        assert_eq!(calls[0].id, "t1");
        assert_eq!(calls[0].function.name, "search");
        assert_eq!(calls[0].function.arguments, "{\"q\":\"rust\"}");
        assert!(msg.content.is_none());
    }

    #[test]
    fn from_value_flat_tool_call_shape() {
        let msg = Message::from_value(&json!({
            "role": "assistant",
            "tool_calls": [{"id": "t2", "name": "extract", "args": {"url": "https://example.com"}}]
        }));
        let calls = msg.tool_calls.unwrap();
        assert_eq!(calls[0].id, "t2");
        assert_eq!(calls[0].function.name, "extract");
        assert!(calls[0].function.arguments.contains("example.com"));
    }

    #[test]
    fn from_value_unknown_role_defaults_to_user() {
        let msg = Message::from_value(&json!({"role": "narrator", "content": "scene"}));
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content.as_deref(), Some("scene"));
    }

    #[test]
    fn from_value_drops_calls_without_ids() {
        let msg = Message::from_value(&json!({
            "role": "assistant",
            "tool_calls": [{"name": "search"}, {"id": ""}]
        }));
        // All entries were unusable, so the field collapses to None.
        assert!(msg.tool_calls.is_none());
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn from_value_non_string_content_rendered_as_json() {
        let msg = Message::from_value(&json!({
            "role": "user",
            "content": [{"type": "text", "text": "hi"}]
        }));
        assert!(msg.content.unwrap().contains("\"text\":\"hi\""));
    }
}
