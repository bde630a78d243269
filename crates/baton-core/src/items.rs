//! Conversation items.
//!
//! Three closed vocabularies:
//!
//! - [`OutputItem`]: a single unit a model emitted in one response
//! - [`InputItem`]: a single unit of the transcript sent to a model
//! - [`RunItem`]: a single unit of the visible transcript a run produced,
//!   tagged with the agent that produced it
//!
//! Classification over these is exhaustive; new kinds are added by
//! extending the enums, never by inspecting untyped payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::computer::{ComputerCall, SafetyCheck};

// ─────────────────────────────────────────────────────────────────────────────
// Building blocks
// ─────────────────────────────────────────────────────────────────────────────

/// Message author role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// End user.
    User,
    /// Model.
    Assistant,
    /// System prompt.
    System,
    /// Developer instructions.
    Developer,
}

/// One content part of an assistant message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text.
    OutputText {
        /// The text.
        text: String,
    },
    /// The model declined to answer.
    Refusal {
        /// Refusal explanation.
        refusal: String,
    },
}

/// An assistant message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMessage {
    /// Item identifier.
    pub id: String,
    /// Content parts in order.
    pub content: Vec<MessageContent>,
}

impl OutputMessage {
    /// A message with a single text part.
    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: vec![MessageContent::OutputText { text: text.into() }],
        }
    }
}

/// A reasoning summary.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningItem {
    /// Item identifier.
    pub id: String,
    /// Summary paragraphs.
    #[serde(default)]
    pub summary: Vec<String>,
}

/// A model-issued function call. Handoffs use the same shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Item identifier.
    pub id: String,
    /// Call identifier echoed by the output item.
    pub call_id: String,
    /// Tool (or handoff tool) name.
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

/// A provider-executed tool call (file or web search).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedToolCall {
    /// Item identifier.
    pub id: String,
    /// Provider status string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Provider payload (queries, results).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// OutputItem
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of model output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Assistant message.
    Message(OutputMessage),
    /// Reasoning summary.
    Reasoning(ReasoningItem),
    /// Function or handoff call.
    FunctionCall(FunctionCall),
    /// Computer action call.
    ComputerCall(ComputerCall),
    /// Hosted file search.
    FileSearchCall(HostedToolCall),
    /// Hosted web search.
    WebSearchCall(HostedToolCall),
    /// An item whose tag is not part of the vocabulary.
    #[serde(skip_deserializing)]
    Unknown {
        /// The unrecognised tag.
        item_type: String,
        /// The item as received.
        payload: Value,
    },
}

impl OutputItem {
    /// Decode a provider item, mapping unrecognised tags to [`OutputItem::Unknown`].
    ///
    /// Items with a known tag but malformed fields are an error.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        match tag.as_str() {
            "message" | "reasoning" | "function_call" | "computer_call" | "file_search_call"
            | "web_search_call" => serde_json::from_value(value),
            _ => Ok(Self::Unknown {
                item_type: tag,
                payload: value,
            }),
        }
    }

    /// Tag string of this item.
    pub fn item_type(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Reasoning(_) => "reasoning",
            Self::FunctionCall(_) => "function_call",
            Self::ComputerCall(_) => "computer_call",
            Self::FileSearchCall(_) => "file_search_call",
            Self::WebSearchCall(_) => "web_search_call",
            Self::Unknown { item_type, .. } => item_type,
        }
    }

    /// The transcript form of this item. `None` for unknown items.
    pub fn to_input_item(&self) -> Option<InputItem> {
        Some(match self {
            Self::Message(m) => InputItem::OutputMessage(m.clone()),
            Self::Reasoning(r) => InputItem::Reasoning(r.clone()),
            Self::FunctionCall(c) => InputItem::FunctionCall(c.clone()),
            Self::ComputerCall(c) => InputItem::ComputerCall(c.clone()),
            Self::FileSearchCall(c) => InputItem::FileSearchCall(c.clone()),
            Self::WebSearchCall(c) => InputItem::WebSearchCall(c.clone()),
            Self::Unknown { .. } => return None,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InputItem
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of transcript sent to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    /// A plain message from the user, system or developer.
    Message {
        /// Author.
        role: Role,
        /// Text content.
        content: String,
    },
    /// A previous assistant message.
    OutputMessage(OutputMessage),
    /// A previous reasoning item.
    Reasoning(ReasoningItem),
    /// A previous function or handoff call.
    FunctionCall(FunctionCall),
    /// Result of a function or handoff call.
    FunctionCallOutput {
        /// Originating call.
        call_id: String,
        /// Serialized output.
        output: String,
    },
    /// A previous computer call.
    ComputerCall(ComputerCall),
    /// Result of a computer call.
    ComputerCallOutput {
        /// Originating call.
        call_id: String,
        /// Screenshot image URL.
        image_url: String,
        /// Safety checks the caller acknowledged.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        acknowledged_safety_checks: Vec<SafetyCheck>,
    },
    /// A previous hosted file search.
    FileSearchCall(HostedToolCall),
    /// A previous hosted web search.
    WebSearchCall(HostedToolCall),
}

impl InputItem {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Call id of a call or call-output item.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall(c) => Some(&c.call_id),
            Self::ComputerCall(c) => Some(&c.call_id),
            Self::FunctionCallOutput { call_id, .. } | Self::ComputerCallOutput { call_id, .. } => {
                Some(call_id)
            }
            _ => None,
        }
    }

    /// Whether this item is a tool call or a tool output.
    pub fn is_tool_related(&self) -> bool {
        matches!(
            self,
            Self::FunctionCall(_)
                | Self::FunctionCallOutput { .. }
                | Self::ComputerCall(_)
                | Self::ComputerCallOutput { .. }
                | Self::FileSearchCall(_)
                | Self::WebSearchCall(_)
        )
    }
}

/// Caller-supplied run input: a single user string or a full item list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunInput {
    /// One user message.
    Text(String),
    /// A prepared transcript.
    Items(Vec<InputItem>),
}

impl RunInput {
    /// The input as transcript items.
    pub fn to_items(&self) -> Vec<InputItem> {
        match self {
            Self::Text(text) => vec![InputItem::user(text.clone())],
            Self::Items(items) => items.clone(),
        }
    }
}

impl From<&str> for RunInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for RunInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<InputItem>> for RunInput {
    fn from(items: Vec<InputItem>) -> Self {
        Self::Items(items)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RunItem
// ─────────────────────────────────────────────────────────────────────────────

/// The raw call behind a [`RunItem::ToolCall`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCallRaw {
    /// Function tool call.
    FunctionCall(FunctionCall),
    /// Computer action call.
    ComputerCall(ComputerCall),
    /// Hosted file search.
    FileSearchCall(HostedToolCall),
    /// Hosted web search.
    WebSearchCall(HostedToolCall),
}

impl ToolCallRaw {
    /// Call id, if the call expects a runtime-produced output.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall(c) => Some(&c.call_id),
            Self::ComputerCall(c) => Some(&c.call_id),
            Self::FileSearchCall(_) | Self::WebSearchCall(_) => None,
        }
    }

    fn to_input_item(&self) -> InputItem {
        match self {
            Self::FunctionCall(c) => InputItem::FunctionCall(c.clone()),
            Self::ComputerCall(c) => InputItem::ComputerCall(c.clone()),
            Self::FileSearchCall(c) => InputItem::FileSearchCall(c.clone()),
            Self::WebSearchCall(c) => InputItem::WebSearchCall(c.clone()),
        }
    }
}

/// One unit of the visible transcript produced by a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunItem {
    /// The agent produced a message.
    MessageOutput {
        /// Producing agent.
        agent: String,
        /// The message.
        raw: OutputMessage,
    },
    /// The agent produced a reasoning summary.
    Reasoning {
        /// Producing agent.
        agent: String,
        /// The reasoning item.
        raw: ReasoningItem,
    },
    /// The agent called a tool.
    ToolCall {
        /// Producing agent.
        agent: String,
        /// The call.
        raw: ToolCallRaw,
    },
    /// A tool call finished.
    ToolCallOutput {
        /// Agent whose tool ran.
        agent: String,
        /// Originating call.
        call_id: String,
        /// Value returned by the tool.
        output: Value,
        /// Transcript form of the output.
        raw: InputItem,
    },
    /// The agent requested a handoff.
    HandoffCall {
        /// Producing agent.
        agent: String,
        /// The handoff call.
        raw: FunctionCall,
    },
    /// A handoff was carried out.
    HandoffOutput {
        /// Agent that handed off.
        agent: String,
        /// Transcript form of the output.
        raw: InputItem,
        /// Agent that handed off.
        source_agent: String,
        /// Agent that took over.
        target_agent: String,
    },
}

impl RunItem {
    /// Name of the agent that produced the item.
    pub fn agent_name(&self) -> &str {
        match self {
            Self::MessageOutput { agent, .. }
            | Self::Reasoning { agent, .. }
            | Self::ToolCall { agent, .. }
            | Self::ToolCallOutput { agent, .. }
            | Self::HandoffCall { agent, .. }
            | Self::HandoffOutput { agent, .. } => agent,
        }
    }

    /// Short kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MessageOutput { .. } => "message_output_item",
            Self::Reasoning { .. } => "reasoning_item",
            Self::ToolCall { .. } => "tool_call_item",
            Self::ToolCallOutput { .. } => "tool_call_output_item",
            Self::HandoffCall { .. } => "handoff_call_item",
            Self::HandoffOutput { .. } => "handoff_output_item",
        }
    }

    /// Call id linking calls with their outputs.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCall { raw, .. } => raw.call_id(),
            Self::ToolCallOutput { call_id, .. } => Some(call_id),
            Self::HandoffCall { raw, .. } => Some(&raw.call_id),
            Self::HandoffOutput { raw, .. } => raw.call_id(),
            Self::MessageOutput { .. } | Self::Reasoning { .. } => None,
        }
    }

    /// The transcript form of this item.
    pub fn to_input_item(&self) -> InputItem {
        match self {
            Self::MessageOutput { raw, .. } => InputItem::OutputMessage(raw.clone()),
            Self::Reasoning { raw, .. } => InputItem::Reasoning(raw.clone()),
            Self::ToolCall { raw, .. } => raw.to_input_item(),
            Self::HandoffCall { raw, .. } => InputItem::FunctionCall(raw.clone()),
            Self::ToolCallOutput { raw, .. } | Self::HandoffOutput { raw, .. } => raw.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Text extraction over messages and run items.
pub struct ItemHelpers;

impl ItemHelpers {
    /// Concatenated text parts of a message. Refusals are skipped.
    pub fn text_message_output(message: &OutputMessage) -> String {
        message
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::OutputText { text } => Some(text.as_str()),
                MessageContent::Refusal { .. } => None,
            })
            .collect()
    }

    /// Concatenated text of every message item in `items`.
    pub fn text_message_outputs(items: &[RunItem]) -> String {
        items
            .iter()
            .filter_map(|item| match item {
                RunItem::MessageOutput { raw, .. } => Some(Self::text_message_output(raw)),
                _ => None,
            })
            .collect()
    }

    /// Last content part of a message, as text or refusal.
    pub fn extract_last_content(message: &OutputMessage) -> Option<String> {
        message.content.last().map(|c| match c {
            MessageContent::OutputText { text } => text.clone(),
            MessageContent::Refusal { refusal } => refusal.clone(),
        })
    }

    /// Last content part of a message, only if it is text.
    pub fn extract_last_text(message: &OutputMessage) -> Option<String> {
        match message.content.last() {
            Some(MessageContent::OutputText { text }) => Some(text.clone()),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::ComputerAction;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn call(name: &str) -> FunctionCall {
        FunctionCall {
            id: "fc_1".into(),
            call_id: "call_1".into(),
            name: name.into(),
            arguments: "{}".into(),
        }
    }

    #[test]
    fn from_json_known_tag() {
        let item = OutputItem::from_json(json!({
            "type": "function_call",
            "id": "fc_1",
            "call_id": "call_1",
            "name": "test",
            "arguments": "abc"
        }))
        .unwrap();
        assert_matches!(item, OutputItem::FunctionCall(ref c) if c.name == "test");
    }

    #[test]
    fn from_json_unknown_tag() {
        let item = OutputItem::from_json(json!({"type": "image_generation_call", "id": "x"})).unwrap();
        assert_matches!(item, OutputItem::Unknown { ref item_type, .. } if item_type == "image_generation_call");
        assert_eq!(item.item_type(), "image_generation_call");
        assert!(item.to_input_item().is_none());
    }

    #[test]
    fn from_json_malformed_known_tag_errors() {
        assert!(OutputItem::from_json(json!({"type": "function_call", "id": "x"})).is_err());
    }

    #[test]
    fn output_item_json_shape() {
        let item = OutputItem::Message(OutputMessage::text("msg_1", "hi"));
        insta::assert_json_snapshot!(item, @r#"
        {
          "type": "message",
          "id": "msg_1",
          "content": [
            {
              "type": "output_text",
              "text": "hi"
            }
          ]
        }
        "#);
    }

    #[test]
    fn run_input_text_becomes_user_message() {
        let items = RunInput::from("hello").to_items();
        assert_eq!(items, vec![InputItem::user("hello")]);
    }

    #[test]
    fn run_item_call_ids_link() {
        let c = call("test");
        let call_item = RunItem::ToolCall {
            agent: "a".into(),
            raw: ToolCallRaw::FunctionCall(c.clone()),
        };
        let out_item = RunItem::ToolCallOutput {
            agent: "a".into(),
            call_id: c.call_id.clone(),
            output: json!("ok"),
            raw: InputItem::FunctionCallOutput {
                call_id: c.call_id.clone(),
                output: "ok".into(),
            },
        };
        assert_eq!(call_item.call_id(), out_item.call_id());
        assert_eq!(call_item.kind(), "tool_call_item");
        assert_eq!(out_item.agent_name(), "a");
    }

    #[test]
    fn run_item_to_input_item() {
        let item = RunItem::HandoffCall {
            agent: "a".into(),
            raw: call("transfer_to_b"),
        };
        assert_matches!(item.to_input_item(), InputItem::FunctionCall(c) if c.name == "transfer_to_b");
    }

    #[test]
    fn hosted_calls_have_no_call_id() {
        let raw = ToolCallRaw::WebSearchCall(HostedToolCall {
            id: "ws_1".into(),
            status: Some("completed".into()),
            payload: Value::Null,
        });
        assert!(raw.call_id().is_none());
    }

    #[test]
    fn tool_related_classification() {
        assert!(InputItem::FunctionCall(call("x")).is_tool_related());
        assert!(
            InputItem::ComputerCall(ComputerCall {
                id: "c".into(),
                call_id: "c1".into(),
                action: ComputerAction::Wait,
                pending_safety_checks: vec![],
            })
            .is_tool_related()
        );
        assert!(!InputItem::user("hi").is_tool_related());
    }

    #[test]
    fn text_helpers_skip_refusals() {
        let msg = OutputMessage {
            id: "m".into(),
            content: vec![
                MessageContent::OutputText { text: "a".into() },
                MessageContent::Refusal {
                    refusal: "no".into(),
                },
                MessageContent::OutputText { text: "b".into() },
            ],
        };
        assert_eq!(ItemHelpers::text_message_output(&msg), "ab");
        assert_eq!(ItemHelpers::extract_last_text(&msg).as_deref(), Some("b"));
    }

    #[test]
    fn extract_last_text_ignores_trailing_refusal() {
        let msg = OutputMessage {
            id: "m".into(),
            content: vec![MessageContent::Refusal {
                refusal: "no".into(),
            }],
        };
        assert!(ItemHelpers::extract_last_text(&msg).is_none());
        assert_eq!(ItemHelpers::extract_last_content(&msg).as_deref(), Some("no"));
    }

    #[test]
    fn text_message_outputs_joins_messages() {
        let items = vec![
            RunItem::MessageOutput {
                agent: "a".into(),
                raw: OutputMessage::text("1", "x"),
            },
            RunItem::HandoffCall {
                agent: "a".into(),
                raw: call("t"),
            },
            RunItem::MessageOutput {
                agent: "b".into(),
                raw: OutputMessage::text("2", "y"),
            },
        ];
        assert_eq!(ItemHelpers::text_message_outputs(&items), "xy");
    }
}
