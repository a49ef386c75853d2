//! Message and Conversation domain types.
//!
//! A [`Conversation`] is the ordered log one agent session sends to the model
//! on every turn. It enforces three rules:
//!
//! - exactly one system prompt, first in the log, set once at construction;
//! - retrieval context is tagged with [`RETRIEVAL_CONTEXT_NAME`] and replaced
//!   (delete, then append) rather than accumulated;
//! - messages are never edited once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::ToolCall;

/// Reserved `name` carried by grounding messages.
pub const RETRIEVAL_CONTEXT_NAME: &str = "retrieval";

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions and grounding context
    System,
    /// The caller
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content, possibly empty
    #[serde(default)]
    pub content: String,

    /// Identity tag: the tool name on tool messages, or the retrieval marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tool calls requested by the assistant in this turn, in model order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            name: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg.name = Some(name.into());
        msg
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Whether this message is a replaceable grounding message.
    pub fn is_retrieval_context(&self) -> bool {
        self.name.as_deref() == Some(RETRIEVAL_CONTEXT_NAME)
    }
}

/// The message log of one agent session.
///
/// Owned by exactly one session; the fields are private so every mutation
/// goes through the append/replace operations below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    messages: Vec<Message>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Seed a conversation with its system prompt as the sole message.
    pub fn initialize(system_prompt: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            messages: vec![Message::system(system_prompt)],
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// When the last message was appended.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The session's system prompt.
    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    /// Append an assistant turn. Requested calls are kept verbatim so later
    /// tool messages stay resolvable by id.
    pub fn append_assistant(&mut self, content: impl Into<String>, tool_calls: Vec<ToolCall>) {
        self.push(Message::assistant(content).with_tool_calls(tool_calls));
    }

    /// Append the outcome of one tool call as a `{"result": ...}` envelope.
    pub fn append_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        result: serde_json::Value,
    ) {
        let envelope = serde_json::json!({ "result": result });
        self.push(Message::tool_result(tool_call_id, name, envelope.to_string()));
    }

    /// Drop every earlier grounding message, then append `snippet` as the
    /// current one.
    pub fn replace_retrieval_context(&mut self, snippet: impl Into<String>) {
        self.messages.retain(|m| !m.is_retrieval_context());
        self.push(Message::system(snippet).with_name(RETRIEVAL_CONTEXT_NAME));
    }

    /// The current grounding message, if any.
    pub fn retrieval_context(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_retrieval_context())
    }

    /// Messages from `cursor` onwards; an out-of-range cursor yields nothing.
    pub fn messages_since(&self, cursor: usize) -> &[Message] {
        self.messages.get(cursor..).unwrap_or_default()
    }
}
