use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single chat message. The core never interprets message content; it only
/// carries the history from one node controller to the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn tool(text: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            text: text.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// Chat history shared by every controller of one session.
///
/// Cloning yields another handle to the same history, so a controller built
/// for the next node sees everything the previous one recorded.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    inner: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: ChatMessage) {
        if let Ok(mut messages) = self.inner.lock() {
            messages.push(message);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current messages.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Whether two handles point at the same history.
    pub fn same_as(&self, other: &ChatHistory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Tool definition handed to the host's language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Flow event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// Session started on its initial node.
    SessionStarted { session_id: SessionId, node_id: String },
    /// A node became current.
    NodeEntered { node_id: String },
    /// The current node is being left.
    NodeExited { node_id: String, edge_id: String },
    /// A data-collection tool merged values into the user data record.
    DataCollected { edge_id: String, fields: Vec<String> },
    /// A side-effect action finished (successfully or not).
    ActionCompleted { action_id: String, status: u16, success: bool },
    /// A final node finished speaking and the session was torn down.
    SessionEnded { session_id: SessionId, node_id: String },
}
