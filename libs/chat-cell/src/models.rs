// libs/chat-cell/src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use shared_models::auth::UserRole;
use shared_models::error::ApiError;

/// Shown in place of an assistant reply when a turn fails.
pub const CHAT_ERROR_MESSAGE: &str =
    "Sorry, there was an error processing your request. Please try again.";

// ==============================================================================
// CONVERSATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the canonical, server-acknowledged history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// One entry of the display log. Error turns never reach the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub is_error: bool,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), is_error: false }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), is_error: false }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), is_error: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::AwaitingResponse => write!(f, "awaiting_response"),
            SessionState::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time copy of a session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub history: Vec<HistoryEntry>,
    pub display: Vec<ConversationTurn>,
}

// ==============================================================================
// WIRE MODELS
// ==============================================================================

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub prompt: String,
    pub conversation_history: Vec<HistoryEntry>,
    pub user_id: Option<i64>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("A message is already awaiting a reply")]
    Busy,

    #[error("Conversation was reset before the reply arrived")]
    Superseded,

    #[error(transparent)]
    Api(#[from] ApiError),
}
