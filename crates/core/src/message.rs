//! Turn request domain types.
//!
//! A turn is the unit of work for the whole gateway: one user message plus
//! the conversation history it arrived with. The request is immutable once
//! received and lives only for the duration of its HTTP response.

use serde::{Deserialize, Serialize};

/// The role of a message in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The end user
    User,
    /// The model's prior replies
    Assistant,
}

impl ChatRole {
    /// Lowercase wire name, as hosted APIs expect it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One prior message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: ChatRole,
    pub content: String,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// One chat turn as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    /// The new user message.
    pub message: String,

    /// Ordered conversation history, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryMessage>,

    /// Whether to augment the prompt with retrieved context.
    #[serde(default)]
    pub use_retrieval: bool,
}

impl TurnRequest {
    /// A bare turn with no history and no retrieval.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            use_retrieval: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_names() {
        assert_eq!(ChatRole::User.as_str(), "user");
        assert_eq!(ChatRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn turn_request_deserializes_with_defaults() {
        let req: TurnRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert!(req.history.is_empty());
        assert!(!req.use_retrieval);
    }

    #[test]
    fn history_roles_roundtrip() {
        let req: TurnRequest = serde_json::from_str(
            r#"{"message":"next","history":[{"role":"user","content":"a"},{"role":"assistant","content":"b"}],"use_retrieval":true}"#,
        )
        .unwrap();
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.history[0].role, ChatRole::User);
        assert_eq!(req.history[1].role, ChatRole::Assistant);
        assert!(req.use_retrieval);
    }
}
