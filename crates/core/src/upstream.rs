//! ChatStream trait — the abstraction over streaming LLM upstreams.
//!
//! A ChatStream knows how to send an assembled prompt to a model-serving
//! upstream and yield the reply incrementally as canonical events. The two
//! upstream wire formats (NDJSON from a local model server, SSE from a
//! hosted API) are normalized behind this one contract so the turn
//! controller never branches on provider identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::message::HistoryMessage;

/// A canonical event in a turn's reply stream.
///
/// Adapters translate their native wire format into this; everything
/// downstream (controller, gateway, caller) only ever sees these.
///
/// Invariant: on any one stream, the last event is `Done` or an `Error`;
/// an `Error` followed by further events was a non-fatal per-frame failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of generated text.
    TextDelta(String),
    /// The upstream signalled completion. Nothing follows.
    Done,
    /// Something went wrong. Terminal when last, otherwise a single bad
    /// frame in an otherwise healthy stream.
    Error(String),
}

/// Which prompt layout an upstream expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptShape {
    /// One flattened text blob with a trailing role marker.
    FlatText,
    /// An ordered list of role-tagged messages.
    RoleMessages,
}

/// A role-tagged message in the shape hosted APIs expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

impl From<&HistoryMessage> for WireMessage {
    fn from(msg: &HistoryMessage) -> Self {
        Self {
            role: msg.role.as_str().into(),
            content: msg.content.clone(),
        }
    }
}

/// A fully assembled upstream request payload.
///
/// Built fresh per turn by the prompt assembler; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembledPrompt {
    FlatText(String),
    RoleMessages(Vec<WireMessage>),
}

impl AssembledPrompt {
    /// The flat-text rendition of this prompt.
    ///
    /// Role-tagged prompts degrade to `"ROLE: content"` lines so an adapter
    /// handed the wrong shape still sends something coherent.
    pub fn into_flat_text(self) -> String {
        match self {
            AssembledPrompt::FlatText(text) => text,
            AssembledPrompt::RoleMessages(messages) => messages
                .iter()
                .map(|m| format!("{}: {}", m.role.to_uppercase(), m.content))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// The role-tagged rendition of this prompt.
    ///
    /// A flat-text prompt degrades to a single user message.
    pub fn into_role_messages(self) -> Vec<WireMessage> {
        match self {
            AssembledPrompt::RoleMessages(messages) => messages,
            AssembledPrompt::FlatText(text) => vec![WireMessage::user(text)],
        }
    }
}

/// The core streaming-chat capability.
///
/// Every upstream (local NDJSON model server, hosted SSE API) implements
/// this trait. `stream_chat` either fails up front — connect error, missing
/// credential, non-success status before any token — or hands back a
/// receiver on which the adapter task delivers events in production order.
///
/// Once the receiver exists the adapter guarantees: events arrive in order,
/// the final event is `Done` or a terminal `Error`, and the underlying
/// transport connection is released on every exit path, including receiver
/// drop.
#[async_trait]
pub trait ChatStream: Send + Sync {
    /// A human-readable name for this upstream (e.g., "ollama", "deepseek").
    fn name(&self) -> &str;

    /// Which prompt layout this upstream expects.
    fn prompt_shape(&self) -> PromptShape;

    /// Open the streaming call and return the event receiver.
    async fn stream_chat(
        &self,
        prompt: AssembledPrompt,
    ) -> std::result::Result<tokio::sync::mpsc::Receiver<StreamEvent>, UpstreamError>;

    /// Health check — can we reach the upstream?
    async fn health_check(&self) -> std::result::Result<bool, UpstreamError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_text_passthrough() {
        let prompt = AssembledPrompt::FlatText("SYSTEM\n\nUSER: hi\nASSISTANT:".into());
        assert_eq!(prompt.into_flat_text(), "SYSTEM\n\nUSER: hi\nASSISTANT:");
    }

    #[test]
    fn role_messages_flatten_to_labelled_lines() {
        let prompt = AssembledPrompt::RoleMessages(vec![
            WireMessage::system("Be brief."),
            WireMessage::user("hi"),
        ]);
        assert_eq!(prompt.into_flat_text(), "SYSTEM: Be brief.\nUSER: hi");
    }

    #[test]
    fn flat_text_wraps_as_single_user_message() {
        let prompt = AssembledPrompt::FlatText("hello".into());
        let messages = prompt.into_role_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "hello");
    }

    #[test]
    fn wire_message_from_history() {
        let history = HistoryMessage::assistant("sure");
        let wire = WireMessage::from(&history);
        assert_eq!(wire.role, "assistant");
        assert_eq!(wire.content, "sure");
    }

    #[test]
    fn wire_message_serializes_flat() {
        let json = serde_json::to_string(&WireMessage::user("q")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"q"}"#);
    }
}
