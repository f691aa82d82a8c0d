//! Prompt assembly — one upstream request payload from personality,
//! retrieved context, history, and the new user message.
//!
//! # Determinism
//!
//! Assembly is deterministic: identical inputs always produce identical
//! output. The result is built fresh per turn and never mutated afterwards.

use hudgate_core::message::HistoryMessage;
use hudgate_core::retrieval::{Passage, render_context_block};
use hudgate_core::upstream::{AssembledPrompt, PromptShape, WireMessage};

/// Label prefixed to the injected context so the model can tell it apart
/// from conversation.
const CONTEXT_LABEL: &str = "RELEVANT CONTEXT";

/// Instruction appended to the context system message in role-tagged form.
const CONTEXT_INSTRUCTION: &str =
    "Use this context to inform your response to the user's next message.";

/// Build the upstream payload in the layout `shape` asks for.
///
/// Empty history and empty context are both valid and common; assembly
/// never fails.
pub fn assemble(
    personality: &str,
    passages: &[Passage],
    history: &[HistoryMessage],
    user_message: &str,
    shape: PromptShape,
) -> AssembledPrompt {
    match shape {
        PromptShape::FlatText => assemble_flat(personality, passages, history, user_message),
        PromptShape::RoleMessages => {
            assemble_role_messages(personality, passages, history, user_message)
        }
    }
}

/// Flat layout for local-model upstreams. The trailing `ASSISTANT:` marker
/// (no closing newline) is what cues the model to start generating.
fn assemble_flat(
    personality: &str,
    passages: &[Passage],
    history: &[HistoryMessage],
    user_message: &str,
) -> AssembledPrompt {
    let mut prompt = String::new();
    prompt.push_str(personality);
    prompt.push_str("\n\n");

    if let Some(block) = render_context_block(passages) {
        prompt.push_str(CONTEXT_LABEL);
        prompt.push_str(":\n");
        prompt.push_str(&block);
        prompt.push_str("\n\n");
    }

    for msg in history {
        prompt.push_str(&msg.role.as_str().to_uppercase());
        prompt.push_str(": ");
        prompt.push_str(&msg.content);
        prompt.push('\n');
    }

    prompt.push_str("USER: ");
    prompt.push_str(user_message);
    prompt.push_str("\nASSISTANT:");

    AssembledPrompt::FlatText(prompt)
}

/// Role-tagged layout for hosted-API upstreams.
fn assemble_role_messages(
    personality: &str,
    passages: &[Passage],
    history: &[HistoryMessage],
    user_message: &str,
) -> AssembledPrompt {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(WireMessage::system(personality));

    if let Some(block) = render_context_block(passages) {
        messages.push(WireMessage::system(format!(
            "{CONTEXT_LABEL}:\n{block}\n\n{CONTEXT_INSTRUCTION}"
        )));
    }

    messages.extend(history.iter().map(WireMessage::from));
    messages.push(WireMessage::user(user_message));

    AssembledPrompt::RoleMessages(messages)
}
