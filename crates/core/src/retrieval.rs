//! PassageStore trait — the document-retrieval collaborator boundary.
//!
//! The retriever is deliberately degrade-never-abort: `retrieve` cannot fail
//! a turn, it can only come back empty. Stores are injected, explicitly
//! owned objects so turns and tests run against isolated instances instead
//! of module-level global state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A scored text snippet returned for prompt augmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Store-assigned identifier (monotonically increasing).
    pub id: String,

    /// The passage text.
    pub content: String,

    /// Where the passage came from (file name, URL, …). Preserved verbatim.
    pub source: String,
}

/// The retrieval capability.
///
/// Implementations: in-memory keyword store (default); a vector backend
/// would slot in behind the same contract.
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// The store name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Return up to `limit` passages ranked by relevance, best first.
    ///
    /// Never fails: internal errors degrade to an empty result and the turn
    /// proceeds without context.
    async fn retrieve(&self, query: &str, limit: usize) -> Vec<Passage>;

    /// Append a new passage, returning its assigned id.
    async fn store(
        &self,
        content: &str,
        source: &str,
    ) -> std::result::Result<String, RetrievalError>;

    /// Total number of stored passages.
    async fn count(&self) -> usize;
}

/// Render passages as the labeled context block injected into prompts:
/// `"Source: {source}\n{content}"` per passage, blank-line separated.
///
/// Returns `None` when there is nothing to inject.
pub fn render_context_block(passages: &[Passage]) -> Option<String> {
    if passages.is_empty() {
        return None;
    }
    Some(
        passages
            .iter()
            .map(|p| format!("Source: {}\n{}", p.source, p.content))
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, content: &str, source: &str) -> Passage {
        Passage {
            id: id.into(),
            content: content.into(),
            source: source.into(),
        }
    }

    #[test]
    fn empty_passages_render_nothing() {
        assert!(render_context_block(&[]).is_none());
    }

    #[test]
    fn single_passage_renders_source_then_content() {
        let block = render_context_block(&[passage("doc1", "Ollama runs models.", "ollama.txt")])
            .unwrap();
        assert_eq!(block, "Source: ollama.txt\nOllama runs models.");
    }

    #[test]
    fn passages_join_with_blank_line() {
        let block = render_context_block(&[
            passage("doc1", "first", "a.txt"),
            passage("doc2", "second", "b.txt"),
        ])
        .unwrap();
        assert_eq!(block, "Source: a.txt\nfirst\n\nSource: b.txt\nsecond");
    }
}
