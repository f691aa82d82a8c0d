//! In-memory passage store — keyword-scored context retrieval.
//!
//! The serving-path side of retrieval only: `retrieve` ranks stored passages
//! against a query, `store` appends new ones. Indexing pipelines (chunking,
//! embeddings, persistence) live outside this crate; a vector backend would
//! implement the same `PassageStore` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use hudgate_core::error::RetrievalError;
use hudgate_core::retrieval::{Passage, PassageStore};

/// An in-memory, append-only passage store with keyword scoring.
///
/// Concurrent appends never reorder or drop earlier entries; reads see
/// passages in insertion order, which is also the tie-break order for
/// equal-scored results.
pub struct InMemoryPassageStore {
    passages: Arc<RwLock<Vec<Passage>>>,
}

impl InMemoryPassageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            passages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a store pre-loaded with the demo corpus.
    pub fn with_seed_corpus() -> Self {
        let passages = SEED_CORPUS
            .iter()
            .enumerate()
            .map(|(i, (content, source))| Passage {
                id: format!("doc{}", i + 1),
                content: (*content).into(),
                source: (*source).into(),
            })
            .collect();
        Self {
            passages: Arc::new(RwLock::new(passages)),
        }
    }

    /// Score a passage: how many whitespace-delimited lowercased query terms
    /// occur as substrings of the lowercased content.
    fn score(content: &str, terms: &[String]) -> usize {
        let content_lower = content.to_lowercase();
        terms
            .iter()
            .filter(|term| content_lower.contains(term.as_str()))
            .count()
    }
}

impl Default for InMemoryPassageStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The demo corpus the original deployment ships with.
const SEED_CORPUS: &[(&str, &str)] = &[
    (
        "DeepSeek is an AI model developed for natural language understanding and generation.",
        "deepseek_info.txt",
    ),
    (
        "Ollama is a tool for running large language models locally on your machine.",
        "ollama_docs.txt",
    ),
    (
        "ElevenLabs provides state-of-the-art text-to-speech capabilities with realistic voices.",
        "elevenlabs_api.txt",
    ),
];

#[async_trait]
impl PassageStore for InMemoryPassageStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn retrieve(&self, query: &str, limit: usize) -> Vec<Passage> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        if terms.is_empty() {
            return Vec::new();
        }

        let passages = self.passages.read().await;

        // Stable sort by descending score keeps insertion order among ties.
        let mut scored: Vec<(usize, &Passage)> = passages
            .iter()
            .map(|p| (Self::score(&p.content, &terms), p))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let results: Vec<Passage> = scored
            .into_iter()
            .take(limit)
            .map(|(_, p)| p.clone())
            .collect();

        debug!(
            query = %query,
            matched = results.len(),
            "Passage retrieval complete"
        );

        results
    }

    async fn store(
        &self,
        content: &str,
        source: &str,
    ) -> std::result::Result<String, RetrievalError> {
        let mut passages = self.passages.write().await;
        let id = format!("doc{}", passages.len() + 1);
        passages.push(Passage {
            id: id.clone(),
            content: content.into(),
            source: source.into(),
        });
        Ok(id)
    }

    async fn count(&self) -> usize {
        self.passages.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_assigns_monotonic_ids() {
        let store = InMemoryPassageStore::new();
        let a = store.store("first", "a.txt").await.unwrap();
        let b = store.store("second", "b.txt").await.unwrap();
        assert_eq!(a, "doc1");
        assert_eq!(b, "doc2");
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn stored_passage_round_trips_with_source() {
        let store = InMemoryPassageStore::new();
        store
            .store("Rust has fearless concurrency", "rust_book.txt")
            .await
            .unwrap();

        let results = store.retrieve("concurrency", 1).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "rust_book.txt");
        assert_eq!(results[0].content, "Rust has fearless concurrency");
    }

    #[tokio::test]
    async fn zero_score_passages_excluded() {
        let store = InMemoryPassageStore::new();
        store.store("apples and oranges", "fruit.txt").await.unwrap();
        store.store("trains and planes", "travel.txt").await.unwrap();

        let results = store.retrieve("oranges", 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "fruit.txt");
    }

    #[tokio::test]
    async fn ranking_prefers_more_matching_terms() {
        let store = InMemoryPassageStore::with_seed_corpus();

        // "deepseek" and "model" both hit the DeepSeek passage; "model"
        // alone hits the Ollama passage ("models").
        let results = store.retrieve("deepseek model", 2).await;
        assert!(!results.is_empty());
        assert_eq!(results[0].source, "deepseek_info.txt");
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = InMemoryPassageStore::new();
        store.store("shared keyword alpha", "one.txt").await.unwrap();
        store.store("shared keyword beta", "two.txt").await.unwrap();

        let results = store.retrieve("keyword", 10).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "one.txt");
        assert_eq!(results[1].source, "two.txt");
    }

    #[tokio::test]
    async fn retrieve_is_idempotent() {
        let store = InMemoryPassageStore::with_seed_corpus();
        let first = store.retrieve("language models", 3).await;
        let second = store.retrieve("language models", 3).await;

        let ids = |rs: &[Passage]| rs.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn limit_truncates_results() {
        let store = InMemoryPassageStore::with_seed_corpus();
        let results = store.retrieve("the", 1).await;
        assert!(results.len() <= 1);
    }

    #[tokio::test]
    async fn empty_query_returns_nothing() {
        let store = InMemoryPassageStore::with_seed_corpus();
        assert!(store.retrieve("   ", 5).await.is_empty());
    }

    #[tokio::test]
    async fn matching_is_case_insensitive() {
        let store = InMemoryPassageStore::with_seed_corpus();
        let results = store.retrieve("ELEVENLABS", 1).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "elevenlabs_api.txt");
    }
}
