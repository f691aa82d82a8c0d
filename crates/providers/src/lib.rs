//! Upstream stream adapters for hudgate.
//!
//! Both adapters implement the `hudgate_core::ChatStream` trait: one
//! streaming call in, one canonical event sequence out. `router` selects
//! the adapter from configuration.

pub mod deepseek;
pub mod ollama;
pub mod router;

pub use deepseek::DeepSeekAdapter;
pub use ollama::OllamaAdapter;
pub use router::build_from_config;
