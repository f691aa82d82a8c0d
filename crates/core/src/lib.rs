//! # hudgate Core
//!
//! Domain types, traits, and error definitions for the hudgate conversational
//! gateway. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping upstream providers via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod retrieval;
pub mod upstream;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ChatRole, HistoryMessage, TurnRequest};
pub use retrieval::{Passage, PassageStore};
pub use upstream::{AssembledPrompt, ChatStream, PromptShape, StreamEvent, WireMessage};
