//! Error types for the hudgate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all hudgate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Upstream (chat provider) errors ---
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Speech synthesis errors ---
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the upstream chat providers.
///
/// Mid-stream frame parse failures are NOT represented here — they surface
/// as non-fatal `StreamEvent::Error` payloads on the event channel so the
/// stream can continue. This enum covers failures that prevent or abort the
/// stream as a whole.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("Upstream returned status {status}: {message}")]
    Connect { status: u16, message: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from the speech synthesis relay.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Speech synthesis not configured: {0}")]
    NotConfigured(String),

    #[error("Speech upstream rejected request (status: {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),
}
