//! Ollama adapter — streams from a local model server speaking NDJSON.
//!
//! The `/generate` endpoint replies with newline-delimited JSON objects,
//! each carrying an optional `response` text fragment and a `done` flag:
//!
//! ```text
//! {"response":"Hel","done":false}
//! {"response":"lo","done":false}
//! {"done":true}
//! ```
//!
//! Each line becomes at most one `TextDelta` plus, on the final line, a
//! `Done`. A single malformed line yields a non-fatal `Error` event and the
//! stream continues.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use hudgate_core::error::UpstreamError;
use hudgate_core::upstream::{AssembledPrompt, ChatStream, PromptShape, StreamEvent};

/// Streams chat completions from an Ollama-style local model server.
pub struct OllamaAdapter {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaAdapter {
    /// Create a new adapter.
    ///
    /// `base_url` points at the server's API root (e.g.
    /// `http://127.0.0.1:11434/api`); `timeout` bounds the whole call,
    /// handshake through last token.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        }
    }
}

/// One NDJSON line from the `/generate` stream.
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

/// Parse one wire line into canonical events (zero, one, or two).
///
/// A malformed line maps to a single non-fatal `Error`; the caller keeps
/// consuming subsequent lines.
fn parse_generate_line(line: &str) -> Vec<StreamEvent> {
    match serde_json::from_str::<GenerateChunk>(line) {
        Ok(chunk) => {
            let mut events = Vec::with_capacity(2);
            if let Some(text) = chunk.response
                && !text.is_empty()
            {
                events.push(StreamEvent::TextDelta(text));
            }
            if chunk.done {
                events.push(StreamEvent::Done);
            }
            events
        }
        Err(e) => {
            debug!(line = %line, error = %e, "Unparseable NDJSON line");
            vec![StreamEvent::Error("Failed to parse Ollama response".into())]
        }
    }
}

#[async_trait]
impl ChatStream for OllamaAdapter {
    fn name(&self) -> &str {
        "ollama"
    }

    fn prompt_shape(&self) -> PromptShape {
        PromptShape::FlatText
    }

    async fn stream_chat(
        &self,
        prompt: AssembledPrompt,
    ) -> std::result::Result<tokio::sync::mpsc::Receiver<StreamEvent>, UpstreamError> {
        let url = format!("{}/generate", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt.into_flat_text(),
            "stream": true,
        });

        debug!(model = %self.model, url = %url, "Opening Ollama stream");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = response.status().as_u16();
        if status != 200 {
            warn!(status, "Ollama returned non-success status");
            return Err(UpstreamError::Connect {
                status,
                message: format!("Ollama API error: {status}"),
            });
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // The spawned task owns the response; dropping it on any return
        // path releases the connection.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(StreamEvent::Error(format!("Stream interrupted: {e}")))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines; keep any partial tail buffered.
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.trim().is_empty() {
                        continue;
                    }

                    for event in parse_generate_line(&line) {
                        let is_done = matches!(event, StreamEvent::Done);
                        if tx.send(event).await.is_err() {
                            return; // receiver dropped — caller is gone
                        }
                        if is_done {
                            // Stop on the first terminal signal; trailing
                            // buffered data is discarded, not an error.
                            return;
                        }
                    }
                }
            }

            // Upstream closed without a done marker — exhaustion is terminal.
            let _ = tx.send(StreamEvent::Done).await;
        });

        Ok(rx)
    }

    async fn health_check(&self) -> std::result::Result<bool, UpstreamError> {
        let url = format!("{}/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_err)?;
        Ok(response.status().is_success())
    }
}

fn map_reqwest_err(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout(e.to_string())
    } else {
        UpstreamError::Network(e.to_string())
    }
}
