//! DeepSeek adapter — streams from a hosted chat-completions API over SSE.
//!
//! The `/chat/completions` endpoint replies with Server-Sent-Events framing:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hi"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Comment lines (leading `:`) and blank lines are skipped; the `[DONE]`
//! sentinel terminates the stream. A malformed payload yields a non-fatal
//! `Error` event and the stream continues.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, warn};

use hudgate_core::error::UpstreamError;
use hudgate_core::upstream::{AssembledPrompt, ChatStream, PromptShape, StreamEvent};

/// Streams chat completions from a DeepSeek-style hosted API.
pub struct DeepSeekAdapter {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl DeepSeekAdapter {
    /// Create a new adapter.
    ///
    /// The credential is optional at construction; a missing key fails each
    /// call with `UpstreamError::NotConfigured` rather than panicking at
    /// startup, so a deployment configured for the local provider can still
    /// carry this adapter.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
        }
    }

    fn require_key(&self) -> std::result::Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or_else(|| {
            UpstreamError::NotConfigured("DEEPSEEK_API_KEY is not set".into())
        })
    }
}

// --- SSE wire types ---

/// A single SSE `data: {...}` payload from the streaming response.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

/// What one SSE line means for the canonical stream.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    /// Blank line or comment — nothing to do.
    Skip,
    /// The `[DONE]` sentinel.
    Done,
    /// A parsed delta with generated text.
    Delta(String),
    /// Parsed fine but carried no text (role preamble, finish chunk).
    Empty,
    /// Unparseable payload — one non-fatal error, stream continues.
    Malformed,
}

/// Classify one wire line.
fn classify_sse_line(line: &str) -> SseLine {
    if line.trim().is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }

    let payload = line.strip_prefix("data: ").unwrap_or(line).trim();

    if payload == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<ChatChunk>(payload) {
        Ok(chunk) => {
            let text = chunk
                .choices
                .first()
                .and_then(|c| c.delta.content.as_deref())
                .unwrap_or_default();
            if text.is_empty() {
                SseLine::Empty
            } else {
                SseLine::Delta(text.to_string())
            }
        }
        Err(e) => {
            debug!(payload = %payload, error = %e, "Unparseable SSE payload");
            SseLine::Malformed
        }
    }
}

#[async_trait]
impl ChatStream for DeepSeekAdapter {
    fn name(&self) -> &str {
        "deepseek"
    }

    fn prompt_shape(&self) -> PromptShape {
        PromptShape::RoleMessages
    }

    async fn stream_chat(
        &self,
        prompt: AssembledPrompt,
    ) -> std::result::Result<tokio::sync::mpsc::Receiver<StreamEvent>, UpstreamError> {
        let api_key = self.require_key()?.to_string();
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": prompt.into_role_messages(),
            "stream": true,
        });

        debug!(model = %self.model, url = %url, "Opening DeepSeek stream");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = response.status().as_u16();
        if status != 200 {
            warn!(status, "DeepSeek returned non-success status");
            return Err(UpstreamError::Connect {
                status,
                message: format!("DeepSeek API error: {status}"),
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

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    let event = match classify_sse_line(&line) {
                        SseLine::Skip | SseLine::Empty => continue,
                        SseLine::Done => {
                            // Stop on the first terminal signal; trailing
                            // buffered data is discarded, not an error.
                            let _ = tx.send(StreamEvent::Done).await;
                            return;
                        }
                        SseLine::Delta(text) => StreamEvent::TextDelta(text),
                        SseLine::Malformed => {
                            StreamEvent::Error("Failed to parse DeepSeek response".into())
                        }
                    };

                    if tx.send(event).await.is_err() {
                        return; // receiver dropped — caller is gone
                    }
                }
            }

            // Upstream closed without [DONE] — exhaustion is terminal.
            let _ = tx.send(StreamEvent::Done).await;
        });

        Ok(rx)
    }

    async fn health_check(&self) -> std::result::Result<bool, UpstreamError> {
        let api_key = self.require_key()?;
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {api_key}"))
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
