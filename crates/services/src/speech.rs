//! Speech synthesis relay — streams audio from an ElevenLabs-style API.
//!
//! Unlike the lookup relays, speech has no useful fallback: a missing
//! credential fails the call immediately with `NotConfigured`, and an
//! upstream rejection is surfaced with its status and body.

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use hudgate_config::SpeechConfig;
use hudgate_core::error::SpeechError;

/// Default voice model sent with every request.
const MODEL_ID: &str = "eleven_monolingual_v1";

/// Relays text-to-speech calls, yielding audio as a lazy chunk stream.
pub struct SpeechSynthesizer {
    api_key: Option<String>,
    voice_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl SpeechSynthesizer {
    pub fn new(config: &SpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            voice_id: config.voice_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Whether a credential is configured at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Synthesize `text`, returning a receiver of audio byte chunks.
    ///
    /// `voice` overrides the configured voice id when given. Chunks arrive
    /// in upstream order; the upstream connection is released when the
    /// stream ends or the receiver is dropped.
    pub async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<mpsc::Receiver<Result<Vec<u8>, SpeechError>>, SpeechError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            SpeechError::NotConfigured("ELEVENLABS_API_KEY is not set".into())
        })?;

        let voice_id = voice.unwrap_or(&self.voice_id);
        let url = format!("{}/text-to-speech/{voice_id}/stream", self.base_url);

        let body = serde_json::json!({
            "text": text,
            "model_id": MODEL_ID,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
            },
        });

        debug!(voice = %voice_id, text_len = text.len(), "Opening speech stream");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| SpeechError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, "Speech upstream rejected request");
            return Err(SpeechError::Upstream { status, body });
        }

        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            while let Some(chunk_result) = byte_stream.next().await {
                let item = match chunk_result {
                    Ok(bytes) => Ok(bytes.to_vec()),
                    Err(e) => {
                        let _ = tx.send(Err(SpeechError::Network(e.to_string()))).await;
                        return;
                    }
                };
                if tx.send(item).await.is_err() {
                    return; // receiver dropped — caller is gone
                }
            }
        });

        Ok(rx)
    }
}
