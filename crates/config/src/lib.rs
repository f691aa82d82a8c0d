//! Configuration loading, validation, and management for hudgate.
//!
//! Loads configuration from `~/.hudgate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.hudgate/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which upstream serves chat turns: "ollama" or "deepseek"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// The assistant personality injected as the system prompt
    #[serde(default = "default_personality")]
    pub personality: String,

    /// Upstream model-server configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Gateway (HTTP listener) configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Context retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Speech synthesis relay configuration
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Web search relay configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Weather relay configuration
    #[serde(default)]
    pub weather: WeatherConfig,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_personality() -> String {
    "You are a helpful AI assistant.".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("personality", &self.personality)
            .field("upstream", &self.upstream)
            .field("gateway", &self.gateway)
            .field("retrieval", &self.retrieval)
            .field("speech", &self.speech)
            .field("search", &self.search)
            .field("weather", &self.weather)
            .finish()
    }
}

/// Upstream model-server settings for both provider variants.
#[derive(Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the local Ollama-style server
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Model tag sent to the local server
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,

    /// Base URL of the hosted DeepSeek-style API
    #[serde(default = "default_deepseek_url")]
    pub deepseek_url: String,

    /// Model identifier sent to the hosted API
    #[serde(default = "default_deepseek_model")]
    pub deepseek_model: String,

    /// Bearer token for the hosted API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepseek_api_key: Option<String>,

    /// Whole-call wall-clock budget, sized for slow generation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434/api".into()
}
fn default_ollama_model() -> String {
    "deepseek-r1:7b".into()
}
fn default_deepseek_url() -> String {
    "https://api.deepseek.com/v1".into()
}
fn default_deepseek_model() -> String {
    "deepseek-chat".into()
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            deepseek_url: default_deepseek_url(),
            deepseek_model: default_deepseek_model(),
            deepseek_api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("ollama_url", &self.ollama_url)
            .field("ollama_model", &self.ollama_model)
            .field("deepseek_url", &self.deepseek_url)
            .field("deepseek_model", &self.deepseek_model)
            .field("deepseek_api_key", &redact(&self.deepseek_api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many passages to inject per turn
    #[serde(default = "default_retrieval_limit")]
    pub limit: usize,

    /// Whether to seed the store with the demo corpus at startup
    #[serde(default = "default_true")]
    pub seed_corpus: bool,
}

fn default_retrieval_limit() -> usize {
    2
}
fn default_true() -> bool {
    true
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_retrieval_limit(),
            seed_corpus: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    #[serde(default = "default_speech_url")]
    pub base_url: String,
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".into()
}
fn default_speech_url() -> String {
    "https://api.elevenlabs.io/v1".into()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: default_voice_id(),
            base_url: default_speech_url(),
        }
    }
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &redact(&self.api_key))
            .field("voice_id", &self.voice_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_url")]
    pub base_url: String,
}

fn default_search_url() -> String {
    "https://serpapi.com/search".into()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_search_url(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".into()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_url(),
        }
    }
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.hudgate/config.toml),
    /// then apply environment variable overrides.
    ///
    /// Recognized environment variables:
    /// - `HUDGATE_PROVIDER`           — upstream selection ("ollama"/"deepseek")
    /// - `MODEL_TAG`                  — local model tag
    /// - `PERSONALITY_SYSTEM_PROMPT`  — system personality text
    /// - `OLLAMA_BASE_URL`            — local server base URL
    /// - `DEEPSEEK_API_KEY`           — hosted API bearer token
    /// - `ELEVENLABS_API_KEY` / `ELEVENLABS_VOICE_ID` — speech relay
    /// - `OPENWEATHER_API_KEY`        — weather relay
    /// - `SEARCH_API_KEY`             — web search relay
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. No env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (highest priority).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(provider) = std::env::var("HUDGATE_PROVIDER") {
            self.provider = provider;
        }
        if let Ok(personality) = std::env::var("PERSONALITY_SYSTEM_PROMPT") {
            self.personality = personality;
        }
        if let Ok(model) = std::env::var("MODEL_TAG") {
            self.upstream.ollama_model = model;
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            self.upstream.ollama_url = url;
        }
        if self.upstream.deepseek_api_key.is_none() {
            self.upstream.deepseek_api_key = std::env::var("DEEPSEEK_API_KEY").ok();
        }
        if self.speech.api_key.is_none() {
            self.speech.api_key = std::env::var("ELEVENLABS_API_KEY").ok();
        }
        if let Ok(voice) = std::env::var("ELEVENLABS_VOICE_ID") {
            self.speech.voice_id = voice;
        }
        if self.weather.api_key.is_none() {
            self.weather.api_key = std::env::var("OPENWEATHER_API_KEY").ok();
        }
        if self.search.api_key.is_none() {
            self.search.api_key = std::env::var("SEARCH_API_KEY").ok();
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".hudgate")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.provider.as_str() {
            "ollama" | "deepseek" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown provider '{other}' — expected \"ollama\" or \"deepseek\""
                )));
            }
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "upstream.timeout_secs must be greater than zero".into(),
            ));
        }

        if self.retrieval.limit == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.limit must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            personality: default_personality(),
            upstream: UpstreamConfig::default(),
            gateway: GatewayConfig::default(),
            retrieval: RetrievalConfig::default(),
            speech: SpeechConfig::default(),
            search: SearchConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
