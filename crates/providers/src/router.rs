//! Adapter selection — builds the configured upstream from `AppConfig`.
//!
//! Selection happens once at startup; everything downstream holds an
//! `Arc<dyn ChatStream>` and never branches on provider identity again.

use std::sync::Arc;
use std::time::Duration;

use hudgate_config::AppConfig;
use hudgate_core::upstream::ChatStream;

use crate::deepseek::DeepSeekAdapter;
use crate::ollama::OllamaAdapter;

/// Build the upstream adapter named by `config.provider`.
///
/// `AppConfig::validate` has already constrained the provider name, so any
/// unrecognized value falls back to the local adapter.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn ChatStream> {
    let timeout = Duration::from_secs(config.upstream.timeout_secs);

    match config.provider.as_str() {
        "deepseek" => Arc::new(DeepSeekAdapter::new(
            &config.upstream.deepseek_url,
            &config.upstream.deepseek_model,
            config.upstream.deepseek_api_key.clone(),
            timeout,
        )),
        _ => Arc::new(OllamaAdapter::new(
            &config.upstream.ollama_url,
            &config.upstream.ollama_model,
            timeout,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hudgate_core::upstream::PromptShape;

    #[test]
    fn default_config_selects_ollama() {
        let config = AppConfig::default();
        let adapter = build_from_config(&config);
        assert_eq!(adapter.name(), "ollama");
        assert_eq!(adapter.prompt_shape(), PromptShape::FlatText);
    }

    #[test]
    fn deepseek_provider_selects_sse_adapter() {
        let config = AppConfig {
            provider: "deepseek".into(),
            ..AppConfig::default()
        };
        let adapter = build_from_config(&config);
        assert_eq!(adapter.name(), "deepseek");
        assert_eq!(adapter.prompt_shape(), PromptShape::RoleMessages);
    }
}
