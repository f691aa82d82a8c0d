//! `hudgate serve` — Start the HTTP gateway.

use hudgate_config::AppConfig;

pub async fn run(
    port_override: Option<u16>,
    provider_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(provider) = provider_override {
        if !matches!(provider.as_str(), "ollama" | "deepseek") {
            return Err(format!("unknown provider '{provider}' — expected \"ollama\" or \"deepseek\"").into());
        }
        config.provider = provider;
    }

    println!("hudgate gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {}", config.provider);

    hudgate_gateway::start(config).await?;

    Ok(())
}
