//! `hudgate doctor` — Diagnose configuration and upstream reachability.

use hudgate_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("hudgate doctor — system diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    let config = if config_path.exists() {
        match AppConfig::load() {
            Ok(config) => {
                println!("  [ok]   Config file valid");
                config
            }
            Err(e) => {
                println!("  [fail] Config file invalid: {e}");
                return Err(e.into());
            }
        }
    } else {
        println!("  [warn] No config file at {} — using defaults", config_path.display());
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config
    };

    // Check the selected upstream
    println!("  [ok]   Provider selected: {}", config.provider);
    if config.provider == "deepseek" && config.upstream.deepseek_api_key.is_none() {
        println!("  [warn] DEEPSEEK_API_KEY not set — chat turns will fail");
        issues += 1;
    }

    let adapter = hudgate_providers::build_from_config(&config);
    match adapter.health_check().await {
        Ok(true) => println!("  [ok]   Upstream reachable ({})", adapter.name()),
        Ok(false) => {
            println!("  [warn] Upstream responded but unhealthy ({})", adapter.name());
            issues += 1;
        }
        Err(e) => {
            println!("  [warn] Upstream unreachable: {e}");
            issues += 1;
        }
    }

    // Auxiliary relays degrade without keys; report, don't fail.
    for (name, configured) in [
        ("speech (ELEVENLABS_API_KEY)", config.speech.api_key.is_some()),
        ("search (SEARCH_API_KEY)", config.search.api_key.is_some()),
        ("weather (OPENWEATHER_API_KEY)", config.weather.api_key.is_some()),
    ] {
        if configured {
            println!("  [ok]   {name} configured");
        } else {
            println!("  [info] {name} not configured — fallback mode");
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
