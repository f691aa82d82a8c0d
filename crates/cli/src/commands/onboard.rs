//! `hudgate onboard` — Write a starter config file.

use hudgate_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("hudgate — first-time setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("  Config already exists: {}", config_path.display());
        println!("  Edit it directly, or delete it and re-run `hudgate onboard`.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Wrote starter config: {}", config_path.display());
    println!();
    println!("  Next steps:");
    println!("  - local model:  install Ollama, pull a model, then `hudgate serve`");
    println!("  - hosted model: set DEEPSEEK_API_KEY and `hudgate serve --provider deepseek`");

    Ok(())
}
