//! `haru serve`: start the HTTP gateway.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_llm_key() {
        super::print_missing_llm_key(&super::config_path(config_path));
        return Err("No language-model API key found. See above for setup instructions.".into());
    }

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("☀️  Haru Gateway");
    println!(
        "   Listening: http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("   Model:     {}", config.llm.model);
    println!(
        "   Weather:   {}",
        if config.has_weather_key() {
            "OpenWeatherMap"
        } else {
            "disabled (no OPENWEATHER_API_KEY)"
        }
    );

    haru_gateway::start(config).await?;

    Ok(())
}
