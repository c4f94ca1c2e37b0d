//! `haru weather`: run the weather tool directly and print its JSON.

use haru_tools::WeatherTool;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    location: &str,
    date: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_weather_key() {
        eprintln!("  ⚠️  OPENWEATHER_API_KEY not set; only a placeholder result is available");
    }

    let tool = WeatherTool::new(&config.weather);
    let result = tool.lookup(location, date).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
