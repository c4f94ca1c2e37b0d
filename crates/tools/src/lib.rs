//! Built-in tools for Haru.
//!
//! The model can call three tools:
//! - `getWeather`: current or next-day weather via OpenWeatherMap
//! - `getFortune`: a randomly drawn daily fortune
//! - `getDateTime`: the current date and time in Korea

pub mod city;
pub mod datetime;
pub mod fortune;
pub mod weather;

use haru_config::AppConfig;
use haru_core::tool::ToolRegistry;

pub use datetime::{DateTimeInfo, DateTimeTool};
pub use fortune::{FortuneResult, FortuneTool};
pub use weather::{WeatherErrorCode, WeatherResult, WeatherTool};

/// Create the tool registry the chat orchestrator exposes to the model.
pub fn default_registry(config: &AppConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WeatherTool::new(&config.weather)));
    registry.register(Box::new(FortuneTool::new()));
    registry.register(Box::new(DateTimeTool::new()));
    registry
}
