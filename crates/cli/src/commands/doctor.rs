//! `haru doctor`: diagnose configuration and credentials.

use haru_config::AppConfig;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug)]
pub struct Check {
    pub status: Status,
    pub message: String,
}

impl Check {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Haru Doctor: System Diagnostics");
    println!("==================================\n");

    let path = super::config_path(config_path);
    let checks = diagnose(&path, |k| std::env::var(k).ok());

    let mut issues = 0;
    for check in &checks {
        let mark = match check.status {
            Status::Ok => "✅",
            Status::Warn => "⚠️ ",
            Status::Fail => "❌",
        };
        if check.status != Status::Ok {
            issues += 1;
        }
        println!("  {mark} {}", check.message);
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}

/// Check the config at `path`, reading credentials through `env`.
/// Only the presence of keys is reported, never their values.
pub fn diagnose(path: &Path, env: impl Fn(&str) -> Option<String>) -> Vec<Check> {
    let mut checks = Vec::new();

    if path.exists() {
        checks.push(Check::new(
            Status::Ok,
            format!("Config file found: {}", path.display()),
        ));
    } else {
        checks.push(Check::new(
            Status::Warn,
            "No config file, using defaults. Run `haru onboard` to create one",
        ));
    }

    let config = match AppConfig::load_with_env(path, env) {
        Ok(config) => {
            checks.push(Check::new(Status::Ok, "Config valid"));
            config
        }
        Err(e) => {
            checks.push(Check::new(Status::Fail, format!("Config invalid: {e}")));
            return checks;
        }
    };

    if config.has_llm_key() {
        checks.push(Check::new(
            Status::Ok,
            format!("Language-model key configured ({})", config.llm.provider),
        ));
    } else {
        checks.push(Check::new(
            Status::Fail,
            "No language-model key. Set GROQ_API_KEY or HARU_LLM_API_KEY",
        ));
    }

    if config.has_weather_key() {
        checks.push(Check::new(Status::Ok, "OpenWeatherMap key configured"));
    } else {
        checks.push(Check::new(
            Status::Warn,
            "No OPENWEATHER_API_KEY. Weather answers will be limited",
        ));
    }

    checks
}
