pub mod chat;
pub mod doctor;
pub mod fortune;
pub mod onboard;
pub mod serve;
pub mod weather;

use haru_config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};

/// Where the config lives: the `--config` override or `~/.haru/config.toml`.
pub fn config_path(override_path: Option<&Path>) -> PathBuf {
    match override_path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    }
}

/// Load the config with environment overrides applied.
pub fn load_config(override_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    AppConfig::load_path(&config_path(override_path))
}

/// Printed when a command needs the language model but no key is set.
pub fn print_missing_llm_key(path: &Path) {
    eprintln!();
    eprintln!("  ERROR: No language-model API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    HARU_LLM_API_KEY=...   (any OpenAI-compatible endpoint)");
    eprintln!("    GROQ_API_KEY=gsk_...   (Groq, the default provider)");
    eprintln!();
    eprintln!("  Or add `api_key` under [llm] in:");
    eprintln!("    {}", path.display());
    eprintln!();
}
