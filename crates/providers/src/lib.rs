//! LLM provider implementations for Haru.
//!
//! All providers implement the `haru_core::Provider` trait. Groq, OpenAI and
//! any other OpenAI-compatible endpoint are served by [`OpenAiCompatProvider`].

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use haru_config::AppConfig;
use haru_core::Provider;
use haru_core::error::ProviderError;
use std::sync::Arc;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when no language-model credential is set.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.llm.api_key.as_deref().ok_or_else(|| {
        ProviderError::NotConfigured(format!(
            "no API key for provider '{}' (set HARU_LLM_API_KEY or GROQ_API_KEY)",
            config.llm.provider
        ))
    })?;

    tracing::debug!(
        provider = %config.llm.provider,
        url = %config.llm.api_url,
        model = %config.llm.model,
        "Building LLM provider"
    );

    Ok(Arc::new(
        OpenAiCompatProvider::new(&config.llm.provider, &config.llm.api_url, api_key)
            .with_timeout(std::time::Duration::from_secs(config.llm.timeout_secs)),
    ))
}
