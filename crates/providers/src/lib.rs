//! LLM provider implementations for AIKA.
//!
//! All providers implement the `aika_core::Provider` trait. The agent loop
//! never knows which backend it is talking to.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use aika_config::AppConfig;
use aika_core::error::ProviderError;
use aika_core::provider::Provider;
use std::sync::Arc;

/// Build the configured provider. Fails when no API key is available —
/// this is the one unrecoverable startup condition.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

    let name = if config.base_url.contains("groq") {
        "groq"
    } else {
        "openai-compat"
    };

    Ok(Arc::new(OpenAiCompatProvider::new(
        name,
        &config.base_url,
        api_key,
    )))
}
