//! Backend adapters, one per provider family.

pub mod anthropic;
pub mod ark;
pub mod deepseek;
pub mod openai;
pub mod openai_compatible;
pub mod qwen;

pub use anthropic::AnthropicHandler;
pub use ark::ArkHandler;
pub use deepseek::DeepSeekHandler;
pub use openai::OpenAIHandler;
pub use qwen::QwenHandler;

use crate::env;
use crate::llm::types::{LLMError, ProviderConfig};
use tracing::debug;
use url::Url;

/// API key from the configuration, else from the provider's environment variable
pub(crate) fn configured_api_key(config: &ProviderConfig) -> Option<String> {
    if let Some(key) = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    {
        return Some(key.to_string());
    }

    let var = env::credential_env_var(config.provider_type);
    let key = std::env::var(var)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());
    if key.is_some() {
        debug!("Using {} from the environment", var);
    }
    key
}

pub(crate) fn require_api_key(config: &ProviderConfig) -> Result<String, LLMError> {
    configured_api_key(config).ok_or_else(|| {
        LLMError::Authentication(format!(
            "No API key configured for {} (set api_key or {})",
            config.provider_type,
            env::credential_env_var(config.provider_type)
        ))
    })
}

/// Configured endpoint or `default`, without a trailing slash
pub(crate) fn base_url(config: &ProviderConfig, default: &str) -> Result<String, LLMError> {
    let Some(configured) = config
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    else {
        return Ok(default.to_string());
    };

    let parsed = Url::parse(configured).map_err(|e| {
        LLMError::InvalidRequest(format!("Invalid base_url '{}': {}", configured, e))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LLMError::InvalidRequest(format!(
            "Unsupported base_url scheme '{}'",
            parsed.scheme()
        )));
    }

    Ok(configured.trim_end_matches('/').to_string())
}
