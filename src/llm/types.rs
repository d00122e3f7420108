use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Supported LLM provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Anthropic,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAI,
    DeepSeek,
    /// Alibaba DashScope (compatible mode)
    Qwen,
    /// Volcengine Ark
    Ark,
}

impl ProviderType {
    pub const ALL: [ProviderType; 5] = [
        ProviderType::Anthropic,
        ProviderType::OpenAI,
        ProviderType::DeepSeek,
        ProviderType::Qwen,
        ProviderType::Ark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "anthropic",
            ProviderType::OpenAI => "openai",
            ProviderType::DeepSeek => "deepseek",
            ProviderType::Qwen => "qwen",
            ProviderType::Ark => "ark",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(ProviderType::Anthropic),
            "openai" => Ok(ProviderType::OpenAI),
            "deepseek" => Ok(ProviderType::DeepSeek),
            "qwen" => Ok(ProviderType::Qwen),
            "ark" => Ok(ProviderType::Ark),
            other => Err(LLMError::InvalidRequest(format!(
                "Unknown provider '{}'. Expected one of: anthropic, openai, deepseek, qwen, ark",
                other
            ))),
        }
    }
}

/// Provider-specific connection parameters.
///
/// Owned by the caller and cloned into each handler; handlers never mutate it.
/// `additional_config` carries routing hints and behavioral flags such as
/// `api_line` (Qwen) or `thinking_budget_tokens` (Anthropic). Keys a provider
/// does not understand are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub additional_config: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            ..Default::default()
        }
    }

    /// Configured model id, with empty strings treated as unset
    pub fn model_id(&self) -> Option<&str> {
        self.model.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn hint_str(&self, key: &str) -> Option<&str> {
        self.additional_config.get(key).and_then(|v| v.as_str())
    }

    pub fn hint_u64(&self, key: &str) -> Option<u64> {
        self.additional_config.get(key).and_then(|v| v.as_u64())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Anthropic,
            api_key: None,
            base_url: None,
            model: None,
            temperature: None,
            max_tokens: None,
            additional_config: HashMap::new(),
        }
    }
}

/// Static capability and pricing metadata for one model.
///
/// Prices are USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelInfo {
    pub max_tokens: u32,
    pub context_window: u32,
    pub supports_images: bool,
    pub supports_prompt_cache: bool,
    pub supports_computer_use: bool,
    pub input_price: f64,
    pub output_price: f64,
    pub cache_writes_price: Option<f64>,
    pub cache_reads_price: Option<f64>,
    pub description: &'static str,
}

impl ModelInfo {
    /// Cost of one usage report, using cache prices where the model has them
    pub fn calculate_cost(&self, usage: &Usage) -> f64 {
        let per_token = |price: f64, tokens: u64| price / 1_000_000.0 * tokens as f64;

        let cache_writes = per_token(
            self.cache_writes_price.unwrap_or(0.0),
            usage.cache_write_tokens.unwrap_or(0),
        );
        let cache_reads = per_token(
            self.cache_reads_price.unwrap_or(0.0),
            usage.cache_read_tokens.unwrap_or(0),
        );

        per_token(self.input_price, usage.input_tokens)
            + per_token(self.output_price, usage.output_tokens)
            + cache_writes
            + cache_reads
    }
}

/// A model id paired with the record it resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedModel {
    pub id: String,
    pub info: ModelInfo,
}

/// Token accounting for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    /// Set on the report that closes the backend's accounting for the request
    #[serde(skip)]
    pub terminal: bool,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            ..Default::default()
        }
    }

    pub fn with_cache(mut self, cache_write_tokens: u64, cache_read_tokens: u64) -> Self {
        self.cache_write_tokens = Some(cache_write_tokens);
        self.cache_read_tokens = Some(cache_read_tokens);
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn priced(mut self, info: &ModelInfo) -> Self {
        self.total_cost = Some(info.calculate_cost(&self));
        self
    }
}

/// How successive usage events from one stream combine into the final count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePolicy {
    /// Each event is a delta; fields are summed.
    Sum,
    /// Each event is a cumulative snapshot; the latest value of each field wins.
    LastWriteWins,
}

/// Normalized output event produced by every handler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Text { text: String },
    Reasoning { reasoning: String },
    Usage(Usage),
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        StreamEvent::Text { text: text.into() }
    }

    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        StreamEvent::Reasoning {
            reasoning: reasoning.into(),
        }
    }

    pub fn is_terminal_usage(&self) -> bool {
        matches!(self, StreamEvent::Usage(usage) if usage.terminal)
    }
}

/// Generic LLM errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("Backend error ({status}): {message}")]
    BackendFault { status: u16, message: String },
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Model not available: {0}")]
    ModelUnavailable(String),
    #[error("Conversation conversion failed: {0}")]
    Conversion(String),
}

impl LLMError {
    /// Transport failures, throttling and backend faults may succeed on a fresh attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LLMError::Network(_) | LLMError::RateLimit { .. } | LLMError::BackendFault { .. }
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LLMError::Network(_))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LLMError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LLMError::Network(_) => "Network",
            LLMError::RateLimit { .. } => "RateLimit",
            LLMError::BackendFault { .. } => "BackendFault",
            LLMError::Authentication(_) => "Authentication",
            LLMError::InvalidRequest(_) => "InvalidRequest",
            LLMError::ModelUnavailable(_) => "ModelUnavailable",
            LLMError::Conversion(_) => "Conversion",
        }
    }
}
