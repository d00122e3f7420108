use crate::env::{endpoints, hints};
use crate::llm::message::Conversation;
use crate::llm::provider::ApiHandler;
use crate::llm::providers::openai_compatible::{
    chat_completions_body, chat_completions_url, chat_messages, stream_chat_completions,
};
use crate::llm::providers::{base_url, require_api_key};
use crate::llm::registry;
use crate::llm::stream::{ApiStream, error_stream};
use crate::llm::transport::{HttpRequest, Transport};
use crate::llm::types::{LLMError, ProviderConfig, ResolvedModel};
use std::sync::Arc;
use tracing::{debug, warn};

/// DashScope region selected by the `api_line` hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiLine {
    China,
    International,
}

impl ApiLine {
    pub fn from_config(config: &ProviderConfig) -> Self {
        match config.hint_str(hints::API_LINE) {
            None | Some("china") => ApiLine::China,
            Some("international") => ApiLine::International,
            Some(other) => {
                warn!("Unknown api_line '{}', using china", other);
                ApiLine::China
            }
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            ApiLine::China => endpoints::QWEN_CHINA_BASE_URL,
            ApiLine::International => endpoints::QWEN_INTERNATIONAL_BASE_URL,
        }
    }
}

/// Alibaba DashScope in OpenAI-compatible mode
pub struct QwenHandler {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    api_key: String,
    base_url: String,
}

impl QwenHandler {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, LLMError> {
        let api_key = require_api_key(&config)?;
        // An explicit endpoint overrides the api line
        let base_url = base_url(&config, ApiLine::from_config(&config).base_url())?;
        Ok(Self {
            config,
            transport,
            api_key,
            base_url,
        })
    }
}

/// Reasoning models hosted on DashScope reject system and repeated roles
fn needs_r1_format(model_id: &str) -> bool {
    model_id.starts_with("deepseek-r1") || model_id.starts_with("qwq")
}

impl ApiHandler for QwenHandler {
    fn create_message(&self, system: &str, conversation: &Conversation) -> ApiStream {
        let model = self.resolve_model();
        let messages = match chat_messages(system, conversation, needs_r1_format(&model.id)) {
            Ok(messages) => messages,
            Err(error) => return error_stream(error),
        };

        let body = chat_completions_body(
            &model.id,
            messages,
            Some(self.config.temperature.unwrap_or(0.0)),
            Some(self.config.max_tokens.unwrap_or(model.info.max_tokens)),
        );
        let request = HttpRequest::post_json(chat_completions_url(&self.base_url), body)
            .bearer_auth(&self.api_key);

        debug!("Qwen request for model {} via {}", model.id, self.base_url);
        stream_chat_completions(self.transport.clone(), request, model.info)
    }

    fn resolve_model(&self) -> ResolvedModel {
        registry::resolve_model(self.config.provider_type, self.config.model_id())
    }

    fn provider_name(&self) -> &'static str {
        "qwen"
    }
}
