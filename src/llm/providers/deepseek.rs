use crate::env::endpoints;
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
use tracing::debug;

/// DeepSeek chat completions.
///
/// `deepseek-reasoner` needs strictly alternating turns and no system role,
/// and streams its chain of thought as `reasoning_content`.
pub struct DeepSeekHandler {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    api_key: String,
    base_url: String,
}

impl DeepSeekHandler {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, LLMError> {
        let api_key = require_api_key(&config)?;
        let base_url = base_url(&config, endpoints::DEEPSEEK_BASE_URL)?;
        Ok(Self {
            config,
            transport,
            api_key,
            base_url,
        })
    }
}

fn is_reasoner(model_id: &str) -> bool {
    model_id.contains("reasoner")
}

impl ApiHandler for DeepSeekHandler {
    fn create_message(&self, system: &str, conversation: &Conversation) -> ApiStream {
        let model = self.resolve_model();
        let messages = match chat_messages(system, conversation, is_reasoner(&model.id)) {
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

        debug!("DeepSeek request for model {}", model.id);
        stream_chat_completions(self.transport.clone(), request, model.info)
    }

    fn resolve_model(&self) -> ResolvedModel {
        registry::resolve_model(self.config.provider_type, self.config.model_id())
    }

    fn provider_name(&self) -> &'static str {
        "deepseek"
    }
}
