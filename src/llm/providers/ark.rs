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

/// Volcengine Ark.
///
/// Every Ark model is fed the R1 shape. The configured id goes on the wire
/// unchanged because Ark deployments are addressed by endpoint ids
/// (`ep-...`) the registry cannot know; pricing and limits still come from
/// the resolved registry record.
pub struct ArkHandler {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    api_key: String,
    base_url: String,
}

impl ArkHandler {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, LLMError> {
        let api_key = require_api_key(&config)?;
        let base_url = base_url(&config, endpoints::ARK_BASE_URL)?;
        Ok(Self {
            config,
            transport,
            api_key,
            base_url,
        })
    }
}

impl ApiHandler for ArkHandler {
    fn create_message(&self, system: &str, conversation: &Conversation) -> ApiStream {
        let messages = match chat_messages(system, conversation, true) {
            Ok(messages) => messages,
            Err(error) => return error_stream(error),
        };

        let model = self.resolve_model();
        let model_id = self.request_model_id();

        let body = chat_completions_body(
            &model_id,
            messages,
            Some(self.config.temperature.unwrap_or(0.0)),
            self.config.max_tokens,
        );
        let request = HttpRequest::post_json(chat_completions_url(&self.base_url), body)
            .bearer_auth(&self.api_key);

        debug!("Ark request for {}", model_id);
        stream_chat_completions(self.transport.clone(), request, model.info)
    }

    fn resolve_model(&self) -> ResolvedModel {
        registry::resolve_model(self.config.provider_type, self.config.model_id())
    }

    fn request_model_id(&self) -> String {
        self.config
            .model_id()
            .map(str::to_string)
            .unwrap_or_else(|| self.resolve_model().id)
    }

    fn provider_name(&self) -> &'static str {
        "ark"
    }
}
