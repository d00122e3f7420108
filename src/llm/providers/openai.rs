use crate::env::endpoints;
use crate::llm::message::Conversation;
use crate::llm::provider::ApiHandler;
use crate::llm::providers::openai_compatible::{
    chat_completions_body, chat_completions_url, chat_messages, stream_chat_completions,
};
use crate::llm::providers::{base_url, configured_api_key};
use crate::llm::registry;
use crate::llm::stream::{ApiStream, error_stream};
use crate::llm::transport::{HttpRequest, Transport};
use crate::llm::types::{LLMError, ProviderConfig, ResolvedModel};
use std::sync::Arc;
use tracing::debug;

/// Generic OpenAI-compatible chat completions adapter.
///
/// Works against api.openai.com and against local or proxy servers that
/// mimic it, so the credential is optional and the configured model id is
/// sent verbatim even when the registry does not know it.
pub struct OpenAIHandler {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAIHandler {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, LLMError> {
        let api_key = configured_api_key(&config);
        let base_url = base_url(&config, endpoints::OPENAI_BASE_URL)?;
        Ok(Self {
            config,
            transport,
            api_key,
            base_url,
        })
    }
}

impl ApiHandler for OpenAIHandler {
    fn create_message(&self, system: &str, conversation: &Conversation) -> ApiStream {
        let messages = match chat_messages(system, conversation, false) {
            Ok(messages) => messages,
            Err(error) => return error_stream(error),
        };

        let model_id = self.request_model_id();
        // Reasoning models reject sampling overrides, so only send what was configured
        let body = chat_completions_body(
            &model_id,
            messages,
            self.config.temperature,
            self.config.max_tokens,
        );

        let mut request = HttpRequest::post_json(chat_completions_url(&self.base_url), body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("OpenAI-compatible request for model {}", model_id);
        stream_chat_completions(self.transport.clone(), request, self.resolve_model().info)
    }

    fn resolve_model(&self) -> ResolvedModel {
        registry::resolve_model(self.config.provider_type, self.config.model_id())
    }

    /// The configured id verbatim, so local servers get the names they expect
    fn request_model_id(&self) -> String {
        self.config
            .model_id()
            .map(str::to_string)
            .unwrap_or_else(|| self.resolve_model().id)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
