use crate::llm::message::Conversation;
use crate::llm::providers::{
    AnthropicHandler, ArkHandler, DeepSeekHandler, OpenAIHandler, QwenHandler,
};
use crate::llm::registry;
use crate::llm::retry::{RetryConfig, RetryExecutor, RetryObserver};
use crate::llm::stream::{ApiStream, error_stream};
use crate::llm::transport::{ReqwestTransport, Transport, TransportConfig};
use crate::llm::types::{
    LLMError, ProviderConfig, ProviderType, ResolvedModel, StreamEvent, UsagePolicy,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Contract every backend adapter satisfies
pub trait ApiHandler: Send + Sync {
    /// Start a streaming completion.
    ///
    /// The returned stream is lazy: no request is sent until it is polled.
    /// Each call issues its own request; a stream is never restarted.
    fn create_message(&self, system: &str, conversation: &Conversation) -> ApiStream;

    /// The model this handler sends requests for. Never performs I/O.
    fn resolve_model(&self) -> ResolvedModel;

    /// The model id placed in the request body
    fn request_model_id(&self) -> String {
        self.resolve_model().id
    }

    /// Get provider name/identifier
    fn provider_name(&self) -> &'static str;

    /// How the usage events of this handler's streams combine
    fn usage_policy(&self) -> UsagePolicy {
        UsagePolicy::LastWriteWins
    }
}

/// Select and construct the adapter for `config.provider_type`
pub fn build_api_handler(
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
) -> Result<Box<dyn ApiHandler>, LLMError> {
    let handler: Box<dyn ApiHandler> = match config.provider_type {
        ProviderType::Anthropic => Box::new(AnthropicHandler::new(config, transport)?),
        ProviderType::OpenAI => Box::new(OpenAIHandler::new(config, transport)?),
        ProviderType::DeepSeek => Box::new(DeepSeekHandler::new(config, transport)?),
        ProviderType::Qwen => Box::new(QwenHandler::new(config, transport)?),
        ProviderType::Ark => Box::new(ArkHandler::new(config, transport)?),
    };
    Ok(handler)
}

/// Caller-facing entry point: adapter selection plus retry
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    retry: RetryExecutor,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            retry: RetryExecutor::new(retry),
        }
    }

    /// Gateway over a fresh `reqwest` client
    pub fn with_reqwest(transport: &TransportConfig, retry: RetryConfig) -> Result<Self, LLMError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(transport)?), retry))
    }

    /// Be told before every retry, e.g. to discard partial output
    pub fn with_retry_observer(mut self, observer: RetryObserver) -> Self {
        self.retry = self.retry.with_observer(observer);
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    pub fn handler(&self, config: &ProviderConfig) -> Result<Box<dyn ApiHandler>, LLMError> {
        build_api_handler(config.clone(), self.transport.clone())
    }

    /// Model resolution never fails and never touches the network
    pub fn resolve_model(&self, config: &ProviderConfig) -> ResolvedModel {
        registry::resolve_model(config.provider_type, config.model_id())
    }

    /// Stream a completion for `conversation`, retrying transient failures.
    ///
    /// Adapter construction errors (e.g. a missing credential) surface as the
    /// first and only item of the stream.
    pub fn create_message(
        &self,
        system: &str,
        conversation: &Conversation,
        config: &ProviderConfig,
    ) -> ApiStream {
        let request_id = Uuid::new_v4();
        let model = self.resolve_model(config);
        let span = info_span!(
            "create_message",
            provider = %config.provider_type,
            model = %model.id,
            wire_model = tracing::field::Empty,
            request_id = %request_id
        );

        let handler: Arc<dyn ApiHandler> = match self.handler(config) {
            Ok(handler) => Arc::from(handler),
            Err(error) => {
                span.in_scope(|| warn!("Cannot build handler: {}", error));
                return error_stream(error);
            }
        };

        span.record("wire_model", handler.request_model_id().as_str());
        span.in_scope(|| {
            info!(
                "Dispatching {} turn(s) to {}",
                conversation.len(),
                handler.provider_name()
            )
        });

        let system = system.to_string();
        let conversation = conversation.clone();
        let mut attempts = self
            .retry
            .stream(move || handler.create_message(&system, &conversation));

        Box::pin(async_stream::stream! {
            let mut text_bytes = 0usize;
            let mut reasoning_bytes = 0usize;

            while let Some(item) = attempts.next().instrument(span.clone()).await {
                match &item {
                    Ok(StreamEvent::Text { text }) => text_bytes += text.len(),
                    Ok(StreamEvent::Reasoning { reasoning }) => reasoning_bytes += reasoning.len(),
                    Ok(StreamEvent::Usage(usage)) => {
                        span.in_scope(|| debug!(
                            "Usage: in={} out={}",
                            usage.input_tokens,
                            usage.output_tokens
                        ));
                    }
                    Err(error) => {
                        span.in_scope(|| warn!("Request failed: {}", error));
                    }
                }
                yield item;
            }

            span.in_scope(|| info!(
                "Stream finished ({} text bytes, {} reasoning bytes)",
                text_bytes,
                reasoning_bytes
            ));
        })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
