//! Anthropic Messages API adapter.
//!
//! The Messages stream reports usage in pieces: `message_start` carries the
//! input (and cache) counts, `message_delta` carries a running output count.
//! The parser turns those into deltas so the handler's usage events can be
//! summed.

use crate::env::{endpoints, hints};
use crate::llm::message::Conversation;
use crate::llm::provider::ApiHandler;
use crate::llm::providers::{base_url, require_api_key};
use crate::llm::registry;
use crate::llm::stream::{ApiStream, sse_events};
use crate::llm::transform::{to_anthropic_messages, to_anthropic_system};
use crate::llm::transport::{HttpRequest, Transport, error_from_payload};
use crate::llm::types::{
    LLMError, ModelInfo, ProviderConfig, ResolvedModel, StreamEvent, Usage, UsagePolicy,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Smallest thinking budget the API accepts
const MIN_THINKING_BUDGET: u32 = 1024;

pub struct AnthropicHandler {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    api_key: String,
    base_url: String,
}

impl AnthropicHandler {
    pub fn new(config: ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self, LLMError> {
        let api_key = require_api_key(&config)?;
        let base_url = base_url(&config, endpoints::ANTHROPIC_BASE_URL)?;
        Ok(Self {
            config,
            transport,
            api_key,
            base_url,
        })
    }

    /// Thinking budget, clamped below `max_tokens`; `None` disables thinking
    fn thinking_budget(&self, max_tokens: u32) -> Option<u32> {
        let requested = self.config.hint_u64(hints::THINKING_BUDGET_TOKENS)?;
        let budget = requested.min(max_tokens.saturating_sub(1) as u64) as u32;
        if budget < MIN_THINKING_BUDGET {
            warn!(
                "Thinking budget {} is below {}, extended thinking disabled",
                budget, MIN_THINKING_BUDGET
            );
            return None;
        }
        Some(budget)
    }

    fn request_body(&self, system: &str, conversation: &Conversation, model: &ResolvedModel) -> Value {
        let prompt_cache = model.info.supports_prompt_cache;
        let max_tokens = self.config.max_tokens.unwrap_or(model.info.max_tokens);

        let mut body = json!({
            "model": model.id,
            "max_tokens": max_tokens,
            "messages": to_anthropic_messages(conversation, prompt_cache),
            "stream": true,
        });

        if !system.is_empty() {
            body["system"] = to_anthropic_system(system, prompt_cache);
        }

        match self.thinking_budget(max_tokens) {
            // Temperature must stay at its default while thinking
            Some(budget) => {
                body["thinking"] = json!({ "type": "enabled", "budget_tokens": budget });
            }
            None => {
                body["temperature"] = json!(self.config.temperature.unwrap_or(0.0));
            }
        }

        body
    }
}

impl ApiHandler for AnthropicHandler {
    fn create_message(&self, system: &str, conversation: &Conversation) -> ApiStream {
        let model = self.resolve_model();
        let body = self.request_body(system, conversation, &model);
        let request = HttpRequest::post_json(format!("{}/v1/messages", self.base_url), body)
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", endpoints::ANTHROPIC_VERSION);

        debug!("Anthropic request for model {}", model.id);
        let transport = self.transport.clone();
        let info = model.info;

        Box::pin(async_stream::stream! {
            let bytes = match transport.open(request).await {
                Ok(bytes) => bytes,
                Err(error) => {
                    yield Err(error);
                    return;
                }
            };

            let mut parser = AnthropicStreamParser::new(info);
            let mut events = Box::pin(sse_events(bytes));
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                };
                if event.data.trim().is_empty() {
                    continue;
                }

                match parser.parse(&event.data) {
                    Ok(Some(parsed)) => yield Ok(parsed),
                    Ok(None) => {}
                    Err(error) => {
                        yield Err(error);
                        return;
                    }
                }
                if parser.is_finished() {
                    break;
                }
            }

            if !parser.is_finished() {
                warn!("Messages stream closed before message_stop");
                yield Err(LLMError::Network("stream ended before completion".to_string()));
            }
        })
    }

    fn resolve_model(&self) -> ResolvedModel {
        registry::resolve_model(self.config.provider_type, self.config.model_id())
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    fn usage_policy(&self) -> UsagePolicy {
        UsagePolicy::Sum
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessagesEvent {
    MessageStart {
        message: StartedMessage,
    },
    MessageDelta {
        #[serde(default)]
        delta: MessageDeltaBody,
        usage: Option<OutputUsage>,
    },
    ContentBlockStart {
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        delta: BlockDelta,
    },
    MessageStop,
    Error {
        error: ErrorPayload,
    },
    #[serde(other)]
    Ignored,
}

#[derive(Debug, Deserialize)]
struct StartedMessage {
    usage: InputUsage,
}

#[derive(Debug, Deserialize)]
struct InputUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MessageDeltaBody {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OutputUsage {
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    RedactedThinking,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Stateful translation of Messages API stream events
#[derive(Debug)]
pub(crate) struct AnthropicStreamParser {
    info: ModelInfo,
    output_reported: u64,
    finished: bool,
}

impl AnthropicStreamParser {
    pub(crate) fn new(info: ModelInfo) -> Self {
        Self {
            info,
            output_reported: 0,
            finished: false,
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn parse(&mut self, data: &str) -> Result<Option<StreamEvent>, LLMError> {
        let event: MessagesEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                warn!("Skipping unparseable Anthropic event: {}", e);
                return Ok(None);
            }
        };

        let parsed = match event {
            MessagesEvent::MessageStart { message } => {
                let usage = message.usage;
                self.output_reported = usage.output_tokens;
                Some(self.usage(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                    cache_write_tokens: usage.cache_creation_input_tokens,
                    cache_read_tokens: usage.cache_read_input_tokens,
                    total_cost: None,
                    terminal: false,
                }))
            }
            MessagesEvent::MessageDelta {
                delta,
                usage: Some(usage),
            } => {
                // output_tokens is a running total
                let output = usage.output_tokens.saturating_sub(self.output_reported);
                self.output_reported = self.output_reported.max(usage.output_tokens);
                let mut report = Usage::new(0, output);
                // The delta carrying stop_reason holds the final count
                report.terminal = delta.stop_reason.is_some();
                Some(self.usage(report))
            }
            MessagesEvent::MessageDelta { usage: None, .. } => None,
            MessagesEvent::ContentBlockStart { content_block } => match content_block {
                ContentBlock::Text { text } if !text.is_empty() => Some(StreamEvent::Text { text }),
                ContentBlock::Thinking { thinking } if !thinking.is_empty() => {
                    Some(StreamEvent::Reasoning { reasoning: thinking })
                }
                ContentBlock::RedactedThinking => {
                    Some(StreamEvent::reasoning("[Redacted thinking block]"))
                }
                _ => None,
            },
            MessagesEvent::ContentBlockDelta { delta } => match delta {
                BlockDelta::TextDelta { text } if !text.is_empty() => Some(StreamEvent::Text { text }),
                BlockDelta::ThinkingDelta { thinking } if !thinking.is_empty() => {
                    Some(StreamEvent::Reasoning { reasoning: thinking })
                }
                _ => None,
            },
            MessagesEvent::MessageStop => {
                self.finished = true;
                None
            }
            MessagesEvent::Error { error } => {
                return Err(error_from_payload(&error.kind, &error.message));
            }
            MessagesEvent::Ignored => None,
        };

        Ok(parsed)
    }

    fn usage(&self, usage: Usage) -> StreamEvent {
        StreamEvent::Usage(usage.priced(&self.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Turn;
    use crate::llm::types::ProviderType;

    fn parser() -> AnthropicStreamParser {
        AnthropicStreamParser::new(registry::resolve_model(ProviderType::Anthropic, None).info)
    }

    fn handler(config: ProviderConfig) -> AnthropicHandler {
        struct NoTransport;
        impl Transport for NoTransport {
            fn open(
                &self,
                _request: HttpRequest,
            ) -> futures::future::BoxFuture<'_, Result<crate::llm::stream::ByteStream, LLMError>>
            {
                Box::pin(async { Err(LLMError::Network("offline".into())) })
            }
        }
        AnthropicHandler::new(config, Arc::new(NoTransport)).unwrap()
    }

    fn keyed() -> ProviderConfig {
        ProviderConfig {
            api_key: Some("sk-ant-test".to_string()),
            ..ProviderConfig::new(ProviderType::Anthropic)
        }
    }

    #[test]
    fn test_usage_is_reported_as_deltas() {
        let mut parser = parser();
        let start = r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":10,"output_tokens":1,"cache_creation_input_tokens":4,"cache_read_input_tokens":2}}}"#;
        let first = r#"{"type":"message_delta","delta":{"stop_reason":null},"usage":{"output_tokens":6}}"#;
        let second = r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":8}}"#;

        let outputs: Vec<Usage> = [start, first, second]
            .iter()
            .map(|data| match parser.parse(data).unwrap() {
                Some(StreamEvent::Usage(usage)) => usage,
                other => panic!("expected usage, got {other:?}"),
            })
            .collect();

        assert_eq!(
            outputs.iter().map(|u| u.terminal).collect::<Vec<_>>(),
            vec![false, false, true]
        );
        assert_eq!(outputs[0].input_tokens, 10);
        assert_eq!(outputs[0].cache_write_tokens, Some(4));
        assert_eq!(outputs[0].cache_read_tokens, Some(2));
        assert_eq!(outputs[1].output_tokens, 5);
        assert_eq!(outputs[2].output_tokens, 2);
        assert_eq!(outputs.iter().map(|u| u.output_tokens).sum::<u64>(), 8);
    }

    #[test]
    fn test_text_and_thinking_blocks() {
        let mut parser = parser();
        let events: Vec<_> = [
            r#"{"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"hmm"}}"#,
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"abc"}}"#,
            r#"{"type":"content_block_stop","index":0}"#,
            r#"{"type":"content_block_start","index":1,"content_block":{"type":"redacted_thinking","data":"xyz"}}"#,
            r#"{"type":"content_block_start","index":2,"content_block":{"type":"text","text":"Hel"}}"#,
            r#"{"type":"content_block_delta","index":2,"delta":{"type":"text_delta","text":"lo"}}"#,
            r#"{"type":"ping"}"#,
        ]
        .iter()
        .filter_map(|data| parser.parse(data).unwrap())
        .collect();

        assert_eq!(
            events,
            vec![
                StreamEvent::reasoning("hmm"),
                StreamEvent::reasoning("[Redacted thinking block]"),
                StreamEvent::text("Hel"),
                StreamEvent::text("lo"),
            ]
        );
    }

    #[test]
    fn test_error_event_and_stop() {
        let mut parser = parser();
        let error = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert!(matches!(
            parser.parse(error),
            Err(LLMError::BackendFault { status: 529, .. })
        ));

        assert!(!parser.is_finished());
        parser.parse(r#"{"type":"message_stop"}"#).unwrap();
        assert!(parser.is_finished());
    }

    #[test]
    fn test_request_body_defaults() {
        let handler = handler(keyed());
        let model = handler.resolve_model();
        let conversation = Conversation::new().with_turn(Turn::user("hi"));
        let body = handler.request_body("rules", &conversation, &model);

        assert_eq!(body["model"], registry::ANTHROPIC_DEFAULT_MODEL_ID);
        assert_eq!(body["max_tokens"], model.info.max_tokens);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["stream"], true);
        assert_eq!(body["system"][0]["text"], "rules");
        assert!(body.get("thinking").is_none());
    }

    #[test]
    fn test_thinking_budget_is_clamped_and_drops_temperature() {
        let mut config = keyed();
        config.max_tokens = Some(4096);
        config
            .additional_config
            .insert(hints::THINKING_BUDGET_TOKENS.to_string(), json!(100_000));
        let handler = handler(config);
        let model = handler.resolve_model();
        let body = handler.request_body("", &Conversation::new().with_turn(Turn::user("x")), &model);

        assert_eq!(body["thinking"]["budget_tokens"], 4095);
        assert!(body.get("temperature").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_tiny_thinking_budget_disables_thinking() {
        let mut config = keyed();
        config
            .additional_config
            .insert(hints::THINKING_BUDGET_TOKENS.to_string(), json!(16));
        let handler = handler(config);
        let model = handler.resolve_model();
        let body = handler.request_body("", &Conversation::new().with_turn(Turn::user("x")), &model);

        assert!(body.get("thinking").is_none());
    }
}
