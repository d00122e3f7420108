//! Shared plumbing for backends that speak the chat-completions protocol.
//!
//! OpenAI, DeepSeek, DashScope and Ark all stream `data: {chunk}` lines
//! terminated by `data: [DONE]`. Chunks carry `delta.content`, optionally
//! `delta.reasoning_content`, and a cumulative `usage` object when
//! `stream_options.include_usage` is requested.

use crate::llm::message::Conversation;
use crate::llm::stream::{ApiStream, sse_events};
use crate::llm::transform::{convert_to_r1_format, to_openai_messages};
use crate::llm::transport::{HttpRequest, Transport, error_from_payload};
use crate::llm::types::{LLMError, ModelInfo, StreamEvent, Usage};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

/// Message array for a chat-completions body.
///
/// With `r1` set the system text becomes a leading user turn and same-role
/// runs are merged, for backends that reject either.
pub fn chat_messages(
    system: &str,
    conversation: &Conversation,
    r1: bool,
) -> Result<Vec<Value>, LLMError> {
    if r1 {
        let merged = convert_to_r1_format(system, conversation)?;
        Ok(to_openai_messages(None, &merged))
    } else {
        Ok(to_openai_messages(Some(system), conversation))
    }
}

/// Streaming chat-completions body. `None` fields are left to the backend default.
pub fn chat_completions_body(
    model_id: &str,
    messages: Vec<Value>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Value {
    let mut body = json!({
        "model": model_id,
        "messages": messages,
        "stream": true,
        "stream_options": { "include_usage": true },
    });
    if let Some(temperature) = temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

pub fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url)
}

/// Open `request` and translate its SSE chunks into normalized events.
///
/// Usage is reported as cumulative snapshots and priced with `info`.
pub fn stream_chat_completions(
    transport: Arc<dyn Transport>,
    request: HttpRequest,
    info: ModelInfo,
) -> ApiStream {
    Box::pin(async_stream::stream! {
        let bytes = match transport.open(request).await {
            Ok(bytes) => bytes,
            Err(error) => {
                yield Err(error);
                return;
            }
        };

        let mut events = Box::pin(sse_events(bytes));
        let mut done = false;
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(error) => {
                    yield Err(error);
                    return;
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                debug!("Chat completion stream finished");
                done = true;
                break;
            }

            match parse_chunk(data, &info) {
                Ok(parsed) => {
                    for parsed_event in parsed {
                        yield Ok(parsed_event);
                    }
                }
                Err(error) => {
                    yield Err(error);
                    return;
                }
            }
        }

        if !done {
            warn!("Chat completion stream closed before [DONE]");
            yield Err(LLMError::Network("stream ended before completion".to_string()));
        }
    })
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    usage: Option<ChunkUsage>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    prompt_tokens_details: Option<PromptTokensDetails>,
    // DeepSeek context caching
    prompt_cache_hit_tokens: Option<u64>,
    prompt_cache_miss_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PromptTokensDetails {
    cached_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<Value>,
}

/// Parse one `data:` payload into zero or more events.
///
/// Text precedes reasoning within a chunk and usage comes last. Payloads that
/// are not valid JSON are skipped; embedded error objects become errors.
pub(crate) fn parse_chunk(data: &str, info: &ModelInfo) -> Result<Vec<StreamEvent>, LLMError> {
    let chunk: ChatChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!("Skipping unparseable stream chunk: {}", e);
            return Ok(Vec::new());
        }
    };

    if let Some(error) = chunk.error {
        let kind = error
            .kind
            .or_else(|| {
                error.code.map(|code| match code {
                    Value::String(code) => code,
                    other => other.to_string(),
                })
            })
            .unwrap_or_default();
        let message = error
            .message
            .unwrap_or_else(|| "backend reported an error".to_string());
        return Err(error_from_payload(&kind, &message));
    }

    let mut events = Vec::new();
    for delta in chunk.choices.into_iter().filter_map(|choice| choice.delta) {
        if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::Text { text });
        }
        if let Some(reasoning) = delta.reasoning_content.filter(|r| !r.is_empty()) {
            events.push(StreamEvent::Reasoning { reasoning });
        }
    }

    if let Some(usage) = chunk.usage {
        // Usage only arrives in the closing chunk
        events.push(StreamEvent::Usage(
            usage_from_chunk(&usage).terminal().priced(info),
        ));
    }

    Ok(events)
}

fn usage_from_chunk(usage: &ChunkUsage) -> Usage {
    match (usage.prompt_cache_hit_tokens, usage.prompt_cache_miss_tokens) {
        (None, None) => {
            let cached = usage
                .prompt_tokens_details
                .as_ref()
                .and_then(|details| details.cached_tokens);
            match cached {
                Some(cached) => Usage {
                    input_tokens: usage.prompt_tokens.saturating_sub(cached),
                    output_tokens: usage.completion_tokens,
                    cache_read_tokens: Some(cached),
                    ..Default::default()
                },
                None => Usage::new(usage.prompt_tokens, usage.completion_tokens),
            }
        }
        (hit, miss) => {
            // Misses are billed as cache writes, hits as cache reads
            let hit = hit.unwrap_or(0);
            let miss = miss.unwrap_or(0);
            Usage::new(
                usage.prompt_tokens.saturating_sub(hit + miss),
                usage.completion_tokens,
            )
            .with_cache(miss, hit)
        }
    }
}
