//! Stream plumbing shared by every handler.
//!
//! Handlers return an [`ApiStream`]: a lazy, pull-based sequence of
//! [`StreamEvent`]s. Nothing happens on the network until the caller polls
//! it, and dropping it releases the underlying connection.

use crate::llm::types::{LLMError, StreamEvent, Usage, UsagePolicy};
use bytes::Bytes;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;

pub type ApiStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LLMError>> + Send>>;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LLMError>> + Send>>;

/// A stream that fails immediately with `error`
pub fn error_stream(error: LLMError) -> ApiStream {
    Box::pin(stream::once(async move { Err(error) }))
}

/// Decode a byte stream as server-sent events.
///
/// Decoding buffers across chunk boundaries, so event data is always whole
/// UTF-8 text even when a multi-byte character is split between reads.
pub fn sse_events(bytes: ByteStream) -> impl Stream<Item = Result<Event, LLMError>> + Send {
    bytes.eventsource().map(|item| {
        item.map_err(|err| match err {
            EventStreamError::Transport(inner) => inner,
            other => LLMError::Network(format!("Malformed event stream: {}", other)),
        })
    })
}

/// Folds usage events according to a handler's [`UsagePolicy`]
#[derive(Debug, Clone)]
pub struct UsageAccumulator {
    policy: UsagePolicy,
    total: Option<Usage>,
}

impl UsageAccumulator {
    pub fn new(policy: UsagePolicy) -> Self {
        Self {
            policy,
            total: None,
        }
    }

    pub fn record(&mut self, usage: &Usage) {
        let current = self.total.get_or_insert_with(Usage::default);
        current.terminal |= usage.terminal;
        match self.policy {
            UsagePolicy::Sum => {
                current.input_tokens += usage.input_tokens;
                current.output_tokens += usage.output_tokens;
                current.cache_write_tokens = add_optional(current.cache_write_tokens, usage.cache_write_tokens);
                current.cache_read_tokens = add_optional(current.cache_read_tokens, usage.cache_read_tokens);
                current.total_cost = add_optional(current.total_cost, usage.total_cost);
            }
            UsagePolicy::LastWriteWins => {
                current.input_tokens = usage.input_tokens;
                current.output_tokens = usage.output_tokens;
                if usage.cache_write_tokens.is_some() {
                    current.cache_write_tokens = usage.cache_write_tokens;
                }
                if usage.cache_read_tokens.is_some() {
                    current.cache_read_tokens = usage.cache_read_tokens;
                }
                if usage.total_cost.is_some() {
                    current.total_cost = usage.total_cost;
                }
            }
        }
    }

    pub fn total(&self) -> Option<Usage> {
        self.total
    }
}

fn add_optional<T: std::ops::Add<Output = T>>(current: Option<T>, delta: Option<T>) -> Option<T> {
    match (current, delta) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Everything a finished stream produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletedResponse {
    pub text: String,
    pub reasoning: String,
    pub usage: Option<Usage>,
}

/// Drain a stream, concatenating deltas and folding usage
pub async fn collect_response(
    mut stream: ApiStream,
    policy: UsagePolicy,
) -> Result<CompletedResponse, LLMError> {
    let mut response = CompletedResponse::default();
    let mut usage = UsageAccumulator::new(policy);

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::Text { text } => response.text.push_str(&text),
            StreamEvent::Reasoning { reasoning } => response.reasoning.push_str(&reasoning),
            StreamEvent::Usage(delta) => usage.record(&delta),
        }
    }

    response.usage = usage.total();
    Ok(response)
}
