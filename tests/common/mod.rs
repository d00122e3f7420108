#![allow(dead_code)]

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use llm_gateway::LLMError;
use llm_gateway::llm::stream::ByteStream;
use llm_gateway::llm::transport::{HttpRequest, Transport};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted response
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream these body chunks, then end
    Body(Vec<String>),
    /// Fail before any byte is returned
    Fail(LLMError),
    /// Stream these chunks, then fail mid-body
    BodyThenFail(Vec<String>, LLMError),
    /// Stream these chunks, then hang forever
    BodyThenHang(Vec<String>),
}

/// In-memory transport that replays scripted replies and records requests
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    requests: Mutex<Vec<HttpRequest>>,
    opened: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
        }
    }

    /// Answer every request with `reply`
    pub fn always(reply: Reply) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    pub fn request_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }
}

fn chunks(body: Vec<String>) -> impl futures::Stream<Item = Result<Bytes, LLMError>> + Send {
    stream::iter(body.into_iter().map(|chunk| Ok(Bytes::from(chunk))))
}

impl Transport for ScriptedTransport {
    fn open(&self, request: HttpRequest) -> BoxFuture<'_, Result<ByteStream, LLMError>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .expect("transport script exhausted");

        Box::pin(async move {
            match reply {
                Reply::Body(body) => Ok(Box::pin(chunks(body)) as ByteStream),
                Reply::Fail(error) => Err(error),
                Reply::BodyThenFail(body, error) => Ok(Box::pin(
                    chunks(body).chain(stream::once(async move { Err(error) })),
                ) as ByteStream),
                Reply::BodyThenHang(body) => {
                    Ok(Box::pin(chunks(body).chain(stream::pending())) as ByteStream)
                }
            }
        })
    }
}

/// Frame each JSON payload as one SSE `data:` event
pub fn sse(payloads: &[&str]) -> Vec<String> {
    payloads
        .iter()
        .map(|payload| format!("data: {}\n\n", payload))
        .collect()
}

/// Chat-completions stream answering `parts` and reporting cumulative usage
pub fn chat_completion_body(parts: &[&str], usage: &[(u64, u64)]) -> Vec<String> {
    let mut payloads: Vec<String> = parts
        .iter()
        .map(|text| {
            serde_json::json!({ "choices": [{ "delta": { "content": text } }] }).to_string()
        })
        .collect();
    for (prompt, completion) in usage {
        payloads.push(
            serde_json::json!({
                "choices": [],
                "usage": { "prompt_tokens": prompt, "completion_tokens": completion }
            })
            .to_string(),
        );
    }
    payloads.push("[DONE]".to_string());

    payloads
        .iter()
        .map(|payload| format!("data: {}\n\n", payload))
        .collect()
}

pub fn network_error() -> LLMError {
    LLMError::Network("connection reset by peer".to_string())
}
