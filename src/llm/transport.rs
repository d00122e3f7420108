//! HTTP transport boundary.
//!
//! Handlers never talk to `reqwest` directly. They build an [`HttpRequest`]
//! and hand it to a [`Transport`], which opens the streaming response or
//! fails with a typed [`LLMError`]. Tests substitute scripted transports.

use crate::llm::stream::ByteStream;
use crate::llm::types::LLMError;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum characters of an error body carried into error messages
const BODY_SAMPLE_CHARS: usize = 200;

/// A JSON POST request that expects a streamed response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl HttpRequest {
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Lower-level network client consumed by every handler
pub trait Transport: Send + Sync {
    /// Send `request` and return the response body as a byte stream.
    ///
    /// Non-2xx statuses are mapped to typed errors before any byte is returned.
    fn open(&self, request: HttpRequest) -> BoxFuture<'_, Result<ByteStream, LLMError>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Upper bound on one whole request, streaming included
    pub request_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            request_timeout_secs: 600,
        }
    }
}

/// [`Transport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, LLMError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LLMError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn open(&self, request: HttpRequest) -> BoxFuture<'_, Result<ByteStream, LLMError>> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url).json(&request.body);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            debug!("Opening stream to {}", request.url);
            let response = builder.send().await.map_err(map_reqwest_error)?;

            let status = response.status();
            if !status.is_success() {
                let retry_after = retry_after_from_headers(response.headers());
                let body = response.text().await.unwrap_or_default();
                warn!("Request to {} failed with HTTP {}", request.url, status.as_u16());
                return Err(error_from_status(status.as_u16(), retry_after, &body));
            }

            let bytes: ByteStream =
                Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(map_reqwest_error)));
            Ok(bytes)
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> LLMError {
    if error.is_timeout() {
        LLMError::Network(format!("Request timed out: {}", error))
    } else if error.is_connect() {
        LLMError::Network(format!("Connection failed: {}", error))
    } else {
        LLMError::Network(error.to_string())
    }
}

/// Read `retry-after-ms` or `retry-after` (seconds or HTTP-date)
pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<Duration> {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(ms) = value("retry-after-ms").and_then(|v| v.trim().parse::<f64>().ok())
        && ms >= 0.0
    {
        return Some(Duration::from_millis(ms as u64));
    }

    value("retry-after").and_then(|v| parse_retry_after(v, Utc::now()))
}

pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return (seconds >= 0.0).then(|| Duration::from_millis((seconds * 1000.0) as u64));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Map a non-2xx status and its body onto the error taxonomy
pub fn error_from_status(status: u16, retry_after: Option<Duration>, body: &str) -> LLMError {
    let message = error_message_from_body(body);

    match status {
        408 => LLMError::Network(format!("HTTP 408: {}", message)),
        429 => LLMError::RateLimit {
            message,
            retry_after,
        },
        401 | 403 => LLMError::Authentication(format!("HTTP {}: {}", status, message)),
        404 => LLMError::ModelUnavailable(format!("HTTP 404: {}", message)),
        500..=599 => LLMError::BackendFault { status, message },
        _ => LLMError::InvalidRequest(format!("HTTP {}: {}", status, message)),
    }
}

/// Map an error object embedded in a stream (`type` or `code` plus message)
pub fn error_from_payload(kind: &str, message: &str) -> LLMError {
    let message = message.to_string();
    let lower = kind.to_lowercase();

    if lower.contains("rate_limit") || lower == "429" {
        LLMError::RateLimit {
            message,
            retry_after: None,
        }
    } else if lower.contains("overloaded") {
        LLMError::BackendFault {
            status: 529,
            message,
        }
    } else if lower.contains("authentication")
        || lower.contains("permission")
        || lower.contains("invalid_api_key")
        || lower == "401"
        || lower == "403"
    {
        LLMError::Authentication(message)
    } else if lower.contains("not_found") || lower.contains("model_not_found") {
        LLMError::ModelUnavailable(message)
    } else if lower.contains("invalid_request") || lower == "400" {
        LLMError::InvalidRequest(message)
    } else {
        LLMError::BackendFault {
            status: 500,
            message,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn error_message_from_body(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = envelope
            .error
            .and_then(|e| e.message)
            .or(envelope.message)
    {
        return message;
    }

    let sample: String = body.chars().take(BODY_SAMPLE_CHARS).collect();
    if sample.trim().is_empty() {
        "empty response body".to_string()
    } else {
        sample
    }
}
