//! Retry with exponential backoff around a stream-producing call.
//!
//! [`RetryExecutor::stream`] takes a factory that opens a brand-new stream on
//! every call and re-invokes it on retryable failure:
//!
//! - Retryable: [`LLMError::Network`], [`LLMError::RateLimit`],
//!   [`LLMError::BackendFault`]. Anything else propagates on first occurrence.
//! - The delay before attempt `n + 1` is `base_delay * multiplier^(n - 1)`,
//!   jittered upward by at most one step and capped by `max_delay`, so delays
//!   never decrease. A backend retry-after hint replaces the computed delay.
//! - After `max_attempts` attempts the last error is returned.
//!
//! Events are forwarded as they arrive; nothing is buffered. Once an attempt
//! has yielded an event it is only retried if the transport drops
//! ([`LLMError::Network`]) before a usage event with `terminal` set was seen.
//! A stream that closes before its end marker counts as such a drop. In that
//! case the request restarts from empty and the caller may already hold partial output
//! from the abandoned attempt. Register a [`RetryObserver`] to learn when that
//! happens and discard what was shown.
//!
//! Dropping the returned stream cancels the in-flight attempt. No retry
//! follows abandonment.

use crate::llm::stream::ApiStream;
use crate::llm::types::LLMError;
use futures::StreamExt;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Backoff before the attempt following failed attempt number `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.max(1.0);
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let cap = self.max_delay_ms as f64;
        // min() also folds an overflowed (infinite) step back to the cap
        let step = (self.base_delay_ms as f64 * multiplier.powi(exponent)).min(cap);
        let next_step = (step * multiplier).min(cap);

        let millis = if self.jitter && next_step > step {
            rand::rng().random_range(step..next_step)
        } else {
            step
        };

        Duration::from_millis(millis as u64)
    }

    /// A backend hint wins over the computed backoff
    pub fn delay_for(&self, attempt: u32, error: &LLMError) -> Duration {
        error
            .retry_after()
            .unwrap_or_else(|| self.backoff_delay(attempt))
    }
}

/// Emitted before every retry sleep
#[derive(Debug, Clone)]
pub struct RetryNotice {
    /// The attempt that just failed (1-based)
    pub attempt: u32,
    pub delay: Duration,
    pub error: LLMError,
    /// True when the failed attempt had already yielded events
    pub discarded_output: bool,
}

pub type RetryObserver = Arc<dyn Fn(&RetryNotice) + Send + Sync>;

#[derive(Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    observer: Option<RetryObserver>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Wrap `factory` so that each retry opens a fresh stream
    pub fn stream<F>(&self, factory: F) -> ApiStream
    where
        F: Fn() -> ApiStream + Send + Sync + 'static,
    {
        let config = self.config.clone();
        let observer = self.observer.clone();
        let max_attempts = config.max_attempts.max(1);

        Box::pin(async_stream::stream! {
            let mut attempt: u32 = 0;

            loop {
                attempt += 1;
                debug!("Starting attempt {}/{}", attempt, max_attempts);

                let mut inner = factory();
                let mut yielded = false;
                let mut saw_terminal_usage = false;

                let failure = loop {
                    match inner.next().await {
                        None => break None,
                        Some(Ok(event)) => {
                            yielded = true;
                            saw_terminal_usage |= event.is_terminal_usage();
                            yield Ok(event);
                        }
                        Some(Err(error)) => break Some(error),
                    }
                };
                drop(inner);

                let Some(error) = failure else {
                    return;
                };

                let may_retry = error.is_retryable()
                    && attempt < max_attempts
                    && (!yielded || (error.is_transport() && !saw_terminal_usage));

                if !may_retry {
                    if error.is_retryable() && attempt >= max_attempts {
                        warn!("Giving up after {} attempts: {}", attempt, error);
                    }
                    yield Err(error);
                    return;
                }

                let delay = config.delay_for(attempt, &error);
                warn!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    max_attempts,
                    error.kind(),
                    delay
                );

                if let Some(observer) = observer.as_ref() {
                    observer(&RetryNotice {
                        attempt,
                        delay,
                        error: error.clone(),
                        discarded_output: yielded,
                    });
                }

                tokio::time::sleep(delay).await;
            }
        })
    }
}
