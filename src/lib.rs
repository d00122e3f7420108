//! # LLM Gateway
//!
//! Send one conversation to any of several LLM backends and read back a single
//! normalized stream of text, reasoning and usage events.
//!
//! ## Architecture Overview
//!
//! - **[`llm::message`]**: canonical conversation (role-tagged, multi-part turns)
//! - **[`llm::transform`]**: pure converters into backend message shapes
//! - **[`llm::providers`]**: one adapter per backend family behind [`ApiHandler`]
//! - **[`llm::retry`]**: exponential backoff around any stream-producing call
//! - **[`llm::registry`]**: static model metadata with per-provider defaults
//! - **[`llm::transport`]**: HTTP boundary and status-to-error mapping
//! - **[`cli`]**: configuration discovery and the command-line front end
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use llm_gateway::{
//!     Conversation, Gateway, ProviderConfig, ProviderType, RetryConfig, StreamEvent,
//!     TransportConfig, Turn,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Gateway::with_reqwest(&TransportConfig::default(), RetryConfig::default())?;
//!     let config = ProviderConfig::new(ProviderType::DeepSeek);
//!     let conversation = Conversation::new().with_turn(Turn::user("Hello"));
//!
//!     let mut stream = gateway.create_message("Be brief.", &conversation, &config);
//!     while let Some(event) = stream.next().await {
//!         if let StreamEvent::Text { text } = event? {
//!             print!("{}", text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

/// Provider-agnostic LLM gateway.
///
/// Conversation model, format converters, backend adapters, retry and the
/// model registry.
pub mod llm;

/// Environment constants and path utilities.
pub mod env;

/// Command-line interface and configuration loading.
pub mod cli;

pub use llm::{
    ApiHandler, ApiStream, Conversation, Gateway, LLMError, ModelInfo, ProviderConfig,
    ProviderType, ResolvedModel, RetryConfig, StreamEvent, TransportConfig, Turn, Usage,
    UsagePolicy, build_api_handler,
};
