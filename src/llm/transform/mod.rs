//! Converters from the canonical conversation to backend wire shapes.
//!
//! - [`r1_format`]: for backends without a system slot that reject consecutive
//!   same-role turns (DeepSeek reasoner, Ark, Qwen reasoning models)
//! - [`openai_format`]: chat completions message arrays
//! - [`anthropic_format`]: Messages API content blocks

pub mod anthropic_format;
pub mod openai_format;
pub mod r1_format;

pub use anthropic_format::{to_anthropic_messages, to_anthropic_system};
pub use openai_format::to_openai_messages;
pub use r1_format::{convert_to_r1_format, ensure_alternating, merge_consecutive_turns};
