//! CLI-specific functionality for the gateway binary
//!
//! Argument parsing, configuration discovery and prompt input handling.

pub mod args;
pub mod config;
pub mod input;

pub use args::{Args, ChatArgs, Commands};
pub use config::{ConfigDiscovery, GatewayConfig};
pub use input::{load_image, media_type_for};
