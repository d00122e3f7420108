//! Command line argument parsing
//!
//! Subcommands:
//! - `chat`: Send a prompt and stream the normalized response
//! - `models`: List the registry's model ids for a provider
//! - `show-config`: Show configuration discovery information

use crate::llm::ProviderType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "llm-gateway")]
#[command(author = "LLM Gateway Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stream a conversation to any supported LLM backend")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send a single prompt and print the streamed answer
    Chat(ChatArgs),
    /// List known model ids for a provider
    Models {
        /// Provider to list (anthropic, openai, deepseek, qwen, ark)
        provider: ProviderType,
    },
    /// Show configuration discovery information
    ShowConfig {
        /// Configuration file path
        #[arg(short = 'c', long = "config")]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    /// Prompt sent as the user turn
    pub prompt: String,
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Provider override; resets provider-specific settings from the file
    #[arg(short = 'p', long = "provider")]
    pub provider: Option<ProviderType>,
    /// Model id override
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,
    /// System instruction
    #[arg(short = 's', long = "system", default_value = "")]
    pub system: String,
    /// Attach an image to the prompt (can be used multiple times)
    #[arg(long = "image", value_name = "FILE")]
    pub images: Vec<PathBuf>,
    /// Print reasoning deltas to stderr
    #[arg(long = "show-reasoning")]
    pub show_reasoning: bool,
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_arguments() {
        let args = Args::try_parse_from([
            "llm-gateway",
            "chat",
            "hello there",
            "--provider",
            "deepseek",
            "-m",
            "deepseek-reasoner",
            "--image",
            "a.png",
            "--image",
            "b.jpg",
            "--show-reasoning",
        ])
        .unwrap();

        match args.command {
            Commands::Chat(chat) => {
                assert_eq!(chat.prompt, "hello there");
                assert_eq!(chat.provider, Some(ProviderType::DeepSeek));
                assert_eq!(chat.model.as_deref(), Some("deepseek-reasoner"));
                assert_eq!(chat.images.len(), 2);
                assert!(chat.show_reasoning);
                assert!(chat.system.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_models_rejects_unknown_provider() {
        assert!(Args::try_parse_from(["llm-gateway", "models", "bedrock"]).is_err());

        let args = Args::try_parse_from(["llm-gateway", "models", "ark"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Models {
                provider: ProviderType::Ark
            }
        ));
    }

    #[test]
    fn test_show_config() {
        let args = Args::try_parse_from(["llm-gateway", "show-config"]).unwrap();
        assert!(matches!(args.command, Commands::ShowConfig { config: None }));
    }
}
