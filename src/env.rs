//! Environment constants and path utilities for the provider gateway.
//!
//! Centralizes file names, default endpoints, credential variable names and
//! configuration hint keys so adapters and the CLI agree on them.

use crate::llm::types::ProviderType;
use std::path::{Path, PathBuf};

/// Gateway directory name (hidden directory like .git, .vscode)
pub const GATEWAY_DIR_NAME: &str = ".llm-gateway";

/// Configuration file name inside the gateway directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Stand-alone configuration file name in the working directory
pub const PROJECT_CONFIG_FILE_NAME: &str = "llm-gateway.toml";

/// System-wide configuration directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/llm-gateway";

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "llm_gateway=info";

/// Environment variables consulted when a configuration carries no API key
pub mod credentials {
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
    pub const DASHSCOPE_API_KEY: &str = "DASHSCOPE_API_KEY";
    pub const ARK_API_KEY: &str = "ARK_API_KEY";
}

/// Default backend endpoints
pub mod endpoints {
    pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
    pub const ANTHROPIC_VERSION: &str = "2023-06-01";
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
    pub const QWEN_CHINA_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
    pub const QWEN_INTERNATIONAL_BASE_URL: &str =
        "https://dashscope-intl.aliyuncs.com/compatible-mode/v1";
    pub const ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
}

/// Keys understood in `ProviderConfig::additional_config`
pub mod hints {
    /// Qwen routing: `china` (default) or `international`
    pub const API_LINE: &str = "api_line";

    /// Anthropic extended thinking budget; thinking is off when absent
    pub const THINKING_BUDGET_TOKENS: &str = "thinking_budget_tokens";
}

/// Credential variable for a provider
pub fn credential_env_var(provider: ProviderType) -> &'static str {
    match provider {
        ProviderType::Anthropic => credentials::ANTHROPIC_API_KEY,
        ProviderType::OpenAI => credentials::OPENAI_API_KEY,
        ProviderType::DeepSeek => credentials::DEEPSEEK_API_KEY,
        ProviderType::Qwen => credentials::DASHSCOPE_API_KEY,
        ProviderType::Ark => credentials::ARK_API_KEY,
    }
}

/// Build the gateway directory path in the user's home directory
pub fn user_config_dir_path(home_dir: &Path) -> PathBuf {
    home_dir.join(GATEWAY_DIR_NAME)
}

/// Build the config file path in the user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    user_config_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build the `.llm-gateway/config.toml` path under the current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(GATEWAY_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Build the `llm-gateway.toml` path under the current directory
pub fn project_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(PROJECT_CONFIG_FILE_NAME)
}

pub fn system_config_file_path() -> PathBuf {
    Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_construction() {
        let cwd = Path::new("/work/project");
        let home = Path::new("/home/dev");

        assert_eq!(
            project_config_file_path(cwd),
            Path::new("/work/project/llm-gateway.toml")
        );
        assert_eq!(
            local_config_file_path(cwd),
            Path::new("/work/project/.llm-gateway/config.toml")
        );
        assert_eq!(
            user_config_file_path(home),
            Path::new("/home/dev/.llm-gateway/config.toml")
        );
        assert_eq!(
            system_config_file_path(),
            Path::new("/etc/llm-gateway/config.toml")
        );
    }

    #[test]
    fn test_every_provider_has_a_credential_variable() {
        for provider in ProviderType::ALL {
            assert!(credential_env_var(provider).ends_with("_API_KEY"));
        }
    }

    #[test]
    fn test_endpoints_have_no_trailing_slash() {
        for url in [
            endpoints::ANTHROPIC_BASE_URL,
            endpoints::OPENAI_BASE_URL,
            endpoints::DEEPSEEK_BASE_URL,
            endpoints::QWEN_CHINA_BASE_URL,
            endpoints::QWEN_INTERNATIONAL_BASE_URL,
            endpoints::ARK_BASE_URL,
        ] {
            assert!(url.starts_with("https://"));
            assert!(!url.ends_with('/'));
        }
    }
}
