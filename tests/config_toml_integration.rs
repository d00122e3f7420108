use llm_gateway::cli::GatewayConfig;
use llm_gateway::{ProviderConfig, ProviderType, RetryConfig};
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_config_serialization_roundtrip() {
    let mut original_config = GatewayConfig::default();
    original_config.provider = ProviderConfig {
        api_key: Some("sk-test".to_string()),
        model: Some("deepseek-reasoner".to_string()),
        temperature: Some(0.2),
        ..ProviderConfig::new(ProviderType::DeepSeek)
    };
    original_config.retry.max_attempts = 5;

    let toml_str = original_config
        .to_toml_string()
        .expect("Should be able to serialize config to TOML");
    assert!(toml_str.contains("[provider]"), "Should contain provider section");
    assert!(toml_str.contains("[retry]"), "Should contain retry section");
    assert!(toml_str.contains("[transport]"), "Should contain transport section");

    let deserialized_config =
        GatewayConfig::from_toml_str(&toml_str).expect("Should be able to deserialize TOML string");
    assert_eq!(original_config, deserialized_config);
}

#[test]
fn test_config_file_operations() {
    let original_config = GatewayConfig::default();

    let temp_file = NamedTempFile::new().expect("Should be able to create temporary file");
    let temp_path = temp_file.path();

    original_config
        .to_toml_file(temp_path)
        .expect("Should be able to save config to file");

    let loaded_config =
        GatewayConfig::from_toml_file(temp_path).expect("Should be able to load config from file");

    assert_eq!(original_config, loaded_config);
}

#[test]
fn test_hand_written_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("llm-gateway.toml");
    std::fs::write(
        &path,
        r#"
[provider]
provider_type = "ark"
model = "ep-20250301-abcde"
base_url = "https://ark.example.com/api/v3"

[provider.additional_config]
unrecognized_flag = true

[retry]
max_attempts = 6
base_delay_ms = 250
max_delay_ms = 4000
backoff_multiplier = 1.5
jitter = false
"#,
    )
    .unwrap();

    let config = GatewayConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.provider.provider_type, ProviderType::Ark);
    assert_eq!(config.provider.model_id(), Some("ep-20250301-abcde"));
    assert_eq!(config.retry.max_attempts, 6);
    assert_eq!(config.retry.backoff_multiplier, 1.5);
    assert!(!config.retry.jitter);
    assert_eq!(config.transport.request_timeout_secs, 600);
}

#[test]
fn test_config_error_handling() {
    let result = GatewayConfig::from_toml_file("/nonexistent/path/llm-gateway.toml");
    assert!(result.is_err(), "Should fail to load non-existent file");

    let result = GatewayConfig::from_toml_str("[provider\nprovider_type = ");
    assert!(result.is_err(), "Should fail to parse invalid TOML");

    let result = GatewayConfig::from_toml_str("[retry]\nmax_attempts = \"many\"\n");
    assert!(result.is_err(), "Should reject wrongly typed fields");
}

#[test]
fn test_empty_file_means_defaults() {
    let config = GatewayConfig::from_toml_str("").unwrap();
    assert_eq!(config.provider.provider_type, ProviderType::Anthropic);
    assert_eq!(config.retry, RetryConfig::default());
}
