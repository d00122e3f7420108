//! Static model registry.
//!
//! One table per provider, keyed by exact model id, plus a documented default
//! id. Resolving an unset, blank or unknown id yields the provider default:
//! a stale model setting never fails a request on its own.

use crate::llm::types::{ModelInfo, ProviderType, ResolvedModel};

pub struct ProviderModels {
    pub default_id: &'static str,
    pub models: &'static [(&'static str, ModelInfo)],
}

impl ProviderModels {
    pub fn get(&self, id: &str) -> Option<&'static ModelInfo> {
        self.models
            .iter()
            .find(|(model_id, _)| *model_id == id)
            .map(|(_, info)| info)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> {
        self.models.iter().map(|(id, _)| *id)
    }

    fn default_info(&self) -> &'static ModelInfo {
        // Every table lists its default id; checked by the registry tests.
        self.get(self.default_id).unwrap_or(&self.models[0].1)
    }
}

pub const ANTHROPIC_DEFAULT_MODEL_ID: &str = "claude-3-7-sonnet-20250219";
pub const OPENAI_DEFAULT_MODEL_ID: &str = "gpt-4o";
pub const DEEPSEEK_DEFAULT_MODEL_ID: &str = "deepseek-chat";
pub const QWEN_DEFAULT_MODEL_ID: &str = "qwen-coder-plus-latest";
pub const ARK_DEFAULT_MODEL_ID: &str = "doubao-1-5-vision-pro-32k-250115";

static ANTHROPIC: ProviderModels = ProviderModels {
    default_id: ANTHROPIC_DEFAULT_MODEL_ID,
    models: &[
        (
            "claude-3-7-sonnet-20250219",
            ModelInfo {
                max_tokens: 8192,
                context_window: 200_000,
                supports_images: true,
                supports_prompt_cache: true,
                supports_computer_use: true,
                input_price: 3.0,
                output_price: 15.0,
                cache_writes_price: Some(3.75),
                cache_reads_price: Some(0.3),
                description: "Most capable Sonnet with optional extended thinking",
            },
        ),
        (
            "claude-3-5-sonnet-20241022",
            ModelInfo {
                max_tokens: 8192,
                context_window: 200_000,
                supports_images: true,
                supports_prompt_cache: true,
                supports_computer_use: true,
                input_price: 3.0,
                output_price: 15.0,
                cache_writes_price: Some(3.75),
                cache_reads_price: Some(0.3),
                description: "Balanced intelligence and speed",
            },
        ),
        (
            "claude-3-5-haiku-20241022",
            ModelInfo {
                max_tokens: 8192,
                context_window: 200_000,
                supports_images: false,
                supports_prompt_cache: true,
                supports_computer_use: false,
                input_price: 0.8,
                output_price: 4.0,
                cache_writes_price: Some(1.0),
                cache_reads_price: Some(0.08),
                description: "Fastest model for everyday tasks",
            },
        ),
        (
            "claude-3-opus-20240229",
            ModelInfo {
                max_tokens: 4096,
                context_window: 200_000,
                supports_images: true,
                supports_prompt_cache: true,
                supports_computer_use: false,
                input_price: 15.0,
                output_price: 75.0,
                cache_writes_price: Some(18.75),
                cache_reads_price: Some(1.5),
                description: "Previous-generation flagship for complex analysis",
            },
        ),
        (
            "claude-3-haiku-20240307",
            ModelInfo {
                max_tokens: 4096,
                context_window: 200_000,
                supports_images: true,
                supports_prompt_cache: true,
                supports_computer_use: false,
                input_price: 0.25,
                output_price: 1.25,
                cache_writes_price: Some(0.3),
                cache_reads_price: Some(0.03),
                description: "Compact model for near-instant responses",
            },
        ),
    ],
};

static OPENAI: ProviderModels = ProviderModels {
    default_id: OPENAI_DEFAULT_MODEL_ID,
    models: &[
        (
            "gpt-4o",
            ModelInfo {
                max_tokens: 16_384,
                context_window: 128_000,
                supports_images: true,
                supports_prompt_cache: true,
                supports_computer_use: false,
                input_price: 2.5,
                output_price: 10.0,
                cache_writes_price: None,
                cache_reads_price: Some(1.25),
                description: "General purpose multimodal model",
            },
        ),
        (
            "gpt-4o-mini",
            ModelInfo {
                max_tokens: 16_384,
                context_window: 128_000,
                supports_images: true,
                supports_prompt_cache: true,
                supports_computer_use: false,
                input_price: 0.15,
                output_price: 0.6,
                cache_writes_price: None,
                cache_reads_price: Some(0.075),
                description: "Small, inexpensive multimodal model",
            },
        ),
        (
            "o3-mini",
            ModelInfo {
                max_tokens: 100_000,
                context_window: 200_000,
                supports_images: false,
                supports_prompt_cache: true,
                supports_computer_use: false,
                input_price: 1.1,
                output_price: 4.4,
                cache_writes_price: None,
                cache_reads_price: Some(0.55),
                description: "Small reasoning model",
            },
        ),
    ],
};

static DEEPSEEK: ProviderModels = ProviderModels {
    default_id: DEEPSEEK_DEFAULT_MODEL_ID,
    models: &[
        (
            "deepseek-chat",
            ModelInfo {
                max_tokens: 8_000,
                context_window: 64_000,
                supports_images: false,
                supports_prompt_cache: true,
                supports_computer_use: false,
                // Input is billed entirely as cache misses (writes) and hits (reads)
                input_price: 0.0,
                output_price: 1.1,
                cache_writes_price: Some(0.27),
                cache_reads_price: Some(0.07),
                description: "DeepSeek-V3 general chat model",
            },
        ),
        (
            "deepseek-reasoner",
            ModelInfo {
                max_tokens: 8_000,
                context_window: 64_000,
                supports_images: false,
                supports_prompt_cache: true,
                supports_computer_use: false,
                input_price: 0.0,
                output_price: 2.19,
                cache_writes_price: Some(0.55),
                cache_reads_price: Some(0.14),
                description: "DeepSeek-R1 reasoning model; streams reasoning_content",
            },
        ),
    ],
};

static QWEN: ProviderModels = ProviderModels {
    default_id: QWEN_DEFAULT_MODEL_ID,
    models: &[
        (
            "qwen-coder-plus-latest",
            ModelInfo {
                max_tokens: 129_024,
                context_window: 131_072,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 3.5,
                output_price: 7.0,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "Qwen coder, tuned for code generation",
            },
        ),
        (
            "qwen-plus-latest",
            ModelInfo {
                max_tokens: 129_024,
                context_window: 131_072,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 0.8,
                output_price: 2.0,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "Balanced general model",
            },
        ),
        (
            "qwen-max-latest",
            ModelInfo {
                max_tokens: 30_720,
                context_window: 32_768,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 2.4,
                output_price: 9.6,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "Most capable Qwen model",
            },
        ),
        (
            "qwen-vl-max-latest",
            ModelInfo {
                max_tokens: 30_720,
                context_window: 32_768,
                supports_images: true,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 3.0,
                output_price: 9.0,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "Vision-language model",
            },
        ),
        (
            "qwq-plus-latest",
            ModelInfo {
                max_tokens: 8_192,
                context_window: 131_071,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 0.0,
                output_price: 0.0,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "QwQ reasoning model; streams reasoning_content",
            },
        ),
        (
            "deepseek-r1",
            ModelInfo {
                max_tokens: 8_000,
                context_window: 64_000,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 0.0,
                output_price: 0.0,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "DeepSeek-R1 hosted on DashScope",
            },
        ),
    ],
};

static ARK: ProviderModels = ProviderModels {
    default_id: ARK_DEFAULT_MODEL_ID,
    models: &[
        (
            "doubao-1-5-vision-pro-32k-250115",
            ModelInfo {
                max_tokens: 4096,
                context_window: 200_000,
                supports_images: true,
                supports_prompt_cache: false,
                supports_computer_use: true,
                input_price: 0.0001,
                output_price: 0.0002,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "Doubao 1.5 vision pro with stronger visual reasoning, document OCR and instruction following",
            },
        ),
        (
            "doubao-1-5-pro-32k-250115",
            ModelInfo {
                max_tokens: 12_288,
                context_window: 32_768,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 0.0008,
                output_price: 0.002,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "Doubao 1.5 pro, 32k context",
            },
        ),
        (
            "doubao-1-5-pro-256k-250115",
            ModelInfo {
                max_tokens: 12_288,
                context_window: 262_144,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 0.005,
                output_price: 0.009,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "Doubao 1.5 pro, 256k context",
            },
        ),
        (
            "deepseek-r1-250120",
            ModelInfo {
                max_tokens: 16_384,
                context_window: 65_536,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 0.004,
                output_price: 0.016,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "DeepSeek-R1 served by Ark; streams reasoning_content",
            },
        ),
        (
            "deepseek-v3-241226",
            ModelInfo {
                max_tokens: 16_384,
                context_window: 65_536,
                supports_images: false,
                supports_prompt_cache: false,
                supports_computer_use: false,
                input_price: 0.002,
                output_price: 0.008,
                cache_writes_price: None,
                cache_reads_price: None,
                description: "DeepSeek-V3 served by Ark",
            },
        ),
    ],
};

pub fn provider_models(provider: ProviderType) -> &'static ProviderModels {
    match provider {
        ProviderType::Anthropic => &ANTHROPIC,
        ProviderType::OpenAI => &OPENAI,
        ProviderType::DeepSeek => &DEEPSEEK,
        ProviderType::Qwen => &QWEN,
        ProviderType::Ark => &ARK,
    }
}

pub fn default_model_id(provider: ProviderType) -> &'static str {
    provider_models(provider).default_id
}

/// Exact-match lookup with fallback to the provider default. Never fails.
pub fn resolve_model(provider: ProviderType, model_id: Option<&str>) -> ResolvedModel {
    let table = provider_models(provider);

    match model_id.and_then(|id| table.get(id).map(|info| (id, info)))
    {
        Some((id, info)) => ResolvedModel {
            id: id.to_string(),
            info: *info,
        },
        None => ResolvedModel {
            id: table.default_id.to_string(),
            info: *table.default_info(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_default_is_listed() {
        for provider in ProviderType::ALL {
            let table = provider_models(provider);
            assert!(
                table.get(table.default_id).is_some(),
                "{} default {} missing from its table",
                provider,
                table.default_id
            );
        }
    }

    #[test]
    fn test_ids_are_unique_per_provider() {
        for provider in ProviderType::ALL {
            let mut ids: Vec<_> = provider_models(provider).ids().collect();
            let total = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), total, "duplicate ids for {}", provider);
        }
    }

    #[test]
    fn test_known_id_resolves_exactly() {
        let resolved = resolve_model(ProviderType::DeepSeek, Some("deepseek-reasoner"));
        assert_eq!(resolved.id, "deepseek-reasoner");
        assert_eq!(resolved.info.output_price, 2.19);
    }

    #[test]
    fn test_unknown_blank_and_missing_ids_fall_back() {
        for provider in ProviderType::ALL {
            let expected = provider_models(provider).default_id;
            for candidate in [None, Some(""), Some("  "), Some("no-such-model"), Some("GPT-4O")] {
                let resolved = resolve_model(provider, candidate);
                assert_eq!(resolved.id, expected, "{provider} with {candidate:?}");
            }
        }
    }

    #[test]
    fn test_lookup_is_exact_match() {
        assert!(provider_models(ProviderType::Anthropic).get("claude-3-7-sonnet").is_none());

        let padded = resolve_model(ProviderType::DeepSeek, Some(" deepseek-reasoner "));
        assert_eq!(padded.id, DEEPSEEK_DEFAULT_MODEL_ID);
    }
}
