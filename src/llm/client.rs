//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the two completion calls the
//! research pipeline makes:
//! - a one-shot completion used to refine the question into sub-queries
//! - a streaming completion used to synthesize the answer
//!
//! Supported providers:
//! - **OpenAI**: any OpenAI-compatible chat completions endpoint
//! - **Ollama**: local inference through an Ollama server

use crate::types::{AppError, Result};
use crate::utils::toml_config::{ModelConfig, ProviderConfig};
use async_trait::async_trait;

/// Incremental text produced by a streaming completion.
pub type TokenStream = Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// One-shot completion with a system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Stream a completion with a system prompt
    async fn stream_with_system(&self, system: &str, prompt: &str) -> Result<TokenStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including Azure OpenAI and compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4".to_string(),
    ///     temperature: Some(0.7),
    ///     max_tokens: None,
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    },

    /// Ollama local LLM provider
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Build a provider from a model entry and the provider it references.
    ///
    /// API keys are resolved from the environment variable named in the
    /// provider section.
    pub fn from_model_config(model: &ModelConfig, provider: &ProviderConfig) -> Result<Self> {
        match provider {
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                ..
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Configuration(format!(
                        "Environment variable '{}' is not set",
                        api_key_env
                    ))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.model.clone(),
                    temperature: Some(model.temperature),
                    max_tokens: model.max_tokens,
                })
            }
            ProviderConfig::Ollama { base_url, .. } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.model.clone(),
            }),
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's cargo feature is disabled or the
    /// client cannot be constructed.
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
                max_tokens,
            } => Ok(Box::new(
                super::openai::OpenAIClient::new(api_key.clone(), api_base.clone(), model.clone())
                    .with_temperature(*temperature)
                    .with_max_tokens(*max_tokens),
            )),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),

            #[allow(unreachable_patterns)]
            other => Err(AppError::Configuration(format!(
                "{} support is not compiled in; enable the '{}' feature",
                other.name(),
                other.name().to_lowercase()
            ))),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let openai = Provider::OpenAI {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "".to_string(),
            temperature: None,
            max_tokens: None,
        };
        assert_eq!(openai.name(), "OpenAI");

        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "".to_string(),
        };
        assert_eq!(ollama.name(), "Ollama");
    }

    #[test]
    fn test_from_model_config_ollama() {
        let model = ModelConfig {
            provider: "local".to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.2,
            max_tokens: None,
        };
        let provider = ProviderConfig::Ollama {
            base_url: "http://localhost:11434".to_string(),
            default_model: "other".to_string(),
        };

        match Provider::from_model_config(&model, &provider).unwrap() {
            Provider::Ollama { base_url, model } => {
                assert_eq!(base_url, "http://localhost:11434");
                assert_eq!(model, "llama3.2");
            }
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[test]
    fn test_from_model_config_missing_key() {
        let model = ModelConfig {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: None,
        };
        let provider = ProviderConfig::OpenAI {
            api_key_env: "DELVE_TEST_UNSET_OPENAI_KEY".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4".to_string(),
        };

        let err = Provider::from_model_config(&model, &provider).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("DELVE_TEST_UNSET_OPENAI_KEY"));
    }
}
