//! Provider Registry for managing multiple LLM providers
//!
//! This module provides a registry for managing named LLM providers and
//! models configured in `delve.toml`. The research pipeline asks it for one
//! client per role (refiner, summarizer).

use crate::llm::client::{LLMClient, Provider};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{DelveConfig, ModelConfig, ProviderConfig};
use std::collections::HashMap;

/// Registry for managing multiple named LLM providers
///
/// The ProviderRegistry holds provider and model configurations and creates
/// LLM clients for specific models by name.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    /// Provider configurations keyed by name
    providers: HashMap<String, ProviderConfig>,
    /// Model configurations keyed by name
    models: HashMap<String, ModelConfig>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider registry from TOML configuration
    pub fn from_config(config: &DelveConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            models: config.models.clone(),
        }
    }

    /// Register a provider configuration
    pub fn register_provider(&mut self, name: &str, config: ProviderConfig) {
        self.providers.insert(name.to_string(), config);
    }

    /// Register a model configuration
    pub fn register_model(&mut self, name: &str, config: ModelConfig) {
        self.models.insert(name.to_string(), config);
    }

    /// Get a model configuration by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Check if a model exists in the registry
    pub fn has_model(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Resolve the model -> provider chain for a model name
    pub fn provider_for_model(&self, model_name: &str) -> Result<Provider> {
        let model_config = self.get_model(model_name).ok_or_else(|| {
            AppError::Configuration(format!("Model '{}' not found in configuration", model_name))
        })?;

        let provider_config = self.providers.get(&model_config.provider).ok_or_else(|| {
            AppError::Configuration(format!(
                "Provider '{}' referenced by model '{}' not found",
                model_config.provider, model_name
            ))
        })?;

        Provider::from_model_config(model_config, provider_config)
    }

    /// Create an LLM client for a specific model by name
    pub async fn create_client_for_model(&self, model_name: &str) -> Result<Box<dyn LLMClient>> {
        self.provider_for_model(model_name)?.create_client().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register_provider(
            "local",
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_string(),
                default_model: "llama3.2".to_string(),
            },
        );
        registry.register_model(
            "default",
            ModelConfig {
                provider: "local".to_string(),
                model: "llama3.2".to_string(),
                temperature: 0.7,
                max_tokens: None,
            },
        );
        registry
    }

    #[test]
    fn test_resolve_model() {
        let registry = registry();
        assert!(registry.has_model("default"));

        let provider = registry.provider_for_model("default").unwrap();
        assert_eq!(provider.name(), "Ollama");
    }

    #[test]
    fn test_unknown_model() {
        let err = registry().provider_for_model("missing").unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_dangling_provider() {
        let mut registry = registry();
        registry.register_model(
            "broken",
            ModelConfig {
                provider: "nowhere".to_string(),
                model: "x".to_string(),
                temperature: 0.7,
                max_tokens: None,
            },
        );

        let err = registry.provider_for_model("broken").unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
