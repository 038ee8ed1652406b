//! TOML-based configuration for Delve
//!
//! This module provides declarative configuration for the server, the run
//! store, LLM providers and models, the web search backend, the research
//! pipeline and the live event transport via a TOML file (`delve.toml`).
//!
//! Secrets are never written to the file. Sections name the environment
//! variable that holds them (`api_key_env = "OPENAI_API_KEY"`) and the value
//! is resolved when a client is built.
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `ConfigManager` for thread-safe access to the current configuration.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from delve.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelveConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named LLM provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Named model configurations that reference providers
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Web search backend
    #[serde(default)]
    pub search: SearchConfig,

    /// Research pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Live event delivery
    #[serde(default)]
    pub transport: TransportConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/delve.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        default_model: String,
    },
    OpenAI {
        /// Environment variable containing API key
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        default_model: String,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Reference to a provider name defined in [providers]
    pub provider: String,

    /// Model name/identifier to use with the provider
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens; provider default when unset
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum SearchConfig {
    /// SerpAPI (Google engine by default)
    SerpApi {
        #[serde(default = "default_serpapi_key_env")]
        api_key_env: String,
        #[serde(default = "default_serpapi_base")]
        base_url: String,
        #[serde(default = "default_serpapi_engine")]
        engine: String,
        #[serde(default = "default_num_results")]
        num_results: usize,
    },
    /// DuckDuckGo via daedra, no key required
    DuckDuckGo {
        #[serde(default = "default_num_results")]
        num_results: usize,
    },
}

fn default_serpapi_key_env() -> String {
    "SERPAPI_API_KEY".to_string()
}

fn default_serpapi_base() -> String {
    "https://serpapi.com".to_string()
}

fn default_serpapi_engine() -> String {
    "google".to_string()
}

fn default_num_results() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig::DuckDuckGo {
            num_results: default_num_results(),
        }
    }
}

// ============= Pipeline Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Model used to expand the question into sub-queries
    #[serde(default = "default_model_name")]
    pub refiner_model: String,

    /// Model used to stream the final answer
    #[serde(default = "default_model_name")]
    pub summarizer_model: String,

    /// Number of sub-queries the refiner must return
    #[serde(default = "default_num_queries")]
    pub num_queries: usize,

    #[serde(default = "default_max_organic_results")]
    pub max_organic_results: usize,

    #[serde(default = "default_max_related_questions")]
    pub max_related_questions: usize,

    /// Bound on each external call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_model_name() -> String {
    "default".to_string()
}

fn default_num_queries() -> usize {
    3
}

fn default_max_organic_results() -> usize {
    5
}

fn default_max_related_questions() -> usize {
    3
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            refiner_model: default_model_name(),
            summarizer_model: default_model_name(),
            num_queries: default_num_queries(),
            max_organic_results: default_max_organic_results(),
            max_related_questions: default_max_related_questions(),
            request_timeout_secs: default_request_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy for external calls. One attempt means no retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

// ============= Transport Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Buffered events per connection before non-terminal events are dropped
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Delivery attempts for `complete`/`error` on a full connection
    #[serde(default = "default_terminal_retry_attempts")]
    pub terminal_retry_attempts: u32,

    #[serde(default = "default_terminal_retry_timeout")]
    pub terminal_retry_timeout_ms: u64,

    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_terminal_retry_attempts() -> u32 {
    3
}

fn default_terminal_retry_timeout() -> u64 {
    1000
}

fn default_keepalive() -> u64 {
    15
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            terminal_retry_attempts: default_terminal_retry_attempts(),
            terminal_retry_timeout_ms: default_terminal_retry_timeout(),
            keepalive_secs: default_keepalive(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' referenced by model '{1}' does not exist")]
    MissingProvider(String, String),

    #[error("Model '{0}' referenced by {1} does not exist")]
    MissingModel(String, String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl DelveConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: DelveConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref env) = self.database.turso_url_env {
            self.validate_env_var(env)?;
        }
        if let Some(ref env) = self.database.turso_token_env {
            self.validate_env_var(env)?;
        }

        for provider in self.providers.values() {
            if let ProviderConfig::OpenAI { api_key_env, .. } = provider {
                self.validate_env_var(api_key_env)?;
            }
        }

        if let SearchConfig::SerpApi { api_key_env, .. } = &self.search {
            self.validate_env_var(api_key_env)?;
        }

        // Validate model -> provider references
        for (model_name, model_config) in &self.models {
            if !self.providers.contains_key(&model_config.provider) {
                return Err(ConfigError::MissingProvider(
                    model_config.provider.clone(),
                    model_name.clone(),
                ));
            }
        }

        // Validate pipeline -> model references
        for (model, role) in [
            (&self.pipeline.refiner_model, "pipeline.refiner_model"),
            (&self.pipeline.summarizer_model, "pipeline.summarizer_model"),
        ] {
            if !self.models.contains_key(model) {
                return Err(ConfigError::MissingModel(model.clone(), role.to_string()));
            }
        }

        if self.pipeline.num_queries == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.num_queries must be at least 1".to_string(),
            ));
        }
        if self.pipeline.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.transport.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "transport.channel_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Get model by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct ConfigManager {
    config: Arc<ArcSwap<DelveConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl ConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Convert to absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = DelveConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Create a config manager directly from a config (useful for testing)
    /// This won't have file watching capabilities.
    pub fn from_config(config: DelveConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("test-config.toml"),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<DelveConfig> {
        self.config.load_full()
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = DelveConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    ///
    /// Pipeline and transport settings are read per run, so a reload applies
    /// to runs started afterwards. Server address and database are fixed at
    /// startup.
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the config file's parent directory
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload: Option<std::time::Instant> = None;
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.is_some_and(|at| at.elapsed() < debounce_duration) {
                    continue;
                }

                // Wait a bit for file write to complete
                tokio::time::sleep(Duration::from_millis(100)).await;

                match DelveConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                        last_reload = Some(std::time::Instant::now());
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}
