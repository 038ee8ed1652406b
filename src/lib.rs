//! # Delve - streaming web research server
//!
//! Turns a free-text question into a researched, streamed answer: an LLM
//! refines the question into search queries, each query is sent to a web
//! search backend, and a streaming completion summarizes the results. Every
//! stage is persisted as it commits and every event is broadcast to any
//! number of live observers.
//!
//! ## Overview
//!
//! Delve can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `delve-server` binary
//! 2. **As a library** - Drive [`ResearchPipeline`] from your own code
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use delve::{EventBroker, ResearchPipeline, db::DatabaseProvider, search::DuckDuckGoSearch};
//! use delve::llm::Provider;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! let store = DatabaseProvider::Memory.create_client().await?;
//! let llm: Arc<dyn delve::LLMClient> = Arc::from(
//!     Provider::Ollama {
//!         base_url: "http://localhost:11434".to_string(),
//!         model: "llama3.2:3b".to_string(),
//!     }
//!     .create_client()
//!     .await?,
//! );
//!
//! let broker = EventBroker::new();
//! let _watcher = broker.subscribe("some-run-id", |event| println!("{:?}", event));
//!
//! let pipeline = ResearchPipeline::new(store, llm.clone(), llm, Arc::new(DuckDuckGoSearch::new(5)))
//!     .with_broker(broker);
//!
//! let mut events = Box::pin(pipeline.run("rust vs go".to_string()));
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ollama` | Ollama local inference (default) |
//! | `openai` | OpenAI API support (default) |
//! | `turso` | Remote Turso database |
//! | `swagger-ui` | Interactive API docs at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`api`] - REST and SSE handlers and routes
//! - [`db`] - Durable run store (SQLite, Turso)
//! - [`events`] - Progress events, wire format and the fan-out broker
//! - [`llm`] - LLM client implementations
//! - [`research`] - The refine, search, summarize pipeline
//! - [`search`] - Web search backends
//! - [`types`] - Common types and error handling
//!
//! ## Configuration
//!
//! Everything is configured in `delve.toml` (see [`utils::toml_config`]),
//! which is hot-reloaded. Model, search and pipeline changes apply to the
//! next run.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Run storage (Turso/SQLite).
pub mod db;
/// Progress events and live fan-out.
pub mod events;
/// LLM provider clients and abstractions.
pub mod llm;
/// Research pipeline.
pub mod research;
/// Web search backends.
pub mod search;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{RunStore, TursoClient};
pub use events::{EventBroker, ProgressEvent};
pub use llm::{LLMClient, Provider, ProviderRegistry};
pub use research::{PipelineFactory, ResearchPipeline, RunRegistry};
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigManager, DelveConfig};

use axum::Router;
use research::ConfiguredPipelineFactory;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Request bodies are a single query.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML-based configuration with hot-reload support
    pub config_manager: Arc<ConfigManager>,
    /// Durable run store
    pub store: Arc<dyn RunStore>,
    /// Live fan-out of progress events, keyed by run id
    pub broker: Arc<EventBroker>,
    /// Cancellation handles for background runs
    pub runs: Arc<RunRegistry>,
    /// Builds one pipeline per run
    pub pipelines: Arc<dyn PipelineFactory>,
}

impl AppState {
    /// Wire the state from configuration: open the store and build pipelines
    /// from the configured models and search backend.
    pub async fn from_config(config_manager: Arc<ConfigManager>) -> Result<Self> {
        let config = config_manager.config();
        let store: Arc<dyn RunStore> = db::DatabaseProvider::from_config(&config.database)?
            .create_client()
            .await?;
        let broker = Arc::new(EventBroker::new());

        let pipelines = Arc::new(ConfiguredPipelineFactory::new(
            Arc::clone(&config_manager),
            Arc::clone(&store),
            Arc::clone(&broker),
        ));

        Ok(Self::new(config_manager, store, broker, pipelines))
    }

    /// Assemble the state from parts.
    pub fn new(
        config_manager: Arc<ConfigManager>,
        store: Arc<dyn RunStore>,
        broker: Arc<EventBroker>,
        pipelines: Arc<dyn PipelineFactory>,
    ) -> Self {
        Self {
            config_manager,
            store,
            broker,
            runs: Arc::new(RunRegistry::new()),
            pipelines,
        }
    }
}

/// The full HTTP application: `/api` routes, tracing, CORS and optional docs.
pub fn create_app(state: AppState) -> Router {
    let router = Router::new().nest("/api", api::routes::create_router());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", api::openapi::ApiDoc::openapi()),
        )
    };

    // Compression skips text/event-stream responses
    router
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
