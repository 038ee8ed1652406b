//! Research pipeline
//!
//! A run turns one free-text question into a streamed, researched answer:
//!
//! 1. **Refinement** - an LLM expands the question into search queries
//! 2. **Search** - one web search per refined query, in order
//! 3. **Summary** - a streaming completion over the trimmed results
//!
//! State is persisted as each stage commits, and every event is published to
//! the [`EventBroker`](crate::events::EventBroker) so any number of observers
//! can follow a run they did not start.
//!
//! # Usage
//!
//! ```ignore
//! use delve::research::ResearchPipeline;
//! use futures::StreamExt;
//!
//! let pipeline = ResearchPipeline::new(store, refiner_llm, summarizer_llm, search)
//!     .with_broker(broker.clone());
//!
//! let mut events = Box::pin(pipeline.run("rust vs go".to_string()));
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! ```

/// Stage orchestration as an async stream.
pub mod pipeline;
/// Sub-query generation.
pub mod refiner;
/// Cancellation handles for background runs.
pub mod registry;
/// Retry policy for external calls.
pub mod retry;
/// Result trimming and streaming synthesis.
pub mod summarizer;

pub use pipeline::{PipelineSettings, ResearchPipeline, validate_query};
pub use registry::RunRegistry;
pub use retry::RetryPolicy;

use crate::db::RunStore;
use crate::events::EventBroker;
use crate::llm::ProviderRegistry;
use crate::types::Result;
use crate::utils::toml_config::ConfigManager;
use async_trait::async_trait;
use std::sync::Arc;

/// Builds a fresh pipeline for each run.
#[async_trait]
pub trait PipelineFactory: Send + Sync {
    async fn create(&self) -> Result<ResearchPipeline>;
}

/// Builds pipelines from the current configuration, so model and search
/// changes picked up by hot reload apply to the next run.
pub struct ConfiguredPipelineFactory {
    config: Arc<ConfigManager>,
    store: Arc<dyn RunStore>,
    broker: Arc<EventBroker>,
}

impl ConfiguredPipelineFactory {
    pub fn new(
        config: Arc<ConfigManager>,
        store: Arc<dyn RunStore>,
        broker: Arc<EventBroker>,
    ) -> Self {
        Self {
            config,
            store,
            broker,
        }
    }
}

#[async_trait]
impl PipelineFactory for ConfiguredPipelineFactory {
    async fn create(&self) -> Result<ResearchPipeline> {
        let config = self.config.config();
        let providers = ProviderRegistry::from_config(&config);

        let refiner = providers
            .create_client_for_model(&config.pipeline.refiner_model)
            .await?;
        let summarizer = providers
            .create_client_for_model(&config.pipeline.summarizer_model)
            .await?;
        let search = crate::search::from_config(&config.search)?;

        Ok(ResearchPipeline::new(
            Arc::clone(&self.store),
            Arc::from(refiner),
            Arc::from(summarizer),
            search,
        )
        .with_settings(PipelineSettings::from(&config.pipeline))
        .with_broker(self.broker.as_ref().clone()))
    }
}
