//! Web search backends
//!
//! The pipeline issues one search per refined query through the
//! [`WebSearch`] trait. Each backend returns a JSON payload shaped like a
//! SerpAPI response so the summarizer can trim all of them the same way:
//!
//! ```json
//! {
//!   "query": "...",
//!   "organic_results": [{ "title": "...", "link": "...", "snippet": "..." }],
//!   "answer_box": { ... },
//!   "knowledge_graph": { ... },
//!   "related_questions": [ ... ],
//!   "search_metadata": { ... }
//! }
//! ```
//!
//! Only `query` and `organic_results` are guaranteed.

/// DuckDuckGo search through daedra.
pub mod duckduckgo;
/// SerpAPI search over HTTP.
pub mod serpapi;

pub use duckduckgo::DuckDuckGoSearch;
pub use serpapi::SerpApiSearch;

use crate::types::{AppError, Result};
use crate::utils::toml_config::SearchConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A single-call web search service.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Run one search and return its raw result payload.
    async fn search(&self, query: &str) -> Result<Value>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Build the configured search backend.
pub fn from_config(config: &SearchConfig) -> Result<Arc<dyn WebSearch>> {
    match config {
        SearchConfig::SerpApi {
            api_key_env,
            base_url,
            engine,
            num_results,
        } => {
            let api_key = std::env::var(api_key_env).map_err(|_| {
                AppError::Configuration(format!(
                    "Environment variable '{}' is not set",
                    api_key_env
                ))
            })?;
            Ok(Arc::new(
                SerpApiSearch::new(api_key, base_url.clone())
                    .with_engine(engine.clone())
                    .with_num_results(*num_results),
            ))
        }
        SearchConfig::DuckDuckGo { num_results } => {
            Ok(Arc::new(DuckDuckGoSearch::new(*num_results)))
        }
    }
}
