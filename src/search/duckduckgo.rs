//! Search backend using daedra
//!
//! daedra queries DuckDuckGo and needs no API key. Results are mapped onto
//! the `organic_results` shape used by the rest of the pipeline.

use super::WebSearch;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Web search powered by daedra
pub struct DuckDuckGoSearch {
    num_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(num_results: usize) -> Self {
        Self { num_results }
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Value> {
        if query.trim().is_empty() {
            return Err(AppError::Validation("Search query is empty".to_string()));
        }

        let search_args = daedra::SearchArgs {
            query: query.to_string(),
            options: Some(daedra::SearchOptions {
                num_results: self.num_results,
                ..Default::default()
            }),
        };

        let response = daedra::tools::search::perform_search(&search_args)
            .await
            .map_err(|e| AppError::Upstream(format!("Search failed: {}", e)))?;

        let organic_results: Vec<Value> = response
            .data
            .iter()
            .map(|r| {
                json!({
                    "title": r.title,
                    "link": r.url,
                    "snippet": r.description
                })
            })
            .collect();

        tracing::info!(query, results = organic_results.len(), "duckduckgo search complete");

        Ok(json!({
            "query": query,
            "organic_results": organic_results
        }))
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}
