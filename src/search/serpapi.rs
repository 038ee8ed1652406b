use super::WebSearch;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Sections of a SerpAPI response forwarded to the pipeline.
const FORWARDED_SECTIONS: [&str; 5] = [
    "organic_results",
    "answer_box",
    "knowledge_graph",
    "related_questions",
    "search_metadata",
];

/// Web search via the SerpAPI JSON endpoint.
pub struct SerpApiSearch {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    engine: String,
    num_results: usize,
}

impl SerpApiSearch {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            engine: "google".to_string(),
            num_results: 5,
        }
    }

    pub fn with_engine(mut self, engine: String) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_num_results(mut self, num_results: usize) -> Self {
        self.num_results = num_results;
        self
    }

    fn shape(query: &str, mut body: Value) -> Value {
        let mut payload = Map::new();
        payload.insert("query".to_string(), json!(query));

        for section in FORWARDED_SECTIONS {
            if let Some(value) = body.get_mut(section).map(Value::take) {
                payload.insert(section.to_string(), value);
            }
        }
        payload
            .entry("organic_results")
            .or_insert_with(|| json!([]));

        Value::Object(payload)
    }
}

#[async_trait]
impl WebSearch for SerpApiSearch {
    async fn search(&self, query: &str) -> Result<Value> {
        tracing::debug!(query, engine = %self.engine, "serpapi search");

        let num = self.num_results.to_string();
        let response = self
            .http
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("engine", self.engine.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("SerpAPI request failed: {}", e)))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("SerpAPI returned invalid JSON: {}", e)))?;

        if let Some(message) = body.get("error").and_then(Value::as_str) {
            return Err(AppError::Upstream(format!("SerpAPI error: {}", message)));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "SerpAPI returned status {}",
                status
            )));
        }

        let payload = Self::shape(query, body);
        tracing::info!(
            query,
            results = payload["organic_results"].as_array().map_or(0, Vec::len),
            "serpapi search complete"
        );
        Ok(payload)
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_keeps_known_sections() {
        let body = json!({
            "organic_results": [{ "title": "Rust", "link": "https://rust-lang.org" }],
            "answer_box": { "title": "Rust", "answer": "A language" },
            "pagination": { "next": "..." },
            "search_metadata": { "id": "abc", "status": "Success" }
        });

        let payload = SerpApiSearch::shape("rust", body);
        assert_eq!(payload["query"], "rust");
        assert_eq!(payload["organic_results"][0]["title"], "Rust");
        assert!(payload.get("answer_box").is_some());
        assert!(payload.get("pagination").is_none());
    }

    #[test]
    fn test_shape_defaults_organic_results() {
        let payload = SerpApiSearch::shape("nothing", json!({}));
        assert_eq!(payload["organic_results"], json!([]));
    }
}
