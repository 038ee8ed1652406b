//! Answer synthesis over trimmed search results.
//!
//! Raw search payloads can be large. Before they are sent to the model each
//! one is reduced to the fields a summary needs:
//! - organic results: top N, `title`/`snippet`/`link` only
//! - answer box / knowledge graph: `title` + `description`
//! - related questions: first N
//! - search metadata: dropped

use crate::llm::{LLMClient, TokenStream};
use crate::types::Result;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const SUMMARY_SYSTEM_PROMPT: &str =
    "Summarize the search results in markdown format. Include relevant links and citations.";

/// Caps applied to each search payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimLimits {
    pub max_organic_results: usize,
    pub max_related_questions: usize,
}

impl Default for TrimLimits {
    fn default() -> Self {
        Self {
            max_organic_results: 5,
            max_related_questions: 3,
        }
    }
}

fn pick(source: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|field| {
            source
                .get(*field)
                .filter(|v| !v.is_null())
                .map(|v| (field.to_string(), v.clone()))
        })
        .collect()
}

fn reduce_card(card: &Value) -> Value {
    let description = ["description", "snippet", "answer"]
        .iter()
        .find_map(|field| card.get(*field).filter(|v| !v.is_null()))
        .cloned()
        .unwrap_or(Value::Null);

    json!({
        "title": card.get("title").cloned().unwrap_or(Value::Null),
        "description": description,
    })
}

/// Reduce one search payload to a bounded summary input.
pub fn trim_result(payload: &Value, limits: TrimLimits) -> Value {
    let mut trimmed = Map::new();

    if let Some(query) = payload.get("query") {
        trimmed.insert("query".to_string(), query.clone());
    }

    let organic: Vec<Value> = payload
        .get("organic_results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .take(limits.max_organic_results)
                .map(|r| Value::Object(pick(r, &["title", "snippet", "link"])))
                .collect()
        })
        .unwrap_or_default();
    trimmed.insert("organic_results".to_string(), Value::Array(organic));

    for card in ["answer_box", "knowledge_graph"] {
        if let Some(value) = payload.get(card).filter(|v| v.is_object()) {
            trimmed.insert(card.to_string(), reduce_card(value));
        }
    }

    if let Some(related) = payload.get("related_questions").and_then(Value::as_array) {
        let capped: Vec<Value> = related
            .iter()
            .take(limits.max_related_questions)
            .cloned()
            .collect();
        trimmed.insert("related_questions".to_string(), Value::Array(capped));
    }

    Value::Object(trimmed)
}

/// Streams a markdown answer synthesized from search results.
pub struct Summarizer {
    llm: Arc<dyn LLMClient>,
    limits: TrimLimits,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LLMClient>, limits: TrimLimits) -> Self {
        Self { llm, limits }
    }

    pub fn build_prompt(&self, query: &str, results: &[Value]) -> String {
        let trimmed: Vec<Value> = results
            .iter()
            .map(|r| trim_result(r, self.limits))
            .collect();

        format!(
            "Question: {}\n\nSummarize these search results: {}",
            query,
            Value::Array(trimmed)
        )
    }

    /// Open the completion stream. Fragments are yielded as they arrive.
    pub async fn stream(&self, query: &str, results: &[Value]) -> Result<TokenStream> {
        let prompt = self.build_prompt(query, results);
        tracing::debug!(
            prompt_bytes = prompt.len(),
            model = self.llm.model_name(),
            "opening summary stream"
        );

        self.llm
            .stream_with_system(SUMMARY_SYSTEM_PROMPT, &prompt)
            .await
    }
}
