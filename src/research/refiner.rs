use crate::llm::LLMClient;
use crate::types::Result;
use std::sync::Arc;

const REFINER_SYSTEM_PROMPT: &str = "You are a helpful assistant that generates search queries. \
You must respond with exactly {n} search queries in a JSON array format. \
Example response: [\"query1\", \"query2\", \"query3\"]";

/// Expands one question into several search-engine friendly sub-queries.
pub struct QueryRefiner {
    llm: Arc<dyn LLMClient>,
    num_queries: usize,
}

impl QueryRefiner {
    pub fn new(llm: Arc<dyn LLMClient>, num_queries: usize) -> Self {
        Self {
            llm,
            num_queries: num_queries.max(1),
        }
    }

    /// Ask the model for sub-queries.
    ///
    /// A failed call is an error. A reply that is not a JSON array of exactly
    /// `num_queries` non-empty strings falls back to `[query]`.
    pub async fn refine(&self, query: &str) -> Result<Vec<String>> {
        let system = REFINER_SYSTEM_PROMPT.replace("{n}", &self.num_queries.to_string());
        let prompt = format!(
            "Generate {} different search queries for: \"{}\". \
             Make them specific and search-engine friendly. Respond only with the JSON array.",
            self.num_queries, query
        );

        let raw = self.llm.generate_with_system(&system, &prompt).await?;

        match parse_queries(&raw, self.num_queries) {
            Some(queries) => {
                tracing::info!(?queries, "refined queries");
                Ok(queries)
            }
            None => {
                tracing::warn!(
                    raw = %raw,
                    "refiner reply not in expected format, using original query"
                );
                Ok(vec![query.to_string()])
            }
        }
    }
}

/// Parse a model reply into exactly `expected` queries.
///
/// Tolerates a surrounding markdown code fence.
pub fn parse_queries(raw: &str, expected: usize) -> Option<Vec<String>> {
    let body = strip_code_fence(raw.trim());
    let queries: Vec<String> = serde_json::from_str(body).ok()?;

    let queries: Vec<String> = queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .collect();

    if queries.len() != expected || queries.iter().any(|q| q.is_empty()) {
        return None;
    }
    Some(queries)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening line
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
