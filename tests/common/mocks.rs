//! Mock implementations for testing.
//!
//! This module provides mock LLM clients, search backends and a pipeline
//! factory that can be used across different test files without duplication.

use async_trait::async_trait;
use delve::db::TursoClient;
use delve::events::EventBroker;
use delve::llm::{LLMClient, TokenStream};
use delve::research::{PipelineFactory, PipelineSettings, ResearchPipeline, RetryPolicy};
use delve::search::WebSearch;
use delve::types::{AppError, Result};
use delve::utils::toml_config::{ConfigManager, DelveConfig};
use delve::{AppState, RunStore};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone)]
enum Mode {
    Ok,
    /// Every call fails with an upstream error
    Failing,
    /// Refinement never answers
    HangingRefine,
    /// Summary yields its chunks then fails
    StreamErrorAfter(usize),
    /// Summary waits `Duration` between chunks
    SlowStream(Duration),
}

/// Mock LLM client for testing with scripted responses.
///
/// `generate_with_system` returns `reply`; `stream_with_system` yields
/// `chunks` one by one.
///
/// # Examples
///
/// ```ignore
/// let client = MockLLMClient::new(r#"["a", "b", "c"]"#, &["Rust ", "wins."]);
/// let client = MockLLMClient::failing();
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    reply: String,
    chunks: Vec<String>,
    mode: Mode,
    calls: Arc<AtomicUsize>,
}

impl MockLLMClient {
    /// Create a client that answers `reply` and streams `chunks`.
    pub fn new(reply: &str, chunks: &[&str]) -> Self {
        Self {
            reply: reply.to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            mode: Mode::Ok,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            mode: Mode::Failing,
            ..Self::new("", &[])
        }
    }

    /// Create a mock client whose one-shot completion never returns.
    pub fn hanging() -> Self {
        Self {
            mode: Mode::HangingRefine,
            ..Self::new("", &[])
        }
    }

    /// Stream `chunks` and then fail.
    pub fn stream_error_after(chunks: &[&str]) -> Self {
        let mut client = Self::new("", chunks);
        client.mode = Mode::StreamErrorAfter(chunks.len());
        client
    }

    /// Stream `chunks` with a pause before each one.
    pub fn slow_stream(chunks: &[&str], delay: Duration) -> Self {
        let mut client = Self::new("", chunks);
        client.mode = Mode::SlowStream(delay);
        client
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn complete(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Failing => Err(AppError::Upstream("Mock LLM failure".to_string())),
            Mode::HangingRefine => futures::future::pending().await,
            _ => Ok(self.reply.clone()),
        }
    }

    fn open(&self) -> Result<TokenStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let chunks = self.chunks.clone();

        match self.mode.clone() {
            Mode::Failing => Err(AppError::Upstream("Mock LLM failure".to_string())),
            Mode::StreamErrorAfter(n) => {
                let items = chunks
                    .into_iter()
                    .take(n)
                    .map(Ok)
                    .chain(std::iter::once(Err(AppError::Upstream(
                        "stream interrupted".to_string(),
                    ))));
                Ok(Box::new(stream::iter(items)))
            }
            Mode::SlowStream(delay) => Ok(Box::new(
                stream::iter(chunks)
                    .then(move |chunk| async move {
                        tokio::time::sleep(delay).await;
                        Ok(chunk)
                    })
                    .boxed(),
            )),
            _ => Ok(Box::new(stream::iter(chunks.into_iter().map(Ok)))),
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.complete().await
    }

    async fn stream_with_system(&self, _system: &str, _prompt: &str) -> Result<TokenStream> {
        self.open()
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Search backend that records queries and returns canned payloads.
#[derive(Default)]
pub struct MockSearch {
    queries: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when asked for `query`.
    pub fn failing_on(query: &str) -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            fail_on: Some(query.to_string()),
        }
    }

    /// Queries received, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn payload(query: &str) -> Value {
        json!({
            "query": query,
            "organic_results": [
                { "title": format!("{} - result", query), "link": "https://example.com", "snippet": "..." }
            ]
        })
    }
}

#[async_trait]
impl WebSearch for MockSearch {
    async fn search(&self, query: &str) -> Result<Value> {
        self.queries.lock().push(query.to_string());
        if self.fail_on.as_deref() == Some(query) {
            return Err(AppError::Upstream(format!("search failed for '{}'", query)));
        }
        Ok(Self::payload(query))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Sub-queries the "rust vs go" refiner returns.
pub const RUST_VS_GO_QUERIES: &str =
    r#"["rust vs go performance", "rust vs go memory safety", "rust vs go concurrency"]"#;

/// Summary fragments for the "rust vs go" run.
pub const RUST_VS_GO_CHUNKS: [&str; 4] = ["Rust ", "offers ", "memory ", "safety."];

/// Settings with a short timeout so failure tests finish quickly.
pub fn test_settings() -> PipelineSettings {
    PipelineSettings {
        request_timeout: Duration::from_millis(200),
        retry: RetryPolicy::none(),
        ..PipelineSettings::default()
    }
}

/// Builds pipelines from fixed mocks.
pub struct MockPipelineFactory {
    pub store: Arc<dyn RunStore>,
    pub broker: Arc<EventBroker>,
    pub refiner: MockLLMClient,
    pub summarizer: MockLLMClient,
    pub search: Arc<MockSearch>,
    pub settings: PipelineSettings,
}

#[async_trait]
impl PipelineFactory for MockPipelineFactory {
    async fn create(&self) -> Result<ResearchPipeline> {
        Ok(ResearchPipeline::new(
            Arc::clone(&self.store),
            Arc::new(self.refiner.clone()),
            Arc::new(self.summarizer.clone()),
            self.search.clone(),
        )
        .with_settings(self.settings.clone())
        .with_broker(self.broker.as_ref().clone()))
    }
}

/// In-memory store.
pub async fn memory_store() -> Arc<TursoClient> {
    Arc::new(
        TursoClient::new_memory()
            .await
            .expect("Failed to create in-memory database"),
    )
}

/// App state backed by an in-memory store and the given mocks.
pub async fn test_state(refiner: MockLLMClient, summarizer: MockLLMClient) -> AppState {
    let store: Arc<dyn RunStore> = memory_store().await;
    let broker = Arc::new(EventBroker::new());
    let factory = Arc::new(MockPipelineFactory {
        store: Arc::clone(&store),
        broker: Arc::clone(&broker),
        refiner,
        summarizer,
        search: Arc::new(MockSearch::new()),
        settings: test_settings(),
    });

    AppState::new(
        Arc::new(ConfigManager::from_config(DelveConfig::default())),
        store,
        broker,
        factory,
    )
}
