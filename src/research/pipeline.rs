use super::refiner::QueryRefiner;
use super::retry::RetryPolicy;
use super::summarizer::{Summarizer, TrimLimits};
use crate::db::RunStore;
use crate::events::{EventBroker, ProgressEvent};
use crate::llm::{LLMClient, TokenStream};
use crate::search::WebSearch;
use crate::types::{AppError, Result};
use crate::utils::toml_config::PipelineConfig;
use async_stream::stream;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const STATUS_REFINING: &str = "Generating search queries...";
pub const STATUS_SEARCHING: &str = "Searching...";
pub const STATUS_SUMMARIZING: &str = "Generating summary...";

/// Reason published to observers when a run is dropped before finishing.
pub const CANCELLED_REASON: &str = "Run cancelled";

/// Reason given to an observer that attaches after a run stopped without
/// completing.
pub const RUN_ENDED_REASON: &str = "Run ended before completion";

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub num_queries: usize,
    pub limits: TrimLimits,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            num_queries: config.num_queries,
            limits: TrimLimits {
                max_organic_results: config.max_organic_results,
                max_related_questions: config.max_related_questions,
            },
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

/// Reject queries that would produce an empty run.
pub fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(AppError::Validation("Query must not be empty".to_string()));
    }
    Ok(())
}

/// Publishes each event of a run to the broker and tells observers when the
/// run goes away without a terminal event.
///
/// The run counts as live on the broker from `RunCreated` until its terminal
/// event has been published.
struct BrokerRelay {
    broker: Option<EventBroker>,
    run_id: Option<String>,
    finished: bool,
}

impl BrokerRelay {
    fn observe(&mut self, event: &ProgressEvent) {
        if let ProgressEvent::RunCreated { id } = event {
            self.run_id = Some(id.clone());
            if let Some(broker) = &self.broker {
                broker.mark_live(id);
            }
        }
        if event.is_terminal() {
            self.finished = true;
        }
        if let (Some(broker), Some(run_id)) = (&self.broker, &self.run_id) {
            broker.publish(run_id, event);
            if event.is_terminal() {
                broker.mark_ended(run_id);
            }
        }
    }
}

impl Drop for BrokerRelay {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(run_id) = &self.run_id {
            tracing::info!(%run_id, "run cancelled before completion");
            if let Some(broker) = &self.broker {
                broker.publish(run_id, &ProgressEvent::error(CANCELLED_REASON));
                broker.mark_ended(run_id);
            }
        }
    }
}

/// One research run: refine, search, summarize.
///
/// The pipeline is consumed by [`ResearchPipeline::run`]; build a new one per
/// query.
pub struct ResearchPipeline {
    store: Arc<dyn RunStore>,
    refiner: Arc<dyn LLMClient>,
    summarizer: Arc<dyn LLMClient>,
    search: Arc<dyn WebSearch>,
    broker: Option<EventBroker>,
    settings: PipelineSettings,
}

impl ResearchPipeline {
    pub fn new(
        store: Arc<dyn RunStore>,
        refiner: Arc<dyn LLMClient>,
        summarizer: Arc<dyn LLMClient>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            store,
            refiner,
            summarizer,
            search,
            broker: None,
            settings: PipelineSettings::default(),
        }
    }

    /// Publish every event to `broker` as it is produced.
    pub fn with_broker(mut self, broker: EventBroker) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start the run. Nothing happens until the stream is polled.
    ///
    /// `RunCreated` is always first and the stream ends after exactly one
    /// `Complete` or `Error`. Dropping the stream cancels the run; the summary
    /// is then never persisted.
    pub fn run(self, query: String) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        let mut relay = BrokerRelay {
            broker: self.broker.clone(),
            run_id: None,
            finished: false,
        };

        self.events(query).map(move |event| {
            relay.observe(&event);
            event
        })
    }

    fn events(self, query: String) -> impl Stream<Item = ProgressEvent> + Send + 'static {
        stream! {
            if let Err(e) = validate_query(&query) {
                yield ProgressEvent::error(e.to_string());
                return;
            }
            let query = query.trim().to_string();

            let run = match self.store.create_run(&query).await {
                Ok(run) => run,
                Err(e) => {
                    tracing::error!(error = %e, "failed to create run");
                    yield ProgressEvent::error(e.to_string());
                    return;
                }
            };
            let run_id = run.id;
            tracing::info!(%run_id, query = %query, "run started");
            yield ProgressEvent::RunCreated { id: run_id.clone() };

            // Refinement
            yield ProgressEvent::status(STATUS_REFINING);
            let queries = match self.refine(&query).await {
                Ok(queries) => queries,
                Err(e) => {
                    tracing::error!(%run_id, error = %e, "refinement failed");
                    yield ProgressEvent::error(e.to_string());
                    return;
                }
            };
            if let Err(e) = self.store.set_refined_queries(&run_id, &queries).await {
                tracing::error!(%run_id, error = %e, "failed to persist refined queries");
                yield ProgressEvent::error(e.to_string());
                return;
            }
            yield ProgressEvent::QueriesReady { queries: queries.clone() };

            // Search
            yield ProgressEvent::status(STATUS_SEARCHING);
            let mut results: Vec<Value> = Vec::with_capacity(queries.len());
            for sub_query in &queries {
                match self.search_one(sub_query).await {
                    Ok(payload) => {
                        tracing::info!(%run_id, query = %sub_query, "search finished");
                        results.push(payload.clone());
                        yield ProgressEvent::SearchResult { payload };
                    }
                    Err(e) => {
                        tracing::error!(%run_id, query = %sub_query, error = %e, "search failed");
                        yield ProgressEvent::error(e.to_string());
                        return;
                    }
                }
            }

            // Summary
            yield ProgressEvent::status(STATUS_SUMMARIZING);
            let mut fragments = match self.open_summary(&query, &results).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    tracing::error!(%run_id, error = %e, "failed to open summary stream");
                    yield ProgressEvent::error(e.to_string());
                    return;
                }
            };

            let mut summary = String::new();
            loop {
                let next = tokio::time::timeout(self.settings.request_timeout, fragments.next());
                match next.await {
                    Ok(Some(Ok(text))) => {
                        if text.is_empty() {
                            continue;
                        }
                        summary.push_str(&text);
                        yield ProgressEvent::SummaryChunk { text };
                    }
                    Ok(Some(Err(e))) => {
                        tracing::error!(%run_id, error = %e, "summary stream failed");
                        yield ProgressEvent::error(e.to_string());
                        return;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        let e = self.timed_out("summary stream");
                        tracing::error!(%run_id, error = %e, "summary stream stalled");
                        yield ProgressEvent::error(e.to_string());
                        return;
                    }
                }
            }

            if let Err(e) = self.store.set_final_summary(&run_id, &summary).await {
                tracing::error!(%run_id, error = %e, "failed to persist summary");
                yield ProgressEvent::error(e.to_string());
                return;
            }
            tracing::info!(%run_id, summary_len = summary.len(), "run complete");
            yield ProgressEvent::Complete { final_summary: summary };
        }
    }

    fn timed_out(&self, call: &str) -> AppError {
        AppError::Upstream(format!(
            "{} timed out after {}s",
            call,
            self.settings.request_timeout.as_secs()
        ))
    }

    async fn bounded<T>(&self, call: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.settings.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(self.timed_out(call)),
        }
    }

    async fn refine(&self, query: &str) -> Result<Vec<String>> {
        let refiner = QueryRefiner::new(Arc::clone(&self.refiner), self.settings.num_queries);
        self.settings
            .retry
            .run("refine", || self.bounded("refinement", refiner.refine(query)))
            .await
    }

    async fn search_one(&self, query: &str) -> Result<Value> {
        self.settings
            .retry
            .run("search", || self.bounded("search", self.search.search(query)))
            .await
    }

    async fn open_summary(&self, query: &str, results: &[Value]) -> Result<TokenStream> {
        let summarizer = Summarizer::new(Arc::clone(&self.summarizer), self.settings.limits);
        self.settings
            .retry
            .run("summarize", || {
                self.bounded("summary", summarizer.stream(query, results))
            })
            .await
    }
}
