//! Progress events and live fan-out
//!
//! A run produces an ordered, append-only sequence of [`ProgressEvent`]s.
//! The same sequence is pushed to every live observer of that run through
//! the [`broker::EventBroker`], and serialized for the wire by [`wire`].
//!
//! # Example
//!
//! ```rust,ignore
//! use delve::events::{EventBroker, ProgressEvent};
//!
//! let broker = EventBroker::new();
//! let subscription = broker.subscribe("run-1", |event: &ProgressEvent| {
//!     println!("{:?}", event);
//! });
//!
//! broker.publish("run-1", &ProgressEvent::status("Searching..."));
//! subscription.unsubscribe();
//! ```

/// Per-run publish/subscribe registry.
pub mod broker;
/// JSON wire records for progress events.
pub mod wire;

pub use broker::{ChannelOptions, EventBroker, Subscription};
pub use wire::WireEvent;

use serde_json::Value;

/// One unit in a run's output sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Always the first event; carries the durable run id.
    RunCreated { id: String },
    /// Human-readable stage transition.
    Status { message: String },
    /// Refined sub-queries, emitted once.
    QueriesReady { queries: Vec<String> },
    /// Raw result of one web search, one per refined query.
    SearchResult { payload: Value },
    /// One fragment of the streamed summary.
    SummaryChunk { text: String },
    /// Terminal success carrying the full summary.
    Complete { final_summary: String },
    /// Terminal failure.
    Error { reason: String },
}

impl ProgressEvent {
    pub fn status(message: impl Into<String>) -> Self {
        ProgressEvent::Status {
            message: message.into(),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        ProgressEvent::Error {
            reason: reason.into(),
        }
    }

    /// `complete` and `error` end a run's sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Complete { .. } | ProgressEvent::Error { .. }
        )
    }

    /// Progress notes a lagging observer can miss without losing content.
    ///
    /// Everything else carries data the observer cannot rebuild from the
    /// live stream and is delivered in order.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Status { .. } | ProgressEvent::SearchResult { .. }
        )
    }

    /// The wire `type` tag for this event.
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::RunCreated { .. } => "runCreated",
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::QueriesReady { .. } => "queriesReady",
            ProgressEvent::SearchResult { .. } => "searchResult",
            ProgressEvent::SummaryChunk { .. } => "summaryChunk",
            ProgressEvent::Complete { .. } => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }
}
