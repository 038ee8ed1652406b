//! Ask command implementation
//!
//! Runs one query through the pipeline in-process and prints each progress
//! event as it arrives. The run is stored like any server run.

use super::output::Output;
use crate::AppState;
use crate::events::ProgressEvent;
use futures::StreamExt;

/// Research `query` and print progress. Returns whether the run completed.
pub async fn run(state: &AppState, query: String, output: &Output) -> anyhow::Result<bool> {
    crate::research::validate_query(&query)?;

    output.header("Researching");
    output.kv("query", query.trim());

    let pipeline = state.pipelines.create().await?;
    let mut events = Box::pin(pipeline.run(query));

    let mut completed = false;
    while let Some(event) = events.next().await {
        output.progress(&event);
        if let ProgressEvent::Complete { .. } = event {
            completed = true;
        }
    }
    Ok(completed)
}
