//! Research run handlers.
//!
//! Runs can be driven two ways:
//! - `POST /api/runs` starts the pipeline in a background task and returns
//!   the run id; progress is followed through `GET /api/runs/{id}/events`.
//! - `POST /api/runs/stream` drives the pipeline inside the request and
//!   streams every event back to the caller. Disconnecting cancels the run.
//!
//! Both paths publish through the broker, so any number of observers can
//! attach to the same run.

use crate::{
    AppState,
    events::{ChannelOptions, ProgressEvent, WireEvent},
    research::{pipeline::RUN_ENDED_REASON, validate_query},
    types::{AppError, Result, Run, RunCreatedResponse, RunRequest, SuccessResponse},
};
use async_stream::stream;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;

fn to_sse(event: &ProgressEvent) -> SseEvent {
    SseEvent::default().data(WireEvent::from(event).to_json())
}

fn keep_alive(state: &AppState) -> KeepAlive {
    let secs = state.config_manager.config().transport.keepalive_secs;
    KeepAlive::new().interval(Duration::from_secs(secs.max(1)))
}

/// Start a run in the background
#[utoipa::path(
    post,
    path = "/api/runs",
    request_body = RunRequest,
    responses(
        (status = 201, description = "Run created", body = RunCreatedResponse),
        (status = 400, description = "Empty query"),
        (status = 500, description = "Run could not be created")
    ),
    tag = "runs"
)]
pub async fn create_run(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<(StatusCode, Json<RunCreatedResponse>)> {
    validate_query(&payload.query)?;

    let pipeline = state.pipelines.create().await?;
    let mut events = Box::pin(pipeline.run(payload.query));

    let run_id = match events.next().await {
        Some(ProgressEvent::RunCreated { id }) => id,
        Some(ProgressEvent::Error { reason }) => return Err(AppError::Persistence(reason)),
        _ => {
            return Err(AppError::Internal(
                "Run ended before it was created".to_string(),
            ));
        }
    };

    state.runs.spawn(&run_id, events);
    tracing::info!(%run_id, "background run started");

    Ok((StatusCode::CREATED, Json(RunCreatedResponse { run_id })))
}

/// Run the pipeline and stream its events to the caller
#[utoipa::path(
    post,
    path = "/api/runs/stream",
    request_body = RunRequest,
    responses(
        (status = 200, description = "Server-sent progress events", content_type = "text/event-stream"),
        (status = 400, description = "Empty query")
    ),
    tag = "runs"
)]
pub async fn stream_run(
    State(state): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    validate_query(&payload.query)?;

    let pipeline = state.pipelines.create().await?;
    let events = pipeline
        .run(payload.query)
        .map(|event| Ok(to_sse(&event)));

    Ok(Sse::new(events).keep_alive(keep_alive(&state)))
}

/// Get a run snapshot
#[utoipa::path(
    get,
    path = "/api/runs/{id}",
    params(("id" = String, Path, description = "Run id")),
    responses(
        (status = 200, description = "Run snapshot", body = Run),
        (status = 404, description = "Run not found")
    ),
    tag = "runs"
)]
pub async fn get_run(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Run>> {
    let run = state
        .store
        .get_run(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run '{}' not found", id)))?;

    Ok(Json(run))
}

/// Delete a run
#[utoipa::path(
    delete,
    path = "/api/runs/{id}",
    params(("id" = String, Path, description = "Run id")),
    responses((status = 200, description = "Run deleted", body = SuccessResponse)),
    tag = "runs"
)]
pub async fn delete_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    if state.runs.is_active(&id) {
        state.runs.cancel(&id)?;
    }
    state.store.delete_run(&id).await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Cancel a background run
#[utoipa::path(
    post,
    path = "/api/runs/{id}/cancel",
    params(("id" = String, Path, description = "Run id")),
    responses(
        (status = 200, description = "Run cancelled", body = SuccessResponse),
        (status = 404, description = "No active run with this id")
    ),
    tag = "runs"
)]
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.runs.cancel(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Follow a run's live events
///
/// Only events published after the connection opens are sent. A run that
/// already completed yields its stored summary as a single `complete` event.
/// A run that stopped without completing ends the stream with an `error`.
#[utoipa::path(
    get,
    path = "/api/runs/{id}/events",
    params(("id" = String, Path, description = "Run id")),
    responses(
        (status = 200, description = "Server-sent progress events", content_type = "text/event-stream"),
        (status = 404, description = "Run not found")
    ),
    tag = "runs"
)]
pub async fn run_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    let options = ChannelOptions::from(&state.config_manager.config().transport);

    // Subscribe before reading the snapshot so nothing falls in between
    let (subscription, mut rx) = state.broker.subscribe_channel(&id, options);

    let run = state
        .store
        .get_run(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Run '{}' not found", id)))?;

    let completed = run.is_complete().then_some(run.summary);
    let live = state.broker.is_live(&id);

    let events = stream! {
        if let Some(final_summary) = completed {
            yield Ok(to_sse(&ProgressEvent::Complete { final_summary }));
            return;
        }

        // An ended run publishes nothing more, so the channel closes once
        // whatever reached it has been read
        let _subscription = live.then_some(subscription);

        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            yield Ok(to_sse(&event));
            if terminal {
                return;
            }
        }

        if !live {
            tracing::debug!(run_id = %id, "run ended before observer attached");
            yield Ok(to_sse(&ProgressEvent::error(RUN_ENDED_REASON)));
        }
    };

    Ok(Sse::new(events).keep_alive(keep_alive(&state)))
}
