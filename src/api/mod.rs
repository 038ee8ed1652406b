//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for Delve, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Runs (`/api/runs`)
//! - `POST /api/runs` - Start a run in the background, returns `{runId}`
//! - `POST /api/runs/stream` - Start a run and stream its events (SSE)
//! - `GET /api/runs/{id}` - Run snapshot
//! - `DELETE /api/runs/{id}` - Delete a run
//! - `POST /api/runs/{id}/cancel` - Abort a background run
//! - `GET /api/runs/{id}/events` - Follow a run's live events (SSE)
//!
//! ## Health (`/api/health`)
//! - `GET /api/health` - Health check endpoint
//!
//! # Event stream
//!
//! Each SSE `data:` line is one JSON record:
//!
//! ```text
//! {"type":"status","message":"Searching..."}
//! {"type":"summaryChunk","content":"Rust "}
//! {"type":"complete","content":"Rust offers memory safety."}
//! ```
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// OpenAPI document.
pub mod openapi;
/// Router configuration and route definitions.
pub mod routes;
