//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Liveness endpoint.
pub mod health;
/// Research run lifecycle and event streaming.
pub mod runs;
