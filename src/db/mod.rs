//! Durable run storage.
//!
//! - [`RunStore`] is the contract the pipeline and the API depend on.
//! - [`TursoClient`] implements it on libsql (in-memory SQLite, local file,
//!   or remote Turso with the `turso` feature).

#![allow(missing_docs)]

pub mod traits;
pub mod turso;

pub use traits::{DatabaseProvider, RunStore};
pub use turso::TursoClient;
