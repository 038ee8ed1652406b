//! Run store abstraction
//!
//! This module provides the `RunStore` trait that the research pipeline and
//! the HTTP handlers use to persist runs, and `DatabaseProvider` to pick a
//! backend (in-memory SQLite, file-based SQLite, remote Turso).
//!
//! # Example
//!
//! ```rust,ignore
//! use delve::db::{DatabaseProvider, RunStore};
//!
//! let store = DatabaseProvider::Memory.create_client().await?;
//! let run = store.create_run("rust vs go").await?;
//! assert!(store.get_run(&run.id).await?.is_some());
//! ```

use crate::types::{AppError, Result, Run};
use crate::utils::toml_config::DatabaseConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable storage for runs.
///
/// Mutations are keyed by run id and idempotent. Field setters on an unknown
/// id fail with [`AppError::NotFound`]; `get_run` on an unknown id is
/// `Ok(None)`; deleting an unknown id succeeds.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a new run with empty refined queries and summary
    async fn create_run(&self, query: &str) -> Result<Run>;

    /// Record the refined sub-queries
    async fn set_refined_queries(&self, run_id: &str, queries: &[String]) -> Result<()>;

    /// Record the full summary once the stream has finished. This marks the
    /// run complete, even when the summary is empty.
    async fn set_final_summary(&self, run_id: &str, summary: &str) -> Result<()>;

    /// Snapshot of a run
    async fn get_run(&self, run_id: &str) -> Result<Option<Run>>;

    /// Remove a run
    async fn delete_run(&self, run_id: &str) -> Result<()>;
}

/// Database provider configuration
#[derive(Debug, Clone, Default)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
    /// Remote Turso database (requires network access)
    #[cfg(feature = "turso")]
    Turso {
        /// The Turso database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the Turso database
        auth_token: String,
    },
}

impl DatabaseProvider {
    /// Create a database client from this provider configuration
    pub async fn create_client(&self) -> Result<Arc<super::turso::TursoClient>> {
        let client = match self {
            DatabaseProvider::Memory => super::turso::TursoClient::new_memory().await?,
            DatabaseProvider::SQLite { path } => {
                super::turso::TursoClient::new_local(path).await?
            }
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { url, auth_token } => {
                super::turso::TursoClient::new_remote(url.clone(), auth_token.clone()).await?
            }
        };
        Ok(Arc::new(client))
    }

    /// Pick a provider from `[database]`: Turso when both env vars are
    /// configured and set, otherwise the local url.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if let (Some(url_env), Some(token_env)) = (&config.turso_url_env, &config.turso_token_env)
        {
            let url = std::env::var(url_env).map_err(|_| {
                AppError::Configuration(format!("Environment variable '{}' is not set", url_env))
            })?;
            let auth_token = std::env::var(token_env).map_err(|_| {
                AppError::Configuration(format!("Environment variable '{}' is not set", token_env))
            })?;

            #[cfg(feature = "turso")]
            return Ok(DatabaseProvider::Turso { url, auth_token });

            #[cfg(not(feature = "turso"))]
            {
                let _ = (url, auth_token);
                return Err(AppError::Configuration(
                    "Turso is configured but the 'turso' feature is disabled".to_string(),
                ));
            }
        }

        if config.url.is_empty() || config.url == ":memory:" {
            Ok(DatabaseProvider::Memory)
        } else {
            Ok(DatabaseProvider::SQLite {
                path: config.url.clone(),
            })
        }
    }
}
