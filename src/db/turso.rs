use crate::db::traits::RunStore;
use crate::types::{AppError, Result, Run};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::{Builder, Connection, Database, Row};
use uuid::Uuid;

/// libsql-backed run store: in-memory, local file, or remote Turso.
pub struct TursoClient {
    db: Database,
    // An in-memory database lives only as long as a connection to it.
    memory_conn: Option<Connection>,
}

impl TursoClient {
    /// Connect to a database URL: `:memory:`, a file path, or a `libsql://` URL.
    pub async fn new(url: String, auth_token: String) -> Result<Self> {
        if url == ":memory:" {
            Self::new_memory().await
        } else if url.starts_with("libsql://") || url.starts_with("https://") {
            Self::new_remote(url, auth_token).await
        } else {
            Self::new_local(&url).await
        }
    }

    /// Ephemeral database, lost when the client is dropped
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to open in-memory db: {}", e)))?;

        let memory_conn = db
            .connect()
            .map_err(|e| AppError::Persistence(format!("Failed to get connection: {}", e)))?;

        let client = Self {
            db,
            memory_conn: Some(memory_conn),
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    /// File-backed SQLite database; parent directories are created
    pub async fn new_local(path: &str) -> Result<Self> {
        if path == ":memory:" {
            return Self::new_memory().await;
        }

        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Persistence(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to open {}: {}", path, e)))?;

        let client = Self {
            db,
            memory_conn: None,
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    /// Remote Turso database
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to connect to Turso: {}", e)))?;

        let client = Self {
            db,
            memory_conn: None,
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> Result<Connection> {
        if let Some(conn) = &self.memory_conn {
            return Ok(conn.clone());
        }
        self.db
            .connect()
            .map_err(|e| AppError::Persistence(format!("Failed to get connection: {}", e)))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                refined_queries TEXT NOT NULL DEFAULT '[]',
                summary TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Persistence(format!("Failed to create runs table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_created_at ON runs(created_at)",
            (),
        )
        .await
        .map_err(|e| AppError::Persistence(format!("Failed to create runs index: {}", e)))?;

        Ok(())
    }

    fn timestamp(millis: i64) -> Result<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| AppError::Persistence(format!("Invalid timestamp: {}", millis)))
    }

    fn row_to_run(row: &Row) -> Result<Run> {
        let refined: String = row.get(2).map_err(|e| AppError::Persistence(e.to_string()))?;
        let refined_queries: Vec<String> = serde_json::from_str(&refined).map_err(|e| {
            AppError::Persistence(format!("Corrupt refined_queries column: {}", e))
        })?;
        // NULL until the summary stage finishes
        let summary: Option<String> =
            row.get(3).map_err(|e| AppError::Persistence(e.to_string()))?;

        Ok(Run {
            id: row.get(0).map_err(|e| AppError::Persistence(e.to_string()))?,
            query: row.get(1).map_err(|e| AppError::Persistence(e.to_string()))?,
            refined_queries,
            completed: summary.is_some(),
            summary: summary.unwrap_or_default(),
            created_at: Self::timestamp(
                row.get(4).map_err(|e| AppError::Persistence(e.to_string()))?,
            )?,
            updated_at: Self::timestamp(
                row.get(5).map_err(|e| AppError::Persistence(e.to_string()))?,
            )?,
        })
    }

    async fn update_column(&self, run_id: &str, sql: &str, value: String) -> Result<()> {
        let conn = self.connection()?;
        let now = Utc::now().timestamp_millis();

        let affected = conn
            .execute(sql, (value, now, run_id))
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to update run: {}", e)))?;

        if affected == 0 {
            return Err(AppError::NotFound(format!("Run {} not found", run_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RunStore for TursoClient {
    async fn create_run(&self, query: &str) -> Result<Run> {
        let conn = self.connection()?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();

        conn.execute(
            "INSERT INTO runs (id, query, refined_queries, summary, created_at, updated_at)
             VALUES (?, ?, '[]', NULL, ?, ?)",
            (id.as_str(), query, now, now),
        )
        .await
        .map_err(|e| AppError::Persistence(format!("Failed to create run: {}", e)))?;

        let created_at = Self::timestamp(now)?;
        Ok(Run {
            id,
            query: query.to_string(),
            refined_queries: Vec::new(),
            summary: String::new(),
            completed: false,
            created_at,
            updated_at: created_at,
        })
    }

    async fn set_refined_queries(&self, run_id: &str, queries: &[String]) -> Result<()> {
        let serialized = serde_json::to_string(queries)
            .map_err(|e| AppError::Internal(format!("Failed to encode queries: {}", e)))?;

        self.update_column(
            run_id,
            "UPDATE runs SET refined_queries = ?, updated_at = ? WHERE id = ?",
            serialized,
        )
        .await
    }

    async fn set_final_summary(&self, run_id: &str, summary: &str) -> Result<()> {
        self.update_column(
            run_id,
            "UPDATE runs SET summary = ?, updated_at = ? WHERE id = ?",
            summary.to_string(),
        )
        .await
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, query, refined_queries, summary, created_at, updated_at
                 FROM runs WHERE id = ?",
                [run_id],
            )
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to query run: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_run(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_run(&self, run_id: &str) -> Result<()> {
        let conn = self.connection()?;

        conn.execute("DELETE FROM runs WHERE id = ?", [run_id])
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to delete run: {}", e)))?;

        Ok(())
    }
}
