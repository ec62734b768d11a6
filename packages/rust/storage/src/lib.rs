//! libSQL storage layer (local, offline mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the durable
//! translation cache and the history of pipeline runs. Published artifacts
//! (manifest, index, detail documents) live on disk as JSON and are never
//! stored here.

mod migrations;

use std::path::Path;

use chrono::Utc;
use libsql::{Connection, Database, params};
use recipefeed_shared::{RecipeFeedError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Default database file name inside the config directory.
pub const DB_FILE_NAME: &str = "recipefeed.db";

/// One finished (or still running) pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub site: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    /// Version token written by the run, `None` for no-op runs.
    pub version: Option<String>,
    pub stats_json: Option<String>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> RecipeFeedError {
    RecipeFeedError::Storage(e.to_string())
}

/// Cache key for a piece of source text.
fn text_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RecipeFeedError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        RecipeFeedError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(RecipeFeedError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Translation cache
    // -----------------------------------------------------------------------

    /// Look up a cached translation of `source_text` into `dest_language`.
    pub async fn get_translation(
        &self,
        dest_language: &str,
        source_text: &str,
    ) -> Result<Option<String>> {
        let hash = text_hash(source_text);
        let mut rows = self
            .conn
            .query(
                "SELECT translated FROM translation_cache
                 WHERE dest_language = ?1 AND text_hash = ?2",
                params![dest_language, hash.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row.get::<String>(0).map_err(storage_err)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Store a translation (upserts).
    pub async fn set_translation(
        &self,
        dest_language: &str,
        source_text: &str,
        translated: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let hash = text_hash(source_text);
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO translation_cache (dest_language, text_hash, source_text, translated, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(dest_language, text_hash) DO UPDATE SET
                   translated = excluded.translated,
                   created_at = excluded.created_at",
                params![dest_language, hash.as_str(), source_text, translated, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Drop every cached translation for one destination language.
    /// Returns the number of rows removed.
    pub async fn invalidate_translations(&self, dest_language: &str) -> Result<u64> {
        self.check_writable()?;
        self.conn
            .execute(
                "DELETE FROM translation_cache WHERE dest_language = ?1",
                params![dest_language],
            )
            .await
            .map_err(storage_err)
    }

    pub async fn count_translations(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM translation_cache", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)? as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Run history
    // -----------------------------------------------------------------------

    /// Record the start of a run. Returns the generated run ID.
    pub async fn insert_run(&self, site: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO runs (id, site, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), site, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark a run finished with its outcome.
    pub async fn finish_run(
        &self,
        run_id: &str,
        version: Option<&str>,
        stats_json: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE runs SET finished_at = ?1, version = ?2, stats_json = ?3 WHERE id = ?4",
                params![now.as_str(), version, stats_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, site, started_at, finished_at, version, stats_json
                 FROM runs ORDER BY started_at DESC, id DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(RunRecord {
                id: row.get::<String>(0).map_err(storage_err)?,
                site: row.get::<String>(1).map_err(storage_err)?,
                started_at: row.get::<String>(2).map_err(storage_err)?,
                finished_at: row.get::<String>(3).ok(),
                version: row.get::<String>(4).ok(),
                stats_json: row.get::<String>(5).ok(),
            });
        }
        Ok(results)
    }
}
