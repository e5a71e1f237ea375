//! Plan persistence.
//!
//! One strategic plan per session, written wholesale on refresh and removed
//! on session reset. The trait keeps the engine testable against an
//! in-memory store while real installations use SQLite.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gambit_types::{PlanRecord, SessionId};
use rusqlite::{Connection, params};

/// Single-slot, session-keyed persistence for strategic plans.
pub trait PlanStore: Send {
    /// The stored plan for `session`, if any.
    fn get(&self, session: &SessionId) -> Result<Option<PlanRecord>>;

    /// Replace the plan for `session` wholesale.
    fn put(&mut self, session: &SessionId, record: &PlanRecord) -> Result<()>;

    /// Remove the plan for `session`. Removing an absent plan is not an
    /// error.
    fn clear(&mut self, session: &SessionId) -> Result<()>;
}

/// Ephemeral store for tests and stateless embeddings.
#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    records: HashMap<String, PlanRecord>,
}

impl MemoryPlanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanStore for MemoryPlanStore {
    fn get(&self, session: &SessionId) -> Result<Option<PlanRecord>> {
        Ok(self.records.get(session.as_str()).cloned())
    }

    fn put(&mut self, session: &SessionId, record: &PlanRecord) -> Result<()> {
        self.records
            .insert(session.as_str().to_owned(), record.clone());
        Ok(())
    }

    fn clear(&mut self, session: &SessionId) -> Result<()> {
        self.records.remove(session.as_str());
        Ok(())
    }
}

/// SQLite-backed store, one row per session.
pub struct SqlitePlanStore {
    db: Connection,
}

impl SqlitePlanStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS plans (
            session_id TEXT PRIMARY KEY,
            record TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ";

    /// Open or create the plan database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create plan store directory {}", parent.display())
            })?;
        }

        let db = Connection::open(path)
            .with_context(|| format!("Failed to open plan store at {}", path.display()))?;
        Self::initialize(db)
    }

    /// Open an in-memory plan store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory plan store")?;
        Self::initialize(db)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .context("Failed to set plan store pragmas")?;
        db.execute_batch(Self::SCHEMA)
            .context("Failed to create plan store schema")?;
        Ok(Self { db })
    }

    /// Default location: `~/.gambit/plans.db`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".gambit").join("plans.db"))
    }
}

impl PlanStore for SqlitePlanStore {
    fn get(&self, session: &SessionId) -> Result<Option<PlanRecord>> {
        let mut stmt = self
            .db
            .prepare("SELECT record FROM plans WHERE session_id = ?1")
            .context("Failed to prepare plan query")?;
        let mut rows = stmt
            .query([session.as_str()])
            .context("Failed to query plan")?;

        let Some(row) = rows.next().context("Failed to read plan row")? else {
            return Ok(None);
        };
        let json: String = row.get(0).context("Failed to read plan record column")?;
        let record = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt plan record for session {session}"))?;
        Ok(Some(record))
    }

    fn put(&mut self, session: &SessionId, record: &PlanRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize plan record")?;
        let updated_at = chrono::Utc::now().to_rfc3339();

        self.db
            .execute(
                "INSERT INTO plans (session_id, record, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(session_id) DO UPDATE SET record = ?2, updated_at = ?3",
                params![session.as_str(), &json, &updated_at],
            )
            .context("Failed to store plan")?;
        Ok(())
    }

    fn clear(&mut self, session: &SessionId) -> Result<()> {
        self.db
            .execute("DELETE FROM plans WHERE session_id = ?1", [session.as_str()])
            .context("Failed to clear plan")?;
        Ok(())
    }
}
