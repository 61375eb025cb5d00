//! SQLite persistence for Questkeeper campaign state.
//!
//! A single database file with three tables:
//! - `npcs` — characters with disposition and append-only notes
//! - `quests` — quests with a constrained status column
//! - `relationships` — typed edges between entities, queried bidirectionally
//!
//! All schema creation is idempotent and runs at startup.

mod records;

pub use records::{Npc, Quest, QuestStatus, Relationship};

use chrono::Utc;
use questkeeper_core::error::StoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Fields for a new NPC.
#[derive(Debug, Clone)]
pub struct NewNpc {
    pub name: String,
    pub description: String,
    pub location: String,
    pub metadata: serde_json::Value,
}

/// Optional filters for listing NPCs.
#[derive(Debug, Clone, Default)]
pub struct NpcFilter {
    /// Exact location match
    pub location: Option<String>,
    /// Case-insensitive substring match on the name
    pub name_search: Option<String>,
}

/// Fields to change on an existing NPC. `None` fields are left untouched;
/// notes are appended with a timestamp, never replaced.
#[derive(Debug, Clone, Default)]
pub struct NpcUpdate {
    pub player_disposition: Option<i64>,
    pub notes: Option<String>,
    pub location: Option<String>,
}

impl NpcUpdate {
    /// Whether this update changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.player_disposition.is_none() && self.notes.is_none() && self.location.is_none()
    }
}

/// Fields for a new quest.
#[derive(Debug, Clone)]
pub struct NewQuest {
    pub title: String,
    pub description: String,
    pub status: QuestStatus,
    pub metadata: serde_json::Value,
}

/// Fields for a new relationship edge.
#[derive(Debug, Clone)]
pub struct NewRelationship {
    pub entity_type_a: String,
    pub entity_id_a: i64,
    pub relationship_type: String,
    pub entity_type_b: String,
    pub entity_id_b: i64,
    pub strength: i64,
    pub metadata: serde_json::Value,
}

/// Per-table row counts, for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct StoreCounts {
    pub npcs: i64,
    pub quests: i64,
    pub relationships: i64,
}

/// The SQLite-backed campaign store shared by all tool handlers.
///
/// Cheap to clone — clones share the underlying pool.
#[derive(Clone)]
pub struct QuestStore {
    pool: SqlitePool,
}

impl QuestStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        // The database lives under a directory that may not exist yet
        if !path.starts_with("sqlite:") {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::Storage(format!("Failed to create data directory: {e}"))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Quest store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create tables and indexes. Safe to call multiple times.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS npcs (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                name               TEXT NOT NULL,
                description        TEXT,
                location           TEXT,
                player_disposition INTEGER DEFAULT 0,
                notes              TEXT DEFAULT '',
                metadata           TEXT DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("npcs table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quests (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                description TEXT,
                status      TEXT CHECK(status IN ('available','active','completed')) DEFAULT 'available',
                metadata    TEXT DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("quests table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS relationships (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_type_a     TEXT NOT NULL,
                entity_id_a       INTEGER NOT NULL,
                relationship_type TEXT NOT NULL,
                entity_type_b     TEXT NOT NULL,
                entity_id_b       INTEGER NOT NULL,
                strength          INTEGER DEFAULT 0,
                metadata          TEXT DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("relationships table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_relationships_a ON relationships(entity_type_a, entity_id_a)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("relationships index a: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_relationships_b ON relationships(entity_type_b, entity_id_b)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("relationships index b: {e}")))?;

        debug!("Quest store migrations complete");
        Ok(())
    }

    // ── NPCs ───────────────────────────────────────────────────────────

    /// Insert a new NPC; returns its rowid.
    pub async fn create_npc(&self, new: NewNpc) -> Result<i64, StoreError> {
        let metadata = serde_json::to_string(&new.metadata)
            .map_err(|e| StoreError::Storage(format!("metadata serialization: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO npcs (name, description, location, metadata) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.location)
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT npc: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Fetch one NPC by id.
    pub async fn get_npc(&self, id: i64) -> Result<Option<Npc>, StoreError> {
        let row = sqlx::query("SELECT * FROM npcs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT npc: {e}")))?;

        row.as_ref().map(row_to_npc).transpose()
    }

    /// List NPCs matching the filter, in id order.
    pub async fn list_npcs(&self, filter: &NpcFilter) -> Result<Vec<Npc>, StoreError> {
        let mut sql = String::from("SELECT * FROM npcs WHERE 1=1");
        if filter.location.is_some() {
            sql.push_str(" AND location = ?");
        }
        if filter.name_search.is_some() {
            sql.push_str(" AND name LIKE ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql);
        if let Some(location) = &filter.location {
            query = query.bind(location);
        }
        if let Some(search) = &filter.name_search {
            query = query.bind(format!("%{search}%"));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT npcs: {e}")))?;

        rows.iter().map(row_to_npc).collect()
    }

    /// Apply an update to an NPC. Disposition and location replace the
    /// current value; notes are appended as a timestamped entry. Returns the
    /// updated row, or `None` if the NPC does not exist.
    pub async fn update_npc(&self, id: i64, update: NpcUpdate) -> Result<Option<Npc>, StoreError> {
        if self.get_npc(id).await?.is_none() {
            return Ok(None);
        }

        let mut sets: Vec<&str> = Vec::new();
        if update.player_disposition.is_some() {
            sets.push("player_disposition = ?");
        }
        let note_entry = update
            .notes
            .as_ref()
            .filter(|n| !n.trim().is_empty())
            .map(|n| format!("\n[{}] {}", Utc::now().to_rfc3339(), n));
        if note_entry.is_some() {
            sets.push("notes = notes || ?");
        }
        if update.location.is_some() {
            sets.push("location = ?");
        }

        if !sets.is_empty() {
            let sql = format!("UPDATE npcs SET {} WHERE id = ?", sets.join(", "));
            let mut query = sqlx::query(&sql);
            if let Some(disposition) = update.player_disposition {
                query = query.bind(disposition);
            }
            if let Some(entry) = &note_entry {
                query = query.bind(entry);
            }
            if let Some(location) = &update.location {
                query = query.bind(location);
            }
            query
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Storage(format!("UPDATE npc: {e}")))?;
        }

        self.get_npc(id).await
    }

    // ── Quests ─────────────────────────────────────────────────────────

    /// Insert a new quest; returns its rowid.
    pub async fn create_quest(&self, new: NewQuest) -> Result<i64, StoreError> {
        let metadata = serde_json::to_string(&new.metadata)
            .map_err(|e| StoreError::Storage(format!("metadata serialization: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO quests (title, description, status, metadata) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.status.as_str())
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT quest: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Fetch one quest by id.
    pub async fn get_quest(&self, id: i64) -> Result<Option<Quest>, StoreError> {
        let row = sqlx::query("SELECT * FROM quests WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT quest: {e}")))?;

        row.as_ref().map(row_to_quest).transpose()
    }

    /// List quests, optionally filtered by status, in id order.
    pub async fn list_quests(&self, status: Option<QuestStatus>) -> Result<Vec<Quest>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM quests WHERE status = ?1 ORDER BY id")
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM quests ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| StoreError::QueryFailed(format!("SELECT quests: {e}")))?;

        rows.iter().map(row_to_quest).collect()
    }

    /// Change a quest's status. Returns the updated row, or `None` if the
    /// quest does not exist.
    pub async fn set_quest_status(
        &self,
        id: i64,
        status: QuestStatus,
    ) -> Result<Option<Quest>, StoreError> {
        let result = sqlx::query("UPDATE quests SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("UPDATE quest: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_quest(id).await
    }

    // ── Relationships ──────────────────────────────────────────────────

    /// Insert a new relationship edge; returns its rowid.
    pub async fn create_relationship(&self, new: NewRelationship) -> Result<i64, StoreError> {
        let metadata = serde_json::to_string(&new.metadata)
            .map_err(|e| StoreError::Storage(format!("metadata serialization: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO relationships
                (entity_type_a, entity_id_a, relationship_type, entity_type_b, entity_id_b, strength, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&new.entity_type_a)
        .bind(new.entity_id_a)
        .bind(&new.relationship_type)
        .bind(&new.entity_type_b)
        .bind(new.entity_id_b)
        .bind(new.strength)
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT relationship: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// All relationships where the entity appears on either side, optionally
    /// narrowed to one relationship type.
    pub async fn relationships_for(
        &self,
        entity_type: &str,
        entity_id: i64,
        relationship_type: Option<&str>,
    ) -> Result<Vec<Relationship>, StoreError> {
        let mut sql = String::from(
            "SELECT * FROM relationships \
             WHERE ((entity_type_a = ? AND entity_id_a = ?) \
                 OR (entity_type_b = ? AND entity_id_b = ?))",
        );
        if relationship_type.is_some() {
            sql.push_str(" AND relationship_type = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql)
            .bind(entity_type)
            .bind(entity_id)
            .bind(entity_type)
            .bind(entity_id);
        if let Some(kind) = relationship_type {
            query = query.bind(kind);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT relationships: {e}")))?;

        rows.iter().map(row_to_relationship).collect()
    }

    /// Per-table row counts.
    pub async fn counts(&self) -> Result<StoreCounts, StoreError> {
        Ok(StoreCounts {
            npcs: self.count_table("npcs").await?,
            quests: self.count_table("quests").await?,
            relationships: self.count_table("relationships").await?,
        })
    }

    async fn count_table(&self, table: &str) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) as cnt FROM {table}");
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT {table}: {e}")))?;
        row.try_get::<i64, _>("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))
    }
}

fn parse_metadata(raw: Option<String>) -> serde_json::Value {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_else(|| serde_json::json!({}))
}

fn row_to_npc(row: &SqliteRow) -> Result<Npc, StoreError> {
    let col = |e: sqlx::Error, name: &str| StoreError::QueryFailed(format!("{name} column: {e}"));
    Ok(Npc {
        id: row.try_get("id").map_err(|e| col(e, "id"))?,
        name: row.try_get("name").map_err(|e| col(e, "name"))?,
        description: row
            .try_get::<Option<String>, _>("description")
            .map_err(|e| col(e, "description"))?
            .unwrap_or_default(),
        location: row
            .try_get::<Option<String>, _>("location")
            .map_err(|e| col(e, "location"))?
            .unwrap_or_default(),
        player_disposition: row
            .try_get("player_disposition")
            .map_err(|e| col(e, "player_disposition"))?,
        notes: row
            .try_get::<Option<String>, _>("notes")
            .map_err(|e| col(e, "notes"))?
            .unwrap_or_default(),
        metadata: parse_metadata(row.try_get("metadata").map_err(|e| col(e, "metadata"))?),
    })
}

fn row_to_quest(row: &SqliteRow) -> Result<Quest, StoreError> {
    let col = |e: sqlx::Error, name: &str| StoreError::QueryFailed(format!("{name} column: {e}"));
    let status_raw: String = row.try_get("status").map_err(|e| col(e, "status"))?;
    Ok(Quest {
        id: row.try_get("id").map_err(|e| col(e, "id"))?,
        title: row.try_get("title").map_err(|e| col(e, "title"))?,
        description: row
            .try_get::<Option<String>, _>("description")
            .map_err(|e| col(e, "description"))?
            .unwrap_or_default(),
        status: status_raw
            .parse()
            .map_err(|e: String| StoreError::QueryFailed(e))?,
        metadata: parse_metadata(row.try_get("metadata").map_err(|e| col(e, "metadata"))?),
    })
}

fn row_to_relationship(row: &SqliteRow) -> Result<Relationship, StoreError> {
    let col = |e: sqlx::Error, name: &str| StoreError::QueryFailed(format!("{name} column: {e}"));
    Ok(Relationship {
        id: row.try_get("id").map_err(|e| col(e, "id"))?,
        entity_type_a: row
            .try_get("entity_type_a")
            .map_err(|e| col(e, "entity_type_a"))?,
        entity_id_a: row
            .try_get("entity_id_a")
            .map_err(|e| col(e, "entity_id_a"))?,
        relationship_type: row
            .try_get("relationship_type")
            .map_err(|e| col(e, "relationship_type"))?,
        entity_type_b: row
            .try_get("entity_type_b")
            .map_err(|e| col(e, "entity_type_b"))?,
        entity_id_b: row
            .try_get("entity_id_b")
            .map_err(|e| col(e, "entity_id_b"))?,
        strength: row.try_get("strength").map_err(|e| col(e, "strength"))?,
        metadata: parse_metadata(row.try_get("metadata").map_err(|e| col(e, "metadata"))?),
    })
}
