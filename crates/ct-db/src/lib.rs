//! Storage layer for the club timer.
//!
//! Persists the imported agenda, timer snapshots and completion records using
//! `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but not shared without
//! external synchronization.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2025-03-01T19:30:00.000Z`), so lexicographic order matches
//! chronological order.
//!
//! ## Snapshots
//!
//! `timer_snapshots` holds one row per item, overwritten on every checkpoint.
//! Concurrent writers are last-writer-wins.

use std::path::Path;

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use ct_core::snapshot::{SnapshotStore, StoreError, TimerSnapshot};
use ct_core::{AgendaEntry, AgendaItem, Category, CompletionRecord, ItemId, ValidationError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {key}: {timestamp}")]
    TimestampParse {
        key: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row could not be turned back into a domain value.
    #[error("invalid stored data for {key}: {message}")]
    InvalidData { key: String, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A completion record as stored, with its row id, item title and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEntry {
    pub id: String,
    pub title: String,
    pub record: CompletionRecord,
    pub completed_at: DateTime<Utc>,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- position: 1-based order within the meeting
            -- duration: normalized seconds
            -- scheduled_time: 'HH:MM:SS' or NULL
            CREATE TABLE IF NOT EXISTS agenda_items (
                id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                duration INTEGER NOT NULL,
                category TEXT NOT NULL,
                speaker TEXT,
                scheduled_time TEXT,
                level TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_agenda_position ON agenda_items(position);

            CREATE TABLE IF NOT EXISTS timer_snapshots (
                item_id TEXT PRIMARY KEY,
                elapsed INTEGER NOT NULL,
                running INTEGER NOT NULL,
                has_started INTEGER NOT NULL,
                snapshot_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS completions (
                id TEXT PRIMARY KEY,
                item_id TEXT NOT NULL,
                title TEXT NOT NULL,
                target INTEGER NOT NULL,
                actual INTEGER NOT NULL,
                is_overtime INTEGER NOT NULL,
                overtime_amount INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_completions_completed ON completions(completed_at);
            ",
        )?;
        Ok(())
    }

    // ── Agenda ───────────────────────────────────────────────────────

    /// Stores agenda items after the existing ones. Returns the count stored.
    pub fn append_agenda(&mut self, items: &[AgendaItem]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        let start: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), 0) FROM agenda_items",
            [],
            |row| row.get(0),
        )?;
        insert_agenda_rows(&tx, items, start)?;
        tx.commit()?;
        Ok(items.len())
    }

    /// Replaces the stored agenda. Snapshots of removed items are dropped.
    pub fn replace_agenda(&mut self, items: &[AgendaItem]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM agenda_items", [])?;
        tx.execute("DELETE FROM timer_snapshots", [])?;
        insert_agenda_rows(&tx, items, 0)?;
        tx.commit()?;
        Ok(items.len())
    }

    /// Lists the stored agenda in position order.
    pub fn list_agenda(&self) -> Result<Vec<AgendaItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, title, duration, category, speaker, scheduled_time, level
            FROM agenda_items
            ORDER BY position ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], AgendaRow::from_row)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?.into_item()?);
        }
        Ok(items)
    }

    pub fn agenda_item(&self, id: &str) -> Result<Option<AgendaItem>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, title, duration, category, speaker, scheduled_time, level
                FROM agenda_items
                WHERE id = ?
                ",
                [id],
                AgendaRow::from_row,
            )
            .optional()?;
        row.map(AgendaRow::into_item).transpose()
    }

    /// Looks up an item by its 1-based position.
    pub fn agenda_item_at(&self, position: i64) -> Result<Option<AgendaItem>, DbError> {
        if position < 1 {
            return Ok(None);
        }
        let row = self
            .conn
            .query_row(
                "
                SELECT id, title, duration, category, speaker, scheduled_time, level
                FROM agenda_items
                ORDER BY position ASC, id ASC
                LIMIT 1 OFFSET ?
                ",
                [position - 1],
                AgendaRow::from_row,
            )
            .optional()?;
        row.map(AgendaRow::into_item).transpose()
    }

    pub fn agenda_count(&self) -> Result<usize, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM agenda_items", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // ── Completions ──────────────────────────────────────────────────

    /// Stores a completion record. Returns the new row id.
    pub fn record_completion(
        &mut self,
        record: &CompletionRecord,
        title: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "
            INSERT INTO completions
                (id, item_id, title, target, actual, is_overtime, overtime_amount, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id,
                record.item_id.as_str(),
                title,
                record.target_secs,
                record.actual_secs,
                record.is_overtime,
                record.overtime_secs,
                format_timestamp(completed_at),
            ],
        )?;
        tracing::debug!(item_id = %record.item_id, completion_id = %id, "recorded completion");
        Ok(id)
    }

    /// Lists completion records, oldest first.
    pub fn list_completions(&self) -> Result<Vec<CompletionEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, item_id, title, target, actual, is_overtime, overtime_amount, completed_at
            FROM completions
            ORDER BY completed_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            let (id, item_id, title, target_secs, actual_secs, is_overtime, overtime_secs, completed_at) = row?;
            let completed_at = parse_timestamp(&completed_at, &id)?;
            entries.push(CompletionEntry {
                id,
                title,
                record: CompletionRecord {
                    item_id: ItemId::new(item_id)?,
                    target_secs,
                    actual_secs,
                    is_overtime,
                    overtime_secs,
                },
                completed_at,
            });
        }
        Ok(entries)
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Writes a snapshot, replacing any previous one for the item.
    pub fn save_snapshot_row(&mut self, snapshot: &TimerSnapshot) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO timer_snapshots (item_id, elapsed, running, has_started, snapshot_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO UPDATE SET
                elapsed = excluded.elapsed,
                running = excluded.running,
                has_started = excluded.has_started,
                snapshot_at = excluded.snapshot_at
            ",
            params![
                snapshot.item_id.as_str(),
                snapshot.elapsed_secs,
                snapshot.running,
                snapshot.has_started,
                format_timestamp(snapshot.snapshot_at),
            ],
        )?;
        Ok(())
    }

    pub fn load_snapshot_row(&self, item_id: &ItemId) -> Result<Option<TimerSnapshot>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT item_id, elapsed, running, has_started, snapshot_at
                FROM timer_snapshots
                WHERE item_id = ?
                ",
                [item_id.as_str()],
                SnapshotRow::from_row,
            )
            .optional()?;
        row.map(SnapshotRow::into_snapshot).transpose()
    }

    pub fn delete_snapshot_row(&mut self, item_id: &ItemId) -> Result<(), DbError> {
        self.conn.execute(
            "DELETE FROM timer_snapshots WHERE item_id = ?",
            [item_id.as_str()],
        )?;
        Ok(())
    }

    pub fn list_snapshot_rows(&self) -> Result<Vec<TimerSnapshot>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT item_id, elapsed, running, has_started, snapshot_at
            FROM timer_snapshots
            ORDER BY item_id ASC
            ",
        )?;
        let rows = stmt.query_map([], SnapshotRow::from_row)?;
        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row?.into_snapshot()?);
        }
        Ok(snapshots)
    }
}

impl SnapshotStore for Database {
    fn save_snapshot(&mut self, snapshot: &TimerSnapshot) -> Result<(), StoreError> {
        self.save_snapshot_row(snapshot).map_err(store_error)
    }

    fn load_snapshot(&self, item_id: &ItemId) -> Result<Option<TimerSnapshot>, StoreError> {
        self.load_snapshot_row(item_id).map_err(store_error)
    }

    fn delete_snapshot(&mut self, item_id: &ItemId) -> Result<(), StoreError> {
        self.delete_snapshot_row(item_id).map_err(store_error)
    }

    fn list_snapshots(&self) -> Result<Vec<TimerSnapshot>, StoreError> {
        self.list_snapshot_rows().map_err(store_error)
    }
}

fn store_error(err: DbError) -> StoreError {
    StoreError::Backend(Box::new(err))
}

fn insert_agenda_rows(tx: &rusqlite::Transaction<'_>, items: &[AgendaItem], start: i64) -> Result<(), DbError> {
    let mut stmt = tx.prepare(
        "
        INSERT INTO agenda_items
            (id, position, title, duration, category, speaker, scheduled_time, level)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )?;
    for (position, item) in (start + 1..).zip(items) {
        let entry = &item.entry;
        stmt.execute(params![
            item.id.as_str(),
            position,
            entry.title,
            entry.duration_secs,
            entry.category.as_str(),
            entry.speaker,
            entry.scheduled_time_text(),
            entry.level,
        ])?;
    }
    Ok(())
}

struct AgendaRow {
    id: String,
    title: String,
    duration: i64,
    category: String,
    speaker: Option<String>,
    scheduled_time: Option<String>,
    level: Option<String>,
}

impl AgendaRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            duration: row.get(2)?,
            category: row.get(3)?,
            speaker: row.get(4)?,
            scheduled_time: row.get(5)?,
            level: row.get(6)?,
        })
    }

    fn into_item(self) -> Result<AgendaItem, DbError> {
        let category: Category = self.category.parse()?;
        let scheduled_time = self
            .scheduled_time
            .map(|text| {
                NaiveTime::parse_from_str(&text, "%H:%M:%S").map_err(|source| DbError::TimestampParse {
                    key: self.id.clone(),
                    timestamp: text,
                    source,
                })
            })
            .transpose()?;
        let entry = AgendaEntry {
            title: self.title,
            duration_secs: self.duration,
            category,
            speaker: self.speaker,
            scheduled_time,
            level: self.level,
        };
        Ok(AgendaItem::new(ItemId::new(self.id)?, entry))
    }
}

struct SnapshotRow {
    item_id: String,
    elapsed: i64,
    running: bool,
    has_started: bool,
    snapshot_at: String,
}

impl SnapshotRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            elapsed: row.get(1)?,
            running: row.get(2)?,
            has_started: row.get(3)?,
            snapshot_at: row.get(4)?,
        })
    }

    fn into_snapshot(self) -> Result<TimerSnapshot, DbError> {
        if self.elapsed < 0 {
            return Err(DbError::InvalidData {
                key: self.item_id,
                message: format!("negative elapsed {}", self.elapsed),
            });
        }
        let snapshot_at = parse_timestamp(&self.snapshot_at, &self.item_id)?;
        Ok(TimerSnapshot {
            item_id: ItemId::new(self.item_id)?,
            elapsed_secs: self.elapsed,
            running: self.running,
            has_started: self.has_started,
            snapshot_at,
        })
    }
}

fn parse_timestamp(timestamp: &str, key: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            key: key.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
