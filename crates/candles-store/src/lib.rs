//! # Candles Store
//! SQLite-backed persistence for group destination config and per-user
//! event records. Survives restarts; schema creation is idempotent.
//!
//! Every operation is a single atomic statement, so independent callers
//! (command handlers, the daily poll) never need cross-operation locking.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension;

use candles_core::error::{CandlesError, Result};
use candles_core::types::{DestinationId, EventRecord, GroupId, UserId};

/// SQLite-backed store for all candles data.
pub struct EventStore {
    conn: rusqlite::Connection,
}

impl EventStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| CandlesError::Storage(format!("DB open: {e}")))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| CandlesError::Storage(format!("DB open: {e}")))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Create tables. Safe to run against an existing database.
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            -- Per-group notification destination (NULL = not configured)
            CREATE TABLE IF NOT EXISTS group_destinations (
                group_id INTEGER PRIMARY KEY,
                destination_id INTEGER
            );

            -- One annually-recurring event per user per group
            CREATE TABLE IF NOT EXISTS event_records (
                group_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                event_date TEXT NOT NULL,       -- ISO-8601 date
                last_updated TEXT NOT NULL,     -- RFC 3339 timestamp
                PRIMARY KEY (group_id, user_id)
            );
         ",
            )
            .map_err(|e| CandlesError::Storage(format!("Migration: {e}")))?;
        Ok(())
    }

    /// Replace or insert a group's destination.
    pub fn set_destination(&self, group: GroupId, destination: DestinationId) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO group_destinations (group_id, destination_id)
                 VALUES (?1, ?2)",
                rusqlite::params![group.0 as i64, destination.0 as i64],
            )
            .map_err(|e| CandlesError::Storage(format!("Save destination: {e}")))?;
        Ok(())
    }

    /// Replace or insert a user's event record.
    pub fn set_event(
        &self,
        group: GroupId,
        user: UserId,
        date: NaiveDate,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO event_records (group_id, user_id, event_date, last_updated)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    group.0 as i64,
                    user.0 as i64,
                    date.format("%Y-%m-%d").to_string(),
                    updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| CandlesError::Storage(format!("Save event: {e}")))?;
        Ok(())
    }

    /// Full scan of every event record. Used once per poll cycle.
    pub fn all_events(&self) -> Result<Vec<EventRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT group_id, user_id, event_date, last_updated
                 FROM event_records ORDER BY group_id, user_id",
            )
            .map_err(|e| CandlesError::Storage(format!("Load events: {e}")))?;
        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| CandlesError::Storage(format!("Load events: {e}")))?;
        collect_records(rows)
    }

    /// Event records for one group, used by the upcoming query.
    pub fn events_for_group(&self, group: GroupId) -> Result<Vec<EventRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT group_id, user_id, event_date, last_updated
                 FROM event_records WHERE group_id = ?1 ORDER BY user_id",
            )
            .map_err(|e| CandlesError::Storage(format!("Load group events: {e}")))?;
        let rows = stmt
            .query_map([group.0 as i64], row_to_record)
            .map_err(|e| CandlesError::Storage(format!("Load group events: {e}")))?;
        collect_records(rows)
    }

    /// The configured destination for a group, if any.
    pub fn destination_for_group(&self, group: GroupId) -> Result<Option<DestinationId>> {
        let dest: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT destination_id FROM group_destinations WHERE group_id = ?1",
                [group.0 as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CandlesError::Storage(format!("Load destination: {e}")))?;
        // Missing row and NULL column both mean "not configured".
        Ok(dest.flatten().map(|id| DestinationId(id as u64)))
    }
}

type RawRecord = (i64, i64, String, String);

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<RawRecord>>,
) -> Result<Vec<EventRecord>> {
    let mut records = Vec::new();
    for row in rows {
        let (group_id, user_id, date_str, updated_str) =
            row.map_err(|e| CandlesError::Storage(format!("Read row: {e}")))?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| CandlesError::Storage(format!("Bad event_date '{date_str}': {e}")))?;
        let last_updated = DateTime::parse_from_rfc3339(&updated_str)
            .map_err(|e| CandlesError::Storage(format!("Bad last_updated '{updated_str}': {e}")))?
            .with_timezone(&Utc);
        records.push(EventRecord {
            group_id: GroupId(group_id as u64),
            user_id: UserId(user_id as u64),
            date,
            last_updated,
        });
    }
    Ok(records)
}
