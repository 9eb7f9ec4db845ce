//! History store
//!
//! SQLite database holding two append-only tables:
//! - `appTracking`: one row per app per successful run
//! - `logs`: run start markers and caught run errors
//!
//! The store has no business logic of its own; the orchestrator decides
//! what gets written and when. Nothing here updates or deletes rows.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::{Result, TrackerError};

/// Embedded schema SQL
const SCHEMA_SQL: &str = include_str!("../SCHEMA.sql");

/// Column width of `logs.message` and the other VARCHAR columns.
pub const MAX_TEXT_LEN: usize = 256;

/// A row from the `appTracking` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankRecord {
    pub id: i64,
    pub app: String,
    pub date: DateTime<Utc>,
    pub category: String,
    pub all_rank: Option<u32>,
    pub specific_rank: Option<u32>,
}

/// Insert form of [`RankRecord`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRankRecord {
    pub app: String,
    pub date: DateTime<Utc>,
    pub category: String,
    pub all_rank: u32,
    pub specific_rank: u32,
}

/// Value of `logs.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Informational entry (run started)
    Log,
    /// A run failed
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "log" => Some(Self::Log),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A row from the `logs` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: i64,
    /// Raw `type` column; see [`LogKind::parse`]
    pub kind: String,
    pub message: String,
    pub created_on: DateTime<Utc>,
}

/// Insert form of [`LogEntry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub kind: LogKind,
    pub message: String,
    pub created_on: DateTime<Utc>,
}

impl NewLogEntry {
    pub fn info(message: impl Into<String>, created_on: DateTime<Utc>) -> Self {
        Self {
            kind: LogKind::Log,
            message: message.into(),
            created_on,
        }
    }

    pub fn error(message: impl Into<String>, created_on: DateTime<Utc>) -> Self {
        Self {
            kind: LogKind::Error,
            message: message.into(),
            created_on,
        }
    }
}

/// Fixed-width UTC timestamp so text order matches time order.
fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn decode_rank(idx: usize, raw: Option<i64>) -> rusqlite::Result<Option<u32>> {
    raw.map(|value| {
        u32::try_from(value).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Integer,
                Box::new(e),
            )
        })
    })
    .transpose()
}

/// Cut `text` down to the column width without splitting a character.
fn clamp_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_LEN) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn rank_record_from_row(row: &Row<'_>) -> rusqlite::Result<RankRecord> {
    let date: String = row.get(2)?;
    Ok(RankRecord {
        id: row.get(0)?,
        app: row.get(1)?,
        date: decode_timestamp(2, &date)?,
        category: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        all_rank: decode_rank(4, row.get(4)?)?,
        specific_rank: decode_rank(5, row.get(5)?)?,
    })
}

fn log_entry_from_row(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let created_on: String = row.get(3)?;
    Ok(LogEntry {
        id: row.get(0)?,
        kind: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        message: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        created_on: decode_timestamp(3, &created_on)?,
    })
}

/// History store wrapper
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (creating if needed) the database file at `path` and apply the schema
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                TrackerError::persistence_with_source(
                    format!("failed to create db directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            TrackerError::persistence_with_source(
                format!("failed to open db at {}", path.display()),
                e,
            )
        })?;

        Self::apply_schema(&conn)?;
        tracing::debug!(path = %path.display(), "History store initialized");

        Ok(Self { conn })
    }

    /// Open an in-memory database (tests and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            TrackerError::persistence_with_source("failed to open in-memory db", e)
        })?;
        Self::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open from a connection string: `sqlite::memory:`, `sqlite://<path>`,
    /// `sqlite:<path>` or a bare file path. URLs with any other scheme are
    /// rejected.
    pub fn from_database_url(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(TrackerError::config("database url is empty"));
        }
        if let Some((scheme, _)) = url.split_once("://")
            && !scheme.eq_ignore_ascii_case("sqlite")
        {
            return Err(TrackerError::config(format!(
                "unsupported database url scheme {scheme:?}; expected sqlite:// or a file path"
            )));
        }
        if url == "sqlite::memory:" || url == ":memory:" {
            return Self::open_in_memory();
        }
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        Self::open(Path::new(path))
    }

    fn apply_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| TrackerError::persistence_with_source("failed to apply schema", e))?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // appTracking
    // ─────────────────────────────────────────────────────────────────────────────

    /// Latest record for `app`: greatest date, then greatest id.
    pub fn most_recent_rank(&self, app: &str) -> Result<Option<RankRecord>> {
        self.conn
            .query_row(
                r#"
                SELECT id, app, date, category, allRank, specificRank
                FROM appTracking
                WHERE app = ?1
                ORDER BY date DESC, id DESC
                LIMIT 1
                "#,
                params![app],
                rank_record_from_row,
            )
            .optional()
            .map_err(|e| TrackerError::persistence_with_source("failed to fetch most recent rank", e))
    }

    /// Append a rank record. Returns the new row id.
    pub fn insert_rank_record(&self, record: &NewRankRecord) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO appTracking (app, date, category, allRank, specificRank)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    clamp_text(&record.app),
                    encode_timestamp(record.date),
                    clamp_text(&record.category),
                    record.all_rank,
                    record.specific_rank,
                ],
            )
            .map_err(|e| TrackerError::persistence_with_source("failed to insert rank record", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest-first history for `app`.
    pub fn recent_ranks(&self, app: &str, limit: u32) -> Result<Vec<RankRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, app, date, category, allRank, specificRank
                FROM appTracking
                WHERE app = ?1
                ORDER BY date DESC, id DESC
                LIMIT ?2
                "#,
            )
            .map_err(|e| TrackerError::persistence_with_source("failed to prepare rank query", e))?;

        let rows = stmt
            .query_map(params![app, limit], rank_record_from_row)
            .map_err(|e| TrackerError::persistence_with_source("failed to query ranks", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| TrackerError::persistence_with_source("failed to read rank row", e))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // logs
    // ─────────────────────────────────────────────────────────────────────────────

    /// Append a log entry. Messages longer than the column are truncated.
    pub fn insert_log_entry(&self, entry: &NewLogEntry) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO logs (type, message, createdOn) VALUES (?1, ?2, ?3)",
                params![
                    entry.kind.as_str(),
                    clamp_text(&entry.message),
                    encode_timestamp(entry.created_on),
                ],
            )
            .map_err(|e| TrackerError::persistence_with_source("failed to insert log entry", e))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Newest-first log entries.
    pub fn recent_logs(&self, limit: u32) -> Result<Vec<LogEntry>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, type, message, createdOn
                FROM logs
                ORDER BY createdOn DESC, id DESC
                LIMIT ?1
                "#,
            )
            .map_err(|e| TrackerError::persistence_with_source("failed to prepare log query", e))?;

        let rows = stmt
            .query_map(params![limit], log_entry_from_row)
            .map_err(|e| TrackerError::persistence_with_source("failed to query logs", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| TrackerError::persistence_with_source("failed to read log row", e))
    }

    /// Total rows in `appTracking`
    pub fn rank_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM appTracking")
    }

    /// Total rows in `logs`
    pub fn log_count(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM logs")
    }

    fn count(&self, sql: &str) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| TrackerError::persistence_with_source("failed to count rows", e))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
