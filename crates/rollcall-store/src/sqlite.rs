//! SQLite-backed gallery and attendance ledger.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rollcall_core::{
    AttendanceRecord, Embedding, GalleryEntry, GalleryReader, GalleryWriter, InsertOutcome,
    LedgerStore, StoreError,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS gallery (
    identity_id TEXT PRIMARY KEY NOT NULL,
    dimension   INTEGER NOT NULL,
    embedding   BLOB NOT NULL,
    enrolled_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance (
    identity_id TEXT NOT NULL,
    day         TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    confidence  REAL NOT NULL,
    UNIQUE (identity_id, day)
);

CREATE INDEX IF NOT EXISTS attendance_by_time
    ON attendance (identity_id, timestamp);
";

/// How long a connection waits on another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Gallery and ledger in one SQLite database.
///
/// Gallery order is enrollment order (rowid); re-enrolling an identity
/// updates it in place and keeps its position.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at the provided sqlite path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::debug!(path = %path.display(), "opened attendance database");
        Self::init(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::Poisoned)
    }

    /// All records for `identity_id`, newest first.
    pub fn history(&self, identity_id: &str) -> Result<Vec<AttendanceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, confidence
             FROM attendance
             WHERE identity_id = ?1
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map(params![identity_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let records = rows
            .map(|row| -> Result<AttendanceRecord> {
                let (timestamp, confidence) = row?;
                decode_record(identity_id, &timestamp, confidence)
            })
            .collect::<Result<Vec<_>>>();
        records
    }

    /// Number of enrolled identities.
    pub fn enrolled_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM gallery", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn gallery_entries(&self) -> Result<Vec<GalleryEntry>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT identity_id, dimension, embedding FROM gallery ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let entries = rows
            .map(|row| -> Result<GalleryEntry> {
                let (identity_id, dimension, blob) = row?;
                let embedding = decode_embedding(&identity_id, dimension, &blob)?;
                Ok(GalleryEntry {
                    identity_id,
                    embedding,
                })
            })
            .collect::<Result<Vec<_>>>();
        entries
    }

    fn upsert_entry(&self, entry: &GalleryEntry) -> Result<()> {
        let dimension = i64::try_from(entry.embedding.dimension()).map_err(|_| {
            Error::InvalidEmbedding {
                identity_id: entry.identity_id.clone(),
                reason: "dimension out of range".into(),
            }
        })?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        self.conn()?.execute(
            "INSERT INTO gallery (identity_id, dimension, embedding, enrolled_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identity_id) DO UPDATE SET
                dimension = excluded.dimension,
                embedding = excluded.embedding,
                enrolled_at = excluded.enrolled_at",
            params![
                entry.identity_id,
                dimension,
                encode_embedding(&entry.embedding),
                now
            ],
        )?;
        Ok(())
    }

    fn remove_entry(&self, identity_id: &str) -> Result<bool> {
        let removed = self.conn()?.execute(
            "DELETE FROM gallery WHERE identity_id = ?1",
            params![identity_id],
        )?;
        Ok(removed > 0)
    }

    fn find(&self, identity_id: &str, day: NaiveDate) -> Result<Option<AttendanceRecord>> {
        let row = self
            .conn()?
            .query_row(
                "SELECT timestamp, confidence
                 FROM attendance
                 WHERE identity_id = ?1 AND day = ?2",
                params![identity_id, day_key(day)],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .optional()?;

        row.map(|(timestamp, confidence)| decode_record(identity_id, &timestamp, confidence))
            .transpose()
    }

    fn insert(&self, record: &AttendanceRecord) -> Result<InsertOutcome> {
        let result = self.conn()?.execute(
            "INSERT INTO attendance (identity_id, day, timestamp, confidence)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.identity_id,
                day_key(record.day()),
                encode_timestamp(&record.timestamp),
                f64::from(record.confidence)
            ],
        );

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                tracing::debug!(
                    identity = %record.identity_id,
                    day = %record.day(),
                    "attendance already recorded by a concurrent writer"
                );
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl GalleryReader for SqliteStore {
    fn load_gallery(&self) -> std::result::Result<Vec<GalleryEntry>, StoreError> {
        Ok(self.gallery_entries()?)
    }
}

impl GalleryWriter for SqliteStore {
    fn upsert(&self, entry: &GalleryEntry) -> std::result::Result<(), StoreError> {
        Ok(self.upsert_entry(entry)?)
    }

    fn remove(&self, identity_id: &str) -> std::result::Result<bool, StoreError> {
        Ok(self.remove_entry(identity_id)?)
    }
}

impl LedgerStore for SqliteStore {
    fn find_record(
        &self,
        identity_id: &str,
        day: NaiveDate,
    ) -> std::result::Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.find(identity_id, day)?)
    }

    fn insert_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> std::result::Result<InsertOutcome, StoreError> {
        Ok(self.insert(record)?)
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Fixed-width nanosecond RFC 3339, so text order is time order and the
/// value round-trips exactly.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_record(identity_id: &str, timestamp: &str, confidence: f64) -> Result<AttendanceRecord> {
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| Error::InvalidTimestamp {
            value: timestamp.to_string(),
            reason: e.to_string(),
        })?
        .with_timezone(&Utc);

    Ok(AttendanceRecord {
        identity_id: identity_id.to_string(),
        timestamp,
        confidence: confidence as f32,
    })
}

/// Little-endian f32 blob.
fn encode_embedding(embedding: &Embedding) -> Vec<u8> {
    embedding
        .values()
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

fn decode_embedding(identity_id: &str, dimension: i64, blob: &[u8]) -> Result<Embedding> {
    let invalid = |reason: String| Error::InvalidEmbedding {
        identity_id: identity_id.to_string(),
        reason,
    };

    let dimension = usize::try_from(dimension)
        .map_err(|_| invalid(format!("dimension {dimension} out of range")))?;
    let expected = dimension
        .checked_mul(4)
        .ok_or_else(|| invalid(format!("dimension {dimension} out of range")))?;
    if blob.len() != expected {
        return Err(invalid(format!(
            "expected {expected} bytes for {dimension} values, got {}",
            blob.len()
        )));
    }

    let values = blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(Embedding::new(values))
}
