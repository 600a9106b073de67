//! rollcall-store — Gallery and attendance ledger storage.
//!
//! [`SqliteStore`] is the persistent backend used by the CLI; the unique
//! index on `(identity_id, day)` is what makes daily attendance race-safe.
//! [`MemoryStore`] keeps everything in process for embedding and tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use rollcall_core::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid embedding for {identity_id}: {reason}")]
    InvalidEmbedding { identity_id: String, reason: String },
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidEmbedding { .. } | Error::InvalidTimestamp { .. } => {
                StoreError::InvalidData(err.to_string())
            }
            Error::Sqlite(_) | Error::Io(_) | Error::Poisoned => {
                StoreError::Unavailable(err.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
