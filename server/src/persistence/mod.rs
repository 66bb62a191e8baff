//! Durable results log.
//!
//! [`traits::ResultsRepository`] is the storage seam; [`sqlite`] provides the
//! only backend. Synthetic data used for ladder/league demos lives in
//! [`test_data`].

pub mod sqlite;
pub mod test_data;
pub mod traits;

pub use traits::ResultsRepository;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::record::ResultRecord;

/// Errors from the persistence layer. Every variant is a storage failure
/// from the caller's point of view.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Malformed result record #{seq}: {reason}")]
    Malformed { seq: i64, reason: String },
    #[error("{column} of session '{session}' does not fit in the results table")]
    TimestampOutOfRange {
        session: String,
        column: &'static str,
    },
    #[error("A result for session '{0}' is already recorded")]
    DuplicateRecord(String),
}

/// Selects records for administrative purges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Either participant's id starts with the prefix.
    ParticipantPrefix(String),
    SessionName(String),
}

impl RecordFilter {
    pub fn matches(&self, record: &ResultRecord) -> bool {
        match self {
            RecordFilter::ParticipantPrefix(prefix) => {
                record.white.starts_with(prefix.as_str())
                    || record.black.starts_with(prefix.as_str())
            }
            RecordFilter::SessionName(name) => record.session_name == *name,
        }
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
