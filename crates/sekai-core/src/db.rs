//! Shared store types and utilities.
//!
//! Provides `DatabaseError`, `unix_timestamp()` and the deadline wrapper
//! every store operation runs under.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Store errors shared by every service that persists state.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        Self::Query(e.to_string())
    }
}

/// Returns the current time as a Unix timestamp (seconds since epoch).
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Run one store operation under `deadline`.
///
/// An elapsed deadline drops the operation and surfaces as
/// [`DatabaseError::Timeout`] instead of blocking the caller.
pub async fn with_deadline<T, F>(deadline: Duration, op: F) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    tokio::time::timeout(deadline, op)
        .await
        .map_err(|_| DatabaseError::Timeout(deadline))?
}
