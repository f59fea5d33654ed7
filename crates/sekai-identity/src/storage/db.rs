//! SQLite database for the identity service.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sekai_core::db::DatabaseError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Connections kept by the on-disk pool.
const MAX_CONNECTIONS: u32 = 5;

/// Handle to the identity database with migrations applied.
#[derive(Clone)]
pub struct IdentityDatabase {
    pool: Pool<Sqlite>,
}

impl IdentityDatabase {
    /// Open or create the database at `path`, creating parent directories.
    ///
    /// WAL mode lets liveness checks read while a login or refresh writes.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| DatabaseError::Connection(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        info!(path = %path.display(), "Identity database opened");
        Self::migrated(pool).await
    }

    /// Open a private in-memory database (for testing).
    ///
    /// Single connection: every in-memory connection would otherwise see its
    /// own empty database.
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        Self::migrated(pool).await
    }

    async fn migrated(pool: Pool<Sqlite>) -> Result<Self, DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Identity database migrations complete");
        Ok(Self { pool })
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

/// Credential store: point operations against the credential collection.
///
/// Cheap to clone; clones share one connection pool. No operation takes a
/// lock or opens a transaction, so concurrent writes to one record resolve
/// last-write-wins.
#[derive(Clone)]
pub struct CredentialStore {
    db: IdentityDatabase,
    deadline: Duration,
}

impl CredentialStore {
    /// Wrap `db`; every operation gives up after `deadline`.
    pub const fn new(db: IdentityDatabase, deadline: Duration) -> Self {
        Self { db, deadline }
    }

    /// Open an in-memory store with the default deadline (for testing).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = IdentityDatabase::open_in_memory().await?;
        Ok(Self::new(db, Duration::from_secs(10)))
    }

    pub(super) const fn deadline(&self) -> Duration {
        self.deadline
    }

    pub(crate) const fn pool(&self) -> &Pool<Sqlite> {
        self.db.pool()
    }
}
