//! Index database: connection pool, pragmas and migrations.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Index queries are short point lookups; a handful of connections is plenty
/// even with a full batch of resolutions completing together.
const POOL_SIZE: u32 = 5;
/// Every completed resolution writes, and WAL allows a single writer.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);
/// Per-connection settings that `SqliteConnectOptions` has no builder for.
const CONNECTION_PRAGMAS: &str = "
    PRAGMA wal_autocheckpoint = 500;
    PRAGMA cache_size = -2048;
    PRAGMA temp_store = MEMORY;
";

/// Connection pool for the link index.
///
/// Build a [`Repository`](crate::Repository) from it to run queries.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the index at `path` and bring its schema up
    /// to date. Missing parent directories are created.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
        }
        Self::open(Self::options().filename(path).create_if_missing(true), POOL_SIZE).await
    }

    /// Open a throwaway in-memory index.
    ///
    /// Not gated behind `cfg(test)`: downstream crates use it in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        // Each in-memory connection is its own database, so the pool must
        // never hold more than one.
        Self::open(Self::options().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, pool_size: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            // Runs for every pooled connection, not just the first.
            .after_connect(|conn, _meta| Box::pin(async move { Self::tune(conn).await }))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    fn options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT)
            .auto_vacuum(SqliteAutoVacuum::None)
    }

    async fn tune(conn: &mut SqliteConnection) -> sqlx::Result<()> {
        sqlx::query(CONNECTION_PRAGMAS).execute(conn).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)?;
        debug!("index schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for checked-out connections to come back, then close the pool.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
