//! Database connection pool supporting SQLite and PostgreSQL.
//!
//! The backend is picked from the database URL at runtime. SQLite connections
//! are opened on demand, with a semaphore bounding how many are live at once;
//! PostgreSQL uses a deadpool pool of the same size.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, SimpleAsyncConnection};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::deadpool::Pool as DeadPool;
#[cfg(feature = "postgres")]
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
#[cfg(feature = "postgres")]
use diesel_async::AsyncPgConnection;

use super::util::to_diesel_error;

/// Diesel error type alias.
pub type DbError = diesel::result::Error;

/// Async SQLite connection type.
pub type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Async PostgreSQL connection type.
#[cfg(feature = "postgres")]
pub type PgConn = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Default number of concurrent connections.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// How long a caller waits for a free slot before giving up.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite pool: connections are created per checkout, bounded by a semaphore.
#[derive(Clone)]
pub struct SqlitePool {
    database_url: String,
    permits: Arc<Semaphore>,
    max_connections: usize,
    acquire_timeout: Duration,
}

impl SqlitePool {
    pub fn new(database_url: &str, max_connections: usize) -> Self {
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        let max_connections = max_connections.max(1);
        Self {
            database_url: url.to_string(),
            permits: Arc::new(Semaphore::new(max_connections)),
            max_connections,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn from_path(path: &Path, max_connections: usize) -> Self {
        Self::new(&path.display().to_string(), max_connections)
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Reserve a connection slot. The slot is released when the permit drops.
    pub async fn checkout(&self) -> Result<OwnedSemaphorePermit, DbError> {
        match tokio::time::timeout(self.acquire_timeout, self.permits.clone().acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(e)) => Err(to_diesel_error(e)),
            Err(_) => Err(to_diesel_error(format!(
                "connection pool exhausted: no slot free after {}ms",
                self.acquire_timeout.as_millis()
            ))),
        }
    }

    /// Open a connection. Callers hold a [`checkout`](Self::checkout) permit.
    pub async fn get(&self) -> Result<SqliteConn, DbError> {
        let mut conn = SqliteConn::establish(&self.database_url)
            .await
            .map_err(to_diesel_error)?;
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .await?;
        Ok(conn)
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Slots not currently checked out.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// PostgreSQL connection pool.
#[cfg(feature = "postgres")]
#[derive(Clone)]
pub struct PgPool {
    pool: DeadPool<AsyncPgConnection>,
}

#[cfg(feature = "postgres")]
impl PgPool {
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, DbError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = DeadPool::builder(config)
            .max_size(max_size.max(1))
            .build()
            .map_err(to_diesel_error)?;
        Ok(Self { pool })
    }

    pub async fn get(&self) -> Result<PgConn, DbError> {
        self.pool.get().await.map_err(|e| match e {
            deadpool::managed::PoolError::Timeout(_) => {
                to_diesel_error("connection pool exhausted: timed out waiting for a connection")
            }
            other => to_diesel_error(other),
        })
    }
}

/// Unified database pool that supports both SQLite and PostgreSQL.
#[derive(Clone)]
pub enum DbPool {
    Sqlite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

impl DbPool {
    /// Create a pool from a database URL.
    ///
    /// - `postgres://` or `postgresql://` → PostgreSQL (with the `postgres` feature)
    /// - Everything else → SQLite
    pub fn from_url(url: &str, max_connections: usize) -> Result<Self, DbError> {
        #[cfg(feature = "postgres")]
        if super::util::is_postgres_url(url) {
            return Ok(DbPool::Postgres(PgPool::new(url, max_connections)?));
        }

        if super::util::is_postgres_url(url) {
            return Err(to_diesel_error(
                "configuration: PostgreSQL URL given but the postgres feature is not enabled",
            ));
        }

        Ok(DbPool::Sqlite(SqlitePool::new(url, max_connections)))
    }

    pub fn sqlite_from_path(path: &Path, max_connections: usize) -> Self {
        DbPool::Sqlite(SqlitePool::from_path(path, max_connections))
    }

    pub fn is_sqlite(&self) -> bool {
        matches!(self, DbPool::Sqlite(_))
    }

    #[cfg(feature = "postgres")]
    pub fn is_postgres(&self) -> bool {
        matches!(self, DbPool::Postgres(_))
    }
}

/// Run database operations on either backend.
///
/// On SQLite a pool slot is held for the whole body and released when the
/// body finishes, whether it returned normally or bailed out with `?`.
///
/// # Example
/// ```ignore
/// with_conn!(self.pool, conn => {
///     templates::table.load::<TemplateRecord>(&mut conn).await
/// })
/// ```
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident => $body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let _permit = pool.checkout().await?;
                let mut $conn = pool.get().await?;
                $body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $conn = pool.get().await?;
                $body
            }
        }
    }};
}

/// Run database operations that need different SQL per backend.
///
/// # Example
/// ```ignore
/// with_conn_split!(self.pool,
///     sqlite: conn => {
///         diesel::replace_into(table).values(...).execute(&mut conn).await
///     },
///     postgres: conn => {
///         diesel::insert_into(table).values(...).on_conflict(...).execute(&mut conn).await
///     }
/// )
/// ```
#[macro_export]
macro_rules! with_conn_split {
    ($pool:expr, sqlite: $sqlite_conn:ident => $sqlite_body:expr, postgres: $pg_conn:ident => $pg_body:expr) => {{
        match &$pool {
            $crate::repository::pool::DbPool::Sqlite(pool) => {
                let _permit = pool.checkout().await?;
                let mut $sqlite_conn = pool.get().await?;
                $sqlite_body
            }
            #[cfg(feature = "postgres")]
            $crate::repository::pool::DbPool::Postgres(pool) => {
                let mut $pg_conn = pool.get().await?;
                $pg_body
            }
        }
    }};
}

pub use with_conn;
pub use with_conn_split;
