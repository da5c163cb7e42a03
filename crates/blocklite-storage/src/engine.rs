//! SQLite persistence engine
//!
//! Owns the database file: applies tuning on every connection, creates the
//! schema once, and keeps the fixed statement set prepared on each pooled
//! connection.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{
    SqliteAutoVacuum, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Connection, Executor};
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::options::Options;

/// On-disk schema generation written by this version.
pub const SCHEMA_VERSION: i64 = 1;

const INIT_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS blocks (
        storage_key TEXT NOT NULL PRIMARY KEY,
        payload BLOB NOT NULL
    ) WITHOUT ROWID",
    // Marker row gating future migrations.
    "CREATE TABLE IF NOT EXISTS _meta (
        version INTEGER NOT NULL UNIQUE
    )",
    "INSERT INTO _meta (version) SELECT 1 WHERE NOT EXISTS (SELECT 1 FROM _meta)",
];

/// The fixed statement set, prepared once per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    Has,
    Get,
    GetSize,
    Put,
    Delete,
    SelectAll,
}

impl Statement {
    pub const ALL: [Statement; 6] = [
        Statement::Has,
        Statement::Get,
        Statement::GetSize,
        Statement::Put,
        Statement::Delete,
        Statement::SelectAll,
    ];

    pub const fn sql(self) -> &'static str {
        match self {
            Statement::Has => "SELECT EXISTS (SELECT 1 FROM blocks WHERE storage_key = ?1)",
            Statement::Get => "SELECT payload FROM blocks WHERE storage_key = ?1",
            Statement::GetSize => "SELECT LENGTH(payload) FROM blocks WHERE storage_key = ?1",
            Statement::Put => "INSERT OR IGNORE INTO blocks (storage_key, payload) VALUES (?1, ?2)",
            Statement::Delete => "DELETE FROM blocks WHERE storage_key = ?1",
            Statement::SelectAll => "SELECT CAST(storage_key AS BLOB) FROM blocks",
        }
    }
}

/// Connection tuning for one store. Throughput over durability: a crash may
/// lose recent writes but constraints are always enforced.
pub fn connect_options(path: &Path, options: &Options) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .busy_timeout(options.busy_timeout())
        .page_size(options.page_size)
        .synchronous(SqliteSynchronous::Off)
        .pragma("temp_store", "memory")
        .pragma("cache_size", options.cache_size_pragma())
        .auto_vacuum(SqliteAutoVacuum::None)
        .pragma("automatic_index", "OFF")
        .journal_mode(SqliteJournalMode::Memory)
}

#[derive(Debug, Clone)]
pub struct Engine {
    pool: SqlitePool,
    path: PathBuf,
}

impl Engine {
    /// Open (or create) the database at `path` and initialize it.
    ///
    /// Safe to run against an already initialized file. Any failure while
    /// tuning, creating the schema or preparing statements is fatal.
    pub async fn open(path: &Path, options: &Options) -> Result<Self> {
        let connect = connect_options(path, options);

        let mut conn = SqliteConnection::connect_with(&connect)
            .await
            .map_err(|source| StorageError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        for &ddl in INIT_DDL {
            conn.execute(ddl)
                .await
                .map_err(|source| StorageError::Schema {
                    statement: ddl,
                    source,
                })?;
        }

        let version = read_schema_version(&mut conn).await?;
        if version > SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        conn.close().await.map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(options.pool_size())
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for statement in Statement::ALL {
                        (&mut *conn).prepare(statement.sql()).await?;
                    }
                    debug!("Prepared {} blockstore statements", Statement::ALL.len());
                    Ok(())
                })
            })
            .connect_with(connect)
            .await
            .map_err(|source| StorageError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            "Opened sqlite blockstore at {} (schema v{})",
            path.display(),
            version
        );

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn schema_version(&self) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        read_schema_version(&mut *conn).await
    }

    /// Close every pooled connection, finalizing prepared statements.
    ///
    /// Waits for checked-out connections, so in-flight key enumerations must be
    /// cancelled first.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed sqlite blockstore at {}", self.path.display());
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

async fn read_schema_version(conn: &mut SqliteConnection) -> Result<i64> {
    const QUERY: &str = "SELECT MAX(version) FROM _meta";

    sqlx::query_scalar::<_, i64>(QUERY)
        .fetch_one(&mut *conn)
        .await
        .map_err(|source| StorageError::Schema {
            statement: QUERY,
            source,
        })
}
