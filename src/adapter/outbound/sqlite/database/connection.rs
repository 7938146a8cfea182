//! Database connection management using Diesel ORM.
//!
//! Provides connection pooling, migration support, and per-connection
//! pragmas for SQLite databases.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Milliseconds a writer waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Pragmas applied to every connection handed out by the pool.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool for the given database URL.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Run all pending database migrations and switch file databases to WAL.
///
/// # Errors
/// Returns an error if migrations fail.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")
        .map_err(|e| Error::Database(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(())
}

/// Run blocking Diesel work on the blocking thread pool with a pooled connection.
///
/// # Errors
/// Propagates the closure's error, pool exhaustion, or a panicked task.
pub async fn with_conn<T, F>(pool: &DbPool, work: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        work(&mut conn)
    })
    .await
    .map_err(|e| Error::Connection(format!("database task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;
    use tempfile::TempDir;

    use super::*;

    #[derive(diesel::QueryableByName)]
    struct TableName {
        #[diesel(sql_type = diesel::sql_types::Text)]
        name: String,
    }

    fn file_pool(dir: &TempDir) -> DbPool {
        let path = dir.path().join("kastia.db");
        create_pool(path.to_str().unwrap(), 2).unwrap()
    }

    #[test]
    fn run_migrations_creates_tables() {
        let dir = TempDir::new().unwrap();
        let pool = file_pool(&dir);
        run_migrations(&pool).unwrap();

        let mut conn = pool.get().unwrap();
        let tables: Vec<String> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .load::<TableName>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();

        for table in ["users", "profiles", "markets", "outcomes", "positions", "trades"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
        assert!(tables.iter().any(|t| t == "group_access_requests"));
        assert!(tables.iter().any(|t| t == "audit_logs"));
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let pool = file_pool(&dir);
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();
    }

    #[test]
    fn pooled_connections_enforce_foreign_keys() {
        let dir = TempDir::new().unwrap();
        let pool = file_pool(&dir);
        let mut conn = pool.get().unwrap();

        let row = diesel::sql_query("PRAGMA foreign_keys")
            .get_result::<ForeignKeys>(&mut conn)
            .unwrap();
        assert_eq!(row.foreign_keys, 1);
    }

    #[derive(diesel::QueryableByName)]
    struct ForeignKeys {
        #[diesel(sql_type = diesel::sql_types::Integer)]
        foreign_keys: i32,
    }

    #[tokio::test]
    async fn with_conn_runs_on_blocking_pool() {
        let dir = TempDir::new().unwrap();
        let pool = file_pool(&dir);
        run_migrations(&pool).unwrap();

        let count = with_conn(&pool, |conn| {
            use crate::adapter::outbound::sqlite::database::schema::users;
            users::table
                .count()
                .get_result::<i64>(conn)
                .map_err(Error::from)
        })
        .await
        .unwrap();
        assert_eq!(count, 0);
    }
}
