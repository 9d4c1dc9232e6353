use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::Config;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the SQLite pool described by `config.sqlite_dsn`.
///
/// Accepts either a `sqlite:` URL or a bare file path. The file is created if
/// missing. WAL journaling and a bounded busy timeout let concurrent requests
/// queue behind SQLite's single writer instead of failing immediately.
pub async fn create_pool(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = connect_options(&config.sqlite_dsn)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
}

/// Single-connection in-memory database with migrations applied.
///
/// Every connection to `:memory:` sees its own database, so the pool is pinned
/// to one connection that never expires.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn connect_options(dsn: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    if dsn.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(dsn)
    } else {
        Ok(SqliteConnectOptions::new().filename(dsn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_creates_file_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let config = Config {
            sqlite_dsn: path.to_string_lossy().into_owned(),
            ..Config::default()
        };

        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // Applying twice is a no-op.
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_in_memory_pool_is_migrated() {
        let pool = connect_in_memory().await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
