//! Embedded migrations for development and test stores.
//!
//! Production history is loaded by the ingestion job; these migrations only create
//! an empty `stock_data` table with the same shape.

use anyhow::anyhow;
use diesel::{Connection, SqliteConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::db::connection::sqlite_path;

/// Embedded Diesel migrations bundled with this crate.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs pending Diesel migrations on a SQLite database at the given path or URL.
pub fn run_sqlite(url: &str) -> anyhow::Result<()> {
    let mut conn = SqliteConnection::establish(sqlite_path(url))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!(e))?;

    Ok(())
}

/// Runs pending migrations for the given database URL.
///
/// Only SQLite is supported; `postgres://` URLs are rejected with a clear message
/// instead of being mistaken for a file name.
pub fn run_all(database_url: &str) -> anyhow::Result<()> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        anyhow::bail!("Unsupported DATABASE_URL (postgres is not supported): {database_url}");
    }
    run_sqlite(database_url)
}

#[cfg(test)]
mod test {
    use super::*;
    use diesel::connection::SimpleConnection;

    #[test]
    fn migrations_apply_on_temp_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let path = temp.path().to_string_lossy().to_string();

        run_sqlite(&path).expect("migration run");
        // idempotent
        run_all(&path).expect("second migration run");

        let mut conn = SqliteConnection::establish(&path).unwrap();
        conn.batch_execute(
            r#"INSERT INTO stock_data (stock_symbol, "Date", "Close") VALUES ('AAPL', '2024-01-02', 185.6)"#,
        )
        .unwrap();
    }

    #[test]
    fn postgres_urls_are_rejected() {
        let err = run_all("postgres://localhost/stocks").unwrap_err();
        assert!(err.to_string().contains("postgres is not supported"));
    }
}
