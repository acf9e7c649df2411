//! SQLite connection helpers.
//!
//! Database URLs may be bare file paths or carry a `sqlite:` / `sqlite://` prefix;
//! [`sqlite_path`] strips the prefix before handing the path to Diesel.

use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};

use crate::store::StoreError;

/// Strip an optional `sqlite:` / `sqlite://` scheme from a database URL.
pub fn sqlite_path(database_url: &str) -> &str {
    let url = database_url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
}

/// Open a SQLite connection and apply connection-wide PRAGMAs.
pub fn connect_sqlite(database_url: &str) -> Result<SqliteConnection, StoreError> {
    let path = sqlite_path(database_url);
    let mut conn = SqliteConnection::establish(path).map_err(|source| StoreError::Connect {
        url: database_url.to_string(),
        source,
    })?;

    let session_err = |source| StoreError::Session {
        url: database_url.to_string(),
        source,
    };
    sql_query("PRAGMA foreign_keys=ON;")
        .execute(&mut conn)
        .map_err(session_err)?;
    sql_query("PRAGMA busy_timeout=5000;")
        .execute(&mut conn)
        .map_err(session_err)?;
    Ok(conn)
}

/// Open a connection for the forecasting core: same PRAGMAs as [`connect_sqlite`]
/// plus `query_only`, so any accidental write fails instead of touching history.
pub fn open_read_session(database_url: &str) -> Result<SqliteConnection, StoreError> {
    let mut conn = connect_sqlite(database_url)?;
    sql_query("PRAGMA query_only=ON;")
        .execute(&mut conn)
        .map_err(|source| StoreError::Session {
            url: database_url.to_string(),
            source,
        })?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sqlite_scheme() {
        assert_eq!(sqlite_path("sqlite:///tmp/a.db"), "/tmp/a.db");
        assert_eq!(sqlite_path("sqlite:stocks.db"), "stocks.db");
        assert_eq!(sqlite_path(" stocks.db "), "stocks.db");
    }

    #[test]
    fn missing_parent_directory_is_a_connect_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("no/such/dir/stocks.db");
        let Err(err) = connect_sqlite(url.to_str().unwrap()) else {
            panic!("expected a connect error");
        };
        assert!(err.is_connectivity());
        assert!(matches!(err, StoreError::Connect { .. }));
    }
}
