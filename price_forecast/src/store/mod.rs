//! Read-only access to the historical price store.
//!
//! The forecasting core reaches the store through two seams:
//! - [`HistoricalStore`]: something that can open a scoped session. [`SqliteStore`] only
//!   holds the database URL; every unit of work (a catalog listing, one symbol's load)
//!   opens its own [`StoreSession`] and drops it when done, so concurrent workers never
//!   share a connection.
//! - [`PriceHistory`]: the two read queries the core needs, distinct-symbol enumeration
//!   and one symbol's date-ordered series.
//!
//! Row validation lives in [`loader`] and [`catalog`] as plain functions so alternative
//! stores (and test fakes) reuse the same rules.

pub mod catalog;
pub mod loader;

use std::collections::BTreeSet;

use chrono_tz::Tz;
use diesel::SqliteConnection;
use thiserror::Error;

use crate::dates::DEFAULT_EXCHANGE_TZ;
use crate::db::connection;
use crate::series::{DuplicateDatePolicy, PriceSeries, Symbol};

/// Failures talking to the historical store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened.
    #[error("cannot open historical store {url}: {source}")]
    Connect {
        /// Database URL as configured.
        url: String,
        /// Underlying diesel error.
        source: diesel::ConnectionError,
    },
    /// Session PRAGMAs could not be applied.
    #[error("cannot configure session on {url}: {source}")]
    Session {
        /// Database URL as configured.
        url: String,
        /// Underlying diesel error.
        source: diesel::result::Error,
    },
    /// A read query failed.
    #[error("{query} query failed: {source}")]
    Query {
        /// Which query failed.
        query: &'static str,
        /// Underlying diesel error.
        source: diesel::result::Error,
    },
}

impl StoreError {
    /// `true` when the store itself is unreachable, as opposed to a single failing query.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Session { .. })
    }
}

/// How the loader turns raw rows into a [`PriceSeries`].
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Rule for rows sharing a date.
    pub duplicates: DuplicateDatePolicy,
    /// Exchange time zone used to reduce timestamps to trading dates.
    pub exchange_tz: Tz,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            duplicates: DuplicateDatePolicy::default(),
            exchange_tz: DEFAULT_EXCHANGE_TZ,
        }
    }
}

/// Read queries available inside one session.
pub trait PriceHistory {
    /// Distinct, valid symbols known to the store.
    fn list_symbols(&mut self) -> Result<BTreeSet<Symbol>, StoreError>;

    /// One symbol's validated series; `Ok(None)` when it has no usable rows.
    fn load_series(
        &mut self,
        symbol: &Symbol,
        opts: &LoadOptions,
    ) -> Result<Option<PriceSeries>, StoreError>;
}

/// A store that hands out short-lived sessions.
pub trait HistoricalStore: Send + Sync {
    /// Session type; dropped at the end of each unit of work.
    type Session: PriceHistory;

    /// Open a fresh session.
    fn open_session(&self) -> Result<Self::Session, StoreError>;
}

/// SQLite-backed historical store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    url: String,
}

impl SqliteStore {
    /// Store at `url` (a path, optionally prefixed with `sqlite:`). Nothing is opened yet.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HistoricalStore for SqliteStore {
    type Session = StoreSession;

    fn open_session(&self) -> Result<StoreSession, StoreError> {
        let conn = connection::open_read_session(&self.url)?;
        Ok(StoreSession { conn })
    }
}

/// One read-only SQLite connection, closed on drop.
pub struct StoreSession {
    conn: SqliteConnection,
}

impl PriceHistory for StoreSession {
    fn list_symbols(&mut self) -> Result<BTreeSet<Symbol>, StoreError> {
        catalog::distinct_symbols(&mut self.conn)
    }

    fn load_series(
        &mut self,
        symbol: &Symbol,
        opts: &LoadOptions,
    ) -> Result<Option<PriceSeries>, StoreError> {
        loader::load_series(&mut self.conn, symbol, opts)
    }
}
