#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Days, NaiveDate};
use diesel::prelude::*;
use price_forecast::db::{connection, migrate};
use price_forecast::models::{NewStockDataRow, StockDataRow};
use price_forecast::schema::stock_data;
use price_forecast::series::{PriceSeries, Symbol};
use price_forecast::store::{
    HistoricalStore, LoadOptions, PriceHistory, StoreError, catalog, loader,
};
use tempfile::TempDir;

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/stocks.db
    pub artifacts: PathBuf,
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("stocks.db").to_string_lossy().to_string();
    let artifacts = dir.path().join("Stocks");

    migrate::run_all(&path).expect("migrations");
    let conn = connection::connect_sqlite(&path).expect("connect");
    (
        TestDb {
            _dir: dir,
            path,
            artifacts,
        },
        conn,
    )
}

pub fn insert_rows(conn: &mut SqliteConnection, rows: &[(Option<&str>, Option<&str>, Option<f64>)]) {
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        for (symbol, date, close) in rows {
            diesel::insert_into(stock_data::table)
                .values(NewStockDataRow {
                    stock_symbol: *symbol,
                    date: *date,
                    close: *close,
                })
                .execute(conn)?;
        }
        Ok(())
    })
    .expect("seed rows");
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive daily closes `base + slope * i` starting at `start`.
pub fn linear_rows(start: NaiveDate, n: usize, base: f64, slope: f64) -> Vec<(String, f64)> {
    (0..n)
        .map(|i| {
            let date = start + Days::new(i as u64);
            (date.to_string(), base + slope * i as f64)
        })
        .collect()
}

pub fn seed_series(conn: &mut SqliteConnection, symbol: &str, rows: &[(String, f64)]) {
    let rows: Vec<_> = rows
        .iter()
        .map(|(d, c)| (Some(symbol), Some(d.as_str()), Some(*c)))
        .collect();
    insert_rows(conn, &rows);
}

/// The 400-day linear "ABC" history starting 2020-01-01.
pub fn seed_abc(conn: &mut SqliteConnection) {
    seed_series(conn, "ABC", &linear_rows(day(2020, 1, 1), 400, 100.0, 0.5));
}

/// The 3-row "XYZ" history.
pub fn seed_xyz(conn: &mut SqliteConnection) {
    seed_series(conn, "XYZ", &linear_rows(day(2023, 6, 1), 3, 20.0, 1.0));
}

pub fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
    let start = day(2020, 1, 1);
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, c)| price_forecast::series::PricePoint::new(start + Days::new(i as u64), *c))
        .collect();
    PriceSeries::new(Symbol::parse(symbol).unwrap(), points).unwrap()
}

pub fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("read {}: {e}", path.as_ref().display()))
}

pub fn file_names(dir: impl AsRef<Path>) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub fn unreachable() -> StoreError {
    StoreError::Connect {
        url: "fake://store".into(),
        source: diesel::ConnectionError::BadConnection("store unreachable".into()),
    }
}

/// In-memory store with switchable failures.
#[derive(Default)]
pub struct FakeInner {
    pub rows: BTreeMap<String, Vec<StockDataRow>>,
    /// Every session open fails.
    pub offline: bool,
    /// Sessions that may be opened before the store goes offline.
    pub sessions_before_outage: Option<usize>,
    /// Series query for this symbol fails.
    pub failing_query: Option<String>,
    pub sessions_opened: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    pub inner: Arc<FakeInner>,
}

impl FakeStore {
    pub fn new(inner: FakeInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }
}

pub fn fake_rows(rows: &[(String, f64)]) -> Vec<StockDataRow> {
    rows.iter()
        .map(|(d, c)| StockDataRow {
            date: Some(d.clone()),
            close: Some(*c),
        })
        .collect()
}

pub struct FakeSession {
    inner: Arc<FakeInner>,
}

impl HistoricalStore for FakeStore {
    type Session = FakeSession;

    fn open_session(&self) -> Result<FakeSession, StoreError> {
        let n = self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        if self.inner.offline || self.inner.sessions_before_outage.is_some_and(|limit| n >= limit) {
            return Err(unreachable());
        }
        Ok(FakeSession {
            inner: Arc::clone(&self.inner),
        })
    }
}

impl PriceHistory for FakeSession {
    fn list_symbols(&mut self) -> Result<std::collections::BTreeSet<Symbol>, StoreError> {
        Ok(catalog::validate_symbols(self.inner.rows.keys()))
    }

    fn load_series(
        &mut self,
        symbol: &Symbol,
        opts: &LoadOptions,
    ) -> Result<Option<PriceSeries>, StoreError> {
        if self.inner.failing_query.as_deref() == Some(symbol.as_str()) {
            return Err(StoreError::Query {
                query: "load series",
                source: diesel::result::Error::NotFound,
            });
        }
        let rows = self.inner.rows.get(symbol.as_str()).cloned().unwrap_or_default();
        Ok(loader::assemble_series(symbol, rows, opts))
    }
}
