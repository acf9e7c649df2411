//! Series loader: one symbol's `(Date, Close)` rows turned into a [`PriceSeries`].
//!
//! Rows are fetched in `"Date"` order (ties by insertion order). Each row must carry a
//! parseable date and a finite, positive close, otherwise it is dropped. Because
//! mixed date formats don't sort correctly as text, the survivors are stable-sorted
//! by parsed date before duplicate dates are collapsed with [`DuplicateDatePolicy`].

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text};
use tracing::{debug, warn};

use crate::dates::parse_trading_date;
use crate::models::StockDataRow;
use crate::schema::stock_data;
use crate::series::{DuplicateDatePolicy, PricePoint, PriceSeries, Symbol};
use crate::store::{LoadOptions, StoreError};

diesel::define_sql_function! {
    /// SQLite `TRIM`. Catalog keys are trimmed, so stored symbols are matched trimmed too.
    fn trim(value: Nullable<Text>) -> Nullable<Text>;
}

/// Fetch and validate one symbol's series. `Ok(None)` means absent, not an error.
pub fn load_series(
    conn: &mut SqliteConnection,
    symbol: &Symbol,
    opts: &LoadOptions,
) -> Result<Option<PriceSeries>, StoreError> {
    let rows: Vec<StockDataRow> = stock_data::table
        .filter(trim(stock_data::stock_symbol).eq(symbol.as_str()))
        .order(stock_data::date.asc())
        .then_order_by(sql::<BigInt>("rowid"))
        .select(StockDataRow::as_select())
        .load(conn)
        .map_err(|source| StoreError::Query {
            query: "load series",
            source,
        })?;
    Ok(assemble_series(symbol, rows, opts))
}

/// Validate, order and deduplicate raw rows. Pure; shared by every store.
pub fn assemble_series<I>(symbol: &Symbol, rows: I, opts: &LoadOptions) -> Option<PriceSeries>
where
    I: IntoIterator<Item = StockDataRow>,
{
    let mut total = 0usize;
    let mut parsed: Vec<PricePoint> = Vec::new();
    for row in rows {
        total += 1;
        match validate_row(&row, opts) {
            Some(point) => parsed.push(point),
            None => debug!(%symbol, date = ?row.date, close = ?row.close, "dropping malformed row"),
        }
    }
    let dropped = total - parsed.len();
    if dropped > 0 {
        warn!(%symbol, dropped, total, "dropped malformed rows");
    }
    if parsed.is_empty() {
        return None;
    }

    parsed.sort_by_key(|p| p.date);
    let (points, duplicates) = collapse_duplicates(parsed, opts.duplicates);
    if duplicates > 0 {
        warn!(%symbol, duplicates, policy = ?opts.duplicates, "collapsed duplicate dates");
    }

    match PriceSeries::new(symbol.clone(), points) {
        Ok(series) => Some(series),
        Err(error) => {
            warn!(%symbol, %error, "series failed validation");
            None
        }
    }
}

fn validate_row(row: &StockDataRow, opts: &LoadOptions) -> Option<PricePoint> {
    let date = parse_trading_date(row.date.as_deref()?, opts.exchange_tz)?;
    let close = row.close.filter(|c| c.is_finite() && *c > 0.0)?;
    Some(PricePoint::new(date, close))
}

/// Collapse runs of equal dates in an already date-sorted vector.
fn collapse_duplicates(
    sorted: Vec<PricePoint>,
    policy: DuplicateDatePolicy,
) -> (Vec<PricePoint>, usize) {
    let mut out: Vec<PricePoint> = Vec::with_capacity(sorted.len());
    let mut duplicates = 0;
    for p in sorted {
        match out.last_mut() {
            Some(prev) if prev.date == p.date => {
                duplicates += 1;
                if policy == DuplicateDatePolicy::KeepLast {
                    *prev = p;
                }
            }
            _ => out.push(p),
        }
    }
    (out, duplicates)
}
