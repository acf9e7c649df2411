//! Diesel models mapping to the historical store.
//!
//! These types mirror [`crate::schema::stock_data`]. Every column is nullable on
//! the read side so that a malformed row surfaces as a `None` the loader can drop,
//! rather than a deserialization error that fails the whole query.

use diesel::prelude::*;

use crate::schema::stock_data;

/// One `(Date, Close)` observation as stored, before validation.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = stock_data, check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockDataRow {
    /// Raw `"Date"` text (ISO date, naive timestamp or RFC 3339).
    pub date: Option<String>,
    /// Raw `"Close"` value.
    pub close: Option<f64>,
}

/// Insertable form used by development tooling and tests to seed a store.
///
/// The forecasting core never writes to `stock_data`.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stock_data, treat_none_as_null = true)]
pub struct NewStockDataRow<'a> {
    /// Ticker symbol (e.g., "AAPL").
    pub stock_symbol: Option<&'a str>,
    /// Trading date text.
    pub date: Option<&'a str>,
    /// Closing price.
    pub close: Option<f64>,
}
