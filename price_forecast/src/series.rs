//! Price series and ticker symbols.
//!
//! A [`PriceSeries`] is the canonical model input: one symbol's closing prices,
//! strictly increasing by calendar date, every close finite and positive. It can only
//! be built through [`PriceSeries::new`], so every model may rely on those invariants.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest ticker accepted as an artifact key.
pub const MAX_SYMBOL_LEN: usize = 32;

/// Validation failures for [`Symbol`] and [`PriceSeries`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    /// Symbol was empty after trimming.
    #[error("symbol is empty")]
    EmptySymbol,
    /// Symbol exceeded [`MAX_SYMBOL_LEN`].
    #[error("symbol {0:?} is longer than 32 characters")]
    SymbolTooLong(String),
    /// Symbol contained a character that is unsafe in a file name.
    #[error("symbol {symbol:?} contains invalid character {ch:?}")]
    InvalidSymbolChar {
        /// Offending symbol.
        symbol: String,
        /// First rejected character.
        ch: char,
    },
    /// A series needs at least one observation.
    #[error("price series for {0} is empty")]
    Empty(Symbol),
    /// Dates were not strictly increasing at `index`.
    #[error("price series dates are not strictly increasing at index {index} ({date})")]
    NotIncreasing {
        /// Position of the offending point.
        index: usize,
        /// Its date.
        date: NaiveDate,
    },
    /// A close was non-finite or not positive.
    #[error("invalid close {close} on {date}")]
    InvalidClose {
        /// Date of the offending point.
        date: NaiveDate,
        /// Offending value.
        close: f64,
    },
}

/// Validated ticker symbol.
///
/// Trimmed, non-empty, at most [`MAX_SYMBOL_LEN`] characters, made of ASCII
/// alphanumerics and `.`, `-`, `^`, `=`, `_`. That keeps every symbol usable
/// verbatim inside artifact file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Validate and wrap a raw symbol.
    pub fn parse(raw: &str) -> Result<Self, SeriesError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(SeriesError::EmptySymbol);
        }
        if s.chars().count() > MAX_SYMBOL_LEN {
            return Err(SeriesError::SymbolTooLong(s.to_string()));
        }
        if let Some(ch) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '_')))
        {
            return Err(SeriesError::InvalidSymbolChar {
                symbol: s.to_string(),
                ch,
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Borrow the symbol text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Symbol {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SeriesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// One `(date, close)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    /// Trading date.
    pub date: NaiveDate,
    /// Closing price.
    pub close: f64,
}

impl PricePoint {
    /// Convenience constructor.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Rule for collapsing rows that share a trading date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDatePolicy {
    /// Keep the first row seen for a date (store order).
    KeepFirst,
    /// Keep the last row seen for a date (store order), i.e. the latest correction.
    #[default]
    KeepLast,
}

/// Immutable, validated closing-price history of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: Symbol,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, enforcing non-empty, strictly increasing dates and finite
    /// positive closes.
    pub fn new(symbol: Symbol, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        if points.is_empty() {
            return Err(SeriesError::Empty(symbol));
        }
        for (index, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(SeriesError::InvalidClose {
                    date: p.date,
                    close: p.close,
                });
            }
            if index > 0 && points[index - 1].date >= p.date {
                return Err(SeriesError::NotIncreasing {
                    index,
                    date: p.date,
                });
            }
        }
        Ok(Self { symbol, points })
    }

    /// Owning symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Observations in date order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Number of observations (always at least one).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Earliest date.
    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    /// Latest date.
    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    /// Latest close.
    pub fn last_close(&self) -> f64 {
        self.points[self.points.len() - 1].close
    }

    /// Calendar days between the first and last observation.
    pub fn span_days(&self) -> i64 {
        (self.last_date() - self.first_date()).num_days()
    }

    /// The `horizon` consecutive calendar days after [`Self::last_date`].
    ///
    /// Shorter than `horizon` only when the calendar runs out (`NaiveDate::MAX`).
    pub fn forecast_dates(&self, horizon: usize) -> Vec<NaiveDate> {
        self.last_date().iter_days().skip(1).take(horizon).collect()
    }
}
