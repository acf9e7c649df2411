//! Symbol catalog: the distinct tickers present in `stock_data`.

use std::collections::BTreeSet;

use diesel::prelude::*;
use tracing::{info, warn};

use crate::schema::stock_data;
use crate::series::Symbol;
use crate::store::{HistoricalStore, PriceHistory, StoreError};

/// Result of a catalog listing.
///
/// A failed listing is not fatal: `symbols` is empty and `failure` carries the cause,
/// so the pipeline degrades to a no-op run.
#[derive(Debug, Default)]
pub struct SymbolListing {
    /// Known symbols, ascending.
    pub symbols: BTreeSet<Symbol>,
    /// Why the listing failed, if it did.
    pub failure: Option<StoreError>,
}

/// List the symbols known to `store`, opening and releasing one session.
pub fn list_symbols<S: HistoricalStore>(store: &S) -> SymbolListing {
    let result = store
        .open_session()
        .and_then(|mut session| session.list_symbols());
    match result {
        Ok(symbols) => {
            info!(count = symbols.len(), "symbol catalog loaded");
            SymbolListing {
                symbols,
                failure: None,
            }
        }
        Err(error) => {
            warn!(%error, "symbol catalog unavailable");
            SymbolListing {
                symbols: BTreeSet::new(),
                failure: Some(error),
            }
        }
    }
}

/// Distinct non-null `stock_symbol` values, validated.
pub fn distinct_symbols(conn: &mut SqliteConnection) -> Result<BTreeSet<Symbol>, StoreError> {
    let raw: Vec<Option<String>> = stock_data::table
        .select(stock_data::stock_symbol)
        .filter(stock_data::stock_symbol.is_not_null())
        .distinct()
        .order(stock_data::stock_symbol.asc())
        .load(conn)
        .map_err(|source| StoreError::Query {
            query: "distinct symbols",
            source,
        })?;
    Ok(validate_symbols(raw.into_iter().flatten()))
}

/// Keep only values that form a valid [`Symbol`]; the rest are logged and dropped.
pub fn validate_symbols<I, T>(raw: I) -> BTreeSet<Symbol>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| match Symbol::parse(s.as_ref()) {
            Ok(sym) => Some(sym),
            Err(error) => {
                warn!(raw = s.as_ref(), %error, "skipping invalid symbol");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_and_duplicate_symbols_are_collapsed() {
        let got = validate_symbols(["MSFT", " AAPL", "AAPL", "", "bad/sym", "AAPL "]);
        let got: Vec<_> = got.iter().map(Symbol::as_str).collect();
        assert_eq!(got, ["AAPL", "MSFT"]);
    }
}
