mod common;

use common::*;
use diesel::{RunQueryDsl, sql_query};
use price_forecast::db::connection;
use price_forecast::series::{DuplicateDatePolicy, Symbol};
use price_forecast::store::{HistoricalStore, LoadOptions, PriceHistory, SqliteStore, catalog};

#[test]
fn catalog_lists_distinct_valid_symbols_in_order() {
    let (db, mut conn) = setup_db();
    insert_rows(
        &mut conn,
        &[
            (Some("MSFT"), Some("2024-01-02"), Some(370.0)),
            (Some("AAPL"), Some("2024-01-02"), Some(185.0)),
            (Some("AAPL"), Some("2024-01-03"), Some(184.0)),
            (None, Some("2024-01-02"), Some(1.0)),
            (Some("bad symbol"), Some("2024-01-02"), Some(1.0)),
        ],
    );

    let listing = catalog::list_symbols(&SqliteStore::new(&db.path));
    assert!(listing.failure.is_none());
    let got: Vec<&str> = listing.symbols.iter().map(Symbol::as_str).collect();
    assert_eq!(got, ["AAPL", "MSFT"]);
}

#[test]
fn catalog_outage_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let url = dir.path().join("missing/dir/stocks.db");
    let listing = catalog::list_symbols(&SqliteStore::new(url.to_string_lossy()));
    assert!(listing.symbols.is_empty());
    let failure = listing.failure.expect("failure reported");
    assert!(failure.is_connectivity());
}

#[test]
fn loader_drops_malformed_rows_and_collapses_duplicates() {
    let (db, mut conn) = setup_db();
    insert_rows(
        &mut conn,
        &[
            (Some("ABC"), Some("2024-01-03"), Some(11.0)),
            (Some("ABC"), Some("2024-01-02"), Some(10.0)),
            (Some("ABC"), Some("not-a-date"), Some(99.0)),
            (Some("ABC"), None, Some(99.0)),
            (Some("ABC"), Some("2024-01-04"), None),
            (Some("ABC"), Some("2024-01-05"), Some(0.0)),
            (Some("ABC"), Some("2024-01-03"), Some(11.5)),
            (Some("ABC"), Some("2024-01-08T00:00:00"), Some(12.0)),
            (Some("OTHER"), Some("2024-01-02"), Some(1.0)),
        ],
    );
    let store = SqliteStore::new(&db.path);
    let abc = Symbol::parse("ABC").unwrap();

    let mut session = store.open_session().unwrap();
    let series = session
        .load_series(&abc, &LoadOptions::default())
        .unwrap()
        .expect("series present");
    let dates: Vec<String> = series.dates().iter().map(|d| d.to_string()).collect();
    assert_eq!(dates, ["2024-01-02", "2024-01-03", "2024-01-08"]);
    assert_eq!(series.closes(), vec![10.0, 11.5, 12.0]);

    let keep_first = LoadOptions {
        duplicates: DuplicateDatePolicy::KeepFirst,
        ..LoadOptions::default()
    };
    let series = session.load_series(&abc, &keep_first).unwrap().unwrap();
    assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
}

#[test]
fn padded_symbols_load_under_their_trimmed_key() {
    let (db, mut conn) = setup_db();
    seed_series(&mut conn, " PAD ", &linear_rows(day(2024, 1, 1), 20, 50.0, 1.0));
    let store = SqliteStore::new(&db.path);

    let listing = catalog::list_symbols(&store);
    let got: Vec<&str> = listing.symbols.iter().map(Symbol::as_str).collect();
    assert_eq!(got, ["PAD"]);

    let mut session = store.open_session().unwrap();
    let series = session
        .load_series(listing.symbols.first().unwrap(), &LoadOptions::default())
        .unwrap()
        .expect("padded rows are found");
    assert_eq!(series.len(), 20);
    assert_eq!(series.last_close(), 69.0);
}

#[test]
fn absent_symbol_is_none_not_error() {
    let (db, mut conn) = setup_db();
    seed_xyz(&mut conn);
    insert_rows(&mut conn, &[(Some("NULLS"), Some("2024-01-02"), None)]);
    let mut session = SqliteStore::new(&db.path).open_session().unwrap();

    for sym in ["NOPE", "NULLS"] {
        let got = session
            .load_series(&Symbol::parse(sym).unwrap(), &LoadOptions::default())
            .unwrap();
        assert!(got.is_none(), "{sym}");
    }
}

#[test]
fn read_sessions_cannot_write() {
    let (db, _conn) = setup_db();
    let mut ro = connection::open_read_session(&format!("sqlite://{}", db.path)).unwrap();
    let err = sql_query(
        r#"INSERT INTO stock_data (stock_symbol, "Date", "Close") VALUES ('A', '2024-01-02', 1.0)"#,
    )
    .execute(&mut ro)
    .unwrap_err();
    assert!(err.to_string().contains("readonly"), "{err}");
}
