//! Database utilities for connections and schema migrations.
//!
//! This module provides:
//! - SQLite connection helpers: [`connection::connect_sqlite`] applies foreign_keys=ON and a
//!   5000ms busy_timeout; [`connection::open_read_session`] additionally pins the connection
//!   to `query_only` for the forecasting core.
//! - Embedded Diesel migrations for development stores: [`migrate::run_sqlite`] and
//!   [`migrate::run_all`].
//!
//! Example:
//! ```no_run
//! use price_forecast::db::{migrate, connection};
//!
//! let db_path = std::env::temp_dir().join("price_forecast_example.db");
//! migrate::run_all(db_path.to_str().unwrap()).expect("migrations");
//!
//! let _conn = connection::open_read_session(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;
