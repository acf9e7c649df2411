//! Multi-model stock price forecasting.
//!
//! Reads closing-price histories from a SQLite `stock_data` table, runs independent
//! forecasting models per symbol, and writes per-model forecast CSVs, a comparative
//! chart and an analysis summary per symbol. See [`pipeline`] for the orchestration
//! and failure-containment rules.

#![deny(missing_docs)]

pub mod artifacts;
pub mod config;
pub mod dates;
pub mod db;
pub mod forecast;
pub mod models;
pub mod pipeline;
pub mod record;
#[allow(missing_docs)]
pub mod schema;
pub mod series;
pub mod store;
