//! Durable per-symbol artifacts.
//!
//! Layout under the artifacts root (see [`layout::ArtifactLayout`]):
//! - `forecasts/{model_id}_forecast_{SYMBOL}.csv`
//! - `visualizations/visualization_{SYMBOL}.html`
//! - `analysis/analysis_{SYMBOL}.txt`
//!
//! Names are derived from the symbol alone, so the presentation side resolves
//! artifacts by path construction without touching the database.

pub mod analysis;
pub mod chart;
pub mod layout;
pub mod writer;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use layout::{ArtifactLayout, ArtifactPaths};
pub use writer::ArtifactWriter;

/// Failures writing or listing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Filesystem error on `path`.
    #[error("artifact i/o on {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// CSV encoding failed.
    #[error("csv encoding for {}: {source}", path.display())]
    Csv {
        /// Destination file.
        path: PathBuf,
        /// Underlying error.
        source: csv::Error,
    },
    /// Chart data could not be serialised.
    #[error("chart encoding: {0}")]
    Json(#[from] serde_json::Error),
}
