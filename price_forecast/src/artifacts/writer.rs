//! Atomic artifact writes.
//!
//! Every artifact is rendered in memory, written to a hidden `.{name}.tmp` next to its
//! destination and renamed into place. A rerun therefore replaces the previous file,
//! and a crash mid-write leaves the old artifact intact.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::chart::Chart;
use super::{ArtifactError, ArtifactLayout};
use crate::record::ForecastRecord;
use crate::series::Symbol;

/// Writes forecast, chart and analysis artifacts into an [`ArtifactLayout`].
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    layout: ArtifactLayout,
}

impl ArtifactWriter {
    /// Writer over `layout`.
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Underlying layout.
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Create the namespace directories.
    pub fn prepare(&self) -> Result<(), ArtifactError> {
        self.layout.ensure_dirs()
    }

    /// Write one forecast as `Date,{LABEL}_Forecast` CSV.
    pub fn write_forecast(&self, record: &ForecastRecord) -> Result<PathBuf, ArtifactError> {
        let path = self.layout.forecast_path(record.symbol(), record.model().id);
        let bytes = forecast_csv(record).map_err(|source| ArtifactError::Csv {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &bytes)?;
        Ok(path)
    }

    /// Delete a forecast left over from an earlier run. `Ok(false)` if none existed.
    pub fn remove_forecast(&self, symbol: &Symbol, model_id: &str) -> Result<bool, ArtifactError> {
        let path = self.layout.forecast_path(symbol, model_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed stale forecast");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ArtifactError::Io { path, source }),
        }
    }

    /// Write the comparative chart as standalone HTML.
    pub fn write_chart(&self, chart: &Chart) -> Result<PathBuf, ArtifactError> {
        let path = self.layout.visualization_path(&chart.symbol);
        let html = chart.to_html()?;
        write_atomic(&path, html.as_bytes())?;
        Ok(path)
    }

    /// Write the analysis text.
    pub fn write_analysis(&self, symbol: &Symbol, text: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.layout.analysis_path(symbol);
        write_atomic(&path, text.as_bytes())?;
        Ok(path)
    }
}

/// Render a forecast as CSV: `YYYY-MM-DD` dates, values to 6 decimals.
pub fn forecast_csv(record: &ForecastRecord) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let header = format!("{}_Forecast", record.model().label);
    wtr.write_record(["Date", header.as_str()])?;
    for p in record.points() {
        wtr.write_record([&p.date.to_string(), &format!("{:.6}", p.value)])?;
    }
    wtr.into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Write to `.{name}.tmp` beside `path`, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
    let tmp_path = temp_path(path);

    fs::write(&tmp_path, bytes).map_err(|source| ArtifactError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}
