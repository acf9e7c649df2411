//! Artifact naming convention and presentation lookup.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::ArtifactError;
use crate::series::Symbol;

const FORECASTS_DIR: &str = "forecasts";
const VISUALIZATIONS_DIR: &str = "visualizations";
const ANALYSIS_DIR: &str = "analysis";
const VISUALIZATION_PREFIX: &str = "visualization_";
const VISUALIZATION_EXT: &str = ".html";

/// Every artifact path for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    /// Symbol looked up.
    pub symbol: Symbol,
    /// Comparative chart.
    pub visualization: PathBuf,
    /// Forecast CSV per model id.
    pub forecasts: BTreeMap<String, PathBuf>,
    /// Analysis text.
    pub analysis: PathBuf,
}

/// Root directory plus the fixed namespace layout beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    /// Layout rooted at `root` (e.g. `Stocks`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Artifacts root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `forecasts/` namespace.
    pub fn forecasts_dir(&self) -> PathBuf {
        self.root.join(FORECASTS_DIR)
    }

    /// `visualizations/` namespace.
    pub fn visualizations_dir(&self) -> PathBuf {
        self.root.join(VISUALIZATIONS_DIR)
    }

    /// `analysis/` namespace.
    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join(ANALYSIS_DIR)
    }

    /// Create all three namespaces.
    pub fn ensure_dirs(&self) -> Result<(), ArtifactError> {
        for dir in [
            self.forecasts_dir(),
            self.visualizations_dir(),
            self.analysis_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|source| ArtifactError::Io { path: dir, source })?;
        }
        Ok(())
    }

    /// `forecasts/{model_id}_forecast_{SYMBOL}.csv`
    pub fn forecast_path(&self, symbol: &Symbol, model_id: &str) -> PathBuf {
        self.forecasts_dir()
            .join(format!("{model_id}_forecast_{symbol}.csv"))
    }

    /// `visualizations/visualization_{SYMBOL}.html`
    pub fn visualization_path(&self, symbol: &Symbol) -> PathBuf {
        self.visualizations_dir()
            .join(format!("{VISUALIZATION_PREFIX}{symbol}{VISUALIZATION_EXT}"))
    }

    /// `analysis/analysis_{SYMBOL}.txt`
    pub fn analysis_path(&self, symbol: &Symbol) -> PathBuf {
        self.analysis_dir().join(format!("analysis_{symbol}.txt"))
    }

    /// Resolve every artifact path of `symbol`. Pure path construction; the files
    /// need not exist.
    pub fn lookup<'a, I>(&self, symbol: &Symbol, model_ids: I) -> ArtifactPaths
    where
        I: IntoIterator<Item = &'a str>,
    {
        ArtifactPaths {
            symbol: symbol.clone(),
            visualization: self.visualization_path(symbol),
            forecasts: model_ids
                .into_iter()
                .map(|id| (id.to_string(), self.forecast_path(symbol, id)))
                .collect(),
            analysis: self.analysis_path(symbol),
        }
    }

    /// Symbols that currently have a chart, read from file names. A missing
    /// `visualizations/` directory means none.
    pub fn visualized_symbols(&self) -> Result<BTreeSet<Symbol>, ArtifactError> {
        let dir = self.visualizations_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => return Err(ArtifactError::Io { path: dir, source }),
        };
        let mut out = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|source| ArtifactError::Io {
                path: dir.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let symbol = name
                .strip_prefix(VISUALIZATION_PREFIX)
                .and_then(|rest| rest.strip_suffix(VISUALIZATION_EXT))
                .and_then(|raw| Symbol::parse(raw).ok());
            if let Some(symbol) = symbol {
                out.insert(symbol);
            }
        }
        Ok(out)
    }
}
