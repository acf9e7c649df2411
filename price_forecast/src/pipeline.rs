//! Forecast orchestrator.
//!
//! [`ForecastPipeline::run_all`] lists the catalog, then for every symbol: opens a
//! session, loads the series and releases the session, runs every model
//! independently, writes each forecast, removes forecasts left behind by models that
//! failed this time, and finally writes the chart and analysis text.
//!
//! Failures are contained at the narrowest scope and recorded in the [`RunReport`]:
//! - catalog outage: the run is a no-op ([`RunOutcome::CatalogUnavailable`]);
//! - absent data: the symbol is skipped ([`SymbolStatus::NoData`]);
//! - a failing query: that symbol only ([`SymbolStatus::LoadFailed`]);
//! - a model failure: that `(symbol, model)` pair only ([`ModelOutcome::Failed`]);
//! - an artifact write: that artifact only ([`ArtifactOutcome::Failed`]).
//!
//! Losing connectivity to the store mid-run aborts the remaining symbols
//! ([`RunOutcome::Aborted`]). With `workers > 1` symbols are spread over a rayon pool;
//! each worker opens its own session and the report keeps catalog order.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::{ArtifactError, ArtifactWriter, analysis, chart};
use crate::forecast::{ForecastModel, ModelError};
use crate::record::{ModelTag, SymbolRun};
use crate::series::{PriceSeries, Symbol};
use crate::store::{HistoricalStore, LoadOptions, PriceHistory, StoreError, catalog};

/// Orchestrator settings.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Forecast horizon in calendar days.
    pub horizon: usize,
    /// Symbols processed concurrently (1 = sequential).
    pub workers: usize,
    /// Loader settings.
    pub load: LoadOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            horizon: 30,
            workers: 1,
            load: LoadOptions::default(),
        }
    }
}

/// Setup failures; everything after setup is reported in [`RunReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Artifact namespaces could not be created.
    #[error("cannot prepare artifact directories: {0}")]
    Artifacts(#[from] ArtifactError),
    /// Worker pool could not be started.
    #[error("cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result of writing one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Written to this path.
    Written(PathBuf),
    /// Write failed; other artifacts are unaffected.
    Failed(String),
}

impl ArtifactOutcome {
    fn from_result(result: Result<PathBuf, ArtifactError>) -> Self {
        match result {
            Ok(path) => Self::Written(path),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// `true` when written.
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

/// What happened to one model for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    /// Forecast produced; `artifact` tells whether it was persisted.
    Forecast {
        /// Forecast length.
        points: usize,
        /// CSV write result.
        artifact: ArtifactOutcome,
    },
    /// No forecast.
    Failed {
        /// Why.
        error: ModelError,
    },
}

/// Per-model line of a symbol report.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReport {
    /// Model.
    pub model: ModelTag,
    /// Outcome.
    pub outcome: ModelOutcome,
}

/// A symbol that had data and went through the models.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSymbol {
    /// Observations in the loaded series.
    pub observations: usize,
    /// One entry per configured model, in order.
    pub models: Vec<ModelReport>,
    /// Chart write result.
    pub chart: ArtifactOutcome,
    /// Analysis write result.
    pub analysis: ArtifactOutcome,
}

impl ProcessedSymbol {
    /// Models that produced a forecast.
    pub fn forecasts(&self) -> usize {
        self.models
            .iter()
            .filter(|m| matches!(m.outcome, ModelOutcome::Forecast { .. }))
            .count()
    }
}

/// Status of one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolStatus {
    /// No usable rows; skipped without artifacts.
    NoData,
    /// The series query failed.
    LoadFailed {
        /// Error text.
        reason: String,
    },
    /// Models ran and artifacts were written.
    Processed(ProcessedSymbol),
}

/// Report line for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolReport {
    /// Symbol.
    pub symbol: Symbol,
    /// What happened.
    pub status: SymbolStatus,
}

/// How the run as a whole ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every catalog symbol was attempted.
    Completed,
    /// The catalog could not be read; nothing was done.
    CatalogUnavailable {
        /// Error text.
        reason: String,
    },
    /// Store connectivity was lost while opening `symbol`'s session.
    Aborted {
        /// Symbol being started when connectivity failed.
        symbol: Symbol,
        /// Error text.
        reason: String,
    },
}

/// Full run report, symbols in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Overall outcome.
    pub outcome: RunOutcome,
    /// One entry per attempted symbol.
    pub symbols: Vec<SymbolReport>,
}

impl RunReport {
    /// Report entry for `symbol`, if it was attempted.
    pub fn get(&self, symbol: &str) -> Option<&SymbolReport> {
        self.symbols.iter().find(|r| r.symbol.as_str() == symbol)
    }

    /// `true` if connectivity loss cut the run short.
    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted { .. })
    }

    /// Number of forecasts produced across all symbols.
    pub fn forecast_count(&self) -> usize {
        self.symbols
            .iter()
            .filter_map(|r| match &r.status {
                SymbolStatus::Processed(p) => Some(p.forecasts()),
                _ => None,
            })
            .sum()
    }
}

enum Step {
    Done(SymbolReport),
    Abort { symbol: Symbol, error: StoreError },
}

/// Drives catalog → loader → models → artifacts for every symbol.
pub struct ForecastPipeline<S> {
    store: S,
    models: Vec<Box<dyn ForecastModel>>,
    artifacts: ArtifactWriter,
    options: PipelineOptions,
}

impl<S: HistoricalStore> ForecastPipeline<S> {
    /// Assemble a pipeline.
    pub fn new(
        store: S,
        models: Vec<Box<dyn ForecastModel>>,
        artifacts: ArtifactWriter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            models,
            artifacts,
            options,
        }
    }

    /// Process every symbol in the catalog.
    pub fn run_all(&self) -> Result<RunReport, PipelineError> {
        let listing = catalog::list_symbols(&self.store);
        if let Some(error) = listing.failure {
            return Ok(RunReport {
                outcome: RunOutcome::CatalogUnavailable {
                    reason: error.to_string(),
                },
                symbols: Vec::new(),
            });
        }
        self.artifacts.prepare()?;

        let symbols: Vec<Symbol> = listing.symbols.into_iter().collect();
        let steps = if self.options.workers <= 1 {
            self.run_sequential(&symbols)
        } else {
            self.run_parallel(&symbols)?
        };

        let mut outcome = RunOutcome::Completed;
        let mut reports = Vec::with_capacity(steps.len());
        for step in steps {
            match step {
                Step::Done(report) => reports.push(report),
                Step::Abort { symbol, error } => {
                    if outcome == RunOutcome::Completed {
                        warn!(%symbol, %error, "historical store unreachable; aborting run");
                        outcome = RunOutcome::Aborted {
                            symbol,
                            reason: error.to_string(),
                        };
                    }
                }
            }
        }

        let report = RunReport {
            outcome,
            symbols: reports,
        };
        info!(
            symbols = report.symbols.len(),
            forecasts = report.forecast_count(),
            aborted = report.is_aborted(),
            "forecast run finished"
        );
        Ok(report)
    }

    fn run_sequential(&self, symbols: &[Symbol]) -> Vec<Step> {
        let mut steps = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let step = self.process_symbol(symbol);
            let abort = matches!(step, Step::Abort { .. });
            steps.push(step);
            if abort {
                break;
            }
        }
        steps
    }

    fn run_parallel(&self, symbols: &[Symbol]) -> Result<Vec<Step>, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers)
            .thread_name(|i| format!("forecast-worker-{i}"))
            .build()?;
        let abort = AtomicBool::new(false);
        let steps: Vec<Option<Step>> = pool.install(|| {
            symbols
                .par_iter()
                .map(|symbol| {
                    if abort.load(Ordering::SeqCst) {
                        return None;
                    }
                    let step = self.process_symbol(symbol);
                    if matches!(step, Step::Abort { .. }) {
                        abort.store(true, Ordering::SeqCst);
                    }
                    Some(step)
                })
                .collect()
        });
        Ok(steps.into_iter().flatten().collect())
    }

    fn process_symbol(&self, symbol: &Symbol) -> Step {
        let loaded = match self.store.open_session() {
            Ok(mut session) => session.load_series(symbol, &self.options.load),
            Err(error) => Err(error),
        };
        let status = match loaded {
            Ok(Some(series)) => SymbolStatus::Processed(self.process_series(series)),
            Ok(None) => {
                info!(%symbol, "no historical data; skipping");
                SymbolStatus::NoData
            }
            Err(error) if error.is_connectivity() => {
                return Step::Abort {
                    symbol: symbol.clone(),
                    error,
                };
            }
            Err(error) => {
                warn!(%symbol, %error, "failed to load series");
                SymbolStatus::LoadFailed {
                    reason: error.to_string(),
                }
            }
        };
        Step::Done(SymbolReport {
            symbol: symbol.clone(),
            status,
        })
    }

    /// Run every model on `series`. Each model is independent of the others.
    pub fn forecast_series(&self, series: PriceSeries) -> SymbolRun {
        let horizon = self.options.horizon;
        let mut run = SymbolRun::new(series, horizon);
        for model in &self.models {
            let tag = model.tag();
            let outcome = model.forecast(&run.series, horizon).and_then(|record| {
                if record.len() == horizon {
                    Ok(record)
                } else {
                    Err(ModelError::HorizonMismatch {
                        expected: horizon,
                        actual: record.len(),
                    })
                }
            });
            if let Err(error) = &outcome {
                warn!(symbol = %run.series.symbol(), model = tag.id, %error, "model failed");
            }
            run.push(tag, outcome);
        }
        run
    }

    fn process_series(&self, series: PriceSeries) -> ProcessedSymbol {
        let observations = series.len();
        let run = self.forecast_series(series);
        let symbol = run.series.symbol();

        let models = self
            .models
            .iter()
            .map(|model| {
                let tag = model.tag();
                let outcome = match run.forecasts.get(tag.id) {
                    Some(record) => {
                        let written = self.artifacts.write_forecast(record);
                        if let Err(error) = &written {
                            warn!(%symbol, model = tag.id, %error, "forecast artifact not written");
                        }
                        ModelOutcome::Forecast {
                            points: record.len(),
                            artifact: ArtifactOutcome::from_result(written),
                        }
                    }
                    None => {
                        if let Err(error) = self.artifacts.remove_forecast(symbol, tag.id) {
                            warn!(%symbol, model = tag.id, %error, "stale forecast not removed");
                        }
                        let error = run
                            .failures
                            .iter()
                            .find(|f| f.model.id == tag.id)
                            .map(|f| f.error.clone())
                            .unwrap_or_else(|| ModelError::Rejected("no forecast recorded".into()));
                        ModelOutcome::Failed { error }
                    }
                };
                ModelReport {
                    model: tag,
                    outcome,
                }
            })
            .collect();

        let chart = self.artifacts.write_chart(&chart::compose(&run));
        if let Err(error) = &chart {
            warn!(%symbol, %error, "chart not written");
        }
        let analysis = self
            .artifacts
            .write_analysis(symbol, &analysis::render(&run));
        if let Err(error) = &analysis {
            warn!(%symbol, %error, "analysis not written");
        }

        let processed = ProcessedSymbol {
            observations,
            models,
            chart: ArtifactOutcome::from_result(chart),
            analysis: ArtifactOutcome::from_result(analysis),
        };
        info!(
            %symbol,
            observations,
            forecasts = processed.forecasts(),
            failed = run.failures.len(),
            "symbol processed"
        );
        processed
    }
}
