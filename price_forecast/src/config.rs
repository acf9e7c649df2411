//! Pipeline configuration: TOML parsing, validation and environment overrides.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! database_url = "stocks.db"          # falls back to $DATABASE_URL
//! artifacts_dir = "Stocks"            # $PRICE_FORECAST_ARTIFACTS overrides
//! horizon = 30
//! workers = 1
//! exchange_timezone = "America/New_York"
//! duplicate_dates = "keep_last"       # or "keep_first"
//! models = ["arima", "sarima", "decomposition"]
//!
//! [arima]
//! lag_order = 5
//! differencing = 1
//!
//! [sarima]
//! seasonal_period = 12
//! max_iterations = 5000
//! tolerance = 1e-8
//! restarts = 2
//!
//! [decomposition]
//! changepoints = 25
//!
//! [[decomposition.events]]
//! name = "earnings"
//! dates = ["2024-01-25", "2024-04-25"]
//! lower_window = -1
//! upper_window = 1
//! ```
//!
//! Entrypoints: [`load_config_str`] and [`load_config_path`] parse and validate;
//! [`Config::apply_env`] layers the environment on top.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail, ensure};
use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_var, get_env_var_opt};

use crate::dates::parse_tz;
use crate::forecast::ModelsConfig;
use crate::forecast::arima::ArimaConfig;
use crate::forecast::decomposition::DecompositionConfig;
use crate::forecast::sarima::SarimaConfig;
use crate::forecast::BUILTIN_MODELS;
use crate::pipeline::PipelineOptions;
use crate::series::DuplicateDatePolicy;
use crate::store::LoadOptions;

/// Environment variable holding the database URL when the file has none.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable overriding `artifacts_dir`.
pub const ARTIFACTS_DIR_ENV: &str = "PRICE_FORECAST_ARTIFACTS";

const MAX_FOURIER_ORDER: usize = 50;
const MAX_LAG_ORDER: usize = 60;

/// Whole-pipeline configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite path or `sqlite:` URL of the historical store.
    pub database_url: Option<String>,
    /// Root of the artifact namespaces.
    pub artifacts_dir: PathBuf,
    /// Forecast horizon in calendar days.
    pub horizon: usize,
    /// Symbols processed concurrently.
    pub workers: usize,
    /// IANA zone used to turn timestamps into trading dates.
    pub exchange_timezone: String,
    /// Rule for rows sharing a date.
    pub duplicate_dates: DuplicateDatePolicy,
    /// Model ids in run order.
    pub models: Vec<String>,
    /// `[arima]`
    pub arima: ArimaConfig,
    /// `[sarima]`
    pub sarima: SarimaConfig,
    /// `[decomposition]`
    pub decomposition: DecompositionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            artifacts_dir: PathBuf::from("Stocks"),
            horizon: 30,
            workers: 1,
            exchange_timezone: "America/New_York".to_string(),
            duplicate_dates: DuplicateDatePolicy::default(),
            models: BUILTIN_MODELS.iter().map(|m| m.to_string()).collect(),
            arima: ArimaConfig::default(),
            sarima: SarimaConfig::default(),
            decomposition: DecompositionConfig::default(),
        }
    }
}

impl Config {
    /// Check ranges and cross-field rules.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.horizon >= 1, "horizon must be at least 1");
        ensure!(self.workers >= 1, "workers must be at least 1");
        if parse_tz(&self.exchange_timezone).is_none() {
            bail!("unknown exchange_timezone: {}", self.exchange_timezone);
        }
        if let Some(url) = &self.database_url {
            ensure!(!url.trim().is_empty(), "database_url cannot be empty");
        }

        ensure!(!self.models.is_empty(), "models list cannot be empty");
        let mut seen = HashSet::new();
        for id in &self.models {
            let id = id.trim();
            if !BUILTIN_MODELS.contains(&id) {
                bail!("unknown model id {id:?} (expected one of: {})", BUILTIN_MODELS.join(", "));
            }
            ensure!(seen.insert(id), "model {id:?} listed twice");
        }

        let a = &self.arima;
        ensure!(
            (1..=2).contains(&a.differencing),
            "arima.differencing must be 1 or 2"
        );
        ensure!(
            a.lag_order <= MAX_LAG_ORDER,
            "arima.lag_order must be at most {MAX_LAG_ORDER}"
        );

        let s = &self.sarima;
        ensure!(s.seasonal_period >= 2, "sarima.seasonal_period must be at least 2");
        ensure!(s.max_iterations >= 1, "sarima.max_iterations must be at least 1");
        ensure!(
            s.tolerance.is_finite() && s.tolerance > 0.0,
            "sarima.tolerance must be positive"
        );

        let d = &self.decomposition;
        ensure!(
            d.min_observations >= 2,
            "decomposition.min_observations must be at least 2"
        );
        ensure!(
            d.changepoint_range > 0.0 && d.changepoint_range <= 1.0,
            "decomposition.changepoint_range must be in (0, 1]"
        );
        for (name, v) in [
            ("changepoint_prior_scale", d.changepoint_prior_scale),
            ("seasonality_prior_scale", d.seasonality_prior_scale),
            ("event_prior_scale", d.event_prior_scale),
            ("observation_noise", d.observation_noise),
        ] {
            ensure!(v.is_finite() && v > 0.0, "decomposition.{name} must be positive");
        }
        ensure!(
            d.yearly_order <= MAX_FOURIER_ORDER && d.weekly_order <= MAX_FOURIER_ORDER,
            "decomposition Fourier orders must be at most {MAX_FOURIER_ORDER}"
        );
        for e in &d.events {
            ensure!(!e.name.trim().is_empty(), "decomposition event name cannot be empty");
            ensure!(!e.dates.is_empty(), "decomposition event {:?} has no dates", e.name);
            ensure!(
                e.lower_window <= 0 && e.upper_window >= 0,
                "decomposition event {:?}: lower_window must be <= 0 and upper_window >= 0",
                e.name
            );
        }
        Ok(())
    }

    /// Apply `PRICE_FORECAST_ARTIFACTS` on top of the file.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Some(dir) = get_env_var_opt(ARTIFACTS_DIR_ENV)? {
            self.artifacts_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Database URL from the file, else `$DATABASE_URL`.
    pub fn resolve_database_url(&self) -> anyhow::Result<String> {
        match &self.database_url {
            Some(url) => Ok(url.trim().to_string()),
            None => get_env_var(DATABASE_URL_ENV)
                .context("no database_url in config and DATABASE_URL is not usable"),
        }
    }

    /// Model selection and parameters.
    pub fn models_config(&self) -> ModelsConfig {
        ModelsConfig {
            enabled: self.models.clone(),
            arima: self.arima.clone(),
            sarima: self.sarima.clone(),
            decomposition: self.decomposition.clone(),
        }
    }

    /// Loader settings.
    pub fn load_options(&self) -> anyhow::Result<LoadOptions> {
        let exchange_tz = parse_tz(&self.exchange_timezone)
            .with_context(|| format!("unknown exchange_timezone: {}", self.exchange_timezone))?;
        Ok(LoadOptions {
            duplicates: self.duplicate_dates,
            exchange_tz,
        })
    }

    /// Orchestrator settings.
    pub fn pipeline_options(&self) -> anyhow::Result<PipelineOptions> {
        Ok(PipelineOptions {
            horizon: self.horizon,
            workers: self.workers,
            load: self.load_options()?,
        })
    }
}

/// Parse and validate configuration from TOML text.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<Config> {
    let cfg: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
    cfg.validate()?;
    Ok(cfg)
}

/// Read, parse and validate a configuration file.
pub fn load_config_path(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text).with_context(|| format!("in config file {}", path.as_ref().display()))
}
