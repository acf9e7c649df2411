//! Forecasting models.
//!
//! Every strategy implements [`ForecastModel`]: it consumes a validated
//! [`PriceSeries`] and returns either a horizon-length [`ForecastRecord`] or a
//! [`ModelError`]. An `Ok` record with zero points (horizon 0) is a successful empty
//! forecast; every failure is an `Err`, so callers never confuse the two.
//!
//! Built-in strategies:
//! - [`arima::ArimaModel`]: ARIMA(p, d, 0) with drift, least-squares AR fit.
//! - [`sarima::SarimaModel`]: SARIMA(1,1,1)(1,1,1)ₛ fitted by conditional sum of squares.
//! - [`decomposition::DecompositionModel`]: additive trend + seasonality + events.

pub mod arima;
pub mod decomposition;
pub mod optimize;
pub mod sarima;

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::record::{ForecastRecord, ModelTag};
use crate::series::PriceSeries;

use self::arima::{ArimaConfig, ArimaModel};
use self::decomposition::{DecompositionConfig, DecompositionModel};
use self::sarima::{SarimaConfig, SarimaModel};

/// Why a model produced no forecast.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// Fewer observations than the model needs.
    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Minimum required.
        required: usize,
        /// Observations available.
        actual: usize,
    },
    /// Every close is the same.
    #[error("series is constant")]
    ConstantSeries,
    /// First and last dates coincide (or only one point).
    #[error("series does not span more than one date")]
    DegenerateDateSpan,
    /// Normal equations could not be factorised.
    #[error("normal equations are singular")]
    SingularSystem,
    /// Optimiser ran out of iterations.
    #[error("optimizer did not converge within {iterations} iterations")]
    NonConvergence {
        /// Iterations spent.
        iterations: usize,
    },
    /// A forecast value was NaN or infinite.
    #[error("forecast produced a non-finite value at step {step}")]
    NonFinite {
        /// Zero-based horizon step.
        step: usize,
    },
    /// Output length disagrees with the requested horizon.
    #[error("expected {expected} forecast points, got {actual}")]
    HorizonMismatch {
        /// Requested horizon.
        expected: usize,
        /// Points produced.
        actual: usize,
    },
    /// Any other model-specific refusal.
    #[error("{0}")]
    Rejected(String),
}

/// A pluggable forecasting strategy.
pub trait ForecastModel: Send + Sync {
    /// Model identity used for artifacts and reports.
    fn tag(&self) -> ModelTag;

    /// Shortest series the model accepts.
    fn min_observations(&self) -> usize;

    /// Forecast `horizon` calendar days past the end of `series`.
    fn forecast(&self, series: &PriceSeries, horizon: usize) -> Result<ForecastRecord, ModelError>;
}

/// Ids accepted in the `models` list, in default order.
pub const BUILTIN_MODELS: [&str; 3] = [arima::ID, sarima::ID, decomposition::ID];

/// Model id not known to [`build_models`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown model id {0:?} (expected one of: arima, sarima, decomposition)")]
pub struct UnknownModel(pub String);

/// Which models to run and how each is parameterised.
#[derive(Debug, Clone, Default)]
pub struct ModelsConfig {
    /// Model ids in run order; empty means [`BUILTIN_MODELS`].
    pub enabled: Vec<String>,
    /// Trend autoregressive model.
    pub arima: ArimaConfig,
    /// Seasonal autoregressive model.
    pub sarima: SarimaConfig,
    /// Decomposition model.
    pub decomposition: DecompositionConfig,
}

/// Instantiate the enabled models in configured order.
pub fn build_models(cfg: &ModelsConfig) -> Result<Vec<Box<dyn ForecastModel>>, UnknownModel> {
    let ids: Vec<&str> = if cfg.enabled.is_empty() {
        BUILTIN_MODELS.to_vec()
    } else {
        cfg.enabled.iter().map(String::as_str).collect()
    };
    ids.into_iter()
        .map(|id| -> Result<Box<dyn ForecastModel>, UnknownModel> {
            match id.trim() {
                arima::ID => Ok(Box::new(ArimaModel::new(cfg.arima.clone()))),
                sarima::ID => Ok(Box::new(SarimaModel::new(cfg.sarima.clone()))),
                decomposition::ID => Ok(Box::new(DecompositionModel::new(
                    cfg.decomposition.clone(),
                ))),
                other => Err(UnknownModel(other.to_string())),
            }
        })
        .collect()
}

fn require_len(series: &PriceSeries, required: usize) -> Result<(), ModelError> {
    if series.len() < required {
        return Err(ModelError::InsufficientData {
            required,
            actual: series.len(),
        });
    }
    Ok(())
}

fn is_constant(values: &[f64]) -> bool {
    let first = values[0];
    let tol = f64::EPSILON * first.abs().max(1.0);
    values.iter().all(|v| (v - first).abs() <= tol)
}

/// Solve `(XᵀX + diag(penalty)) β = Xᵀy` by Cholesky factorisation.
fn solve_penalized(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    penalty: &[f64],
) -> Result<DVector<f64>, ModelError> {
    let xt = x.transpose();
    let mut gram = &xt * x;
    for (j, p) in penalty.iter().enumerate() {
        gram[(j, j)] += p;
    }
    let rhs = &xt * y;
    let chol = gram.cholesky().ok_or(ModelError::SingularSystem)?;
    let beta = chol.solve(&rhs);
    if beta.iter().any(|b| !b.is_finite()) {
        return Err(ModelError::SingularSystem);
    }
    Ok(beta)
}
