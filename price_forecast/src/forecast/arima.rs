//! Trend autoregressive model: ARIMA(p, d, 0) with drift.
//!
//! The series is differenced `d` times. The differenced values are modelled as a
//! constant drift `μ` (their mean) plus an AR(p) process on the centred values, whose
//! coefficients come from conditional least squares. Forecasts run the AR recursion
//! with future shocks at zero, add the drift back and integrate through every
//! differencing level.
//!
//! An exactly linear price path has a constant first difference, so the centred series
//! has no variance left to explain. The AR part is then zero and the forecast is the
//! straight-line continuation.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ForecastModel, ModelError, is_constant, require_len, solve_penalized};
use crate::record::{ForecastRecord, ModelTag};
use crate::series::PriceSeries;

/// Model id.
pub const ID: &str = "arima";
const TAG: ModelTag = ModelTag::new(ID, "ARIMA");

/// Observations required beyond `p + d`.
const EXTRA_OBSERVATIONS: usize = 10;

/// Relative variance below which the differenced series counts as pure drift.
const DRIFT_ONLY_VARIANCE: f64 = 1e-12;

/// `[arima]` settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArimaConfig {
    /// AR order `p`.
    pub lag_order: usize,
    /// Differencing order `d` (1 or 2).
    pub differencing: usize,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            lag_order: 5,
            differencing: 1,
        }
    }
}

/// ARIMA(p, d, 0) forecaster.
#[derive(Debug, Clone, Default)]
pub struct ArimaModel {
    cfg: ArimaConfig,
}

impl ArimaModel {
    /// Build from settings.
    pub fn new(cfg: ArimaConfig) -> Self {
        Self { cfg }
    }
}

impl ForecastModel for ArimaModel {
    fn tag(&self) -> ModelTag {
        TAG
    }

    fn min_observations(&self) -> usize {
        self.cfg.lag_order + self.cfg.differencing + EXTRA_OBSERVATIONS
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize) -> Result<ForecastRecord, ModelError> {
        require_len(series, self.min_observations())?;
        let closes = series.closes();
        if is_constant(&closes) {
            return Err(ModelError::ConstantSeries);
        }

        let (diffed, mut anchors) = difference(&closes, self.cfg.differencing);
        let p = self.cfg.lag_order;
        let mu = mean(&diffed);
        let centred: Vec<f64> = diffed.iter().map(|w| w - mu).collect();

        let variance = mean_sq(&centred);
        let phi = if variance <= DRIFT_ONLY_VARIANCE * mean_sq(&diffed) {
            debug!(symbol = %series.symbol(), "differenced series is pure drift");
            vec![0.0; p]
        } else {
            fit_ar(&centred, p)?
        };

        let mut history = centred;
        let mut values = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let z: f64 = phi
                .iter()
                .enumerate()
                .map(|(i, c)| c * history[history.len() - 1 - i])
                .sum();
            history.push(z);
            values.push(integrate(z + mu, &mut anchors));
        }
        ForecastRecord::aligned(series, TAG, values)
    }
}

/// Difference `d` times; returns the result and the last value of every level
/// (index 0 is the original series).
fn difference(values: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut anchors = Vec::with_capacity(d);
    let mut current = values.to_vec();
    for _ in 0..d {
        anchors.push(current[current.len() - 1]);
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (current, anchors)
}

/// Undo the differencing for one new value, advancing the anchors.
fn integrate(mut v: f64, anchors: &mut [f64]) -> f64 {
    for k in (0..anchors.len()).rev() {
        v += anchors[k];
        anchors[k] = v;
    }
    v
}

/// Least-squares AR(p) coefficients for a zero-mean series.
fn fit_ar(z: &[f64], p: usize) -> Result<Vec<f64>, ModelError> {
    if p == 0 {
        return Ok(Vec::new());
    }
    let rows = z.len() - p;
    let x = DMatrix::from_fn(rows, p, |r, c| z[p + r - 1 - c]);
    let y = DVector::from_fn(rows, |r, _| z[p + r]);
    let phi = solve_penalized(&x, &y, &vec![0.0; p])?;
    Ok(phi.iter().copied().collect())
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

fn mean_sq(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>() / v.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{PricePoint, Symbol};
    use chrono::{Days, NaiveDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(start + Days::new(i as u64), *c))
            .collect();
        PriceSeries::new(Symbol::parse("ABC").unwrap(), points).unwrap()
    }

    #[test]
    fn linear_path_continues_linearly() {
        let closes: Vec<f64> = (0..400).map(|i| 100.0 + 0.5 * i as f64).collect();
        let rec = ArimaModel::default().forecast(&series(&closes), 30).unwrap();
        assert_eq!(rec.len(), 30);
        for (h, p) in rec.points().iter().enumerate() {
            let expected = 100.0 + 0.5 * (400 + h) as f64;
            assert!((p.value - expected).abs() < 1e-6, "{h}: {}", p.value);
        }
        assert_eq!(rec.points()[0].date.to_string(), "2021-02-04");
    }

    #[test]
    fn short_and_constant_series_fail() {
        let model = ArimaModel::default();
        assert_eq!(model.min_observations(), 16);
        assert_eq!(
            model.forecast(&series(&[1.0, 2.0, 3.0]), 30),
            Err(ModelError::InsufficientData {
                required: 16,
                actual: 3
            })
        );
        assert_eq!(
            model.forecast(&series(&[5.0; 40]), 30),
            Err(ModelError::ConstantSeries)
        );
    }

    #[test]
    fn recovers_ar1_dynamics() {
        // differences follow w_t = 0.6 w_{t-1} + shock, xorshift shocks
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut shock = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        };
        let mut w = vec![0.0f64];
        for t in 1..300 {
            w.push(0.6 * w[t - 1] + shock());
        }
        let mut closes = vec![100.0];
        for dw in &w[1..] {
            closes.push(closes[closes.len() - 1] + dw);
        }
        let cfg = ArimaConfig {
            lag_order: 1,
            differencing: 1,
        };
        let (diffed, _) = difference(&closes, 1);
        let mu = mean(&diffed);
        let centred: Vec<f64> = diffed.iter().map(|v| v - mu).collect();
        let phi = fit_ar(&centred, cfg.lag_order).unwrap();
        assert!((phi[0] - 0.6).abs() < 0.15, "phi = {}", phi[0]);

        let rec = ArimaModel::new(cfg).forecast(&series(&closes), 10).unwrap();
        assert!(rec.points().iter().all(|p| p.value.is_finite()));
    }

    #[test]
    fn second_order_differencing_round_trips() {
        let closes: Vec<f64> = (0..50).map(|i| 10.0 + (i * i) as f64 * 0.01).collect();
        let (diffed, mut anchors) = difference(&closes, 2);
        assert_eq!(diffed.len(), 48);
        // next second difference of a quadratic is the same constant
        let next = integrate(diffed[0], &mut anchors);
        assert!((next - (10.0 + 2500.0 * 0.01)).abs() < 1e-9);
    }

    #[test]
    fn horizon_zero_is_empty_success() {
        let closes: Vec<f64> = (0..40).map(|i| 10.0 + (i % 5) as f64).collect();
        let rec = ArimaModel::default().forecast(&series(&closes), 0).unwrap();
        assert!(rec.is_empty());
    }
}
