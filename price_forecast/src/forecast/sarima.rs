//! Seasonal autoregressive model: SARIMA(1,1,1)(1,1,1)ₛ.
//!
//! The series is transformed by `(1−B)(1−Bˢ)` and the result `w` is treated as the
//! multiplicative ARMA process
//!
//! ```text
//! (1 − φB)(1 − ΦBˢ) w_t = (1 + θB)(1 + ΘBˢ) e_t
//! ```
//!
//! `φ, θ, Φ, Θ` minimise the conditional sum of squares of `e`, with residuals before
//! the first fully-lagged observation fixed at zero. Stationarity and invertibility
//! are not imposed; the simplex avoids parameter regions whose residuals overflow.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::optimize::NelderMead;
use super::{ForecastModel, ModelError, is_constant, require_len};
use crate::record::{ForecastRecord, ModelTag};
use crate::series::PriceSeries;

/// Model id.
pub const ID: &str = "sarima";
const TAG: ModelTag = ModelTag::new(ID, "SARIMA");

// (p, d, q) and (P, D, Q) are fixed at one each.
const ORDER: usize = 1;
const EXTRA_OBSERVATIONS: usize = 10;

/// `[sarima]` settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SarimaConfig {
    /// Season length `s` in observations.
    pub seasonal_period: usize,
    /// Simplex iteration budget.
    pub max_iterations: usize,
    /// Relative tolerance on the objective.
    pub tolerance: f64,
    /// Fresh simplexes started from the best point before giving up.
    pub restarts: usize,
}

impl Default for SarimaConfig {
    fn default() -> Self {
        Self {
            seasonal_period: 12,
            max_iterations: 5000,
            tolerance: 1e-8,
            restarts: 2,
        }
    }
}

/// Fitted coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    phi: f64,
    theta: f64,
    seasonal_phi: f64,
    seasonal_theta: f64,
}

impl Coefficients {
    fn from_slice(x: &[f64]) -> Self {
        Self {
            phi: x[0],
            theta: x[1],
            seasonal_phi: x[2],
            seasonal_theta: x[3],
        }
    }

    /// One step of the ARMA recursion at `t`, excluding the current shock.
    fn predict(&self, w: &[f64], e: &[f64], t: usize, s: usize) -> f64 {
        self.phi * w[t - 1] + self.seasonal_phi * w[t - s]
            - self.phi * self.seasonal_phi * w[t - s - 1]
            + self.theta * e[t - 1]
            + self.seasonal_theta * e[t - s]
            + self.theta * self.seasonal_theta * e[t - s - 1]
    }
}

/// SARIMA(1,1,1)(1,1,1)ₛ forecaster.
#[derive(Debug, Clone, Default)]
pub struct SarimaModel {
    cfg: SarimaConfig,
}

impl SarimaModel {
    /// Build from settings.
    pub fn new(cfg: SarimaConfig) -> Self {
        Self { cfg }
    }
}

impl ForecastModel for SarimaModel {
    fn tag(&self) -> ModelTag {
        TAG
    }

    fn min_observations(&self) -> usize {
        let s = self.cfg.seasonal_period;
        // d + D·s + (p + P·s) + (q + Q·s)
        ORDER + ORDER * s + 2 * (ORDER + ORDER * s) + EXTRA_OBSERVATIONS
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize) -> Result<ForecastRecord, ModelError> {
        require_len(series, self.min_observations())?;
        let closes = series.closes();
        if is_constant(&closes) {
            return Err(ModelError::ConstantSeries);
        }
        let s = self.cfg.seasonal_period;
        let delta = differencing_polynomial(s);
        let w = apply_polynomial(&closes, &delta);

        let optimizer = NelderMead {
            max_iterations: self.cfg.max_iterations,
            tolerance: self.cfg.tolerance,
            restarts: self.cfg.restarts,
            ..NelderMead::default()
        };
        let fit = optimizer.minimize(|x| css(&w, s, &Coefficients::from_slice(x)).0, &[0.0; 4]);
        if !fit.converged {
            return Err(ModelError::NonConvergence {
                iterations: fit.iterations,
            });
        }
        if !fit.value.is_finite() {
            return Err(ModelError::Rejected(
                "residual recursion diverged for every parameter tried".into(),
            ));
        }
        let coef = Coefficients::from_slice(&fit.point);
        debug!(
            symbol = %series.symbol(),
            iterations = fit.iterations,
            css = fit.value,
            ?coef,
            "sarima fitted"
        );

        let (_, mut e) = css(&w, s, &coef);
        let mut w = w;
        let mut y = closes;
        let mut values = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let t = w.len();
            let next_w = coef.predict(&w, &e, t, s);
            w.push(next_w);
            e.push(0.0);
            let next_y = next_w
                - delta
                    .iter()
                    .enumerate()
                    .skip(1)
                    .map(|(k, dk)| dk * y[y.len() - k])
                    .sum::<f64>();
            y.push(next_y);
            values.push(next_y);
        }
        ForecastRecord::aligned(series, TAG, values)
    }
}

/// Coefficients of `(1−B)(1−Bˢ)`, index `k` multiplies `B^k`.
fn differencing_polynomial(s: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for factor in [(1usize, ORDER), (s, ORDER)] {
        let (lag, times) = factor;
        for _ in 0..times {
            let mut next = vec![0.0; poly.len() + lag];
            for (k, c) in poly.iter().enumerate() {
                next[k] += c;
                next[k + lag] -= c;
            }
            poly = next;
        }
    }
    poly
}

/// `w_t = Σ δ_k y_{t−k}` for every `t` with a full window.
fn apply_polynomial(y: &[f64], delta: &[f64]) -> Vec<f64> {
    let lag = delta.len() - 1;
    (lag..y.len())
        .map(|t| delta.iter().enumerate().map(|(k, dk)| dk * y[t - k]).sum())
        .collect()
}

/// Mean squared residual and the residual series. Non-finite sums score `+∞`.
fn css(w: &[f64], s: usize, coef: &Coefficients) -> (f64, Vec<f64>) {
    let start = s + 1;
    let mut e = vec![0.0; w.len()];
    let mut sum = 0.0;
    for t in start..w.len() {
        e[t] = w[t] - coef.predict(w, &e, t, s);
        sum += e[t] * e[t];
    }
    let count = w.len().saturating_sub(start).max(1) as f64;
    let mean = sum / count;
    (if mean.is_finite() { mean } else { f64::INFINITY }, e)
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
        PriceSeries::new(Symbol::parse("SEA").unwrap(), points).unwrap()
    }

    fn seasonal_closes(n: usize) -> Vec<f64> {
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        (0..n)
            .map(|t| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let noise = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
                let season = (2.0 * std::f64::consts::PI * t as f64 / 12.0).sin();
                100.0 + 0.1 * t as f64 + 5.0 * season + 0.5 * noise
            })
            .collect()
    }

    #[test]
    fn polynomial_expansion() {
        assert_eq!(
            differencing_polynomial(4),
            vec![1.0, -1.0, 0.0, 0.0, -1.0, 1.0]
        );
    }

    #[test]
    fn minimum_observations() {
        let model = SarimaModel::default();
        assert_eq!(model.min_observations(), 49);
        let closes = seasonal_closes(48);
        assert_eq!(
            model.forecast(&series(&closes), 30),
            Err(ModelError::InsufficientData {
                required: 49,
                actual: 48
            })
        );
    }

    #[test]
    fn seasonal_series_forecasts_full_horizon() {
        let closes = seasonal_closes(240);
        let rec = SarimaModel::default()
            .forecast(&series(&closes), 30)
            .unwrap();
        assert_eq!(rec.len(), 30);
        for p in rec.points() {
            assert!(p.value > 100.0 && p.value < 150.0, "{}", p.value);
        }
    }

    #[test]
    fn linear_series_continues_linearly() {
        let closes: Vec<f64> = (0..100).map(|i| 20.0 + 0.25 * i as f64).collect();
        let rec = SarimaModel::default()
            .forecast(&series(&closes), 5)
            .unwrap();
        for (h, p) in rec.points().iter().enumerate() {
            let expected = 20.0 + 0.25 * (100 + h) as f64;
            assert!((p.value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn exhausted_budget_is_non_convergence() {
        let model = SarimaModel::new(SarimaConfig {
            max_iterations: 1,
            restarts: 0,
            ..SarimaConfig::default()
        });
        let err = model.forecast(&series(&seasonal_closes(120)), 30).unwrap_err();
        assert_eq!(err, ModelError::NonConvergence { iterations: 1 });
    }

    #[test]
    fn restarts_share_the_reported_iteration_count() {
        let model = SarimaModel::new(SarimaConfig {
            max_iterations: 1,
            restarts: 2,
            ..SarimaConfig::default()
        });
        let err = model.forecast(&series(&seasonal_closes(120)), 30).unwrap_err();
        assert_eq!(err, ModelError::NonConvergence { iterations: 3 });
    }

    #[test]
    fn explosive_parameters_score_infinite() {
        let w: Vec<f64> = (0..2000).map(|t| ((t % 7) as f64) - 3.0).collect();
        let coef = Coefficients {
            phi: 0.0,
            theta: 50.0,
            seasonal_phi: 0.0,
            seasonal_theta: 0.0,
        };
        assert_eq!(css(&w, 12, &coef).0, f64::INFINITY);
    }
}
