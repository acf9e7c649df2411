//! Additive decomposition model: piecewise-linear trend + Fourier seasonality + events.
//!
//! `y(t) = trend(t) + yearly(t) + weekly(t) + Σ events(t)`
//!
//! - Trend: intercept and slope on time scaled to `[0, 1]` over the history, plus
//!   hinge terms `(t − s_j)₊` at changepoints spread over the first
//!   `changepoint_range` of the history.
//! - Seasonality: Fourier series with periods 365.25 and 7 days, evaluated on days
//!   since the Unix epoch. Yearly terms need two years of history, weekly two weeks.
//! - Events: one indicator per configured event, active on each event date widened by
//!   its lower/upper window.
//!
//! Prices are scaled by their absolute maximum and all coefficients are estimated in
//! one ridge solve, i.e. the MAP estimate under zero-mean Gaussian priors with
//! `observation_noise` likelihood. The intercept and slope carry no prior.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{ForecastModel, ModelError, require_len, solve_penalized};
use crate::record::{ForecastRecord, ModelTag};
use crate::series::PriceSeries;

/// Model id.
pub const ID: &str = "decomposition";
const TAG: ModelTag = ModelTag::new(ID, "Decomposition");

const YEAR_DAYS: f64 = 365.25;
const WEEK_DAYS: f64 = 7.0;
/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;
const YEARLY_MIN_SPAN_DAYS: i64 = 730;
const WEEKLY_MIN_SPAN_DAYS: i64 = 14;
/// Keeps the normal equations positive definite when a column is all zero.
const JITTER: f64 = 1e-9;

/// A holiday-like event with a day window around each occurrence.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    /// Event name.
    pub name: String,
    /// Occurrences (past and future).
    pub dates: Vec<NaiveDate>,
    /// Days before each occurrence that are also affected (`<= 0`).
    #[serde(default)]
    pub lower_window: i64,
    /// Days after each occurrence that are also affected (`>= 0`).
    #[serde(default)]
    pub upper_window: i64,
}

impl EventConfig {
    fn active_on(&self, day: NaiveDate) -> bool {
        self.dates.iter().any(|d| {
            let offset = (day - *d).num_days();
            offset >= self.lower_window && offset <= self.upper_window
        })
    }
}

/// `[decomposition]` settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecompositionConfig {
    /// Shortest history accepted (at least 2).
    pub min_observations: usize,
    /// Number of potential trend changepoints.
    pub changepoints: usize,
    /// Share of the history in which changepoints are placed.
    pub changepoint_range: f64,
    /// Prior scale of changepoint rate adjustments.
    pub changepoint_prior_scale: f64,
    /// Prior scale of Fourier coefficients.
    pub seasonality_prior_scale: f64,
    /// Prior scale of event effects.
    pub event_prior_scale: f64,
    /// Observation noise on the scaled series.
    pub observation_noise: f64,
    /// Yearly Fourier order (0 disables).
    pub yearly_order: usize,
    /// Weekly Fourier order (0 disables).
    pub weekly_order: usize,
    /// Event regressors.
    pub events: Vec<EventConfig>,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            min_observations: 10,
            changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            event_prior_scale: 10.0,
            observation_noise: 0.1,
            yearly_order: 10,
            weekly_order: 3,
            events: Vec::new(),
        }
    }
}

/// Fitted components over history followed by the forecast window, in price units.
#[derive(Debug, Clone, PartialEq)]
pub struct DecompositionFit {
    /// Dates covered: every input date, then the forecast days.
    pub dates: Vec<NaiveDate>,
    /// Piecewise-linear trend.
    pub trend: Vec<f64>,
    /// Yearly plus weekly seasonality.
    pub seasonal: Vec<f64>,
    /// Sum of event effects.
    pub events: Vec<f64>,
    /// Number of leading entries that belong to the history.
    pub history_len: usize,
}

impl DecompositionFit {
    /// Component sum at index `i`.
    pub fn total(&self, i: usize) -> f64 {
        self.trend[i] + self.seasonal[i] + self.events[i]
    }

    /// Forecast values (the entries after the history).
    pub fn forecast_values(&self) -> Vec<f64> {
        (self.history_len..self.dates.len())
            .map(|i| self.total(i))
            .collect()
    }
}

/// Column groups of the design matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Group {
    Base,
    Changepoint,
    Seasonal,
    Event,
}

struct Design {
    start: NaiveDate,
    span: f64,
    changepoints: Vec<f64>,
    yearly_order: usize,
    weekly_order: usize,
    groups: Vec<Group>,
}

impl Design {
    fn new(cfg: &DecompositionConfig, series: &PriceSeries) -> Self {
        let start = series.first_date();
        let span_days = series.span_days();
        let span = span_days as f64;
        let t: Vec<f64> = series
            .dates()
            .iter()
            .map(|d| (*d - start).num_days() as f64 / span)
            .collect();

        let history = ((t.len() as f64) * cfg.changepoint_range).floor() as usize;
        let count = cfg.changepoints.min(history.saturating_sub(1));
        let changepoints: Vec<f64> = (1..=count)
            .map(|j| {
                let idx = (j as f64 * (history - 1) as f64 / count as f64).round() as usize;
                t[idx]
            })
            .collect();

        let yearly_order = if span_days >= YEARLY_MIN_SPAN_DAYS {
            cfg.yearly_order
        } else {
            0
        };
        let weekly_order = if span_days >= WEEKLY_MIN_SPAN_DAYS {
            cfg.weekly_order
        } else {
            0
        };

        let mut groups = vec![Group::Base, Group::Base];
        groups.extend(std::iter::repeat_n(Group::Changepoint, changepoints.len()));
        groups.extend(std::iter::repeat_n(
            Group::Seasonal,
            2 * (yearly_order + weekly_order),
        ));
        groups.extend(std::iter::repeat_n(Group::Event, cfg.events.len()));

        Self {
            start,
            span,
            changepoints,
            yearly_order,
            weekly_order,
            groups,
        }
    }

    fn row(&self, cfg: &DecompositionConfig, day: NaiveDate) -> Vec<f64> {
        let t = (day - self.start).num_days() as f64 / self.span;
        let mut row = Vec::with_capacity(self.groups.len());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|s| (t - s).max(0.0)));

        let epoch_days = f64::from(day.num_days_from_ce() - UNIX_EPOCH_FROM_CE);
        for (order, period) in [(self.yearly_order, YEAR_DAYS), (self.weekly_order, WEEK_DAYS)] {
            for k in 1..=order {
                let x = 2.0 * PI * k as f64 * epoch_days / period;
                row.push(x.sin());
                row.push(x.cos());
            }
        }
        row.extend(
            cfg.events
                .iter()
                .map(|e| if e.active_on(day) { 1.0 } else { 0.0 }),
        );
        row
    }

    fn penalty(&self, cfg: &DecompositionConfig) -> Vec<f64> {
        let noise = cfg.observation_noise * cfg.observation_noise;
        let ridge = |scale: f64| noise / (scale * scale) + JITTER;
        self.groups
            .iter()
            .map(|g| match g {
                Group::Base => JITTER,
                Group::Changepoint => ridge(cfg.changepoint_prior_scale),
                Group::Seasonal => ridge(cfg.seasonality_prior_scale),
                Group::Event => ridge(cfg.event_prior_scale),
            })
            .collect()
    }
}

/// Additive decomposition forecaster.
#[derive(Debug, Clone, Default)]
pub struct DecompositionModel {
    cfg: DecompositionConfig,
}

impl DecompositionModel {
    /// Build from settings.
    pub fn new(cfg: DecompositionConfig) -> Self {
        Self { cfg }
    }

    /// Fit the model and evaluate every component over history plus `horizon` days.
    pub fn fit(&self, series: &PriceSeries, horizon: usize) -> Result<DecompositionFit, ModelError> {
        if series.len() < 2 || series.span_days() <= 0 {
            return Err(ModelError::DegenerateDateSpan);
        }
        require_len(series, self.cfg.min_observations.max(2))?;

        let design = Design::new(&self.cfg, series);
        let closes = series.closes();
        let scale = closes.iter().fold(0.0f64, |m, c| m.max(c.abs()));

        let mut dates = series.dates();
        let history_len = dates.len();
        dates.extend(series.forecast_dates(horizon));

        let rows: Vec<Vec<f64>> = dates.iter().map(|d| design.row(&self.cfg, *d)).collect();
        let cols = design.groups.len();
        let x = DMatrix::from_fn(history_len, cols, |r, c| rows[r][c]);
        let y = DVector::from_fn(history_len, |r, _| closes[r] / scale);
        let beta = solve_penalized(&x, &y, &design.penalty(&self.cfg))?;

        let component = |row: &[f64], want: &[Group]| -> f64 {
            row.iter()
                .zip(&design.groups)
                .zip(beta.iter())
                .filter(|((_, g), _)| want.contains(*g))
                .map(|((v, _), b)| v * b)
                .sum::<f64>()
                * scale
        };
        Ok(DecompositionFit {
            trend: rows
                .iter()
                .map(|r| component(r, &[Group::Base, Group::Changepoint]))
                .collect(),
            seasonal: rows.iter().map(|r| component(r, &[Group::Seasonal])).collect(),
            events: rows.iter().map(|r| component(r, &[Group::Event])).collect(),
            dates,
            history_len,
        })
    }
}

impl ForecastModel for DecompositionModel {
    fn tag(&self) -> ModelTag {
        TAG
    }

    fn min_observations(&self) -> usize {
        self.cfg.min_observations.max(2)
    }

    fn forecast(&self, series: &PriceSeries, horizon: usize) -> Result<ForecastRecord, ModelError> {
        let fit = self.fit(series, horizon)?;
        ForecastRecord::aligned(series, TAG, fit.forecast_values())
    }
}
