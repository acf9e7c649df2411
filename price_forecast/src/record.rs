//! Forecast records: a model's horizon-length output aligned to calendar dates.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;

use crate::forecast::ModelError;
use crate::series::{PriceSeries, Symbol};

/// Identity of a forecasting model.
///
/// `id` keys artifacts and configuration (`"arima"`); `label` is the human-facing
/// name used in CSV headers and chart legends (`"ARIMA"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModelTag {
    /// Stable machine id.
    pub id: &'static str,
    /// Display label.
    pub label: &'static str,
}

impl ModelTag {
    /// Convenience constructor.
    pub const fn new(id: &'static str, label: &'static str) -> Self {
        Self { id, label }
    }
}

/// One forecast value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    /// Calendar day being forecast.
    pub date: NaiveDate,
    /// Predicted close.
    pub value: f64,
}

/// Horizon-length forecast produced by one model for one symbol.
///
/// Dates are the consecutive calendar days right after the source series, so a
/// record never overlaps its input and has no gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    symbol: Symbol,
    model: ModelTag,
    points: Vec<ForecastPoint>,
}

impl ForecastRecord {
    /// Stamp `values` onto the calendar days following `series`.
    ///
    /// Fails with [`ModelError::NonFinite`] on NaN/inf values and with
    /// [`ModelError::HorizonMismatch`] if the calendar cannot supply enough days.
    pub fn aligned(
        series: &PriceSeries,
        model: ModelTag,
        values: Vec<f64>,
    ) -> Result<Self, ModelError> {
        if let Some(step) = values.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite { step });
        }
        let dates = series.forecast_dates(values.len());
        if dates.len() != values.len() {
            return Err(ModelError::HorizonMismatch {
                expected: values.len(),
                actual: dates.len(),
            });
        }
        let points = dates
            .into_iter()
            .zip(values)
            .map(|(date, value)| ForecastPoint { date, value })
            .collect();
        Ok(Self {
            symbol: series.symbol().clone(),
            model,
            points,
        })
    }

    /// Symbol the forecast belongs to.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Producing model.
    pub fn model(&self) -> ModelTag {
        self.model
    }

    /// Forecast points in date order.
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Number of forecast days.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` for a horizon-0 forecast. Still a successful forecast.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Final forecast point, if any.
    pub fn last(&self) -> Option<&ForecastPoint> {
        self.points.last()
    }
}

/// A model that produced no forecast for a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFailure {
    /// Failing model.
    pub model: ModelTag,
    /// Why it failed.
    pub error: ModelError,
}

/// Everything one symbol's run produced: its series, every successful forecast keyed by
/// model id (configured order), and the models that failed.
#[derive(Debug, Clone)]
pub struct SymbolRun {
    /// Input series.
    pub series: PriceSeries,
    /// Requested horizon.
    pub horizon: usize,
    /// Successful forecasts keyed by model id.
    pub forecasts: IndexMap<String, ForecastRecord>,
    /// Failed models, in configured order.
    pub failures: Vec<ModelFailure>,
}

impl SymbolRun {
    /// Empty run for `series`.
    pub fn new(series: PriceSeries, horizon: usize) -> Self {
        Self {
            series,
            horizon,
            forecasts: IndexMap::new(),
            failures: Vec::new(),
        }
    }

    /// Record one model's outcome.
    pub fn push(&mut self, model: ModelTag, outcome: Result<ForecastRecord, ModelError>) {
        match outcome {
            Ok(record) => {
                self.forecasts.insert(model.id.to_string(), record);
            }
            Err(error) => self.failures.push(ModelFailure { model, error }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PricePoint;

    const TAG: ModelTag = ModelTag::new("test", "Test");

    fn series() -> PriceSeries {
        let d = NaiveDate::from_ymd_opt(2023, 12, 30).unwrap();
        PriceSeries::new(
            Symbol::parse("ABC").unwrap(),
            vec![PricePoint::new(d, 1.0), PricePoint::new(d.succ_opt().unwrap(), 2.0)],
        )
        .unwrap()
    }

    #[test]
    fn aligns_across_year_end() {
        let rec = ForecastRecord::aligned(&series(), TAG, vec![3.0, 4.0]).unwrap();
        let dates: Vec<_> = rec.points().iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, ["2024-01-01", "2024-01-02"]);
        assert_eq!(rec.symbol().as_str(), "ABC");
    }

    #[test]
    fn empty_forecast_is_valid() {
        let rec = ForecastRecord::aligned(&series(), TAG, vec![]).unwrap();
        assert!(rec.is_empty());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = ForecastRecord::aligned(&series(), TAG, vec![1.0, f64::NAN]).unwrap_err();
        assert_eq!(err, ModelError::NonFinite { step: 1 });
    }
}
