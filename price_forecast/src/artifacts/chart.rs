//! Visualization composer: actual series plus every available forecast on one chart.
//!
//! The chart is a plotly.js figure serialised to JSON and embedded in a standalone
//! HTML page. Missing forecasts simply contribute no trace, so a symbol whose models
//! all failed still gets an actual-price-only chart.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;

use crate::record::SymbolRun;
use crate::series::Symbol;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// One line on the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Legend entry.
    pub name: String,
    /// Dates.
    pub x: Vec<NaiveDate>,
    /// Values.
    pub y: Vec<f64>,
    /// Plotly draw mode.
    pub mode: &'static str,
    /// Plotly trace type.
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Trace {
    fn line(name: impl Into<String>, x: Vec<NaiveDate>, y: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            mode: "lines",
            kind: "scatter",
        }
    }
}

/// Comparative chart for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Symbol charted.
    pub symbol: Symbol,
    /// Figure title.
    pub title: String,
    /// X axis title.
    pub x_title: &'static str,
    /// Y axis title.
    pub y_title: &'static str,
    /// `Actual` first, then one trace per forecast in model order.
    pub traces: Vec<Trace>,
}

/// Build the chart for one symbol's run.
pub fn compose(run: &SymbolRun) -> Chart {
    let series = &run.series;
    let mut traces = vec![Trace::line("Actual", series.dates(), series.closes())];
    traces.extend(run.forecasts.values().map(|record| {
        let (x, y) = record.points().iter().map(|p| (p.date, p.value)).unzip();
        Trace::line(format!("{} Forecast", record.model().label), x, y)
    }));
    Chart {
        symbol: series.symbol().clone(),
        title: format!("Stock Price Forecasting for {}", series.symbol()),
        x_title: "Date",
        y_title: "Price",
        traces,
    }
}

impl Chart {
    /// Plotly layout object.
    pub fn layout_json(&self) -> serde_json::Value {
        json!({
            "title": { "text": self.title },
            "xaxis": { "title": { "text": self.x_title } },
            "yaxis": { "title": { "text": self.y_title } },
        })
    }

    /// Standalone HTML page.
    pub fn to_html(&self) -> Result<String, serde_json::Error> {
        let data = script_safe(serde_json::to_string(&self.traces)?);
        let layout = script_safe(serde_json::to_string(&self.layout_json())?);
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_CDN}"></script>
</head>
<body>
<div id="chart" style="width:100%;height:100vh;"></div>
<script>
const data = {data};
const layout = {layout};
Plotly.newPlot("chart", data, layout, {{responsive: true}});
</script>
</body>
</html>
"#,
            title = self.title,
        ))
    }
}

/// Keep embedded JSON from closing the `<script>` element.
fn script_safe(json: String) -> String {
    json.replace("</", "<\\/")
}
