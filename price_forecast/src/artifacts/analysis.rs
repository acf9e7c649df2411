//! Plain-text per-symbol summary written next to the chart.

use crate::record::SymbolRun;

/// Render the analysis text for one symbol's run.
pub fn render(run: &SymbolRun) -> String {
    let series = &run.series;
    let last_close = series.last_close();
    let window = series.forecast_dates(run.horizon);

    let mut lines = vec![
        format!("Forecast analysis for {}", series.symbol()),
        format!(
            "Observations: {} ({} to {})",
            series.len(),
            series.first_date(),
            series.last_date()
        ),
        format!("Last close: {last_close:.6}"),
        match (window.first(), window.last()) {
            (Some(first), Some(last)) => {
                format!("Forecast window: {first} to {last} ({} days)", window.len())
            }
            _ => "Forecast window: none (horizon 0)".to_string(),
        },
        String::new(),
    ];

    lines.extend(run.forecasts.values().map(|record| {
        let label = record.model().label;
        match record.last() {
            Some(p) => {
                let change = (p.value - last_close) / last_close * 100.0;
                format!(
                    "{label}: final {:.6} on {} ({change:+.2}% vs last close)",
                    p.value, p.date
                )
            }
            None => format!("{label}: empty forecast"),
        }
    }));
    lines.extend(
        run.failures
            .iter()
            .map(|failure| format!("{}: failed: {}", failure.model.label, failure.error)),
    );
    if run.forecasts.is_empty() && run.failures.is_empty() {
        lines.push("No models configured.".to_string());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
