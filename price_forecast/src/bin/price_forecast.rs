use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use price_forecast::artifacts::{ArtifactLayout, ArtifactWriter};
use price_forecast::config::{Config, load_config_path};
use price_forecast::db::migrate;
use price_forecast::forecast::build_models;
use price_forecast::pipeline::{ForecastPipeline, RunOutcome, SymbolStatus};
use price_forecast::series::Symbol;
use price_forecast::store::{SqliteStore, catalog};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Multi-model stock price forecasting")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Forecast every symbol in the historical store.
    Run,
    /// List the symbols known to the historical store.
    Symbols,
    /// Print the artifact paths of one symbol as JSON.
    Lookup {
        /// Ticker symbol.
        symbol: String,
    },
    /// List symbols that currently have a chart.
    Visualized,
    /// Apply the embedded migrations to the configured database.
    Migrate,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("price_forecast=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => Config::default(),
    };
    cfg.apply_env()?;
    let layout = ArtifactLayout::new(&cfg.artifacts_dir);

    match cli.cmd {
        Cmd::Run => {
            let store = SqliteStore::new(cfg.resolve_database_url()?);
            let models = build_models(&cfg.models_config())?;
            let pipeline = ForecastPipeline::new(
                store,
                models,
                ArtifactWriter::new(layout),
                cfg.pipeline_options()?,
            );
            let report = pipeline.run_all()?;
            for entry in &report.symbols {
                let line = match &entry.status {
                    SymbolStatus::NoData => "no data".to_string(),
                    SymbolStatus::LoadFailed { reason } => format!("load failed: {reason}"),
                    SymbolStatus::Processed(p) => {
                        format!("{} of {} forecasts", p.forecasts(), p.models.len())
                    }
                };
                println!("{}\t{line}", entry.symbol);
            }
            match report.outcome {
                RunOutcome::Completed => info!("run completed"),
                RunOutcome::CatalogUnavailable { reason } => {
                    println!("catalog unavailable: {reason}");
                }
                RunOutcome::Aborted { symbol, reason } => {
                    bail!("run aborted at {symbol}: {reason}");
                }
            }
        }
        Cmd::Symbols => {
            let store = SqliteStore::new(cfg.resolve_database_url()?);
            let listing = catalog::list_symbols(&store);
            if let Some(error) = listing.failure {
                return Err(error).context("symbol catalog unavailable");
            }
            for symbol in listing.symbols {
                println!("{symbol}");
            }
        }
        Cmd::Lookup { symbol } => {
            let symbol = Symbol::parse(&symbol)?;
            let paths = layout.lookup(&symbol, cfg.models.iter().map(String::as_str));
            println!("{}", serde_json::to_string_pretty(&paths)?);
        }
        Cmd::Visualized => {
            for symbol in layout.visualized_symbols()? {
                println!("{symbol}");
            }
        }
        Cmd::Migrate => {
            let url = cfg.resolve_database_url()?;
            migrate::run_all(&url)?;
            info!(%url, "migrations applied");
        }
    }

    Ok(())
}
