use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod error;
mod estimate;
mod features;
mod loader;
mod models;
mod pipeline;
mod prune;
mod report;

use aggregate::GroupBy;
use features::ParsePolicy;

const SOURCE_ENV: &str = "SHOOTING_DATA_SOURCE";

#[derive(Parser)]
#[command(name = "shooting-report")]
#[command(about = "Exploratory analysis of recorded shooting incidents", long_about = None)]
struct Cli {
    /// CSV URL or local path; falls back to $SHOOTING_DATA_SOURCE, then NYC Open Data
    #[arg(long, global = true)]
    source: Option<String>,
    /// Drop columns whose missing-value ratio is above this fraction
    #[arg(long, global = true, default_value_t = 0.5, value_parser = parse_threshold)]
    threshold: f64,
    /// Abort on the first malformed date, time or murder flag instead of skipping the row
    #[arg(long, global = true)]
    strict: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which columns are dropped and why
    Prune,
    /// Print grouped incident counts and the busiest/quietest hours
    Summary {
        #[arg(long, value_enum)]
        group_by: Option<GroupBy>,
        /// Report only the smallest hour when several tie for busiest/quietest
        #[arg(long, conflicts_with = "group_by")]
        smallest_tie: bool,
    },
    /// Fit the lag model and predict the next incident's murder probability
    Predict {
        /// Whether the hypothetical previous incident was a murder
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        lag: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write aggregates as JSON for chart rendering
    Export {
        #[arg(long, default_value = "chart-data.json")]
        out: PathBuf,
    },
}

fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|_| format!("{raw} is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is outside [0, 1]"))
    }
}

/// Picks the dataset location: explicit flag, then the environment, then the
/// public NYC Open Data export.
fn resolve_source(flag: Option<String>, env: Option<String>) -> String {
    flag.or(env).unwrap_or_else(|| loader::DEFAULT_SOURCE.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let source = resolve_source(cli.source, std::env::var(SOURCE_ENV).ok());
    let threshold = cli.threshold;
    let policy = if cli.strict {
        ParsePolicy::Abort
    } else {
        ParsePolicy::Reject
    };

    let table = loader::load_table(&source)
        .await
        .context("load stage failed")?;

    let prepare = || {
        pipeline::prepare(&table, threshold, policy).context("prune/derive stage failed")
    };

    match cli.command {
        Commands::Prune => {
            let outcome = prune::prune_columns(&table, threshold);
            println!("Kept columns: {}", outcome.table.headers.join(", "));
            if outcome.dropped.is_empty() {
                println!("No columns dropped at threshold {threshold}.");
            }
            for column in &outcome.dropped {
                println!(
                    "- {} ({})",
                    column.name,
                    report::describe_drop(&column.reason)
                );
            }
        }
        Commands::Summary {
            group_by,
            smallest_tie,
        } => {
            let prepared = prepare()?;
            if let Some(group_by) = group_by {
                for summary in aggregate::summarize(&prepared.records, group_by) {
                    println!(
                        "- {}: {} incidents, {} murders",
                        summary.key, summary.count, summary.positive_count
                    );
                }
                return Ok(());
            }

            let summaries =
                pipeline::summarize(&prepared.records).context("aggregate stage failed")?;
            println!("Incidents by year:");
            for summary in &summaries.by_year {
                println!(
                    "- {}: {} incidents, {} murders",
                    summary.key, summary.count, summary.positive_count
                );
            }
            println!("Day vs night:");
            for summary in &summaries.by_daytime {
                let period = if summary.key { "day" } else { "night" };
                println!("- {period}: {} incidents", summary.count);
            }
            let (busiest, quietest) = if smallest_tie {
                (
                    summaries.busiest_hours.single(),
                    summaries.quietest_hours.single(),
                )
            } else {
                (
                    summaries.busiest_hours.clone(),
                    summaries.quietest_hours.clone(),
                )
            };
            println!(
                "Busiest hour(s): {} with {} incidents",
                report::format_hours(&busiest),
                busiest.count
            );
            println!(
                "Quietest hour(s): {} with {} incidents",
                report::format_hours(&quietest),
                quietest.count
            );
        }
        Commands::Predict { lag } => {
            let prepared = prepare()?;
            let fit =
                estimate::fit_lag_model(&prepared.records).context("estimate stage failed")?;
            println!(
                "P(murder | previous incident murder = {lag}) = {:.4}",
                fit.predict(lag)
            );
        }
        Commands::Report { out } => {
            let prepared = prepare()?;
            let summaries =
                pipeline::summarize(&prepared.records).context("aggregate stage failed")?;
            let fit =
                estimate::fit_lag_model(&prepared.records).context("estimate stage failed")?;
            let generated = chrono::Utc::now().date_naive();
            let report = report::build_report(&source, generated, &prepared, &summaries, &fit);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let prepared = prepare()?;
            let summaries =
                pipeline::summarize(&prepared.records).context("aggregate stage failed")?;
            let fit =
                estimate::fit_lag_model(&prepared.records).context("estimate stage failed")?;
            let json = report::chart_data_json(&source, &prepared, &summaries, &fit)?;
            std::fs::write(&out, json)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Chart data written to {}.", out.display());
        }
    }

    Ok(())
}
