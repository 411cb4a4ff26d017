use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate::Extremum;
use crate::estimate::LogisticFit;
use crate::models::{DropReason, GroupSummary};
use crate::pipeline::{Prepared, Summaries};

const BAR_WIDTH: usize = 30;

/// Aggregates handed to an external chart renderer.
#[derive(Debug, Serialize)]
pub struct ChartData<'a> {
    pub source: &'a str,
    pub records: usize,
    pub summaries: &'a Summaries,
    pub lag_model: &'a LogisticFit,
}

pub fn chart_data_json(
    source: &str,
    prepared: &Prepared,
    summaries: &Summaries,
    fit: &LogisticFit,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ChartData {
        source,
        records: prepared.records.len(),
        summaries,
        lag_model: fit,
    })
}

pub fn describe_drop(reason: &DropReason) -> String {
    match reason {
        DropReason::Sparse { missing_ratio } => {
            format!("sparse, {:.1}% missing", missing_ratio * 100.0)
        }
        DropReason::OutOfScope => "out of scope".to_string(),
    }
}

pub fn format_hours(extremum: &Extremum<u32>) -> String {
    extremum
        .keys
        .iter()
        .map(|hour| format!("{hour:02}:00"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH + max / 2) / max;
    "#".repeat(width.max(usize::from(count > 0)))
}

fn write_group_table<K>(
    output: &mut String,
    label: &str,
    summaries: &[GroupSummary<K>],
    key_label: impl Fn(&K) -> String,
) {
    let _ = writeln!(output, "| {label} | Incidents | Murders | Murder rate |");
    let _ = writeln!(output, "|---|---:|---:|---:|");
    for summary in summaries {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {:.1}% |",
            key_label(&summary.key),
            summary.count,
            summary.positive_count,
            summary.positive_rate() * 100.0
        );
    }
}

pub fn build_report(
    source: &str,
    generated: NaiveDate,
    prepared: &Prepared,
    summaries: &Summaries,
    fit: &LogisticFit,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Shooting Incident Report");
    let _ = writeln!(output, "Generated {generated} from {source}");
    let _ = writeln!(output);

    let _ = writeln!(output, "## Data Preparation");
    let _ = writeln!(
        output,
        "- {} rows loaded, {} rejected for malformed date/time/flag, {} analyzed",
        prepared.rows_loaded,
        prepared.rejected,
        prepared.records.len()
    );
    if let (Some(first), Some(last)) = (prepared.records.first(), prepared.records.last()) {
        let _ = writeln!(
            output,
            "- Incidents dated {} to {}",
            first.occur_date, last.occur_date
        );
    }
    let _ = writeln!(output, "- Columns kept: {}", prepared.kept_columns.join(", "));
    if prepared.dropped.is_empty() {
        let _ = writeln!(output, "- No columns dropped.");
    } else {
        for column in &prepared.dropped {
            let _ = writeln!(
                output,
                "- Dropped {} ({})",
                column.name,
                describe_drop(&column.reason)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Incidents by Year");
    write_group_table(&mut output, "Year", &summaries.by_year, |year| {
        year.to_string()
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Day vs Night");
    let _ = writeln!(output, "Daytime is 07:00 up to (not including) 19:00.");
    let _ = writeln!(output);
    write_group_table(&mut output, "Period", &summaries.by_daytime, |daytime| {
        let label = if *daytime { "day" } else { "night" };
        label.to_string()
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Incidents by Hour");
    let max = summaries.busiest_hours.count;
    let _ = writeln!(output, "```");
    for summary in &summaries.by_hour {
        let _ = writeln!(
            output,
            "{:02}:00 {:>6} {}",
            summary.key,
            summary.count,
            bar(summary.count, max)
        );
    }
    let _ = writeln!(output, "```");
    let _ = writeln!(
        output,
        "- Busiest hour(s): {} with {} incidents",
        format_hours(&summaries.busiest_hours),
        summaries.busiest_hours.count
    );
    let _ = writeln!(
        output,
        "- Quietest hour(s): {} with {} incidents",
        format_hours(&summaries.quietest_hours),
        summaries.quietest_hours.count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Previous Incident as Predictor");
    write_group_table(&mut output, "Previous was murder", &summaries.by_lag, |lag| {
        lag.to_string()
    });
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Logistic fit over {} records ({} Newton iterations, log-likelihood {:.2}):",
        fit.observations, fit.iterations, fit.log_likelihood
    );
    let _ = writeln!(
        output,
        "- intercept {:.4} (std. error {:.4}, z {:.2})",
        fit.intercept,
        fit.intercept_std_error,
        fit.intercept_z()
    );
    let _ = writeln!(
        output,
        "- slope {:.4} (std. error {:.4}, z {:.2})",
        fit.slope,
        fit.slope_std_error,
        fit.slope_z()
    );
    let _ = writeln!(
        output,
        "- P(murder | previous was murder) = {:.4}",
        fit.predict(true)
    );
    let _ = writeln!(
        output,
        "- P(murder | previous was not) = {:.4}",
        fit.predict(false)
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "_Illustrative fit only: no holdout validation, probabilities are not calibrated._"
    );

    output
}
