use serde::Serialize;

use crate::aggregate::{self, Extremum};
use crate::error::Result;
use crate::features::{self, ParsePolicy};
use crate::models::{DerivedRecord, DroppedColumn, GroupSummary, Table};
use crate::prune;

/// Output of the load → prune → derive chain.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub rows_loaded: usize,
    pub dropped: Vec<DroppedColumn>,
    pub kept_columns: Vec<String>,
    pub rejected: usize,
    pub records: Vec<DerivedRecord>,
}

pub fn prepare(table: &Table, threshold: f64, policy: ParsePolicy) -> Result<Prepared> {
    let pruned = prune::prune_columns(table, threshold);
    let extraction = features::extract_records(&pruned.table, policy)?;
    let records = features::derive(&extraction.records);

    Ok(Prepared {
        rows_loaded: table.len(),
        dropped: pruned.dropped,
        kept_columns: pruned.table.headers,
        rejected: extraction.rejected,
        records,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Summaries {
    pub by_year: Vec<GroupSummary<i32>>,
    pub by_daytime: Vec<GroupSummary<bool>>,
    pub by_hour: Vec<GroupSummary<u32>>,
    pub by_lag: Vec<GroupSummary<bool>>,
    pub busiest_hours: Extremum<u32>,
    pub quietest_hours: Extremum<u32>,
}

pub fn summarize(records: &[DerivedRecord]) -> Result<Summaries> {
    let by_hour = aggregate::by_hour(records);
    let busiest_hours = aggregate::max_count(&by_hour)?;
    let quietest_hours = aggregate::min_count(&by_hour)?;

    Ok(Summaries {
        by_year: aggregate::by_year(records),
        by_daytime: aggregate::by_daytime(records),
        by_lag: aggregate::summarize_lagged(records),
        by_hour,
        busiest_hours,
        quietest_hours,
    })
}
