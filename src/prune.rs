use tracing::{debug, info};

use crate::models::{DropReason, DroppedColumn, Table};

/// Identifiers, location descriptors, precinct/borough codes, perpetrator and
/// victim demographics, and geocoordinates. None of them reach the derive stage.
pub const OUT_OF_SCOPE_COLUMNS: &[&str] = &[
    "INCIDENT_KEY",
    "BORO",
    "LOC_OF_OCCUR_DESC",
    "PRECINCT",
    "JURISDICTION_CODE",
    "LOC_CLASSFCTN_DESC",
    "LOCATION_DESC",
    "PERP_AGE_GROUP",
    "PERP_SEX",
    "PERP_RACE",
    "VIC_AGE_GROUP",
    "VIC_SEX",
    "VIC_RACE",
    "X_COORD_CD",
    "Y_COORD_CD",
    "Latitude",
    "Longitude",
    "Lon_Lat",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PruneOutcome {
    pub table: Table,
    pub dropped: Vec<DroppedColumn>,
}

/// Fraction of rows with no value in `column`. An empty table has ratio 0.
pub fn missing_ratio(table: &Table, column: usize) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    let missing = table
        .rows
        .iter()
        .filter(|row| row.get(column).map_or(true, Option::is_none))
        .count();
    missing as f64 / table.len() as f64
}

/// Drops out-of-scope columns and every column whose missing ratio is
/// strictly greater than `threshold`.
pub fn prune_columns(table: &Table, threshold: f64) -> PruneOutcome {
    let mut keep = Vec::new();
    let mut dropped = Vec::new();

    for (index, name) in table.headers.iter().enumerate() {
        if OUT_OF_SCOPE_COLUMNS.contains(&name.as_str()) {
            dropped.push(DroppedColumn {
                name: name.clone(),
                reason: DropReason::OutOfScope,
            });
            continue;
        }

        let ratio = missing_ratio(table, index);
        debug!(column = %name, missing_ratio = ratio, "column completeness");
        if ratio > threshold {
            dropped.push(DroppedColumn {
                name: name.clone(),
                reason: DropReason::Sparse {
                    missing_ratio: ratio,
                },
            });
        } else {
            keep.push(index);
        }
    }

    let headers = keep.iter().map(|&i| table.headers[i].clone()).collect();
    let rows = table
        .rows
        .iter()
        .map(|row| keep.iter().map(|&i| row.get(i).cloned().flatten()).collect())
        .collect();

    info!(
        kept = keep.len(),
        dropped = dropped.len(),
        threshold,
        "pruned columns"
    );

    PruneOutcome {
        table: Table { headers, rows },
        dropped,
    }
}
