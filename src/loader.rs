use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::models::Table;

pub const DEFAULT_SOURCE: &str =
    "https://data.cityofnewyork.us/api/views/833y-fsy8/rows.csv?accessType=DOWNLOAD";

/// Loads the dataset from an `http(s)://` URL or a local CSV path.
pub async fn load_table(source: &str) -> anyhow::Result<Table> {
    let table = if is_remote(source) {
        info!(source, "fetching dataset");
        let response = reqwest::get(source)
            .await
            .with_context(|| format!("failed to fetch {source}"))?
            .error_for_status()
            .with_context(|| format!("server rejected request for {source}"))?;
        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read response body from {source}"))?;
        debug!(bytes = body.len(), "download complete");
        read_table(body.as_ref())?
    } else {
        info!(source, "reading dataset from disk");
        read_table_from_path(Path::new(source))?
    };

    info!(
        rows = table.len(),
        columns = table.headers.len(),
        "dataset loaded"
    );
    Ok(table)
}

pub fn read_table_from_path(path: &Path) -> anyhow::Result<Table> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_table(file)
}

pub fn read_table<R: Read>(input: R) -> anyhow::Result<Table> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader
        .headers()
        .context("failed to read CSV header row")?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("malformed CSV at data row {}", index + 1))?;
        rows.push(record.iter().map(cell_value).collect());
    }

    Ok(Table { headers, rows })
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn cell_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("(null)") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_null_cells_are_missing() {
        let csv = "OCCUR_DATE,BORO,LOCATION_DESC\n01/05/2021,BRONX,(null)\n02/07/2021, ,MULTI DWELL\n";
        let table = read_table(csv.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["OCCUR_DATE", "BORO", "LOCATION_DESC"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][2], None);
        assert_eq!(table.rows[1][1], None);
        assert_eq!(table.rows[1][2].as_deref(), Some("MULTI DWELL"));
    }

    #[test]
    fn header_only_file_is_an_empty_table() {
        let table = read_table("OCCUR_DATE,OCCUR_TIME\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.column_index("OCCUR_TIME"), Some(1));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let csv = "A,B\n1,2\n3\n";
        assert!(read_table(csv.as_bytes()).is_err());
    }

    #[test]
    fn recognises_remote_sources() {
        assert!(is_remote(DEFAULT_SOURCE));
        assert!(!is_remote("data/shootings.csv"));
    }
}
