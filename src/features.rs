use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::models::{
    DerivedRecord, IncidentRecord, Table, COL_MURDER_FLAG, COL_OCCUR_DATE, COL_OCCUR_TIME,
};

pub const DAYTIME_START_HOUR: u32 = 7;
pub const DAYTIME_END_HOUR: u32 = 19;

/// What to do with a row whose date, time or flag cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Exclude the row and count it as rejected.
    #[default]
    Reject,
    /// Fail the whole run on the first malformed row.
    Abort,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub records: Vec<IncidentRecord>,
    pub rejected: usize,
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%m/%d/%Y")
        .map_err(|_| malformed(COL_OCCUR_DATE, raw, "MM/DD/YYYY"))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S")
        .map_err(|_| malformed(COL_OCCUR_TIME, raw, "HH:MM:SS"))
}

pub fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "y" | "yes" | "1" => Ok(true),
        "false" | "n" | "no" | "0" => Ok(false),
        _ => Err(malformed(COL_MURDER_FLAG, raw, "true/false")),
    }
}

pub fn is_daytime(hour: u32) -> bool {
    (DAYTIME_START_HOUR..DAYTIME_END_HOUR).contains(&hour)
}

fn malformed(column: &str, raw: &str, expected: &'static str) -> AnalysisError {
    AnalysisError::Parse {
        column: column.to_string(),
        row: None,
        value: raw.to_string(),
        expected,
    }
}

fn required_column(table: &Table, name: &str) -> Result<usize> {
    table
        .column_index(name)
        .ok_or_else(|| AnalysisError::Schema {
            column: name.to_string(),
        })
}

fn parse_row(row: &[Option<String>], columns: [usize; 3]) -> Result<IncidentRecord> {
    let [date_col, time_col, flag_col] = columns;
    let field = |index: usize| row.get(index).and_then(Option::as_deref).unwrap_or("");

    Ok(IncidentRecord {
        occur_date: parse_date(field(date_col))?,
        occur_time: parse_time(field(time_col))?,
        is_murder: parse_flag(field(flag_col))?,
    })
}

/// Parses the date, time and murder flag of every row. Row numbers in errors
/// are 1-based data rows (the header is not counted).
pub fn extract_records(table: &Table, policy: ParsePolicy) -> Result<Extraction> {
    let columns = [
        required_column(table, COL_OCCUR_DATE)?,
        required_column(table, COL_OCCUR_TIME)?,
        required_column(table, COL_MURDER_FLAG)?,
    ];

    let mut records = Vec::with_capacity(table.len());
    let mut rejected = 0usize;

    for (index, row) in table.rows.iter().enumerate() {
        match parse_row(row, columns) {
            Ok(record) => records.push(record),
            Err(err) => {
                let err = err.at_row(index + 1);
                if policy == ParsePolicy::Abort {
                    return Err(err);
                }
                debug!(%err, "rejecting row");
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        warn!(rejected, "rows excluded because of malformed fields");
    }
    info!(records = records.len(), "extracted incident records");

    Ok(Extraction { records, rejected })
}

/// Sorts by date (stable, so same-day records keep source order) and attaches
/// calendar fields plus the previous record's murder flag.
pub fn derive(records: &[IncidentRecord]) -> Vec<DerivedRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.occur_date);

    let mut previous: Option<bool> = None;
    sorted
        .into_iter()
        .map(|record| {
            let hour = record.occur_time.hour();
            let derived = DerivedRecord {
                occur_date: record.occur_date,
                is_murder: record.is_murder,
                year: record.occur_date.year(),
                month: record.occur_date.month(),
                weekday: record.occur_date.weekday(),
                hour,
                is_daytime: is_daytime(hour),
                lag_outcome: previous,
            };
            previous = Some(record.is_murder);
            derived
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, time: &str, is_murder: bool) -> IncidentRecord {
        IncidentRecord {
            occur_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            occur_time: NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap(),
            is_murder,
        }
    }

    fn table(rows: &[[&str; 3]]) -> Table {
        Table {
            headers: vec![
                COL_OCCUR_DATE.to_string(),
                "BORO".to_string(),
                COL_OCCUR_TIME.to_string(),
                COL_MURDER_FLAG.to_string(),
            ],
            rows: rows
                .iter()
                .map(|[date, time, flag]| {
                    vec![
                        Some(date.to_string()),
                        Some("QUEENS".to_string()),
                        Some(time.to_string()),
                        if flag.is_empty() {
                            None
                        } else {
                            Some(flag.to_string())
                        },
                    ]
                })
                .collect(),
        }
    }

    #[test]
    fn parses_source_formats() {
        assert_eq!(
            parse_date("08/27/2006").unwrap(),
            NaiveDate::from_ymd_opt(2006, 8, 27).unwrap()
        );
        assert_eq!(parse_time("05:35:00").unwrap().hour(), 5);
        assert_eq!(parse_time("23:59:59").unwrap().hour(), 23);
        assert!(parse_flag("true").unwrap());
        assert!(!parse_flag("FALSE").unwrap());
        assert!(parse_flag("Y").unwrap());
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            parse_date("2006-08-27"),
            Err(AnalysisError::Parse { expected: "MM/DD/YYYY", .. })
        ));
        assert!(matches!(
            parse_flag("maybe"),
            Err(AnalysisError::Parse { row: None, .. })
        ));
        assert!(parse_date("13/01/2020").is_err());
        assert!(parse_time("24:00:00").is_err());
        assert!(parse_time("7pm").is_err());
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn daytime_window_boundaries() {
        assert!(!is_daytime(6));
        assert!(is_daytime(7));
        assert!(is_daytime(18));
        assert!(!is_daytime(19));
        assert!(!is_daytime(0));
        assert!(!is_daytime(23));
    }

    #[test]
    fn missing_required_column_is_schema_error() {
        let mut table = table(&[["01/01/2020", "10:00:00", "false"]]);
        table.headers[3] = "MURDER".to_string();
        assert_eq!(
            extract_records(&table, ParsePolicy::Reject),
            Err(AnalysisError::Schema {
                column: COL_MURDER_FLAG.to_string()
            })
        );
    }

    #[test]
    fn reject_policy_counts_bad_rows() {
        let table = table(&[
            ["01/01/2020", "10:00:00", "false"],
            ["not a date", "10:00:00", "true"],
            ["01/03/2020", "25:00:00", "true"],
            ["01/04/2020", "11:00:00", ""],
            ["01/05/2020", "12:30:00", "true"],
        ]);
        let extraction = extract_records(&table, ParsePolicy::Reject).unwrap();
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.rejected, 3);
    }

    #[test]
    fn abort_policy_reports_row_and_column() {
        let table = table(&[
            ["01/01/2020", "10:00:00", "false"],
            ["01/02/2020", "10:61:00", "true"],
        ]);
        let err = extract_records(&table, ParsePolicy::Abort).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Parse {
                column: COL_OCCUR_TIME.to_string(),
                row: Some(2),
                value: "10:61:00".to_string(),
                expected: "HH:MM:SS",
            }
        );
    }

    #[test]
    fn lag_follows_date_order() {
        let records = vec![
            record("2020-01-01", "10:00:00", false),
            record("2020-01-02", "10:00:00", true),
            record("2020-01-03", "10:00:00", false),
        ];
        let derived = derive(&records);
        let lags: Vec<_> = derived.iter().map(|r| r.lag_outcome).collect();
        assert_eq!(lags, vec![None, Some(false), Some(true)]);
    }

    #[test]
    fn sort_is_by_date_only_and_stable() {
        let records = vec![
            record("2021-03-02", "01:00:00", true),
            record("2021-03-01", "22:00:00", false),
            record("2021-03-01", "03:00:00", true),
        ];
        let derived = derive(&records);

        assert_eq!(derived[0].hour, 22);
        assert_eq!(derived[1].hour, 3);
        assert_eq!(derived[2].hour, 1);
        assert_eq!(derived[1].lag_outcome, Some(false));
        assert_eq!(derived[2].lag_outcome, Some(true));
    }

    #[test]
    fn derives_calendar_fields() {
        let derived = derive(&[record("2019-07-04", "19:00:00", false)]);
        let first = &derived[0];
        assert_eq!(first.year, 2019);
        assert_eq!(first.month, 7);
        assert_eq!(first.weekday, chrono::Weekday::Thu);
        assert_eq!(first.hour, 19);
        assert!(!first.is_daytime);
        assert_eq!(first.lag_outcome, None);
    }

    #[test]
    fn empty_input_derives_nothing() {
        assert!(derive(&[]).is_empty());
    }
}
