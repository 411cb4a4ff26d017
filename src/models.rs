use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Serialize;

pub const COL_OCCUR_DATE: &str = "OCCUR_DATE";
pub const COL_OCCUR_TIME: &str = "OCCUR_TIME";
pub const COL_MURDER_FLAG: &str = "STATISTICAL_MURDER_FLAG";

/// Raw CSV contents: one header row plus string cells in source order.
/// Empty and `(null)` cells are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncidentRecord {
    pub occur_date: NaiveDate,
    pub occur_time: NaiveTime,
    pub is_murder: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedRecord {
    pub occur_date: NaiveDate,
    pub is_murder: bool,
    pub year: i32,
    pub month: u32,
    pub weekday: Weekday,
    pub hour: u32,
    pub is_daytime: bool,
    /// Murder flag of the preceding record in date order; `None` for the first.
    pub lag_outcome: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary<K> {
    pub key: K,
    pub count: usize,
    pub positive_count: usize,
}

impl<K> GroupSummary<K> {
    pub fn positive_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.positive_count as f64 / self.count as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    Sparse { missing_ratio: f64 },
    OutOfScope,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedColumn {
    pub name: String,
    pub reason: DropReason,
}
