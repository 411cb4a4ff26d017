use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::models::{DerivedRecord, GroupSummary};

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GroupBy {
    Year,
    Month,
    Weekday,
    Hour,
    Daytime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Year(i32),
    Month(u32),
    /// Days since Monday, so keys sort Monday first.
    Weekday(u32),
    Hour(u32),
    Daytime(bool),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Year(year) => write!(f, "{year}"),
            GroupKey::Month(month) => write!(f, "{month:02}"),
            GroupKey::Weekday(day) => {
                let name = WEEKDAY_NAMES.get(*day as usize).ok_or(fmt::Error)?;
                write!(f, "{name}")
            }
            GroupKey::Hour(hour) => write!(f, "{hour:02}:00"),
            GroupKey::Daytime(true) => write!(f, "day"),
            GroupKey::Daytime(false) => write!(f, "night"),
        }
    }
}

impl GroupBy {
    pub fn key_of(self, record: &DerivedRecord) -> GroupKey {
        match self {
            GroupBy::Year => GroupKey::Year(record.year),
            GroupBy::Month => GroupKey::Month(record.month),
            GroupBy::Weekday => GroupKey::Weekday(record.weekday.num_days_from_monday()),
            GroupBy::Hour => GroupKey::Hour(record.hour),
            GroupBy::Daytime => GroupKey::Daytime(record.is_daytime),
        }
    }
}

/// Groups records by `key` and counts them. Only keys that occur are emitted,
/// in ascending key order.
pub fn summarize_by<'a, K, I, F>(records: I, key: F) -> Vec<GroupSummary<K>>
where
    K: Ord,
    I: IntoIterator<Item = &'a DerivedRecord>,
    F: Fn(&DerivedRecord) -> K,
{
    fold_groups(
        records
            .into_iter()
            .map(|record| (key(record), record.is_murder)),
    )
}

fn fold_groups<K: Ord>(keyed: impl Iterator<Item = (K, bool)>) -> Vec<GroupSummary<K>> {
    let mut groups: BTreeMap<K, (usize, usize)> = BTreeMap::new();

    for (key, is_murder) in keyed {
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        if is_murder {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (count, positive_count))| GroupSummary {
            key,
            count,
            positive_count,
        })
        .collect()
}

pub fn summarize(records: &[DerivedRecord], group_by: GroupBy) -> Vec<GroupSummary<GroupKey>> {
    summarize_by(records, |record| group_by.key_of(record))
}

pub fn by_year(records: &[DerivedRecord]) -> Vec<GroupSummary<i32>> {
    summarize_by(records, |record| record.year)
}

pub fn by_hour(records: &[DerivedRecord]) -> Vec<GroupSummary<u32>> {
    summarize_by(records, |record| record.hour)
}

pub fn by_daytime(records: &[DerivedRecord]) -> Vec<GroupSummary<bool>> {
    summarize_by(records, |record| record.is_daytime)
}

/// Murder counts keyed by the previous record's outcome. Records without a
/// lag (the first in date order) are left out.
pub fn summarize_lagged(records: &[DerivedRecord]) -> Vec<GroupSummary<bool>> {
    fold_groups(
        records
            .iter()
            .filter_map(|record| record.lag_outcome.map(|lag| (lag, record.is_murder))),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extremum<K> {
    /// Every key sharing the extreme count, ascending.
    pub keys: Vec<K>,
    pub count: usize,
}

impl<K: Copy> Extremum<K> {
    /// Single-key view: keeps only the smallest of the tied keys.
    pub fn single(&self) -> Extremum<K> {
        Extremum {
            keys: self.keys.iter().take(1).copied().collect(),
            count: self.count,
        }
    }
}

pub fn max_count<K: Ord + Copy>(summaries: &[GroupSummary<K>]) -> Result<Extremum<K>> {
    let count = summaries
        .iter()
        .map(|summary| summary.count)
        .max()
        .ok_or(AnalysisError::EmptyGroup { query: "max_count" })?;
    Ok(tied_at(summaries, count))
}

pub fn min_count<K: Ord + Copy>(summaries: &[GroupSummary<K>]) -> Result<Extremum<K>> {
    let count = summaries
        .iter()
        .map(|summary| summary.count)
        .min()
        .ok_or(AnalysisError::EmptyGroup { query: "min_count" })?;
    Ok(tied_at(summaries, count))
}

fn tied_at<K: Ord + Copy>(summaries: &[GroupSummary<K>], count: usize) -> Extremum<K> {
    let mut keys: Vec<K> = summaries
        .iter()
        .filter(|summary| summary.count == count)
        .map(|summary| summary.key)
        .collect();
    keys.sort();
    Extremum { keys, count }
}
