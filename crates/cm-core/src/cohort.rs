//! Cohort grouping by registration day or ISO week.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use cm_config::CohortGranularity;
use serde::Serialize;

use crate::record::EventRecord;

/// Identifier of one cohort.
///
/// Ordering is chronological: days by date, weeks by ISO year then week.
/// Week keys use the ISO week-numbering year, so 2024-12-30 is `2025-W01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub enum CohortKey {
    Day(NaiveDate),
    IsoWeek { year: i32, week: u32 },
}

impl CohortKey {
    /// Key of the cohort `ts` falls into under `granularity`.
    pub fn for_timestamp(ts: NaiveDateTime, granularity: CohortGranularity) -> Self {
        let date = ts.date();
        match granularity {
            CohortGranularity::Day => CohortKey::Day(date),
            CohortGranularity::IsoWeek => {
                let iso = date.iso_week();
                CohortKey::IsoWeek {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
        }
    }

    /// The calendar date of a day cohort.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            CohortKey::Day(date) => Some(*date),
            CohortKey::IsoWeek { .. } => None,
        }
    }

    /// First calendar day covered by the key (Monday for weeks).
    pub fn start_date(&self) -> Option<NaiveDate> {
        match self {
            CohortKey::Day(date) => Some(*date),
            CohortKey::IsoWeek { year, week } => {
                NaiveDate::from_isoywd_opt(*year, *week, Weekday::Mon)
            }
        }
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CohortKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            CohortKey::IsoWeek { year, week } => write!(f, "{}-W{:02}", year, week),
        }
    }
}

impl From<CohortKey> for String {
    fn from(key: CohortKey) -> Self {
        key.to_string()
    }
}

/// Records sharing a cohort key.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub key: CohortKey,
    pub members: Vec<EventRecord>,
    pub first_registration: NaiveDateTime,
    pub last_registration: NaiveDateTime,
}

impl Cohort {
    fn new(key: CohortKey, first: EventRecord) -> Self {
        Cohort {
            key,
            first_registration: first.registration_time,
            last_registration: first.registration_time,
            members: vec![first],
        }
    }

    fn push(&mut self, record: EventRecord) {
        self.first_registration = self.first_registration.min(record.registration_time);
        self.last_registration = self.last_registration.max(record.registration_time);
        self.members.push(record);
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Display label. Week cohorts append the registration span actually
    /// observed, e.g. `2025-W26 (06/23-06/29)`.
    pub fn label(&self) -> String {
        match self.key {
            CohortKey::Day(_) => self.key.to_string(),
            CohortKey::IsoWeek { .. } => format!(
                "{} ({}-{})",
                self.key,
                self.first_registration.format("%m/%d"),
                self.last_registration.format("%m/%d")
            ),
        }
    }

    /// Members with a target event at or after registration.
    pub fn valid_members(&self) -> impl Iterator<Item = &EventRecord> {
        self.members.iter().filter(|r| r.valid_elapsed().is_some())
    }
}

/// Cohorts in chronological key order.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortSet {
    pub granularity: CohortGranularity,
    cohorts: BTreeMap<CohortKey, Cohort>,
}

impl CohortSet {
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    pub fn get(&self, key: &CohortKey) -> Option<&Cohort> {
        self.cohorts.get(key)
    }

    /// Cohorts in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = &Cohort> {
        self.cohorts.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CohortKey> {
        self.cohorts.keys()
    }

    /// Total members across all cohorts.
    pub fn total_members(&self) -> usize {
        self.cohorts.values().map(Cohort::size).sum()
    }

    /// All members, cohort by cohort.
    pub fn records(&self) -> impl Iterator<Item = &EventRecord> {
        self.cohorts.values().flat_map(|c| c.members.iter())
    }
}

/// Partition `records` into cohorts by registration time.
///
/// Every record lands in exactly one cohort, including records whose target
/// event precedes registration.
pub fn group_cohorts(records: Vec<EventRecord>, granularity: CohortGranularity) -> CohortSet {
    let mut cohorts: BTreeMap<CohortKey, Cohort> = BTreeMap::new();

    for record in records {
        let key = CohortKey::for_timestamp(record.registration_time, granularity);
        match cohorts.get_mut(&key) {
            Some(cohort) => cohort.push(record),
            None => {
                cohorts.insert(key, Cohort::new(key, record));
            }
        }
    }

    CohortSet {
        granularity,
        cohorts,
    }
}
