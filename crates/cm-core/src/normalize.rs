//! Raw rows to canonical [`EventRecord`]s.
//!
//! A row is a map from column name to a loosely typed cell. Timestamps may
//! arrive as strings in several common layouts, as native datetimes, or as
//! spreadsheet serial numbers. Rows whose registration cannot be parsed are
//! rejected and counted; an unparseable target becomes "no event".

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use cm_config::FieldNames;
use serde::{Deserialize, Serialize};

use crate::record::EventRecord;

/// One cell of a raw input row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    /// Spreadsheet serial day number.
    Number(f64),
    Text(String),
    /// Already-parsed timestamp, for in-process callers.
    Timestamp(NaiveDateTime),
    /// Anything else (arrays, objects); never a valid timestamp.
    Other(serde_json::Value),
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(ts: NaiveDateTime) -> Self {
        FieldValue::Timestamp(ts)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Raw input row keyed by column name.
pub type RawRow = BTreeMap<String, FieldValue>;

/// Why a row was not turned into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingRegistration,
    UnparseableRegistration,
}

/// A row the normalizer could not use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub row: usize,
    pub reason: RejectReason,
}

/// Result of normalizing a batch of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    pub records: Vec<EventRecord>,
    pub rejected: Vec<RejectedRow>,
    /// Rows whose target cell held a value that is not a timestamp.
    pub unparseable_targets: usize,
    /// Rows without any target value.
    pub absent_targets: usize,
}

impl NormalizeOutcome {
    /// Drop records without a target event; returns how many were dropped.
    pub fn retain_with_target(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.target_event_time.is_some());
        before - self.records.len()
    }
}

/// Normalize `rows` using the configured column names.
pub fn normalize_rows(rows: &[RawRow], fields: &FieldNames) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        let registration = match row.get(&fields.registration) {
            None | Some(FieldValue::Null) => {
                outcome.rejected.push(RejectedRow {
                    row: index,
                    reason: RejectReason::MissingRegistration,
                });
                continue;
            }
            Some(value) => match parse_timestamp(value) {
                Some(ts) => ts,
                None => {
                    outcome.rejected.push(RejectedRow {
                        row: index,
                        reason: RejectReason::UnparseableRegistration,
                    });
                    continue;
                }
            },
        };

        let target = match row.get(&fields.target) {
            None | Some(FieldValue::Null) => {
                outcome.absent_targets += 1;
                None
            }
            Some(value) if is_blank(value) => {
                outcome.absent_targets += 1;
                None
            }
            Some(value) => {
                let parsed = parse_timestamp(value);
                if parsed.is_none() {
                    outcome.unparseable_targets += 1;
                }
                parsed
            }
        };

        outcome
            .records
            .push(EventRecord::new(registration, target).with_source_row(index));
    }

    outcome
}

/// Strings that conventionally mean "no value".
const MISSING_MARKERS: &[&str] = &["", "nan", "nat", "null", "none", "-", "/"];

fn is_blank(value: &FieldValue) -> bool {
    match value {
        FieldValue::Text(s) => MISSING_MARKERS.contains(&s.trim().to_lowercase().as_str()),
        _ => false,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Serial day 0 in the 1900 date system, as used by spreadsheet exports.
fn spreadsheet_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

/// Largest serial accepted (9999-12-31).
const MAX_SERIAL_DAYS: f64 = 2_958_465.0;

/// Parse one cell as a timestamp. Returns `None` for anything unparseable.
///
/// Offsets in RFC 3339 strings are kept as local wall-clock time in that
/// offset, so the cohort date is the date the source system recorded.
pub fn parse_timestamp(value: &FieldValue) -> Option<NaiveDateTime> {
    match value {
        FieldValue::Timestamp(ts) => Some(*ts),
        FieldValue::Text(s) => parse_timestamp_str(s),
        FieldValue::Number(n) => from_serial_days(*n),
        FieldValue::Null | FieldValue::Bool(_) | FieldValue::Other(_) => None,
    }
}

/// Parse a timestamp string in any supported layout.
pub fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

fn from_serial_days(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days <= 0.0 || days > MAX_SERIAL_DAYS {
        return None;
    }
    let millis = (days * 86_400_000.0).round() as i64;
    spreadsheet_epoch()?.checked_add_signed(chrono::Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn fields() -> FieldNames {
        FieldNames {
            registration: "registered_at".into(),
            target: "first_paid_at".into(),
        }
    }

    fn row(reg: FieldValue, target: FieldValue) -> RawRow {
        let mut r = RawRow::new();
        r.insert("registered_at".into(), reg);
        r.insert("first_paid_at".into(), target);
        r
    }

    #[test]
    fn parses_common_layouts() {
        let expected = ts("2025-06-23 10:15:00");
        for s in [
            "2025-06-23 10:15:00",
            "2025-06-23T10:15:00",
            "2025-06-23 10:15",
            "2025/06/23 10:15:00",
            "2025-06-23T10:15:00Z",
            "2025-06-23T10:15:00+08:00",
            "  2025-06-23 10:15:00  ",
        ] {
            assert_eq!(parse_timestamp_str(s), Some(expected), "layout {:?}", s);
        }
    }

    #[test]
    fn parses_fractional_seconds_and_bare_dates() {
        let frac = parse_timestamp_str("2025-06-23 10:15:00.250").unwrap();
        assert_eq!(frac.and_utc().timestamp_subsec_millis(), 250);
        assert_eq!(
            parse_timestamp_str("2025/06/23"),
            Some(ts("2025-06-23 00:00:00"))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp_str("tomorrow"), None);
        assert_eq!(parse_timestamp_str("2025-13-01"), None);
        assert_eq!(parse_timestamp(&FieldValue::Bool(true)), None);
    }

    #[test]
    fn spreadsheet_serial_days() {
        // 45831.5 = 2025-06-23 12:00
        assert_eq!(
            parse_timestamp(&FieldValue::Number(45831.5)),
            Some(ts("2025-06-23 12:00:00"))
        );
        assert_eq!(parse_timestamp(&FieldValue::Number(-1.0)), None);
        assert_eq!(parse_timestamp(&FieldValue::Number(f64::NAN)), None);
    }

    #[test]
    fn untagged_cells_deserialize() {
        let r: RawRow = serde_json::from_str(
            r#"{"registered_at":"2025-06-23 10:00:00","first_paid_at":null,"n":45831,"tags":[1]}"#,
        )
        .unwrap();
        assert_eq!(r["first_paid_at"], FieldValue::Null);
        assert_eq!(r["n"], FieldValue::Number(45831.0));
        assert!(matches!(r["tags"], FieldValue::Other(_)));
    }

    #[test]
    fn normalize_counts_rejections_and_targets() {
        let mut no_reg = RawRow::new();
        no_reg.insert("first_paid_at".into(), "2025-06-24 00:00:00".into());

        let rows = vec![
            row("2025-06-23 10:00:00".into(), "2025-06-23 20:00:00".into()),
            row("2025-06-23 11:00:00".into(), FieldValue::Null),
            row("2025-06-23 12:00:00".into(), "not a date".into()),
            row("2025-06-23 13:00:00".into(), "NaT".into()),
            row("garbage".into(), "2025-06-24 00:00:00".into()),
            no_reg,
        ];
        let outcome = normalize_rows(&rows, &fields());

        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.absent_targets, 2);
        assert_eq!(outcome.unparseable_targets, 1);
        assert_eq!(
            outcome.rejected,
            vec![
                RejectedRow {
                    row: 4,
                    reason: RejectReason::UnparseableRegistration
                },
                RejectedRow {
                    row: 5,
                    reason: RejectReason::MissingRegistration
                },
            ]
        );
        assert_eq!(outcome.records[0].source_row, 0);
        assert_eq!(
            outcome.records[0].target_event_time,
            Some(ts("2025-06-23 20:00:00"))
        );
        assert!(outcome.records[2].target_event_time.is_none());
    }

    #[test]
    fn retain_with_target_drops_absent() {
        let rows = vec![
            row("2025-06-23 10:00:00".into(), "2025-06-23 20:00:00".into()),
            row("2025-06-23 11:00:00".into(), FieldValue::Null),
        ];
        let mut outcome = normalize_rows(&rows, &fields());
        assert_eq!(outcome.retain_with_target(), 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn native_timestamps_pass_through() {
        let t = ts("2025-06-23 10:00:00");
        let rows = vec![row(t.into(), FieldValue::from(None::<NaiveDateTime>))];
        let outcome = normalize_rows(&rows, &fields());
        assert_eq!(outcome.records[0].registration_time, t);
        assert_eq!(outcome.absent_targets, 1);
    }
}
