//! Built-in analysis presets.
//!
//! Provides ready-made configurations for:
//! - Conversion: daily cohorts, time-to-first-payment windows, weekly median trend
//! - Retention: ISO-week cohorts of paying users, last-login thresholds
//! - Pay time: time-to-first-payment frequency distributions

use crate::analysis::{
    AnalysisConfig, BinRange, CohortConfig, CohortGranularity, DistributionBucket, FieldNames,
    HistogramSpec, PeriodConfig, PeriodOrder, PeriodRange, TimeUnit, WindowSpec,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetName {
    /// Registration → first payment conversion by registration date
    Conversion,
    /// Registration → last login retention by ISO week
    Retention,
    /// Registration → first payment elapsed-time distributions
    PayTime,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Conversion,
        PresetName::Retention,
        PresetName::PayTime,
    ];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Conversion => "conversion",
            PresetName::Retention => "retention",
            PresetName::PayTime => "pay_time",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "conversion" | "conv" => Some(PresetName::Conversion),
            "retention" | "ret" => Some(PresetName::Retention),
            "pay_time" | "paytime" => Some(PresetName::PayTime),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Conversion => {
                "Daily cohorts; 12h/24h/D7/D14/D30/D90 payment conversion; weekly D7/D14/D30 medians"
            }
            PresetName::Retention => {
                "ISO-week cohorts of users with a last login; D1/D7/D30 retention; retention-day buckets"
            }
            PresetName::PayTime => {
                "Time to first payment: day histogram capped at 35 days, hour histogram within 24h"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = cm_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| cm_common::Error::UnknownPreset(s.to_string()))
    }
}

/// Preset listing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: String,
}

/// List all presets with descriptions.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|name| PresetInfo {
            name: *name,
            description: name.description().to_string(),
        })
        .collect()
}

/// Build the configuration for a preset.
pub fn get_preset(name: PresetName) -> AnalysisConfig {
    match name {
        PresetName::Conversion => conversion_preset(),
        PresetName::Retention => retention_preset(),
        PresetName::PayTime => pay_time_preset(),
    }
}

const REGISTERED_AT: &str = "registered_at";
const FIRST_PAID_AT: &str = "first_paid_at";
const LAST_LOGIN_AT: &str = "last_login_at";

fn conversion_preset() -> AnalysisConfig {
    AnalysisConfig {
        schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
        description: Some(PresetName::Conversion.description().to_string()),
        fields: FieldNames {
            registration: REGISTERED_AT.to_string(),
            target: FIRST_PAID_AT.to_string(),
        },
        cohort: CohortConfig {
            granularity: CohortGranularity::Day,
            require_target: false,
        },
        windows: vec![
            WindowSpec::within("D12h", TimeUnit::Hour, 12.0),
            WindowSpec::within("D24h", TimeUnit::Hour, 24.0),
            WindowSpec::within("D7", TimeUnit::Day, 7.0),
            WindowSpec::within("D14", TimeUnit::Day, 14.0),
            WindowSpec::within("D30", TimeUnit::Day, 30.0),
            WindowSpec::within("D90", TimeUnit::Day, 90.0),
        ],
        histograms: vec![
            HistogramSpec {
                label: "pay_days".to_string(),
                unit: TimeUnit::Day,
                range: BinRange::Observed,
            },
            HistogramSpec {
                label: "pay_hours_within_24h".to_string(),
                unit: TimeUnit::Hour,
                range: BinRange::Truncated { cap: 24 },
            },
        ],
        periods: Some(PeriodConfig {
            order: PeriodOrder::NewestFirst,
            metrics: vec!["D7".to_string(), "D14".to_string(), "D30".to_string()],
            ranges: weekly_ranges_newest_first(ymd(2025, 6, 23), 11),
        }),
        distribution: Vec::new(),
    }
}

fn retention_preset() -> AnalysisConfig {
    AnalysisConfig {
        schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
        description: Some(PresetName::Retention.description().to_string()),
        fields: FieldNames {
            registration: REGISTERED_AT.to_string(),
            target: LAST_LOGIN_AT.to_string(),
        },
        cohort: CohortConfig {
            granularity: CohortGranularity::IsoWeek,
            require_target: true,
        },
        windows: vec![
            WindowSpec::at_least("D1", TimeUnit::Day, 1.0),
            WindowSpec::at_least("D7", TimeUnit::Day, 7.0),
            WindowSpec::at_least("D30", TimeUnit::Day, 30.0),
        ],
        histograms: Vec::new(),
        periods: None,
        distribution: vec![
            bucket("same day", 0, Some(0)),
            bucket("next day", 1, Some(1)),
            bucket("2-7 days", 2, Some(7)),
            bucket("8-30 days", 8, Some(30)),
            bucket("over 30 days", 31, None),
        ],
    }
}

fn pay_time_preset() -> AnalysisConfig {
    AnalysisConfig {
        schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
        description: Some(PresetName::PayTime.description().to_string()),
        fields: FieldNames {
            registration: REGISTERED_AT.to_string(),
            target: FIRST_PAID_AT.to_string(),
        },
        cohort: CohortConfig {
            granularity: CohortGranularity::Day,
            require_target: true,
        },
        windows: Vec::new(),
        histograms: vec![
            HistogramSpec {
                label: "pay_days_capped_35".to_string(),
                unit: TimeUnit::Day,
                range: BinRange::Capped { cap: 35 },
            },
            HistogramSpec {
                label: "pay_hours_within_24h".to_string(),
                unit: TimeUnit::Hour,
                range: BinRange::Truncated { cap: 24 },
            },
        ],
        periods: None,
        distribution: Vec::new(),
    }
}

fn bucket(label: &str, min_days: u32, max_days: Option<u32>) -> DistributionBucket {
    DistributionBucket {
        label: label.to_string(),
        min_days,
        max_days,
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Seven-day ranges labeled `MMDD-MMDD`, starting at `latest_start` and
/// stepping back one week per entry.
fn weekly_ranges_newest_first(latest_start: NaiveDate, count: u32) -> Vec<PeriodRange> {
    (0..count)
        .map(|i| {
            let start = latest_start - chrono::Duration::days(7 * i64::from(i));
            let end = start + chrono::Duration::days(6);
            PeriodRange::new(
                format!("{}-{}", start.format("%m%d"), end.format("%m%d")),
                start,
                end,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_config;
    use crate::analysis::WindowComparison;

    #[test]
    fn test_all_presets_validate() {
        for name in PresetName::ALL {
            let cfg = get_preset(*name);
            validate_config(&cfg).unwrap_or_else(|e| panic!("preset {} invalid: {}", name, e));
        }
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!(PresetName::parse("conversion"), Some(PresetName::Conversion));
        assert_eq!(PresetName::parse("pay-time"), Some(PresetName::PayTime));
        assert_eq!(PresetName::parse("RETENTION"), Some(PresetName::Retention));
        assert_eq!(PresetName::parse("weekly"), None);
        assert!("weekly".parse::<PresetName>().is_err());
    }

    #[test]
    fn test_conversion_period_table() {
        let cfg = get_preset(PresetName::Conversion);
        let periods = cfg.periods.unwrap();
        assert_eq!(periods.ranges.len(), 11);
        assert_eq!(periods.ranges[0].label, "0623-0629");
        assert_eq!(periods.ranges[4].label, "0526-0601");
        assert_eq!(periods.ranges[10].label, "0414-0420");
        assert_eq!(periods.ranges[10].start, ymd(2025, 4, 14));
        assert_eq!(periods.ranges[10].end, ymd(2025, 4, 20));
        assert_eq!(periods.order, PeriodOrder::NewestFirst);
    }

    #[test]
    fn test_retention_thresholds_are_at_least() {
        let cfg = get_preset(PresetName::Retention);
        assert!(cfg
            .windows
            .iter()
            .all(|w| w.comparison == WindowComparison::AtLeast));
        assert_eq!(cfg.distribution.len(), 5);
    }

    #[test]
    fn test_list_presets() {
        let list = list_presets();
        assert_eq!(list.len(), PresetName::ALL.len());
        assert!(list.iter().all(|p| !p.description.is_empty()));
    }
}
