//! Analysis configuration types.
//!
//! One `AnalysisConfig` describes a complete batch run: which columns hold
//! the timestamps, how users are grouped into cohorts, and which windows,
//! histograms, period medians and distributions to compute.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::validate::ValidationError;

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    pub fields: FieldNames,

    #[serde(default)]
    pub cohort: CohortConfig,

    /// Ordered window list; output columns follow this order.
    #[serde(default)]
    pub windows: Vec<WindowSpec>,

    #[serde(default)]
    pub histograms: Vec<HistogramSpec>,

    #[serde(default)]
    pub periods: Option<PeriodConfig>,

    #[serde(default)]
    pub distribution: Vec<DistributionBucket>,
}

impl AnalysisConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Look up a window by label.
    pub fn window(&self, label: &str) -> Option<&WindowSpec> {
        self.windows.iter().find(|w| w.label == label)
    }

    /// Window labels in configured order.
    pub fn window_labels(&self) -> Vec<&str> {
        self.windows.iter().map(|w| w.label.as_str()).collect()
    }
}

/// Source column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    /// Registration timestamp column (required per row).
    pub registration: String,
    /// Target event column: first payment or last login (optional per row).
    pub target: String,
}

/// Unit for elapsed-time windows and histogram bins.
///
/// Hours are fractional. Days are whole elapsed days: the floor of the
/// exact duration, never a difference of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Hour,
    Day,
}

impl TimeUnit {
    /// Short suffix used in labels ("h" or "d").
    pub fn suffix(&self) -> &'static str {
        match self {
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Hour => write!(f, "hour"),
            TimeUnit::Day => write!(f, "day"),
        }
    }
}

/// How a window bound is compared against a member's elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowComparison {
    /// Conversion: `0 <= elapsed <= bound`, both ends inclusive.
    #[default]
    Within,
    /// Retention: `elapsed >= bound` (elapsed must be non-negative).
    AtLeast,
}

impl fmt::Display for WindowComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowComparison::Within => write!(f, "within"),
            WindowComparison::AtLeast => write!(f, "at_least"),
        }
    }
}

/// One elapsed-time window, e.g. `D7 = within 7 days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub label: String,
    pub unit: TimeUnit,
    pub bound: f64,
    #[serde(default)]
    pub comparison: WindowComparison,
}

impl WindowSpec {
    pub fn within(label: impl Into<String>, unit: TimeUnit, bound: f64) -> Self {
        WindowSpec {
            label: label.into(),
            unit,
            bound,
            comparison: WindowComparison::Within,
        }
    }

    pub fn at_least(label: impl Into<String>, unit: TimeUnit, bound: f64) -> Self {
        WindowSpec {
            label: label.into(),
            unit,
            bound,
            comparison: WindowComparison::AtLeast,
        }
    }
}

/// Cohort key policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortGranularity {
    /// Calendar date of registration.
    #[default]
    Day,
    /// ISO year + ISO week number of registration.
    IsoWeek,
}

impl fmt::Display for CohortGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CohortGranularity::Day => write!(f, "day"),
            CohortGranularity::IsoWeek => write!(f, "iso_week"),
        }
    }
}

/// Cohort construction settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CohortConfig {
    #[serde(default)]
    pub granularity: CohortGranularity,

    /// Restrict the population to records that have a target event.
    #[serde(default)]
    pub require_target: bool,
}

/// Upper limit on the number of bins in one histogram. Observed ranges stop
/// here and drop values past it; capped and truncated ranges may not exceed it.
pub const MAX_HISTOGRAM_BINS: u32 = 100_000;

/// Bin range policy for elapsed-time histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum BinRange {
    /// Bins cover `[0, max_observed]`; only values past
    /// [`MAX_HISTOGRAM_BINS`] are dropped.
    Observed,
    /// `cap` bins; values at or above `cap` are clamped into the last bin.
    Capped { cap: u32 },
    /// `cap` bins; values at or above `cap` are dropped.
    Truncated { cap: u32 },
}

/// One histogram over elapsed time-to-event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramSpec {
    pub label: String,
    pub unit: TimeUnit,
    pub range: BinRange,
}

/// Input ordering of period ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodOrder {
    /// Most recent period first; reversed before aggregation.
    #[default]
    NewestFirst,
    OldestFirst,
}

/// A named, closed calendar-date range `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodRange {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        PeriodRange {
            label: label.into(),
            start,
            end,
        }
    }

    /// Whether `date` lies in `[start, end]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Period-median trend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodConfig {
    #[serde(default)]
    pub order: PeriodOrder,

    /// Window labels whose per-cohort rates are aggregated.
    pub metrics: Vec<String>,

    pub ranges: Vec<PeriodRange>,
}

/// Labeled bucket of whole elapsed days, `[min_days, max_days]` inclusive.
/// An absent `max_days` leaves the bucket open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub label: String,
    pub min_days: u32,
    #[serde(default)]
    pub max_days: Option<u32>,
}

impl DistributionBucket {
    pub fn contains(&self, days: u32) -> bool {
        days >= self.min_days && self.max_days.map_or(true, |max| days <= max)
    }
}
