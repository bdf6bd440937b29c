//! Per-cohort window conversion counts and rates.
//!
//! A member counts toward a window when its elapsed time satisfies the
//! window's comparison. Members without a target event, or whose target
//! precedes registration, never count but always stay in the cohort size.

use cm_config::{TimeUnit, WindowComparison, WindowSpec};
use cm_math::safe_rate;
use serde::Serialize;

use crate::cohort::{Cohort, CohortKey, CohortSet};
use crate::record::ElapsedDuration;

/// Count and rate for one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowMetric {
    pub label: String,
    pub paid_count: u64,
    /// `paid_count / cohort_size`, 0 for an empty cohort.
    pub rate: f64,
}

/// Whether `elapsed` satisfies `window`.
pub fn window_includes(window: &WindowSpec, elapsed: &ElapsedDuration) -> bool {
    if elapsed.is_negative() {
        return false;
    }
    let value = elapsed.in_unit(window.unit);
    match window.comparison {
        WindowComparison::Within => value <= window.bound,
        WindowComparison::AtLeast => value >= window.bound,
    }
}

/// One metric per window, in window order.
pub fn count_windows(cohort: &Cohort, windows: &[WindowSpec]) -> Vec<WindowMetric> {
    let mut counts = vec![0u64; windows.len()];
    for elapsed in cohort.members.iter().filter_map(|r| r.valid_elapsed()) {
        for (count, window) in counts.iter_mut().zip(windows) {
            if window_includes(window, &elapsed) {
                *count += 1;
            }
        }
    }

    let size = cohort.size() as u64;
    windows
        .iter()
        .zip(counts)
        .map(|(window, paid_count)| WindowMetric {
            label: window.label.clone(),
            paid_count,
            rate: safe_rate(paid_count, size),
        })
        .collect()
}

/// One cohort's row of the window table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortWindowRow {
    pub key: CohortKey,
    pub label: String,
    pub cohort_size: u64,
    /// Members with a target event at or after registration.
    pub with_target: u64,
    /// Members whose target event precedes registration.
    pub invalid_elapsed: u64,
    pub metrics: Vec<WindowMetric>,
}

impl CohortWindowRow {
    pub fn from_cohort(cohort: &Cohort, windows: &[WindowSpec]) -> Self {
        CohortWindowRow {
            key: cohort.key,
            label: cohort.label(),
            cohort_size: cohort.size() as u64,
            with_target: cohort.valid_members().count() as u64,
            invalid_elapsed: cohort
                .members
                .iter()
                .filter(|r| r.has_invalid_elapsed())
                .count() as u64,
            metrics: count_windows(cohort, windows),
        }
    }

    pub fn metric(&self, label: &str) -> Option<&WindowMetric> {
        self.metrics.iter().find(|m| m.label == label)
    }

    pub fn rate(&self, label: &str) -> Option<f64> {
        self.metric(label).map(|m| m.rate)
    }
}

/// Totals across every cohort: summed counts over summed sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallRow {
    pub cohort_size: u64,
    pub with_target: u64,
    pub invalid_elapsed: u64,
    pub metrics: Vec<WindowMetric>,
}

/// Window column description carried into the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowColumn {
    pub label: String,
    pub unit: TimeUnit,
    pub bound: f64,
    pub comparison: WindowComparison,
}

impl From<&WindowSpec> for WindowColumn {
    fn from(w: &WindowSpec) -> Self {
        WindowColumn {
            label: w.label.clone(),
            unit: w.unit,
            bound: w.bound,
            comparison: w.comparison,
        }
    }
}

/// Window metrics for every cohort, ascending by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowTable {
    pub columns: Vec<WindowColumn>,
    pub rows: Vec<CohortWindowRow>,
    pub overall: OverallRow,
}

impl WindowTable {
    pub fn build(cohorts: &CohortSet, windows: &[WindowSpec]) -> Self {
        let rows: Vec<CohortWindowRow> = cohorts
            .iter()
            .map(|c| CohortWindowRow::from_cohort(c, windows))
            .collect();

        let cohort_size: u64 = rows.iter().map(|r| r.cohort_size).sum();
        let metrics = windows
            .iter()
            .enumerate()
            .map(|(i, window)| {
                let paid_count: u64 = rows.iter().map(|r| r.metrics[i].paid_count).sum();
                WindowMetric {
                    label: window.label.clone(),
                    paid_count,
                    rate: safe_rate(paid_count, cohort_size),
                }
            })
            .collect();

        let overall = OverallRow {
            cohort_size,
            with_target: rows.iter().map(|r| r.with_target).sum(),
            invalid_elapsed: rows.iter().map(|r| r.invalid_elapsed).sum(),
            metrics,
        };

        WindowTable {
            columns: windows.iter().map(WindowColumn::from).collect(),
            rows,
            overall,
        }
    }

    /// Position of a window label among the columns.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label == label)
    }

    pub fn row(&self, key: &CohortKey) -> Option<&CohortWindowRow> {
        self.rows.iter().find(|r| &r.key == key)
    }
}
