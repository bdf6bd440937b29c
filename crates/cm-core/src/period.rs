//! Median of per-cohort window rates over named calendar periods.

use chrono::NaiveDate;
use cm_common::{Error, Result};
use cm_config::{PeriodConfig, PeriodOrder, PeriodRange};
use cm_math::median;
use serde::Serialize;

use crate::window::WindowTable;

/// Median of one metric within one period. `None` when no cohort fell in
/// the period; never reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricMedian {
    pub metric: String,
    pub median: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodMedian {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Daily cohorts whose date lies in `[start, end]`.
    pub cohort_count: usize,
    pub medians: Vec<MetricMedian>,
}

impl PeriodMedian {
    pub fn median(&self, metric: &str) -> Option<f64> {
        self.medians
            .iter()
            .find(|m| m.metric == metric)
            .and_then(|m| m.median)
    }

    pub fn is_empty(&self) -> bool {
        self.cohort_count == 0
    }
}

/// Period medians in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTable {
    pub metrics: Vec<String>,
    pub periods: Vec<PeriodMedian>,
}

impl PeriodTable {
    pub fn empty_periods(&self) -> usize {
        self.periods.iter().filter(|p| p.is_empty()).count()
    }
}

/// Ranges in chronological order; newest-first input is reversed.
pub fn chronological(ranges: &[PeriodRange], order: PeriodOrder) -> Vec<PeriodRange> {
    let mut out = ranges.to_vec();
    if order == PeriodOrder::NewestFirst {
        out.reverse();
    }
    out
}

/// Aggregate daily cohort rates in `table` into the configured periods.
///
/// Rows whose key is not a calendar day are ignored.
pub fn aggregate_periods(table: &WindowTable, config: &PeriodConfig) -> Result<PeriodTable> {
    let columns: Vec<usize> = config
        .metrics
        .iter()
        .map(|metric| {
            table
                .column_index(metric)
                .ok_or_else(|| Error::UnknownMetric {
                    metric: metric.clone(),
                    known: table
                        .columns
                        .iter()
                        .map(|c| c.label.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
        })
        .collect::<Result<_>>()?;

    let periods = chronological(&config.ranges, config.order)
        .into_iter()
        .map(|range| {
            let in_range: Vec<_> = table
                .rows
                .iter()
                .filter(|row| row.key.date().is_some_and(|d| range.contains(d)))
                .collect();

            let medians = config
                .metrics
                .iter()
                .zip(&columns)
                .map(|(metric, &col)| {
                    let rates: Vec<f64> = in_range.iter().map(|row| row.metrics[col].rate).collect();
                    MetricMedian {
                        metric: metric.clone(),
                        median: median(&rates),
                    }
                })
                .collect();

            PeriodMedian {
                label: range.label,
                start: range.start,
                end: range.end,
                cohort_count: in_range.len(),
                medians,
            }
        })
        .collect();

    Ok(PeriodTable {
        metrics: config.metrics.clone(),
        periods,
    })
}
