//! Frequency distributions of elapsed time-to-event.
//!
//! Bins are unit-width and half-open, `[i, i+1)`, labeled `"{i}-{i+1}{unit}"`.
//! The bin set is dense: empty bins inside the range are reported with a
//! zero count.

use cm_config::{BinRange, HistogramSpec, TimeUnit, MAX_HISTOGRAM_BINS};
use serde::Serialize;

use crate::record::EventRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    pub lo: u32,
    pub hi: u32,
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub label: String,
    pub unit: TimeUnit,
    pub range: BinRange,
    pub bins: Vec<HistogramBin>,
    /// Values placed in a bin.
    pub total: u64,
    /// Values at or past the cap that were folded into the last bin.
    pub clamped: u64,
    /// Values excluded by a truncating range, past the observed bin limit,
    /// or negative/non-finite input.
    pub dropped: u64,
}

impl Histogram {
    pub fn counts(&self) -> Vec<u64> {
        self.bins.iter().map(|b| b.count).collect()
    }
}

/// Valid elapsed values of `records` in `unit` (fractional hours, whole days).
pub fn elapsed_values<'a>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    unit: TimeUnit,
) -> Vec<f64> {
    records
        .into_iter()
        .filter_map(|r| r.valid_elapsed())
        .map(|e| e.in_unit(unit))
        .collect()
}

/// Bin `values` under `range`.
pub fn bin_values(label: &str, values: &[f64], unit: TimeUnit, range: BinRange) -> Histogram {
    let mut dropped = 0u64;
    let mut clamped = 0u64;

    let mut indices: Vec<u64> = Vec::with_capacity(values.len());
    for &v in values {
        if !v.is_finite() || v < 0.0 {
            dropped += 1;
            continue;
        }
        indices.push(v.floor() as u64);
    }

    let limit = u64::from(MAX_HISTOGRAM_BINS);
    let bin_count: u64 = match range {
        BinRange::Observed => indices
            .iter()
            .filter(|idx| **idx < limit)
            .max()
            .map_or(0, |max| max + 1),
        BinRange::Capped { cap } | BinRange::Truncated { cap } => u64::from(cap).min(limit),
    };

    let mut counts = vec![0u64; bin_count as usize];
    for idx in indices {
        let slot = match range {
            BinRange::Observed if idx >= bin_count => None,
            BinRange::Observed => Some(idx),
            BinRange::Capped { .. } if idx >= bin_count => {
                clamped += 1;
                bin_count.checked_sub(1)
            }
            BinRange::Truncated { .. } if idx >= bin_count => None,
            _ => Some(idx),
        };
        match slot {
            Some(i) => counts[i as usize] += 1,
            None => dropped += 1,
        }
    }

    let suffix = unit.suffix();
    let bins: Vec<HistogramBin> = counts
        .into_iter()
        .enumerate()
        .filter_map(|(i, count)| {
            let lo = u32::try_from(i).ok()?;
            let hi = lo.checked_add(1)?;
            Some(HistogramBin {
                lo,
                hi,
                label: format!("{}-{}{}", lo, hi, suffix),
                count,
            })
        })
        .collect();

    Histogram {
        label: label.to_string(),
        unit,
        range,
        total: bins.iter().map(|b| b.count).sum(),
        bins,
        clamped,
        dropped,
    }
}

/// Build the histogram described by `spec` over `records`.
pub fn build_histogram<'a>(
    spec: &HistogramSpec,
    records: impl IntoIterator<Item = &'a EventRecord>,
) -> Histogram {
    let values = elapsed_values(records, spec.unit);
    bin_values(&spec.label, &values, spec.unit, spec.range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_range_is_dense() {
        let h = bin_values("d", &[0.0, 0.0, 3.0], TimeUnit::Day, BinRange::Observed);
        assert_eq!(h.counts(), vec![2, 0, 0, 1]);
        assert_eq!(h.bins[3].label, "3-4d");
        assert_eq!(h.total, 3);
        assert_eq!(h.dropped, 0);
    }

    #[test]
    fn observed_empty_input_has_no_bins() {
        let h = bin_values("d", &[], TimeUnit::Day, BinRange::Observed);
        assert!(h.bins.is_empty());
        assert_eq!(h.total, 0);
    }

    #[test]
    fn bins_are_half_open() {
        let h = bin_values("h", &[0.99, 1.0, 1.5], TimeUnit::Hour, BinRange::Observed);
        assert_eq!(h.counts(), vec![1, 2]);
        assert_eq!(h.bins[0].label, "0-1h");
    }

    #[test]
    fn capped_clamps_into_last_bin() {
        let h = bin_values(
            "d",
            &[1.0, 34.0, 35.0, 200.0],
            TimeUnit::Day,
            BinRange::Capped { cap: 35 },
        );
        assert_eq!(h.bins.len(), 35);
        assert_eq!(h.bins[34].count, 3);
        assert_eq!(h.bins[34].label, "34-35d");
        assert_eq!(h.clamped, 2);
        assert_eq!(h.total, 4);
    }

    #[test]
    fn truncated_drops_values_at_or_above_cap() {
        let h = bin_values(
            "h",
            &[0.5, 23.9, 24.0, 30.0],
            TimeUnit::Hour,
            BinRange::Truncated { cap: 24 },
        );
        assert_eq!(h.bins.len(), 24);
        assert_eq!(h.total, 2);
        assert_eq!(h.dropped, 2);
        assert_eq!(h.bins[23].count, 1);
    }

    #[test]
    fn observed_outlier_past_limit_is_dropped() {
        let reg = chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let far = chrono::NaiveDate::from_ymd_opt(9999, 12, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let records = vec![
            EventRecord::new(reg, Some(reg + chrono::Duration::minutes(90))),
            EventRecord::new(reg, Some(far)),
        ];
        let spec = HistogramSpec {
            label: "hours".into(),
            unit: TimeUnit::Hour,
            range: BinRange::Observed,
        };
        let h = build_histogram(&spec, &records);
        assert_eq!(h.counts(), vec![0, 1]);
        assert_eq!(h.dropped, 1);
        assert_eq!(h.total, 1);
    }

    #[test]
    fn observed_never_exceeds_bin_limit() {
        let values = [0.0, f64::from(MAX_HISTOGRAM_BINS) - 0.5, 1e12];
        let h = bin_values("h", &values, TimeUnit::Hour, BinRange::Observed);
        assert_eq!(h.bins.len(), MAX_HISTOGRAM_BINS as usize);
        assert_eq!(h.dropped, 1);
        assert_eq!(h.bins.last().map(|b| b.hi), Some(MAX_HISTOGRAM_BINS));
    }

    #[test]
    fn negative_and_nan_values_are_dropped() {
        let h = bin_values("h", &[-1.0, f64::NAN, 2.0], TimeUnit::Hour, BinRange::Observed);
        assert_eq!(h.dropped, 2);
        assert_eq!(h.counts(), vec![0, 0, 1]);
    }
}
