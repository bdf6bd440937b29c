//! Order statistics and summaries over `f64` samples.
//!
//! NaN inputs are skipped by every function here; the callers only feed
//! rates and elapsed times, where NaN can only come from a bug upstream.

use serde::{Deserialize, Serialize};

fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Median of a sample.
///
/// Odd-sized samples yield the middle value; even-sized samples yield the
/// mean of the two middle values. Returns `None` for an empty sample.
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = finite_sorted(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Arithmetic mean. Returns `None` for an empty sample.
pub fn mean(values: &[f64]) -> Option<f64> {
    let mut count = 0usize;
    let mut sum = 0.0;
    for v in values.iter().filter(|v| !v.is_nan()) {
        count += 1;
        sum += v;
    }
    if count == 0 {
        return None;
    }
    Some(sum / count as f64)
}

/// Five-number style summary used for elapsed-time reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize a sample. Returns `None` for an empty sample.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    let sorted = finite_sorted(values);
    let first = *sorted.first()?;
    let last = *sorted.last()?;
    Some(Summary {
        count: sorted.len(),
        mean: mean(&sorted)?,
        median: median(&sorted)?,
        min: first,
        max: last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12
    }

    #[test]
    fn median_odd() {
        assert_eq!(median(&[0.5, 0.1, 0.3]), Some(0.3));
    }

    #[test]
    fn median_even_averages_middle_pair() {
        let m = median(&[0.3, 0.1]).unwrap();
        assert!(approx_eq(m, 0.2), "got {}", m);
    }

    #[test]
    fn median_single_and_empty() {
        assert_eq!(median(&[0.42]), Some(0.42));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn median_skips_nan() {
        assert_eq!(median(&[f64::NAN, 1.0, 3.0, 2.0]), Some(2.0));
        assert_eq!(median(&[f64::NAN]), None);
    }

    #[test]
    fn mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn summarize_collects_extremes() {
        let s = summarize(&[4.0, 0.0, 9.0, 1.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.max, 9.0);
        assert!(approx_eq(s.mean, 3.5));
        assert!(approx_eq(s.median, 2.5));
    }

    #[test]
    fn summarize_empty() {
        assert!(summarize(&[]).is_none());
    }
}
