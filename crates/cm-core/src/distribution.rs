//! Counts of whole elapsed days in labeled buckets.

use cm_config::DistributionBucket;
use cm_math::safe_rate;
use serde::Serialize;

use crate::record::EventRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub label: String,
    pub min_days: u32,
    pub max_days: Option<u32>,
    pub count: u64,
    /// Share of all bucketed records.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub rows: Vec<DistributionRow>,
    pub total: u64,
    /// Valid records that matched no bucket.
    pub unbucketed: u64,
}

/// Bucket the whole elapsed days of `records`. The first matching bucket wins.
pub fn bucket_days<'a>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    buckets: &[DistributionBucket],
) -> Distribution {
    let mut counts = vec![0u64; buckets.len()];
    let mut unbucketed = 0u64;

    for days in records
        .into_iter()
        .filter_map(|r| r.valid_elapsed())
        .filter_map(|e| e.whole_days())
    {
        match buckets.iter().position(|b| b.contains(days)) {
            Some(i) => counts[i] += 1,
            None => unbucketed += 1,
        }
    }

    let total: u64 = counts.iter().sum();
    let rows = buckets
        .iter()
        .zip(counts)
        .map(|(bucket, count)| DistributionRow {
            label: bucket.label.clone(),
            min_days: bucket.min_days,
            max_days: bucket.max_days,
            count,
            share: safe_rate(count, total),
        })
        .collect();

    Distribution {
        rows,
        total,
        unbucketed,
    }
}
