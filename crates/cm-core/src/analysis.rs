//! End-to-end analysis run: rows in, deterministic report out.
//!
//! The configuration is validated before any row is touched. Each stage
//! logs a `*.finished` event; the report itself carries no run id or wall
//! clock so identical input and configuration serialize identically.

use cm_common::{Result, REPORT_SCHEMA_VERSION};
use cm_config::{validate_config, AnalysisConfig, ConfigSnapshot, ConfigSource};
use cm_math::{summarize, Summary};
use serde::Serialize;

use crate::cohort::{group_cohorts, CohortSet};
use crate::distribution::{bucket_days, Distribution};
use crate::histogram::{build_histogram, Histogram};
use crate::logging::{event_names, Stage};
use crate::normalize::{normalize_rows, NormalizeOutcome, RawRow, RejectedRow};
use crate::period::{aggregate_periods, PeriodTable};
use crate::record::EventRecord;
use crate::window::WindowTable;

/// Rejected rows listed individually in the report; the rest are counted.
const REJECTED_SAMPLE_LIMIT: usize = 20;

/// What happened to the input rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputSummary {
    pub rows: usize,
    pub records: usize,
    pub rejected_rows: usize,
    pub rejected_sample: Vec<RejectedRow>,
    pub absent_targets: usize,
    pub unparseable_targets: usize,
    /// Records dropped because the configuration requires a target event.
    pub excluded_without_target: usize,
}

/// Complete output of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub schema_version: String,
    pub config: ConfigSnapshot,
    pub input: InputSummary,
    pub cohort_count: usize,
    pub windows: WindowTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<PeriodTable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub histograms: Vec<Histogram>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    /// Whole elapsed days over valid records; absent when there are none.
    pub elapsed_days: Option<Summary>,
}

impl AnalysisReport {
    /// No record survived normalization and filtering.
    pub fn is_empty(&self) -> bool {
        self.cohort_count == 0
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validate `config`, normalize `rows`, and compute every configured metric.
pub fn run_analysis(
    rows: &[RawRow],
    config: &AnalysisConfig,
    source: &ConfigSource,
) -> Result<AnalysisReport> {
    validate_config(config)?;

    let mut outcome = normalize_rows(rows, &config.fields);
    log_normalize(rows.len(), &outcome);

    let excluded = if config.cohort.require_target {
        outcome.retain_with_target()
    } else {
        0
    };

    let input = InputSummary {
        rows: rows.len(),
        records: outcome.records.len(),
        rejected_rows: outcome.rejected.len(),
        rejected_sample: outcome
            .rejected
            .iter()
            .take(REJECTED_SAMPLE_LIMIT)
            .cloned()
            .collect(),
        absent_targets: outcome.absent_targets,
        unparseable_targets: outcome.unparseable_targets,
        excluded_without_target: excluded,
    };

    analyze(outcome.records, input, config, source)
}

/// Compute every configured metric over already-normalized records.
///
/// Callers holding canonical records can skip the row normalizer; the
/// configuration is still validated first.
pub fn analyze_records(
    records: Vec<EventRecord>,
    config: &AnalysisConfig,
    source: &ConfigSource,
) -> Result<AnalysisReport> {
    validate_config(config)?;

    let mut records = records;
    let total = records.len();
    let excluded = if config.cohort.require_target {
        let before = records.len();
        records.retain(|r| r.target_event_time.is_some());
        before - records.len()
    } else {
        0
    };

    let input = InputSummary {
        rows: total,
        records: records.len(),
        absent_targets: records
            .iter()
            .filter(|r| r.target_event_time.is_none())
            .count()
            + excluded,
        excluded_without_target: excluded,
        ..InputSummary::default()
    };

    analyze(records, input, config, source)
}

fn analyze(
    records: Vec<EventRecord>,
    input: InputSummary,
    config: &AnalysisConfig,
    source: &ConfigSource,
) -> Result<AnalysisReport> {
    let cohorts = group_cohorts(records, config.cohort.granularity);
    tracing::info!(
        target: event_names::GROUP_FINISHED,
        stage = %Stage::Group,
        granularity = %config.cohort.granularity,
        cohorts = cohorts.len() as u64,
        members = cohorts.total_members() as u64,
        excluded_without_target = input.excluded_without_target as u64,
        message = "cohorts grouped"
    );

    let windows = WindowTable::build(&cohorts, &config.windows);
    log_windows(&windows);

    let histograms: Vec<Histogram> = config
        .histograms
        .iter()
        .map(|spec| build_histogram(spec, cohorts.records()))
        .collect();
    for h in &histograms {
        tracing::info!(
            target: event_names::HISTOGRAM_FINISHED,
            stage = %Stage::Histogram,
            histogram = %h.label,
            bins = h.bins.len() as u64,
            total = h.total,
            clamped = h.clamped,
            dropped = h.dropped,
            message = "histogram built"
        );
    }

    let periods = match &config.periods {
        Some(period_config) => {
            let table = aggregate_periods(&windows, period_config)?;
            log_periods(&table);
            Some(table)
        }
        None => None,
    };

    let distribution = if config.distribution.is_empty() {
        None
    } else {
        Some(bucket_days(cohorts.records(), &config.distribution))
    };

    let elapsed_days = elapsed_day_summary(&cohorts);

    Ok(AnalysisReport {
        schema_version: REPORT_SCHEMA_VERSION.to_string(),
        config: ConfigSnapshot::new(config, source),
        input,
        cohort_count: cohorts.len(),
        windows,
        periods,
        histograms,
        distribution,
        elapsed_days,
    })
}

fn elapsed_day_summary(cohorts: &CohortSet) -> Option<Summary> {
    let days: Vec<f64> = cohorts
        .records()
        .filter_map(|r| r.valid_elapsed())
        .filter_map(|e| e.whole_days())
        .map(f64::from)
        .collect();
    summarize(&days)
}

fn log_normalize(rows: usize, outcome: &NormalizeOutcome) {
    for rejected in outcome.rejected.iter().take(REJECTED_SAMPLE_LIMIT) {
        tracing::debug!(
            target: event_names::NORMALIZE_ROW_REJECTED,
            stage = %Stage::Normalize,
            row = rejected.row as u64,
            reason = ?rejected.reason,
            message = "row rejected"
        );
    }

    if outcome.rejected.is_empty() {
        tracing::info!(
            target: event_names::NORMALIZE_FINISHED,
            stage = %Stage::Normalize,
            rows = rows as u64,
            records = outcome.records.len() as u64,
            rejected = 0u64,
            unparseable_targets = outcome.unparseable_targets as u64,
            message = "rows normalized"
        );
    } else {
        tracing::warn!(
            target: event_names::NORMALIZE_FINISHED,
            stage = %Stage::Normalize,
            rows = rows as u64,
            records = outcome.records.len() as u64,
            rejected = outcome.rejected.len() as u64,
            unparseable_targets = outcome.unparseable_targets as u64,
            message = "rows normalized with rejections"
        );
    }
}

fn log_windows(table: &WindowTable) {
    if table.overall.invalid_elapsed > 0 {
        tracing::warn!(
            target: event_names::WINDOW_INVALID_ELAPSED,
            stage = %Stage::Window,
            invalid_elapsed = table.overall.invalid_elapsed,
            message = "target events before registration excluded from window counts"
        );
    }
    tracing::info!(
        target: event_names::WINDOW_FINISHED,
        stage = %Stage::Window,
        windows = table.columns.len() as u64,
        cohorts = table.rows.len() as u64,
        message = "window metrics computed"
    );
}

fn log_periods(table: &PeriodTable) {
    for period in table.periods.iter().filter(|p| p.is_empty()) {
        tracing::debug!(
            target: event_names::PERIOD_EMPTY,
            stage = %Stage::Period,
            period = %period.label,
            message = "no cohorts in period"
        );
    }
    tracing::info!(
        target: event_names::PERIOD_FINISHED,
        stage = %Stage::Period,
        periods = table.periods.len() as u64,
        empty_periods = table.empty_periods() as u64,
        message = "period medians computed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FieldValue;
    use cm_common::Error;
    use cm_config::{get_preset, PresetName, TimeUnit, WindowSpec};

    fn row(reg: &str, target: Option<&str>) -> RawRow {
        let mut r = RawRow::new();
        r.insert("registered_at".into(), reg.into());
        r.insert("first_paid_at".into(), FieldValue::from(target));
        r
    }

    #[test]
    fn invalid_config_fails_before_computation() {
        let mut cfg = get_preset(PresetName::Conversion);
        cfg.windows.push(WindowSpec::within("bad", TimeUnit::Hour, -1.0));
        let err = run_analysis(&[], &cfg, &ConfigSource::BuiltinPreset).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }), "{:?}", err);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let cfg = get_preset(PresetName::Conversion);
        let report = run_analysis(&[], &cfg, &ConfigSource::BuiltinPreset).unwrap();
        assert!(report.is_empty());
        assert!(report.elapsed_days.is_none());
        let periods = report.periods.unwrap();
        assert!(periods
            .periods
            .iter()
            .all(|p| p.medians.iter().all(|m| m.median.is_none())));
    }

    #[test]
    fn require_target_shrinks_population() {
        let cfg = get_preset(PresetName::PayTime);
        let rows = vec![
            row("2025-06-23 10:00:00", Some("2025-06-24 11:00:00")),
            row("2025-06-23 11:00:00", None),
        ];
        let report = run_analysis(&rows, &cfg, &ConfigSource::BuiltinPreset).unwrap();
        assert_eq!(report.input.excluded_without_target, 1);
        assert_eq!(report.input.records, 1);
        assert_eq!(report.windows.overall.cohort_size, 1);
        let summary = report.elapsed_days.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.median, 1.0);
    }

    #[test]
    fn records_entry_point_matches_rows_entry_point() {
        let cfg = get_preset(PresetName::Conversion);
        let rows = vec![
            row("2025-06-23 10:00:00", Some("2025-06-23 20:00:00")),
            row("2025-06-24 09:00:00", None),
        ];
        let from_rows = run_analysis(&rows, &cfg, &ConfigSource::BuiltinPreset).unwrap();
        let records = normalize_rows(&rows, &cfg.fields).records;
        let from_records = analyze_records(records, &cfg, &ConfigSource::BuiltinPreset).unwrap();
        assert_eq!(from_rows.windows, from_records.windows);
        assert_eq!(from_rows.periods, from_records.periods);
    }
}
