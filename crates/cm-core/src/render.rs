//! Human-facing renderings of an [`AnalysisReport`].
//!
//! JSON is the canonical form; Markdown and the one-line summary are views
//! over the same data.

use std::fmt::Write;

use cm_common::{OutputFormat, Result};
use cm_math::as_percent;

use crate::analysis::AnalysisReport;
use crate::window::WindowMetric;

/// Render `report` in `format`.
pub fn render(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => report.to_json_pretty(),
        OutputFormat::Md => Ok(render_markdown(report)),
        OutputFormat::Summary => Ok(render_summary(report)),
    }
}

fn pct(rate: f64) -> String {
    format!("{:.1}%", as_percent(rate, 1))
}

fn metric_cell(m: &WindowMetric) -> String {
    format!("{} ({})", m.paid_count, pct(m.rate))
}

fn table_header(out: &mut String, columns: &[&str]) {
    let _ = writeln!(out, "| {} |", columns.join(" | "));
    let _ = writeln!(
        out,
        "|{}",
        columns.iter().map(|_| "---|").collect::<String>()
    );
}

/// Markdown tables, one section per computed metric family.
pub fn render_markdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let summary = &report.config.summary;

    let _ = writeln!(out, "# Cohort metrics report\n");
    let _ = writeln!(
        out,
        "Config `{}` ({}), `{}` -> `{}`, {} cohorts.\n",
        report.config.short_id(),
        report.config.source,
        summary.registration_field,
        summary.target_field,
        summary.granularity
    );

    let input = &report.input;
    let _ = writeln!(out, "## Input\n");
    table_header(
        &mut out,
        &["Rows", "Records", "Rejected", "No target", "Unparseable target", "Excluded"],
    );
    let _ = writeln!(
        out,
        "| {} | {} | {} | {} | {} | {} |\n",
        input.rows,
        input.records,
        input.rejected_rows,
        input.absent_targets,
        input.unparseable_targets,
        input.excluded_without_target
    );

    let windows = &report.windows;
    if !windows.columns.is_empty() {
        let _ = writeln!(out, "## Windows\n");
        let mut header = vec!["Cohort", "Size"];
        header.extend(windows.columns.iter().map(|c| c.label.as_str()));
        table_header(&mut out, &header);
        for row in &windows.rows {
            let cells: Vec<String> = row.metrics.iter().map(metric_cell).collect();
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                row.label,
                row.cohort_size,
                cells.join(" | ")
            );
        }
        let cells: Vec<String> = windows.overall.metrics.iter().map(metric_cell).collect();
        let _ = writeln!(
            out,
            "| **Overall** | {} | {} |\n",
            windows.overall.cohort_size,
            cells.join(" | ")
        );
    }

    if let Some(periods) = &report.periods {
        let _ = writeln!(out, "## Period medians\n");
        let mut header = vec!["Period", "Cohorts"];
        header.extend(periods.metrics.iter().map(String::as_str));
        table_header(&mut out, &header);
        for period in &periods.periods {
            let cells: Vec<String> = period
                .medians
                .iter()
                .map(|m| m.median.map_or_else(|| "n/a".to_string(), pct))
                .collect();
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                period.label,
                period.cohort_count,
                cells.join(" | ")
            );
        }
        out.push('\n');
    }

    for histogram in &report.histograms {
        let _ = writeln!(out, "## Histogram `{}`\n", histogram.label);
        table_header(&mut out, &["Bin", "Count"]);
        for bin in &histogram.bins {
            let _ = writeln!(out, "| {} | {} |", bin.label, bin.count);
        }
        let _ = writeln!(
            out,
            "\n{} placed, {} clamped, {} dropped.\n",
            histogram.total, histogram.clamped, histogram.dropped
        );
    }

    if let Some(dist) = &report.distribution {
        let _ = writeln!(out, "## Elapsed-day distribution\n");
        table_header(&mut out, &["Bucket", "Count", "Share"]);
        for row in &dist.rows {
            let _ = writeln!(out, "| {} | {} | {} |", row.label, row.count, pct(row.share));
        }
        out.push('\n');
    }

    if let Some(s) = &report.elapsed_days {
        let _ = writeln!(out, "## Elapsed days\n");
        table_header(&mut out, &["Count", "Mean", "Median", "Min", "Max"]);
        let _ = writeln!(
            out,
            "| {} | {:.2} | {:.1} | {} | {} |",
            s.count, s.mean, s.median, s.min, s.max
        );
    }

    out
}

/// One line for terminals and CI logs.
pub fn render_summary(report: &AnalysisReport) -> String {
    let mut parts = vec![
        format!("cohorts={}", report.cohort_count),
        format!("records={}", report.input.records),
        format!("rejected={}", report.input.rejected_rows),
    ];
    for m in &report.windows.overall.metrics {
        parts.push(format!("{}={}", m.label, pct(m.rate)));
    }
    if let Some(periods) = &report.periods {
        parts.push(format!(
            "periods={} (empty {})",
            periods.periods.len(),
            periods.empty_periods()
        ));
    }
    if let Some(s) = &report.elapsed_days {
        parts.push(format!("median_days={}", s.median));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::run_analysis;
    use crate::normalize::{FieldValue, RawRow};
    use cm_config::{get_preset, ConfigSource, PresetName};

    fn report() -> AnalysisReport {
        let mut row = RawRow::new();
        row.insert("registered_at".into(), "2025-06-23 10:00:00".into());
        row.insert("first_paid_at".into(), FieldValue::from("2025-06-25 10:00:00"));
        run_analysis(
            &[row],
            &get_preset(PresetName::Conversion),
            &ConfigSource::BuiltinPreset,
        )
        .unwrap()
    }

    #[test]
    fn markdown_has_window_and_period_tables() {
        let md = render_markdown(&report());
        assert!(md.contains("| Cohort | Size | D12h | D24h | D7 | D14 | D30 | D90 |"));
        assert!(md.contains("| 2025-06-23 | 1 | 0 (0.0%) | 0 (0.0%) | 1 (100.0%)"));
        assert!(md.contains("| 0623-0629 | 1 | 100.0% | 100.0% | 100.0% |"));
        assert!(md.contains("| 0616-0622 | 0 | n/a | n/a | n/a |"));
        assert!(md.contains("## Histogram `pay_days`"));
    }

    #[test]
    fn summary_is_one_line() {
        let line = render_summary(&report());
        assert!(!line.contains('\n'));
        assert!(line.starts_with("cohorts=1 records=1 rejected=0"));
        assert!(line.contains("D7=100.0%"));
        assert!(line.contains("periods=11 (empty 10)"));
    }

    #[test]
    fn json_render_parses() {
        let json = render(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cohort_count"], 1);
        assert_eq!(value["windows"]["rows"][0]["key"], "2025-06-23");
    }
}
