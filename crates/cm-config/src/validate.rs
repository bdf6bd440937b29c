//! Configuration validation errors and semantic validation.
//!
//! Validation runs before any record is touched: a malformed window list or
//! period table aborts the run instead of producing a misleading report.

use std::collections::HashSet;
use thiserror::Error;

use crate::analysis::{
    AnalysisConfig, BinRange, CohortGranularity, WindowSpec, MAX_HISTOGRAM_BINS,
};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl From<ValidationError> for cm_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidValue { field, message } => {
                cm_common::Error::InvalidConfig { field, message }
            }
            other => cm_common::Error::Config(other.to_string()),
        }
    }
}

/// Validate an analysis configuration semantically.
pub fn validate_config(config: &AnalysisConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if config.fields.registration.trim().is_empty() {
        return Err(ValidationError::MissingField("fields.registration".to_string()));
    }
    if config.fields.target.trim().is_empty() {
        return Err(ValidationError::MissingField("fields.target".to_string()));
    }

    validate_windows(&config.windows)?;
    validate_histograms(config)?;
    validate_periods(config)?;
    validate_distribution(config)?;

    Ok(())
}

/// Validate the window list: labels non-empty and unique, bounds finite and >= 0.
pub fn validate_windows(windows: &[WindowSpec]) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for (i, window) in windows.iter().enumerate() {
        if window.label.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("windows[{}].label", i),
                message: "Must not be empty".to_string(),
            });
        }
        if !seen.insert(window.label.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: format!("windows[{}].label", i),
                message: format!("Duplicate window label '{}'", window.label),
            });
        }
        if !window.bound.is_finite() || window.bound < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("windows[{}].bound", i),
                message: format!(
                    "Window '{}' must have a finite, non-negative bound, got {}",
                    window.label, window.bound
                ),
            });
        }
    }
    Ok(())
}

fn validate_histograms(config: &AnalysisConfig) -> ValidationResult<()> {
    for (i, hist) in config.histograms.iter().enumerate() {
        if hist.label.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("histograms[{}].label", i),
                message: "Must not be empty".to_string(),
            });
        }
        match hist.range {
            BinRange::Capped { cap } | BinRange::Truncated { cap } if cap == 0 => {
                return Err(ValidationError::InvalidValue {
                    field: format!("histograms[{}].range.cap", i),
                    message: "Must be at least 1".to_string(),
                });
            }
            BinRange::Capped { cap } | BinRange::Truncated { cap }
                if cap > MAX_HISTOGRAM_BINS =>
            {
                return Err(ValidationError::InvalidValue {
                    field: format!("histograms[{}].range.cap", i),
                    message: format!("Must be at most {}", MAX_HISTOGRAM_BINS),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_periods(config: &AnalysisConfig) -> ValidationResult<()> {
    let Some(periods) = &config.periods else {
        return Ok(());
    };

    if config.cohort.granularity != CohortGranularity::Day {
        return Err(ValidationError::SemanticError(format!(
            "Period medians need daily cohorts, but cohort.granularity is '{}'",
            config.cohort.granularity
        )));
    }

    if periods.metrics.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "periods.metrics".to_string(),
            message: "Must name at least one window label".to_string(),
        });
    }

    for (i, metric) in periods.metrics.iter().enumerate() {
        if config.window(metric).is_none() {
            return Err(ValidationError::InvalidValue {
                field: format!("periods.metrics[{}]", i),
                message: format!(
                    "Unknown window '{}' (known: {})",
                    metric,
                    config.window_labels().join(", ")
                ),
            });
        }
    }

    for (i, range) in periods.ranges.iter().enumerate() {
        if range.start > range.end {
            return Err(ValidationError::InvalidValue {
                field: format!("periods.ranges[{}]", i),
                message: format!(
                    "Period '{}' starts after it ends ({} > {})",
                    range.label, range.start, range.end
                ),
            });
        }
    }

    Ok(())
}

fn validate_distribution(config: &AnalysisConfig) -> ValidationResult<()> {
    for (i, bucket) in config.distribution.iter().enumerate() {
        if let Some(max) = bucket.max_days {
            if max < bucket.min_days {
                return Err(ValidationError::InvalidValue {
                    field: format!("distribution[{}]", i),
                    message: format!(
                        "Bucket '{}' has max_days {} below min_days {}",
                        bucket.label, max, bucket.min_days
                    ),
                });
            }
        }
    }
    Ok(())
}
