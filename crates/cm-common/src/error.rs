//! Error types for cohort metrics.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! Only conditions that abort a run live here. Bad rows, negative elapsed
//! times, empty cohorts and empty periods are data conditions: the engine
//! counts them in the report instead of raising an error.
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Invalid Analysis Configuration
//!   Reason: invalid value for windows[2].bound: must be finite and >= 0, got -7
//!   Fix: Run 'cm-core check --config <file>' and correct the reported field.
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for cohort metrics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Analysis configuration errors (windows, periods, presets).
    Config,
    /// Source dataset errors (unreadable or wrongly shaped input).
    Input,
    /// Errors raised while computing metrics.
    Analysis,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Analysis => write!(f, "analysis"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for cohort metrics.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    // Input errors (20-29)
    #[error("input error: {0}")]
    Input(String),

    #[error("unsupported input format: {0}")]
    UnsupportedInput(String),

    // Analysis errors (30-39)
    #[error("unknown metric '{metric}' (known: {known})")]
    UnknownMetric { metric: String, known: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Input errors
    /// - 30-39: Analysis errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig { .. } => 11,
            Error::UnknownPreset(_) => 12,
            Error::Input(_) => 20,
            Error::UnsupportedInput(_) => 21,
            Error::UnknownMetric { .. } => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } | Error::UnknownPreset(_) => {
                ErrorCategory::Config
            }
            Error::Input(_) | Error::UnsupportedInput(_) => ErrorCategory::Input,
            Error::UnknownMetric { .. } => ErrorCategory::Analysis,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Fixing the config file resolves these
            Error::Config(_) | Error::InvalidConfig { .. } | Error::UnknownPreset(_) => true,

            Error::Input(_) => true,
            Error::UnsupportedInput(_) => true,

            // Indicates a caller bug
            Error::UnknownMetric { .. } => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } => {
                "Run 'cm-core check --config <file>' and correct the reported field."
            }
            Error::UnknownPreset(_) => "List the built-in presets with 'cm-core presets'.",
            Error::Input(_) => {
                "Check that the input is a JSON array of row objects or one JSON object per line."
            }
            Error::UnsupportedInput(_) => "Use a .json or .jsonl file.",
            Error::UnknownMetric { .. } => {
                "Period metrics must name a window label from the same configuration."
            }
            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig { .. } => "Invalid Analysis Configuration",
            Error::UnknownPreset(_) => "Unknown Preset",
            Error::Input(_) => "Input Error",
            Error::UnsupportedInput(_) => "Unsupported Input",
            Error::UnknownMetric { .. } => "Unknown Metric",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., field name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidConfig { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::UnknownPreset(name) => {
                context.insert("preset".to_string(), serde_json::json!(name));
            }
            Error::UnknownMetric { metric, .. } => {
                context.insert("metric".to_string(), serde_json::json!(metric));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
