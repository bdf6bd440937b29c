//! Structured event vocabulary for logging.
//!
//! Every engine event carries a stage and a stable dotted name so JSONL
//! consumers can filter without parsing messages.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, config resolution and input loading.
    Init,
    /// Raw rows to canonical event records.
    Normalize,
    /// Cohort grouping.
    Group,
    /// Window conversion counting.
    Window,
    Histogram,
    /// Period-median aggregation.
    Period,
    /// Report assembly and rendering.
    Report,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Normalize => "normalize",
            Stage::Group => "group",
            Stage::Window => "window",
            Stage::Histogram => "histogram",
            Stage::Period => "period",
            Stage::Report => "report",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
    pub const INPUT_LOADED: &str = "input.loaded";

    // Normalize stage
    pub const NORMALIZE_ROW_REJECTED: &str = "normalize.row_rejected";
    pub const NORMALIZE_FINISHED: &str = "normalize.finished";

    // Group stage
    pub const GROUP_FINISHED: &str = "group.finished";

    // Window stage
    pub const WINDOW_INVALID_ELAPSED: &str = "window.invalid_elapsed";
    pub const WINDOW_FINISHED: &str = "window.finished";

    // Histogram stage
    pub const HISTOGRAM_FINISHED: &str = "histogram.finished";

    // Period stage
    pub const PERIOD_EMPTY: &str = "period.empty";
    pub const PERIOD_FINISHED: &str = "period.finished";

    // Report stage
    pub const REPORT_WRITTEN: &str = "report.written";

    // Error events
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Correlation context shared by all events of one invocation.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Normalize,
            Stage::Group,
            Stage::Window,
            Stage::Histogram,
            Stage::Period,
            Stage::Report,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::INFO), Level::Info);
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
    }

    #[test]
    fn test_event_names_are_dotted_by_stage() {
        assert_eq!(event_names::RUN_STARTED, "run.started");
        assert!(event_names::NORMALIZE_FINISHED.starts_with("normalize."));
        assert!(event_names::PERIOD_EMPTY.starts_with("period."));
    }
}
