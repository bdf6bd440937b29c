//! Cohort Metrics Core Library
//!
//! Batch analysis of registration cohorts: how many users reach a target
//! event (first payment, last login) within or beyond configured elapsed
//! windows, how elapsed times are distributed, and how cohort rates trend
//! over calendar periods.
//!
//! Pipeline: [`normalize`] → [`cohort`] → [`window`] → [`period`], with
//! [`histogram`] and [`distribution`] over the same records.
//! [`analysis::run_analysis`] runs all of it for one [`cm_config::AnalysisConfig`].

pub mod analysis;
pub mod cohort;
pub mod distribution;
pub mod exit_codes;
pub mod histogram;
pub mod input;
pub mod logging;
pub mod normalize;
pub mod period;
pub mod record;
pub mod render;
pub mod window;

pub use analysis::{analyze_records, run_analysis, AnalysisReport, InputSummary};
pub use cohort::{group_cohorts, Cohort, CohortKey, CohortSet};
pub use histogram::{bin_values, Histogram, HistogramBin};
pub use input::{load_rows, parse_rows, InputFormat};
pub use normalize::{normalize_rows, FieldValue, RawRow};
pub use period::{aggregate_periods, PeriodMedian, PeriodTable};
pub use record::{ElapsedDuration, EventRecord};
pub use render::render;
pub use window::{count_windows, WindowMetric, WindowTable};
