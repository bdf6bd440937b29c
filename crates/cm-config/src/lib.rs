//! Cohort metrics configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for analysis.json
//! - Built-in presets for the conversion, retention and pay-time analyses
//! - Config resolution (CLI → env → XDG → preset)
//! - Semantic validation that runs before any computation
//! - Config snapshots embedded in reports

pub mod analysis;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use analysis::{
    AnalysisConfig, BinRange, CohortConfig, CohortGranularity, DistributionBucket, FieldNames,
    HistogramSpec, PeriodConfig, PeriodOrder, PeriodRange, TimeUnit, WindowComparison, WindowSpec,
    MAX_HISTOGRAM_BINS,
};
pub use preset::{get_preset, list_presets, PresetInfo, PresetName};
pub use resolve::{resolve_config_path, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
