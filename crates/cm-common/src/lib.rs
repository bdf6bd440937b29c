//! Cohort metrics common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the cm-* crates:
//! - Run identifiers for log correlation
//! - Common error types with stable codes
//! - Output format selection

pub mod error;
pub mod id;
pub mod output;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use id::RunId;
pub use output::OutputFormat;

/// Schema version of the report payloads produced by cm-core.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";
