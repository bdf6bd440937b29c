//! Core math modules.

pub mod rate;
pub mod stats;
