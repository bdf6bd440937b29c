//! Cohort metrics math utilities.

pub mod math;

pub use math::rate::*;
pub use math::stats::*;
