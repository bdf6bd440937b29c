//! Fuzz target for analysis.json parsing and validation.
//!
//! Any configuration that parses must either validate or return an error;
//! neither step may panic.

#![no_main]

use cm_config::{validate_config, AnalysisConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<AnalysisConfig>(data) {
        let _ = validate_config(&config);
    }
});
