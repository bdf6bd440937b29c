//! Fuzz target for timestamp cell parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = cm_core::normalize::parse_timestamp_str(s);
    }
});
