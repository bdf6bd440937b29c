//! Fuzz target for row loading and the full analysis run.

#![no_main]

use cm_config::{get_preset, ConfigSource, PresetName};
use cm_core::{parse_rows, run_analysis, InputFormat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(rows) = parse_rows(content, InputFormat::sniff(content)) else {
        return;
    };
    for preset in PresetName::ALL {
        let _ = run_analysis(&rows, &get_preset(*preset), &ConfigSource::BuiltinPreset);
    }
});
