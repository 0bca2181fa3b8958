#![no_main]

use bytesflops::{EngineConfig, OutputFilter};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither parser may panic, whatever the input
        if let Ok(config) = EngineConfig::from_toml_str(input) {
            let _ = config.validate();
        }
        if let Ok(filter) = OutputFilter::parse(input) {
            assert!(input.starts_with(filter.variable.as_str()));
        }
    }
});
