//! Fuzz target: `SystemConfig::from_json`
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every accepted config passes `validate()` again and survives a
//!   serialise / parse cycle unchanged
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use aquamon::config::SystemConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = SystemConfig::from_json(text) else {
        return;
    };
    assert!(config.validate().is_ok());

    let json = serde_json::to_string(&config).expect("accepted config must serialise");
    let again = SystemConfig::from_json(&json).expect("serialised config must load");
    assert_eq!(config, again);
});
