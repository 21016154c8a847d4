//! Fuzz target: DS18B20 scratchpad decoding
//!
//! Invariants checked:
//! - No panics under any 9-byte scratchpad
//! - A scratchpad is only accepted when its CRC byte matches
//! - Accepted temperatures are finite and within the 16-bit register range
//!
//! cargo fuzz run fuzz_scratchpad

#![no_main]

use aquamon::drivers::onewire::{SCRATCHPAD_LEN, crc8, decode_scratchpad};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(sp) = <[u8; SCRATCHPAD_LEN]>::try_from(data) else {
        return;
    };
    if let Ok(celsius) = decode_scratchpad(&sp) {
        assert_eq!(crc8(&sp[..8]), sp[8]);
        assert!(celsius.is_finite());
        assert!((-2048.0..2048.0).contains(&celsius));
    }
});
