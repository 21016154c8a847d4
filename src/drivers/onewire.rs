//! Dallas 1-Wire protocol for a single DS18B20 on a dedicated GPIO.
//!
//! With one device per bus the ROM search is skipped (`SKIP ROM`).  A
//! reading is two transactions separated by the conversion time:
//!
//! ```text
//!   reset ─ CC ─ 44            (start conversion)
//!   ...750 ms...
//!   reset ─ CC ─ BE ─ 9 bytes  (read scratchpad, CRC in byte 8)
//! ```
//!
//! Framing and CRC are target-independent; the bit-banged line driver
//! only exists on ESP-IDF.

use crate::error::HwError;

pub const SKIP_ROM: u8 = 0xCC;
pub const CONVERT_T: u8 = 0x44;
pub const READ_SCRATCHPAD: u8 = 0xBE;

pub const SCRATCHPAD_LEN: usize = 9;

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, LSB first).
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Validate a DS18B20 scratchpad and return the temperature in °C.
pub fn decode_scratchpad(sp: &[u8; SCRATCHPAD_LEN]) -> Result<f32, HwError> {
    // A released bus with nobody driving it reads all ones.
    if sp.iter().all(|&b| b == 0xFF) {
        return Err(HwError::NoDevice);
    }
    if crc8(&sp[..SCRATCHPAD_LEN - 1]) != sp[SCRATCHPAD_LEN - 1] {
        return Err(HwError::BusFault);
    }
    let counts = i16::from_le_bytes([sp[0], sp[1]]);
    Ok(f32::from(counts) / 16.0)
}

#[cfg(target_os = "espidf")]
pub use line::OneWireBus;

#[cfg(target_os = "espidf")]
mod line {
    use super::*;
    use crate::drivers::hw_init;

    /// Open-drain 1-Wire master on one GPIO.  Timings are the standard
    /// speed slots from the DS18B20 datasheet.
    pub struct OneWireBus {
        pin: u8,
    }

    impl OneWireBus {
        pub fn new(pin: u8) -> Result<Self, HwError> {
            hw_init::config_open_drain(pin).map_err(|_| HwError::NotConfigured(pin))?;
            hw_init::gpio_write(pin, true);
            Ok(Self { pin })
        }

        /// Reset pulse.  Fails with `NoDevice` when no presence pulse
        /// follows.
        pub fn reset(&mut self) -> Result<(), HwError> {
            hw_init::gpio_write(self.pin, false);
            hw_init::delay_us(480);
            hw_init::gpio_write(self.pin, true);
            hw_init::delay_us(70);
            let present = !hw_init::gpio_read(self.pin);
            hw_init::delay_us(410);
            if present { Ok(()) } else { Err(HwError::NoDevice) }
        }

        pub fn write_byte(&mut self, byte: u8) {
            for i in 0..8 {
                self.write_bit(byte & (1 << i) != 0);
            }
        }

        pub fn read_byte(&mut self) -> u8 {
            (0..8).fold(0u8, |acc, i| acc | (u8::from(self.read_bit()) << i))
        }

        /// `SKIP ROM` + `CONVERT T`.
        pub fn start_conversion(&mut self) -> Result<(), HwError> {
            self.reset()?;
            self.write_byte(SKIP_ROM);
            self.write_byte(CONVERT_T);
            Ok(())
        }

        /// `SKIP ROM` + `READ SCRATCHPAD`, decoded to °C.
        pub fn read_temperature(&mut self) -> Result<f32, HwError> {
            self.reset()?;
            self.write_byte(SKIP_ROM);
            self.write_byte(READ_SCRATCHPAD);
            let mut sp = [0u8; SCRATCHPAD_LEN];
            for b in &mut sp {
                *b = self.read_byte();
            }
            decode_scratchpad(&sp)
        }

        fn write_bit(&mut self, one: bool) {
            let (low, high) = if one { (6, 64) } else { (60, 10) };
            hw_init::gpio_write(self.pin, false);
            hw_init::delay_us(low);
            hw_init::gpio_write(self.pin, true);
            hw_init::delay_us(high);
        }

        fn read_bit(&mut self) -> bool {
            hw_init::gpio_write(self.pin, false);
            hw_init::delay_us(6);
            hw_init::gpio_write(self.pin, true);
            hw_init::delay_us(9);
            let bit = hw_init::gpio_read(self.pin);
            hw_init::delay_us(55);
            bit
        }
    }
}
