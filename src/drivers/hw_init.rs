//! Thin wrappers over ESP-IDF peripheral sys calls.
//!
//! Configures ADC1 oneshot channels, GPIO outputs (push-pull and
//! open-drain), and LEDC timers/channels using raw `esp_idf_svc::sys`
//! calls.  Everything here runs on the single control task; there is no
//! concurrent access to the handles.
//!
//! The unit conversions at the top are target-independent and tested on
//! the host.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during peripheral configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcConfigFailed(rc) => write!(f, "LEDC config failed (rc={})", rc),
        }
    }
}

// ── Unit conversions ──────────────────────────────────────────

/// ADC1 native resolution.
pub const ADC_BITS: u32 = 12;
/// LEDC duty resolution; 14 bits gives ~1.2 µs steps at 50 Hz.
pub const LEDC_DUTY_BITS: u32 = 14;

/// Scale a native 12-bit ADC code to the 0 ..= 65535 range the
/// hardware port promises.
pub fn adc_to_u16(raw: i32) -> u16 {
    let max = (1i32 << ADC_BITS) - 1;
    let clamped = raw.clamp(0, max) as u32;
    (clamped * u32::from(u16::MAX) / max as u32) as u16
}

/// Percent (0–100) to an LEDC duty register value.
pub fn percent_to_ledc_duty(percent: f32) -> u32 {
    let max = (1u32 << LEDC_DUTY_BITS) - 1;
    let fraction = (percent / 100.0).clamp(0.0, 1.0);
    (fraction * max as f32).round() as u32
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the control task after `init_adc()`.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

/// Create the ADC1 unit and configure `channels` at 12 dB / 12 bit.
#[cfg(target_os = "espidf")]
pub fn init_adc(channels: &[u8]) -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    for &ch in channels {
        // SAFETY: handle initialised above; single-threaded init path.
        let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), u32::from(ch), &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcInitFailed(ret));
        }
    }
    log::info!("hw_init: ADC1 configured ({} channel(s))", channels.len());
    Ok(())
}

/// Native 12-bit read; `Err` carries the ESP-IDF return code.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u8) -> Result<i32, i32> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, control task only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), u32::from(channel), &mut raw) };
    if ret != ESP_OK as i32 { Err(ret) } else { Ok(raw) }
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn gpio_configure(pin: u8, mode: gpio_mode_t, pull_up: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    // SAFETY: plain register configuration of a pin we own.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

/// Push-pull output, driven low.
#[cfg(target_os = "espidf")]
pub fn config_output(pin: u8) -> Result<(), HwInitError> {
    gpio_configure(pin, gpio_mode_t_GPIO_MODE_OUTPUT, false)?;
    gpio_write(pin, false);
    Ok(())
}

/// Open-drain input/output with pull-up, for the 1-Wire line.
#[cfg(target_os = "espidf")]
pub fn config_open_drain(pin: u8) -> Result<(), HwInitError> {
    gpio_configure(pin, gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD, true)
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: u8, high: bool) -> i32 {
    // SAFETY: write to an already-configured output pin, control task only.
    unsafe { gpio_set_level(i32::from(pin), u32::from(high)) }
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: u8) -> bool {
    // SAFETY: read-only register access on a configured pin.
    (unsafe { gpio_get_level(i32::from(pin)) }) != 0
}

/// Return the pin to its reset state (input, no pulls).
#[cfg(target_os = "espidf")]
pub fn gpio_release(pin: u8) {
    // SAFETY: resetting a pin we own.
    unsafe {
        gpio_reset_pin(i32::from(pin));
    }
}

#[cfg(target_os = "espidf")]
pub fn delay_us(us: u32) {
    // SAFETY: ROM busy-wait, no shared state.
    unsafe { esp_rom_delay_us(us) }
}

// ── LEDC PWM ─────────────────────────────────────────────────

/// Configure `timer` at `freq_hz` and bind `channel` to `pin`, duty 0.
#[cfg(target_os = "espidf")]
pub fn ledc_setup(channel: u32, timer: u32, pin: u8, freq_hz: u32) -> Result<(), HwInitError> {
    let timer_cfg = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: timer,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_14_BIT,
        freq_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: control task only; config structs live for the call.
    let ret = unsafe { ledc_timer_config(&timer_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcConfigFailed(ret));
    }

    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            timer_sel: timer,
            gpio_num: i32::from(pin),
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcConfigFailed(ret));
    }
    log::info!("hw_init: LEDC ch{} on GPIO{} at {} Hz", channel, pin, freq_hz);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set_percent(channel: u32, percent: f32) -> i32 {
    // SAFETY: channel configured by ledc_setup(); control task only.
    unsafe {
        let ret = ledc_set_duty(
            ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel,
            percent_to_ledc_duty(percent),
        );
        if ret != ESP_OK as i32 {
            return ret;
        }
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel)
    }
}

#[cfg(target_os = "espidf")]
pub fn ledc_halt(channel: u32) {
    // SAFETY: channel configured by ledc_setup(); idle level low.
    unsafe {
        ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0);
    }
}
