//! Task watchdog for the control loop.
//!
//! On ESP-IDF the control task subscribes to the Task Watchdog Timer and
//! the device resets if an iteration stalls for longer than the timeout.
//! The timeout must exceed the longest blocking step of one iteration
//! (a full feeding sequence plus the temperature conversion), which is why
//! it is derived from the configuration instead of fixed.
//!
//! On the host the watchdog only counts feeds.

use core::cell::Cell;
use core::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Headroom added on top of the longest expected blocking step.
pub const MARGIN: Duration = Duration::from_secs(5);

pub struct Watchdog {
    timeout: Duration,
    feeds: Cell<u64>,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Subscribe the current task with `longest_step + MARGIN` as timeout.
    pub fn new(longest_step: Duration) -> Self {
        let timeout = longest_step + MARGIN;

        #[cfg(target_os = "espidf")]
        {
            let cfg = esp_task_wdt_config_t {
                timeout_ms: timeout.as_millis().min(u128::from(u32::MAX)) as u32,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            // SAFETY: TWDT API called once from the control task at boot.
            let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
            if ret != ESP_OK {
                log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
            }
            // SAFETY: a null handle subscribes the calling task.
            let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
            let subscribed = ret == ESP_OK;
            if subscribed {
                info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", cfg.timeout_ms);
            } else {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
            }
            Self {
                timeout,
                feeds: Cell::new(0),
                subscribed,
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {} ms timeout, not enforced", timeout.as_millis());
            Self {
                timeout,
                feeds: Cell::new(0),
            }
        }
    }

    /// Feed once per control iteration.
    pub fn feed(&self) {
        self.feeds.set(self.feeds.get().wrapping_add(1));
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the calling task's TWDT entry.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn feeds(&self) -> u64 {
        self.feeds.get()
    }
}
