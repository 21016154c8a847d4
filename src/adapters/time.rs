//! Wall-clock adapter.
//!
//! Reads local time through `chrono` on both targets.  On ESP-IDF the
//! newlib clock is only meaningful after SNTP or an RTC has set it; until
//! then it reports a date in 1970 and the schedule would match against
//! time since boot.  That is logged once and otherwise tolerated.

use core::cell::Cell;
use core::time::Duration;

use chrono::{Datelike, Local, Timelike};
use log::warn;

use crate::app::ports::ClockPort;
use crate::scheduler::TimeOfDay;

/// Anything earlier is an unset clock.
const EARLIEST_PLAUSIBLE_YEAR: i32 = 2020;

#[derive(Debug, Default)]
pub struct SystemClock {
    warned_unsynced: Cell<bool>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> TimeOfDay {
        let now = Local::now();
        if now.year() < EARLIEST_PLAUSIBLE_YEAR && !self.warned_unsynced.replace(true) {
            warn!(
                "Wall clock not set ({}); feeding times follow uptime",
                now.format("%Y-%m-%d %H:%M")
            );
        }
        TimeOfDay::new(now.hour() as u8, now.minute() as u8).unwrap_or(TimeOfDay::MIDNIGHT)
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
