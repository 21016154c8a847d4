//! Time-of-day schedule gate for one-shot actions (feeding).
//!
//! The control loop polls far more often than once a minute, so "now is a
//! feeding time" stays true for up to sixty consecutive polls.  The gate
//! remembers the minute it last fired and refuses to fire again until the
//! wall clock has moved on, which yields exactly one firing per listed
//! time per day regardless of poll cadence.
//!
//! ```text
//!   poll 07:59 ─▶ no  (not scheduled)
//!   poll 08:00 ─▶ YES (scheduled, last_fired = None)   last_fired := 08:00
//!   poll 08:00 ─▶ no  (scheduled, but == last_fired)
//!   poll 08:01 ─▶ no  (not scheduled)
//!   poll 14:00 ─▶ YES                                  last_fired := 14:00
//! ```
//!
//! The memory is cleared as soon as the clock leaves the remembered minute,
//! so even a one-entry schedule fires again the next day.
//!
//! The memory lives only in RAM.  A restart inside a scheduled minute
//! starts with `last_fired = None` and can feed a second time.

use core::fmt;
use core::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

/// Wall-clock time at minute resolution, written `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    /// Returns `None` for hours above 23 or minutes above 59.
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub const fn hour(self) -> u8 {
        self.hour
    }

    pub const fn minute(self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err("time must be written HH:MM");
        }
        let digits = |hi: u8, lo: u8| -> Option<u8> {
            if hi.is_ascii_digit() && lo.is_ascii_digit() {
                Some((hi - b'0') * 10 + (lo - b'0'))
            } else {
                None
            }
        };
        let hour = digits(bytes[0], bytes[1]).ok_or("hour is not numeric")?;
        let minute = digits(bytes[3], bytes[4]).ok_or("minute is not numeric")?;
        Self::new(hour, minute).ok_or("time of day out of range")
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Feeding schedule
// ═══════════════════════════════════════════════════════════════

/// Maximum number of scheduled times (stack-allocated).
pub const MAX_SCHEDULED_TIMES: usize = 8;

/// Ordered, duplicate-free set of times of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TimeOfDay>", into = "Vec<TimeOfDay>")]
pub struct FeedingSchedule {
    times: heapless::Vec<TimeOfDay, MAX_SCHEDULED_TIMES>,
}

impl FeedingSchedule {
    /// Build a schedule.  Input order and duplicates do not matter.
    pub fn new(times: &[TimeOfDay]) -> Result<Self, &'static str> {
        let mut sorted: heapless::Vec<TimeOfDay, MAX_SCHEDULED_TIMES> = heapless::Vec::new();
        for &t in times {
            if sorted.contains(&t) {
                continue;
            }
            sorted.push(t).map_err(|_| "too many scheduled times")?;
        }
        sorted.sort_unstable();
        Ok(Self { times: sorted })
    }

    /// Three meals a day: 08:00, 14:00, 20:00.
    pub fn daily() -> Self {
        let mut times = heapless::Vec::new();
        for hour in [8, 14, 20] {
            // Capacity exceeds three entries.
            let _ = times.push(TimeOfDay { hour, minute: 0 });
        }
        Self { times }
    }

    /// Parse a list of `"HH:MM"` strings.
    pub fn parse(times: &[&str]) -> Result<Self, &'static str> {
        let mut parsed: heapless::Vec<TimeOfDay, MAX_SCHEDULED_TIMES> = heapless::Vec::new();
        for s in times {
            let t: TimeOfDay = s.parse()?;
            if !parsed.contains(&t) {
                parsed.push(t).map_err(|_| "too many scheduled times")?;
            }
        }
        Self::new(&parsed)
    }

    pub fn contains(&self, t: TimeOfDay) -> bool {
        self.times.binary_search(&t).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[TimeOfDay] {
        &self.times
    }

    /// First scheduled time strictly after `now`, wrapping past midnight.
    pub fn next_after(&self, now: TimeOfDay) -> Option<TimeOfDay> {
        self.times
            .iter()
            .copied()
            .find(|&t| t > now)
            .or_else(|| self.times.first().copied())
    }
}

impl TryFrom<Vec<TimeOfDay>> for FeedingSchedule {
    type Error = &'static str;

    fn try_from(times: Vec<TimeOfDay>) -> Result<Self, Self::Error> {
        Self::new(&times)
    }
}

impl From<FeedingSchedule> for Vec<TimeOfDay> {
    fn from(s: FeedingSchedule) -> Self {
        s.times.to_vec()
    }
}

impl fmt::Display for FeedingSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.times.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Gate
// ═══════════════════════════════════════════════════════════════

/// True iff `now` is scheduled and differs from the last firing minute.
pub fn should_fire(
    now: TimeOfDay,
    schedule: &FeedingSchedule,
    last_fired: Option<TimeOfDay>,
) -> bool {
    schedule.contains(now) && last_fired != Some(now)
}

/// Schedule plus its last-fired memory.
#[derive(Debug, Clone)]
pub struct ScheduleGate {
    schedule: FeedingSchedule,
    last_fired: Option<TimeOfDay>,
}

impl ScheduleGate {
    pub fn new(schedule: FeedingSchedule) -> Self {
        Self {
            schedule,
            last_fired: None,
        }
    }

    /// Check the gate and, when it opens, record `now` as the last firing.
    ///
    /// Once the clock has left the remembered minute the memory is dropped,
    /// so a schedule with a single entry re-arms for the next day.
    pub fn poll(&mut self, now: TimeOfDay) -> bool {
        if self.last_fired.is_some_and(|last| last != now) {
            self.last_fired = None;
        }
        if !should_fire(now, &self.schedule, self.last_fired) {
            return false;
        }
        info!("Schedule: {} matched, firing", now);
        self.last_fired = Some(now);
        true
    }

    pub fn last_fired(&self) -> Option<TimeOfDay> {
        self.last_fired
    }

    pub fn schedule(&self) -> &FeedingSchedule {
        &self.schedule
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
