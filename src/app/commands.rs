//! Inbound commands to the control loop.
//!
//! Operator actions (console, button, future remote link) that the
//! [`ControlLoop`](super::service::ControlLoop) interprets between cycles.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Dispense one portion now, outside the schedule.
    FeedNow,

    /// Latch the emergency stop: pump off, feedings skipped.
    EmergencyStop,

    /// Release the emergency-stop latch.
    ClearEmergencyStop,
}

impl core::str::FromStr for AppCommand {
    type Err = &'static str;

    /// Console spelling: `feed`, `stop`, `resume`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" => Ok(Self::FeedNow),
            "stop" | "estop" => Ok(Self::EmergencyStop),
            "resume" | "clear" => Ok(Self::ClearEmergencyStop),
            _ => Err("expected one of: feed, stop, resume"),
        }
    }
}
