//! Threshold policy: engineering value + safe band → tri-state verdict.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Closed interval `[low, high]` that counts as "in range" for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub low: f32,
    pub high: f32,
}

impl ThresholdBand {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// A band is usable when both edges are finite and ordered.
    pub fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

/// Classification of one reading against its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Below,
    Normal,
    Above,
}

impl Verdict {
    pub fn is_normal(self) -> bool {
        self == Self::Normal
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Below => write!(f, "BELOW"),
            Self::Normal => write!(f, "NORMAL"),
            Self::Above => write!(f, "ABOVE"),
        }
    }
}

/// Classify `value` against `band`.  Edges are inclusive: a reading equal
/// to `low` or `high` is [`Verdict::Normal`].  NaN compares false on both
/// sides and therefore never reaches this function from a reader; readers
/// reject non-finite values before evaluation.
pub fn evaluate(value: f32, band: &ThresholdBand) -> Verdict {
    if value < band.low {
        Verdict::Below
    } else if value > band.high {
        Verdict::Above
    } else {
        Verdict::Normal
    }
}
