//! Precipitation threshold checking.
//!
//! The configurable alert threshold governs two things: whether a forecast
//! is a "current rain concern" for the alert policy, and which hour counts
//! as rain onset. It does not move the analyzer's fixed risk-level cut-offs.

use serde::{Deserialize, Serialize};

/// Default alert threshold, in percent.
pub const DEFAULT_PRECIPITATION_THRESHOLD: u8 = 30;

/// A precipitation probability threshold, always within 0–100.
///
/// A probability *strictly greater* than the threshold is a breach:
///   probability > threshold  →  rain concern
///   probability == threshold →  no concern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "u8")]
pub struct PrecipitationThreshold(u8);

impl PrecipitationThreshold {
    /// Builds a threshold, clamping out-of-range input into 0–100.
    pub fn new(percent: i32) -> Self {
        Self(crate::model::clamp_probability(percent))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Returns `true` if `probability` breaches this threshold.
    pub fn is_exceeded_by(self, probability: u8) -> bool {
        probability > self.0
    }
}

impl Default for PrecipitationThreshold {
    fn default() -> Self {
        Self(DEFAULT_PRECIPITATION_THRESHOLD)
    }
}

impl From<i32> for PrecipitationThreshold {
    fn from(percent: i32) -> Self {
        Self::new(percent)
    }
}

impl From<PrecipitationThreshold> for u8 {
    fn from(threshold: PrecipitationThreshold) -> Self {
        threshold.0
    }
}

impl std::fmt::Display for PrecipitationThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
