/// Core data types for the laundry rain-alert engine.
///
/// This module defines the shared domain model imported by all other modules:
/// laundry state, forecast samples, risk analysis results, the alert ledger,
/// and the error taxonomy used at the collaborator boundary. It contains no
/// I/O; the only logic is clamping and the laundry status transition table.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Laundry state
// ---------------------------------------------------------------------------

/// Where the laundry currently is.
///
/// Alerting is only meaningful while the status is `Hanging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaundryStatus {
    NotHanging,
    Hanging,
    BroughtIn,
}

impl LaundryStatus {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    ///
    /// Same-status moves are allowed and treated as no-ops by callers.
    pub fn can_transition_to(self, next: LaundryStatus) -> bool {
        use LaundryStatus::*;
        matches!(
            (self, next),
            (NotHanging, Hanging)
                | (Hanging, BroughtIn)
                | (BroughtIn, Hanging)
                | (_, NotHanging)
        ) || self == next
    }
}

impl std::fmt::Display for LaundryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaundryStatus::NotHanging => write!(f, "NOT_HANGING"),
            LaundryStatus::Hanging => write!(f, "HANGING"),
            LaundryStatus::BroughtIn => write!(f, "BROUGHT_IN"),
        }
    }
}

/// Current laundry status plus the instant it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaundryState {
    pub status: LaundryStatus,
    pub changed_at: DateTime<Utc>,
}

impl Default for LaundryState {
    fn default() -> Self {
        Self {
            status: LaundryStatus::NotHanging,
            changed_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl LaundryState {
    pub fn is_hanging(&self) -> bool {
        self.status == LaundryStatus::Hanging
    }

    /// Produces the state after moving to `next` at `now`.
    ///
    /// A same-status move returns `self` unchanged so that `changed_at`
    /// keeps pointing at the original hang time.
    pub fn transition(self, next: LaundryStatus, now: DateTime<Utc>) -> Result<Self, TransitionError> {
        if self.status == next {
            return Ok(self);
        }
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        Ok(Self {
            status: next,
            changed_at: now,
        })
    }

    /// How long the laundry has been out, or `None` if it isn't hanging.
    pub fn hanging_duration(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.is_hanging().then(|| now - self.changed_at)
    }
}

// ---------------------------------------------------------------------------
// Forecast types
// ---------------------------------------------------------------------------

/// One hourly point of a short-term precipitation forecast.
///
/// `offset_hours` is relative to the forecast's "now" (0 = current hour).
/// Probabilities outside 0–100 are clamped on construction and again by
/// every reader, so a hand-built sample with a bad value is still safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub offset_hours: u32,
    pub temperature_c: i32,
    pub precipitation_probability: u8,
}

impl ForecastSample {
    pub fn new(offset_hours: u32, temperature_c: i32, precipitation_probability: i32) -> Self {
        Self {
            offset_hours,
            temperature_c,
            precipitation_probability: clamp_probability(precipitation_probability),
        }
    }

    /// Precipitation probability, guaranteed to be within 0–100.
    pub fn probability(&self) -> u8 {
        self.precipitation_probability.min(100)
    }
}

/// Clamps a raw percentage into the 0–100 range.
pub fn clamp_probability(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

// ---------------------------------------------------------------------------
// Risk analysis
// ---------------------------------------------------------------------------

/// Rain risk levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::None => write!(f, "NONE"),
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

/// What the user should do, mapped 1:1 from [`RiskLevel`].
///
/// The engine hands out the variant; the wording in [`describe`] is only a
/// default for callers that have no presentation layer of their own.
///
/// [`describe`]: RecommendedAction::describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    BringInImmediately,
    BringInWithinTwoHours,
    MonitorConditions,
    NoRainExpected,
}

impl RecommendedAction {
    pub fn for_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::High => RecommendedAction::BringInImmediately,
            RiskLevel::Medium => RecommendedAction::BringInWithinTwoHours,
            RiskLevel::Low => RecommendedAction::MonitorConditions,
            RiskLevel::None => RecommendedAction::NoRainExpected,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            RecommendedAction::BringInImmediately => "bring in immediately",
            RecommendedAction::BringInWithinTwoHours => "bring in within 1–2 hours",
            RecommendedAction::MonitorConditions => "monitor conditions",
            RecommendedAction::NoRainExpected => "no rain expected",
        }
    }
}

/// Maximum precipitation probability within each look-ahead window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowMaxima {
    pub next_1h: u8,
    pub next_2h: u8,
    pub next_4h: u8,
}

/// Result of one risk analysis. Built fresh per call and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RainRiskAnalysis {
    pub risk_level: RiskLevel,
    pub windows: WindowMaxima,
    pub max_probability_next_4h: u8,
    pub estimated_rain_onset: Option<DateTime<Utc>>,
    pub recommended_action: RecommendedAction,
}

// ---------------------------------------------------------------------------
// Alert ledger
// ---------------------------------------------------------------------------

/// The last alert that was actually emitted, used purely for dedup.
///
/// Defaults to `(0, epoch)` so the first qualifying check always alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLedger {
    pub last_alert_probability: u8,
    pub last_alert_time: DateTime<Utc>,
}

impl Default for AlertLedger {
    fn default() -> Self {
        Self {
            last_alert_probability: 0,
            last_alert_time: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A coordinate together with when it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    pub obtained_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from the forecast collaborator. Every variant is a transient
/// fetch failure: periodic cycles retry, snooze cycles give up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network hiccup, timeout, provider temporarily unreachable.
    #[error("Transient fetch error: {0}")]
    Transient(String),
    /// Non-2xx response from the weather provider.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The provider response could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors from the location collaborator. Never fatal to a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the key-value store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("stored value for '{key}' is corrupted: {reason}")]
    Corrupted { key: String, reason: String },
}

/// Raised when a laundry status change isn't in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move laundry from {from} to {to}")]
pub struct TransitionError {
    pub from: LaundryStatus,
    pub to: LaundryStatus,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
