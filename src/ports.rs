//! Port traits: the boundary between the rain-alert engine and the outside world.
//!
//! ```text
//!   Collaborator ──▶ Port trait ──▶ MonitoringLoop ──▶ analyze / AlertPolicy
//! ```
//!
//! Weather provider, location provider, notifications, scheduling and
//! persistence all live behind these traits. The engine never performs
//! network, OS, or disk I/O itself, so every cycle can be driven by mock
//! collaborators in tests.
//!
//! All ports take `&self` and are `Send + Sync`: a snooze cycle may run on
//! a different thread than the periodic cycle, and both share the same
//! collaborators. Implementations use interior mutability where needed.
//! Timeouts on the underlying calls are the implementation's concern.

use chrono::Duration;

use crate::model::{Coordinates, FetchError, ForecastSample, LocationError, StoreError};

// ───────────────────────────────────────────────────────────────
// Forecast source (weather provider → engine)
// ───────────────────────────────────────────────────────────────

/// Supplies the short-term hourly forecast for a coordinate.
pub trait ForecastSource: Send + Sync {
    /// Hourly samples ordered by `offset_hours`, starting at the current hour.
    fn fetch_hourly_forecast(&self, at: Coordinates) -> Result<Vec<ForecastSample>, FetchError>;
}

// ───────────────────────────────────────────────────────────────
// Location source (device location → engine)
// ───────────────────────────────────────────────────────────────

/// Supplies the device's current coordinate.
pub trait LocationSource: Send + Sync {
    fn current_coordinates(&self) -> Result<Coordinates, LocationError>;
}

// ───────────────────────────────────────────────────────────────
// Notifier (engine → user)
// ───────────────────────────────────────────────────────────────

/// Delivers user-visible notifications.
pub trait Notifier: Send + Sync {
    /// Show (or replace) the rain alert with bring-in and snooze actions.
    fn notify_rain_alert(&self, minutes_until_rain: i64);

    /// Show an informational notification.
    fn notify_general(&self, title: &str, message: &str);

    /// Remove the rain alert if it is showing.
    fn cancel_rain_alert(&self);
}

// ───────────────────────────────────────────────────────────────
// Scheduler (engine → OS background work)
// ───────────────────────────────────────────────────────────────

/// Schedules future monitoring cycles.
///
/// Names are unique: scheduling under an existing name replaces it, which
/// guarantees at most one in-flight periodic cycle.
pub trait Scheduler: Send + Sync {
    fn schedule_periodic(&self, name: &str, interval: Duration);

    fn schedule_once(&self, name: &str, delay: Duration);

    /// Cancel a named schedule. Cancelling an unknown name is not an error.
    fn cancel(&self, name: &str);
}

// ───────────────────────────────────────────────────────────────
// Key-value store (engine ↔ persistence)
// ───────────────────────────────────────────────────────────────

/// String key-value persistence for laundry state, ledger and location.
///
/// `set` must be atomic per key: a reader sees either the old or the new
/// value, never a torn write.
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
