//! Monitoring loop: one cycle of location → forecast → analysis → policy,
//! plus the user actions that start and stop monitoring.
//!
//! ```text
//!   resolve location ─▶ fetch forecast ─▶ analyze ─▶ decide ─▶ persist ledger ─▶ notify
//! ```
//!
//! Periodic and snooze checks run the same cycle; [`CheckKind`] picks the
//! alert policy variant and whether a failure asks the scheduler to retry.
//!
//! A snooze check may run on another thread while a periodic check is in
//! flight. The read of state and ledger, the decision, and the ledger write
//! happen under one lock, so the two-field ledger is never interleaved.
//! The ledger is written before any notification goes out; a failed write
//! means the user hears nothing and the previous ledger stays in place.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use thiserror::Error;

use crate::alert::policy::{AlertOutcome, AlertPolicy, SuppressReason};
use crate::analysis::analyze;
use crate::config::MonitorConfig;
use crate::ingest::normalize_forecast;
use crate::location::LocationResolver;
use crate::logging::{log_cycle_failure, log_cycle_summary};
use crate::model::{FetchError, LaundryState, LaundryStatus, RiskLevel, StoreError, TransitionError};
use crate::ports::{ForecastSource, LocationSource, Notifier, Scheduler};
use crate::store::LaundryStore;

/// Unique name of the recurring background check.
pub const PERIODIC_CHECK: &str = "weather_check_periodic";

/// Unique name of the one-shot check queued by a snooze.
pub const SNOOZE_CHECK: &str = "weather_check_snooze";

// ---------------------------------------------------------------------------
// Cycle types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Periodic,
    Snooze,
}

impl CheckKind {
    /// Whether a failed cycle of this kind should be retried by the scheduler.
    pub fn retries_on_failure(self) -> bool {
        matches!(self, CheckKind::Periodic)
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Periodic => write!(f, "periodic"),
            CheckKind::Snooze => write!(f, "snooze"),
        }
    }
}

/// What a successful cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Laundry was not hanging when the cycle started; nothing was fetched.
    Skipped,
    /// A rain alert was sent.
    Alerted {
        minutes_until_rain: i64,
        risk_level: RiskLevel,
    },
    Suppressed(SuppressReason),
    /// A snooze check found the rain concern gone and sent a reassurance notice.
    Recovered,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Skipped => write!(f, "skipped (laundry not hanging)"),
            CycleOutcome::Alerted {
                minutes_until_rain,
                risk_level,
            } => write!(f, "alerted, rain in ~{} min ({} risk)", minutes_until_rain, risk_level),
            CycleOutcome::Suppressed(reason) => write!(f, "suppressed ({})", reason),
            CycleOutcome::Recovered => write!(f, "recovered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    #[error("forecast fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// A failed cycle. `retry` tells the scheduling layer whether to try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleFailure {
    pub error: CycleError,
    pub retry: bool,
}

impl fmt::Display for CycleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for CycleFailure {}

/// Errors from user actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Monitoring loop
// ---------------------------------------------------------------------------

/// The collaborators a [`MonitoringLoop`] drives.
pub struct Collaborators {
    pub store: LaundryStore,
    pub forecast: Box<dyn ForecastSource>,
    pub location: Box<dyn LocationSource>,
    pub notifier: Box<dyn Notifier>,
    pub scheduler: Box<dyn Scheduler>,
}

pub struct MonitoringLoop {
    config: MonitorConfig,
    store: LaundryStore,
    locations: LocationResolver,
    forecast: Box<dyn ForecastSource>,
    notifier: Box<dyn Notifier>,
    scheduler: Box<dyn Scheduler>,
    /// Serialises every read-modify-write of laundry state and ledger.
    state_guard: Mutex<()>,
}

impl MonitoringLoop {
    pub fn new(config: MonitorConfig, collaborators: Collaborators) -> Self {
        let locations = LocationResolver::new(
            collaborators.location,
            config.default_coordinates(),
            config.location_max_age(),
        );
        Self {
            store: collaborators.store,
            locations,
            forecast: collaborators.forecast,
            notifier: collaborators.notifier,
            scheduler: collaborators.scheduler,
            config,
            state_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn policy_for(&self, kind: CheckKind) -> AlertPolicy {
        let alerts = &self.config.alerts;
        match kind {
            CheckKind::Periodic => AlertPolicy::periodic(
                alerts.precipitation_threshold,
                self.config.cooldown(),
                alerts.fallback_minutes_until_rain,
            ),
            CheckKind::Snooze => {
                AlertPolicy::snooze(alerts.precipitation_threshold, alerts.fallback_minutes_until_rain)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.state_guard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Cycle
    // -----------------------------------------------------------------------

    /// Runs one check cycle at `now` and logs its result.
    pub fn run_cycle(&self, kind: CheckKind, now: DateTime<Utc>) -> Result<CycleOutcome, CycleFailure> {
        let result = self.execute_cycle(kind, now).map_err(|error| CycleFailure {
            error,
            retry: kind.retries_on_failure(),
        });
        match &result {
            Ok(outcome) => log_cycle_summary(kind, outcome),
            Err(failure) => log_cycle_failure(kind, failure),
        }
        result
    }

    fn execute_cycle(&self, kind: CheckKind, now: DateTime<Utc>) -> Result<CycleOutcome, CycleError> {
        if !self.store.load_state()?.is_hanging() {
            return Ok(CycleOutcome::Skipped);
        }

        let location = self.locations.resolve(&self.store, now);
        debug!(
            target: "location",
            "using ({:.4}, {:.4}) from {:?}",
            location.coordinates.latitude, location.coordinates.longitude, location.origin
        );

        let raw = self.forecast.fetch_hourly_forecast(location.coordinates)?;
        let forecast = normalize_forecast(raw, self.config.forecast.horizon_hours);
        let analysis = analyze(&forecast, self.config.threshold(), now);
        debug!(
            target: "forecast",
            "{} samples, 1h/2h/4h max {}/{}/{}%, risk {}",
            forecast.len(),
            analysis.windows.next_1h,
            analysis.windows.next_2h,
            analysis.windows.next_4h,
            analysis.risk_level
        );

        let decision = {
            let _guard = self.lock();
            let state = self.store.load_state()?;
            let ledger = self.store.load_ledger()?;
            let decision = self.policy_for(kind).decide(state.status, &analysis, &ledger, now);
            if decision.emit() {
                self.store.save_ledger(&decision.ledger)?;
            }
            decision
        };
        debug!(target: "policy", "{} check decided {:?}", kind, decision.outcome);

        let outcome = match decision.outcome {
            AlertOutcome::Emit => {
                let minutes_until_rain = decision
                    .minutes_until_rain
                    .unwrap_or(self.config.alerts.fallback_minutes_until_rain);
                self.notifier.notify_rain_alert(minutes_until_rain);
                CycleOutcome::Alerted {
                    minutes_until_rain,
                    risk_level: analysis.risk_level,
                }
            }
            AlertOutcome::Suppressed(reason) => CycleOutcome::Suppressed(reason),
            AlertOutcome::Recovered => {
                self.notifier.notify_general(
                    "Weather improving",
                    "The chance of rain has dropped. Your laundry can stay out for now.",
                );
                CycleOutcome::Recovered
            }
        };
        Ok(outcome)
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// Current laundry state.
    pub fn state(&self) -> Result<LaundryState, StoreError> {
        self.store.load_state()
    }

    /// How long the laundry has been out, or `None` if it isn't hanging.
    pub fn hanging_duration(&self, now: DateTime<Utc>) -> Result<Option<Duration>, StoreError> {
        Ok(self.store.load_state()?.hanging_duration(now))
    }

    /// Marks the laundry as hanging and starts the periodic check.
    ///
    /// Hanging again while already hanging keeps the original hang time.
    pub fn hang_laundry(&self, now: DateTime<Utc>) -> Result<LaundryState, ActionError> {
        let state = self.change_status(LaundryStatus::Hanging, now)?;
        self.scheduler
            .schedule_periodic(PERIODIC_CHECK, self.config.periodic_interval());
        info!(target: "monitor", "laundry hanging, checking every {} min", self.config.schedule.periodic_interval_minutes);
        Ok(state)
    }

    /// Marks the laundry as brought in and stops all checks.
    pub fn bring_in(&self, now: DateTime<Utc>) -> Result<LaundryState, ActionError> {
        let state = self.change_status(LaundryStatus::BroughtIn, now)?;
        self.stop_checks();
        self.notifier.cancel_rain_alert();
        self.notifier
            .notify_general("Laundry brought in", "Rain monitoring has stopped.");
        info!(target: "monitor", "laundry brought in, monitoring stopped");
        Ok(state)
    }

    /// Dismisses the current alert and queues one re-check after the snooze
    /// delay. Returns `false` and does nothing unless the laundry is hanging.
    pub fn snooze(&self, _now: DateTime<Utc>) -> Result<bool, StoreError> {
        if !self.store.load_state()?.is_hanging() {
            debug!(target: "monitor", "snooze ignored, laundry not hanging");
            return Ok(false);
        }
        let minutes = self.config.schedule.snooze_delay_minutes;
        self.notifier.cancel_rain_alert();
        self.scheduler.schedule_once(SNOOZE_CHECK, self.config.snooze_delay());
        self.notifier.notify_general(
            "Snoozed",
            &format!("The weather will be checked again in {} minutes.", minutes),
        );
        info!(target: "monitor", "snoozed for {} min", minutes);
        Ok(true)
    }

    /// Returns to `NotHanging` from any status and stops all checks.
    pub fn reset(&self, now: DateTime<Utc>) -> Result<LaundryState, ActionError> {
        let state = self.change_status(LaundryStatus::NotHanging, now)?;
        self.stop_checks();
        self.notifier.cancel_rain_alert();
        Ok(state)
    }

    /// Re-registers the periodic check after a process or device restart if
    /// the persisted status is still `Hanging`. Returns whether it did.
    pub fn resume_after_restart(&self) -> Result<bool, StoreError> {
        if !self.store.load_state()?.is_hanging() {
            return Ok(false);
        }
        self.scheduler
            .schedule_periodic(PERIODIC_CHECK, self.config.periodic_interval());
        info!(target: "monitor", "resumed periodic check after restart");
        Ok(true)
    }

    fn change_status(&self, next: LaundryStatus, now: DateTime<Utc>) -> Result<LaundryState, ActionError> {
        let _guard = self.lock();
        let current = self.store.load_state()?;
        let updated = current.transition(next, now)?;
        if updated != current {
            self.store.save_state(&updated)?;
        }
        Ok(updated)
    }

    fn stop_checks(&self) {
        self.scheduler.cancel(PERIODIC_CHECK);
        self.scheduler.cancel(SNOOZE_CHECK);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
