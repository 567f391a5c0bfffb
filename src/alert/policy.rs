//! Alert policy: whether a risk analysis becomes a rain alert.
//!
//! The policy is a pure decision over the laundry status, the latest
//! analysis, the alert ledger, and an injected `now`. It never touches the
//! store or the notifier; the monitoring loop persists the returned ledger
//! and dispatches whatever the decision asks for.
//!
//! Two variants share one rule set:
//! - **periodic** checks apply a cooldown (default 30 minutes) so repeated
//!   checks don't spam the user;
//! - **snooze** re-checks use a zero cooldown and additionally report a
//!   `Recovered` outcome when the rain concern has gone away.

use chrono::{DateTime, Duration, Utc};

use crate::alert::thresholds::PrecipitationThreshold;
use crate::model::{AlertLedger, LaundryStatus, RainRiskAnalysis};

/// Default dedup window between two periodic alerts.
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 30;

/// Minutes-until-rain reported when the analysis has no onset estimate.
pub const FALLBACK_MINUTES_UNTIL_RAIN: i64 = 30;

// ---------------------------------------------------------------------------
// Decision types
// ---------------------------------------------------------------------------

/// Why an alert was not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Laundry is not out; alerting is meaningless.
    NotHanging,
    /// Four-hour probability is at or below the threshold.
    NoRainConcern,
    /// An alert went out less than one cooldown ago.
    Cooldown,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressReason::NotHanging => write!(f, "laundry not hanging"),
            SuppressReason::NoRainConcern => write!(f, "no rain concern"),
            SuppressReason::Cooldown => write!(f, "within cooldown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// Send a rain alert and persist the new ledger.
    Emit,
    /// Do nothing this cycle.
    Suppressed(SuppressReason),
    /// Snooze re-check found the rain concern gone; send a reassurance
    /// notice instead of an alert. Ledger untouched.
    Recovered,
}

/// The policy's verdict for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertDecision {
    pub outcome: AlertOutcome,
    /// Ledger to persist. Equal to the input ledger unless `outcome` is `Emit`.
    pub ledger: AlertLedger,
    /// Whole minutes until the estimated onset, only set on `Emit`.
    pub minutes_until_rain: Option<i64>,
}

impl AlertDecision {
    pub fn emit(&self) -> bool {
        self.outcome == AlertOutcome::Emit
    }

    pub fn recovered(&self) -> bool {
        self.outcome == AlertOutcome::Recovered
    }

    fn unchanged(outcome: AlertOutcome, ledger: &AlertLedger) -> Self {
        Self {
            outcome,
            ledger: *ledger,
            minutes_until_rain: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    pub threshold: PrecipitationThreshold,
    pub cooldown: Duration,
    pub fallback_minutes_until_rain: i64,
    /// Whether a cleared rain concern is reported as `Recovered`.
    pub reports_recovery: bool,
}

impl AlertPolicy {
    /// Policy for the fixed-interval background check.
    pub fn periodic(threshold: PrecipitationThreshold, cooldown: Duration, fallback_minutes_until_rain: i64) -> Self {
        Self {
            threshold,
            cooldown,
            fallback_minutes_until_rain,
            reports_recovery: false,
        }
    }

    /// Policy for the one-shot check that follows a user snooze.
    pub fn snooze(threshold: PrecipitationThreshold, fallback_minutes_until_rain: i64) -> Self {
        Self {
            threshold,
            cooldown: Duration::zero(),
            fallback_minutes_until_rain,
            reports_recovery: true,
        }
    }

    /// Decides whether `analysis` should raise an alert at `now`.
    ///
    /// Rules, in order:
    /// 1. status is not `Hanging` → suppressed, ledger unchanged;
    /// 2. four-hour max ≤ threshold → suppressed (or `Recovered` for snooze);
    /// 3. `now - last_alert_time < cooldown` → suppressed;
    /// 4. otherwise emit and stamp the ledger with `now`.
    pub fn decide(
        &self,
        status: LaundryStatus,
        analysis: &RainRiskAnalysis,
        ledger: &AlertLedger,
        now: DateTime<Utc>,
    ) -> AlertDecision {
        if status != LaundryStatus::Hanging {
            return AlertDecision::unchanged(AlertOutcome::Suppressed(SuppressReason::NotHanging), ledger);
        }

        if !self.threshold.is_exceeded_by(analysis.max_probability_next_4h) {
            let outcome = if self.reports_recovery {
                AlertOutcome::Recovered
            } else {
                AlertOutcome::Suppressed(SuppressReason::NoRainConcern)
            };
            return AlertDecision::unchanged(outcome, ledger);
        }

        if now - ledger.last_alert_time < self.cooldown {
            return AlertDecision::unchanged(AlertOutcome::Suppressed(SuppressReason::Cooldown), ledger);
        }

        AlertDecision {
            outcome: AlertOutcome::Emit,
            ledger: AlertLedger {
                last_alert_probability: analysis.max_probability_next_4h,
                last_alert_time: now,
            },
            minutes_until_rain: Some(self.minutes_until_rain(analysis, now)),
        }
    }

    fn minutes_until_rain(&self, analysis: &RainRiskAnalysis, now: DateTime<Utc>) -> i64 {
        match analysis.estimated_rain_onset {
            Some(onset) => (onset - now).num_minutes().max(0),
            None => self.fallback_minutes_until_rain,
        }
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self::periodic(
            PrecipitationThreshold::default(),
            Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
            FALLBACK_MINUTES_UNTIL_RAIN,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
