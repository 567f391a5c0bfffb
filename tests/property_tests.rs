//! Property tests for the risk analyzer and the alert policy.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use laundry_alert::alert::{AlertOutcome, AlertPolicy, PrecipitationThreshold, SuppressReason};
use laundry_alert::analysis::analyze;
use laundry_alert::model::{AlertLedger, ForecastSample, LaundryStatus, RiskLevel};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
}

fn samples(probabilities: &[i32]) -> Vec<ForecastSample> {
    probabilities
        .iter()
        .enumerate()
        .map(|(h, &p)| ForecastSample::new(h as u32, 20, p))
        .collect()
}

fn arb_forecast() -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(-20i32..=130, 0..=24)
}

fn arb_status() -> impl Strategy<Value = LaundryStatus> {
    prop_oneof![
        Just(LaundryStatus::NotHanging),
        Just(LaundryStatus::Hanging),
        Just(LaundryStatus::BroughtIn),
    ]
}

// ── Risk analysis ─────────────────────────────────────────────

proptest! {
    /// Nothing above 30% in the first four hours means no risk, no matter
    /// what comes later.
    #[test]
    fn quiet_first_four_hours_is_no_risk(
        head in proptest::collection::vec(0i32..=30, 0..=4),
        tail in proptest::collection::vec(0i32..=100, 0..=20),
    ) {
        let mut probabilities = head.clone();
        if head.len() == 4 {
            probabilities.extend(tail);
        }
        let analysis = analyze(&samples(&probabilities), PrecipitationThreshold::default(), fixed_now());
        prop_assert_eq!(analysis.risk_level, RiskLevel::None);
        prop_assert!(analysis.max_probability_next_4h <= 30);
    }

    /// A first hour above 70% is always high risk.
    #[test]
    fn wet_first_hour_is_high_risk(first in 71i32..=100, rest in proptest::collection::vec(0i32..=100, 0..=23)) {
        let mut probabilities = vec![first];
        probabilities.extend(rest);
        let analysis = analyze(&samples(&probabilities), PrecipitationThreshold::default(), fixed_now());
        prop_assert_eq!(analysis.risk_level, RiskLevel::High);
    }

    /// Raising any probability never lowers the risk level.
    #[test]
    fn risk_is_monotonic_in_probability(
        probabilities in proptest::collection::vec(0i32..=100, 1..=24),
        index in 0usize..24,
        bump in 0i32..=100,
    ) {
        let index = index % probabilities.len();
        let mut raised = probabilities.clone();
        raised[index] = (raised[index] + bump).min(100);

        let threshold = PrecipitationThreshold::default();
        let before = analyze(&samples(&probabilities), threshold, fixed_now());
        let after = analyze(&samples(&raised), threshold, fixed_now());
        prop_assert!(after.risk_level >= before.risk_level);
    }

    /// Out-of-range input is clamped, never rejected, and the analysis is
    /// a pure function of its input.
    #[test]
    fn analysis_is_total_and_deterministic(probabilities in arb_forecast(), threshold in -50i32..=150) {
        let threshold = PrecipitationThreshold::new(threshold);
        let forecast = samples(&probabilities);
        let first = analyze(&forecast, threshold, fixed_now());
        let second = analyze(&forecast, threshold, fixed_now());
        prop_assert_eq!(first, second);
        prop_assert!(first.max_probability_next_4h <= 100);
        if let Some(onset) = first.estimated_rain_onset {
            prop_assert!(onset >= fixed_now());
        }
    }
}

// ── Alert policy ──────────────────────────────────────────────

proptest! {
    /// Only hanging laundry ever gets an alert, and a suppressed decision
    /// never changes the ledger.
    #[test]
    fn only_hanging_laundry_is_alerted(
        status in arb_status(),
        probabilities in arb_forecast(),
        minutes_since_alert in 0i64..=600,
        snooze in any::<bool>(),
    ) {
        let threshold = PrecipitationThreshold::default();
        let policy = if snooze {
            AlertPolicy::snooze(threshold, 30)
        } else {
            AlertPolicy::default()
        };
        let ledger = AlertLedger {
            last_alert_probability: 50,
            last_alert_time: fixed_now() - Duration::minutes(minutes_since_alert),
        };
        let analysis = analyze(&samples(&probabilities), threshold, fixed_now());
        let decision = policy.decide(status, &analysis, &ledger, fixed_now());

        if status != LaundryStatus::Hanging {
            prop_assert_eq!(decision.outcome, AlertOutcome::Suppressed(SuppressReason::NotHanging));
        }
        if !decision.emit() {
            prop_assert_eq!(decision.ledger, ledger);
            prop_assert_eq!(decision.minutes_until_rain, None);
        }
    }

    /// Two periodic alerts are never closer together than the cooldown.
    #[test]
    fn periodic_alerts_respect_cooldown(
        probabilities in proptest::collection::vec(31i32..=100, 4..=24),
        gap_minutes in 0i64..=120,
    ) {
        let policy = AlertPolicy::default();
        let analysis = analyze(&samples(&probabilities), PrecipitationThreshold::default(), fixed_now());
        let first = policy.decide(LaundryStatus::Hanging, &analysis, &AlertLedger::default(), fixed_now());
        prop_assert!(first.emit());

        let later = fixed_now() + Duration::minutes(gap_minutes);
        let second = policy.decide(LaundryStatus::Hanging, &analysis, &first.ledger, later);
        prop_assert_eq!(second.emit(), gap_minutes >= 30);
    }

    /// Re-running a decision on the ledger it produced at the same instant
    /// does not alert again.
    #[test]
    fn decision_is_idempotent_at_same_instant(probabilities in arb_forecast()) {
        let policy = AlertPolicy::default();
        let analysis = analyze(&samples(&probabilities), PrecipitationThreshold::default(), fixed_now());
        let first = policy.decide(LaundryStatus::Hanging, &analysis, &AlertLedger::default(), fixed_now());
        let second = policy.decide(LaundryStatus::Hanging, &analysis, &first.ledger, fixed_now());
        prop_assert!(!second.emit());
        prop_assert_eq!(second.ledger, first.ledger);
    }

    /// Reported minutes until rain are never negative.
    #[test]
    fn minutes_until_rain_are_non_negative(probabilities in arb_forecast()) {
        let policy = AlertPolicy::default();
        let analysis = analyze(&samples(&probabilities), PrecipitationThreshold::default(), fixed_now());
        let decision = policy.decide(LaundryStatus::Hanging, &analysis, &AlertLedger::default(), fixed_now());
        if let Some(minutes) = decision.minutes_until_rain {
            prop_assert!(minutes >= 0);
        }
    }
}
