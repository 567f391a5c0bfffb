//! Rain risk analysis over a short-term hourly forecast.
//!
//! # Rules
//! The forecast is split into three look-ahead windows (first 1, 2 and 4
//! samples). The first matching rule wins:
//!
//! 1. next-1h max probability > 70 → `High`
//! 2. next-2h max probability > 50 → `Medium`
//! 3. next-4h max probability > 30 → `Low`
//! 4. otherwise → `None`
//!
//! These cut-offs are fixed. The configurable alert threshold only decides
//! which hour counts as rain onset.
//!
//! # Clock injection
//! `analyze` takes `now` as a parameter so onset timestamps are
//! deterministic in tests.

use chrono::{DateTime, Duration, Utc};

use crate::alert::thresholds::PrecipitationThreshold;
use crate::model::{ForecastSample, RainRiskAnalysis, RecommendedAction, RiskLevel, WindowMaxima};

/// Next-hour probability above which risk is `High`.
pub const HIGH_RISK_NEXT_1H: u8 = 70;

/// Two-hour probability above which risk is `Medium`.
pub const MEDIUM_RISK_NEXT_2H: u8 = 50;

/// Four-hour probability above which risk is `Low`.
pub const LOW_RISK_NEXT_4H: u8 = 30;

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Analyzes `forecast` and returns the risk level, the four-hour maximum,
/// the estimated onset of rain, and the recommended action.
///
/// `forecast` is expected in ascending `offset_hours` order starting at the
/// current hour. An empty forecast yields `RiskLevel::None` with no onset.
pub fn analyze(
    forecast: &[ForecastSample],
    threshold: PrecipitationThreshold,
    now: DateTime<Utc>,
) -> RainRiskAnalysis {
    let windows = WindowMaxima {
        next_1h: max_probability(forecast, 1),
        next_2h: max_probability(forecast, 2),
        next_4h: max_probability(forecast, 4),
    };
    let risk_level = classify(&windows);

    RainRiskAnalysis {
        risk_level,
        windows,
        max_probability_next_4h: windows.next_4h,
        estimated_rain_onset: estimate_onset(forecast, threshold, now),
        recommended_action: RecommendedAction::for_level(risk_level),
    }
}

/// Maximum probability among the first `hours` samples, or 0 if there are none.
pub fn max_probability(forecast: &[ForecastSample], hours: usize) -> u8 {
    forecast
        .iter()
        .take(hours)
        .map(ForecastSample::probability)
        .max()
        .unwrap_or(0)
}

fn classify(windows: &WindowMaxima) -> RiskLevel {
    if windows.next_1h > HIGH_RISK_NEXT_1H {
        RiskLevel::High
    } else if windows.next_2h > MEDIUM_RISK_NEXT_2H {
        RiskLevel::Medium
    } else if windows.next_4h > LOW_RISK_NEXT_4H {
        RiskLevel::Low
    } else {
        RiskLevel::None
    }
}

/// Earliest sample (by offset) whose probability breaches `threshold`,
/// converted to an absolute timestamp. An offset that cannot be
/// represented as a timestamp yields no onset.
fn estimate_onset(
    forecast: &[ForecastSample],
    threshold: PrecipitationThreshold,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    forecast
        .iter()
        .filter(|s| threshold.is_exceeded_by(s.probability()))
        .map(|s| s.offset_hours)
        .min()
        .and_then(|offset| now.checked_add_signed(Duration::try_hours(i64::from(offset))?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn forecast(probabilities: &[i32]) -> Vec<ForecastSample> {
        probabilities
            .iter()
            .enumerate()
            .map(|(i, p)| ForecastSample::new(i as u32, 22, *p))
            .collect()
    }

    fn threshold() -> PrecipitationThreshold {
        PrecipitationThreshold::default()
    }

    // --- Risk levels --------------------------------------------------------

    #[test]
    fn test_next_hour_above_seventy_is_high() {
        let analysis = analyze(&forecast(&[71, 0, 0, 0]), threshold(), fixed_now());
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.recommended_action, RecommendedAction::BringInImmediately);
    }

    #[test]
    fn test_next_hour_exactly_seventy_is_not_high() {
        let analysis = analyze(&forecast(&[70, 0, 0, 0]), threshold(), fixed_now());
        assert_eq!(analysis.risk_level, RiskLevel::Medium, "70 > 50 still trips the two-hour rule");
    }

    #[test]
    fn test_second_hour_above_fifty_is_medium() {
        let analysis = analyze(&forecast(&[50, 80, 20]), threshold(), fixed_now());
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
        assert_eq!(analysis.windows.next_1h, 50);
        assert_eq!(analysis.windows.next_2h, 80);
        assert_eq!(analysis.max_probability_next_4h, 80);
    }

    #[test]
    fn test_fourth_hour_above_thirty_is_low() {
        let analysis = analyze(&forecast(&[10, 20, 25, 45, 90]), threshold(), fixed_now());
        assert_eq!(analysis.risk_level, RiskLevel::Low);
        assert_eq!(analysis.max_probability_next_4h, 45);
        assert_eq!(analysis.recommended_action, RecommendedAction::MonitorConditions);
    }

    #[test]
    fn test_rain_after_four_hours_does_not_raise_risk() {
        let analysis = analyze(&forecast(&[0, 0, 0, 0, 100, 100]), threshold(), fixed_now());
        assert_eq!(analysis.risk_level, RiskLevel::None);
        assert_eq!(analysis.max_probability_next_4h, 0);
        assert_eq!(
            analysis.estimated_rain_onset,
            Some(fixed_now() + Duration::hours(4)),
            "onset search covers the whole forecast, not just four hours"
        );
    }

    #[test]
    fn test_all_zero_forecast_is_none() {
        let analysis = analyze(&forecast(&[0; 24]), threshold(), fixed_now());
        assert_eq!(analysis.risk_level, RiskLevel::None);
        assert_eq!(analysis.estimated_rain_onset, None);
        assert_eq!(analysis.recommended_action, RecommendedAction::NoRainExpected);
    }

    #[test]
    fn test_empty_forecast_is_none_with_zero_windows() {
        let analysis = analyze(&[], threshold(), fixed_now());
        assert_eq!(analysis.risk_level, RiskLevel::None);
        assert_eq!(analysis.windows, WindowMaxima::default());
        assert_eq!(analysis.estimated_rain_onset, None);
    }

    #[test]
    fn test_short_forecast_uses_available_samples() {
        let analysis = analyze(&forecast(&[40]), threshold(), fixed_now());
        assert_eq!(analysis.windows.next_2h, 40);
        assert_eq!(analysis.windows.next_4h, 40);
        assert_eq!(analysis.risk_level, RiskLevel::Low);
    }

    // --- Onset --------------------------------------------------------------

    #[test]
    fn test_onset_is_first_sample_above_threshold() {
        let analysis = analyze(&forecast(&[50, 80, 20]), threshold(), fixed_now());
        assert_eq!(analysis.estimated_rain_onset, Some(fixed_now()));
    }

    #[test]
    fn test_onset_uses_configurable_threshold() {
        let samples = forecast(&[35, 55, 75]);
        let strict = analyze(&samples, PrecipitationThreshold::new(60), fixed_now());
        assert_eq!(strict.estimated_rain_onset, Some(fixed_now() + Duration::hours(2)));
        assert_eq!(strict.risk_level, RiskLevel::Medium, "risk cut-offs ignore the alert threshold");
    }

    #[test]
    fn test_onset_equal_to_threshold_does_not_count() {
        let analysis = analyze(&forecast(&[30, 30, 31]), threshold(), fixed_now());
        assert_eq!(analysis.estimated_rain_onset, Some(fixed_now() + Duration::hours(2)));
    }

    #[test]
    fn test_onset_is_earliest_by_offset_not_position() {
        let samples = vec![
            ForecastSample::new(3, 20, 90),
            ForecastSample::new(1, 20, 60),
        ];
        let analysis = analyze(&samples, threshold(), fixed_now());
        assert_eq!(analysis.estimated_rain_onset, Some(fixed_now() + Duration::hours(1)));
    }

    #[test]
    fn test_unrepresentable_onset_offset_is_no_onset() {
        let samples = vec![ForecastSample::new(u32::MAX, 20, 90)];
        let analysis = analyze(&samples, threshold(), fixed_now());
        assert_eq!(analysis.estimated_rain_onset, None);
        assert_eq!(analysis.risk_level, RiskLevel::High, "first sample still drives the windows");
    }

    // --- Purity -------------------------------------------------------------

    #[test]
    fn test_identical_inputs_give_identical_output() {
        let samples = forecast(&[12, 64, 33, 90, 5]);
        let first = analyze(&samples, threshold(), fixed_now());
        let second = analyze(&samples, threshold(), fixed_now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_range_probabilities_are_clamped() {
        let samples = vec![ForecastSample {
            offset_hours: 0,
            temperature_c: 20,
            precipitation_probability: 200,
        }];
        let analysis = analyze(&samples, threshold(), fixed_now());
        assert_eq!(analysis.windows.next_1h, 100);
        assert_eq!(analysis.risk_level, RiskLevel::High);
    }
}
