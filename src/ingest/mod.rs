//! Forecast ingestion.
//!
//! `open_meteo` understands the weather provider's response format.
//! [`normalize_forecast`] is applied to whatever a `ForecastSource` hands
//! back before the analyzer sees it.

pub mod open_meteo;

use crate::model::ForecastSample;

/// Puts a collaborator-supplied forecast into analyzer order.
///
/// Samples at or beyond `horizon_hours` are dropped. The rest are sorted by
/// `offset_hours`; for duplicate offsets the first one wins. Probabilities
/// are re-clamped and the result is cut to `horizon_hours` samples.
pub fn normalize_forecast(mut samples: Vec<ForecastSample>, horizon_hours: usize) -> Vec<ForecastSample> {
    samples.retain(|s| (s.offset_hours as usize) < horizon_hours);
    samples.sort_by_key(|s| s.offset_hours);
    samples.dedup_by_key(|s| s.offset_hours);
    samples.truncate(horizon_hours);
    for sample in &mut samples {
        sample.precipitation_probability = sample.probability();
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(offset_hours: u32, probability: u8) -> ForecastSample {
        ForecastSample {
            offset_hours,
            temperature_c: 20,
            precipitation_probability: probability,
        }
    }

    #[test]
    fn test_out_of_order_samples_are_sorted() {
        let normalized = normalize_forecast(vec![sample(2, 40), sample(0, 10), sample(1, 20)], 24);
        let offsets: Vec<u32> = normalized.iter().map(|s| s.offset_hours).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicate_offsets_keep_first_after_sort() {
        let normalized = normalize_forecast(vec![sample(0, 10), sample(0, 90), sample(1, 20)], 24);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].precipitation_probability, 10);
    }

    #[test]
    fn test_out_of_range_probability_is_clamped() {
        let normalized = normalize_forecast(vec![sample(0, 250)], 24);
        assert_eq!(normalized[0].precipitation_probability, 100);
    }

    #[test]
    fn test_horizon_truncates() {
        let samples = (0..30).map(|h| sample(h, 5)).collect();
        assert_eq!(normalize_forecast(samples, 24).len(), 24);
    }

    #[test]
    fn test_offsets_beyond_horizon_are_dropped() {
        let normalized = normalize_forecast(vec![sample(u32::MAX, 90), sample(24, 80), sample(23, 10)], 24);
        let offsets: Vec<u32> = normalized.iter().map(|s| s.offset_hours).collect();
        assert_eq!(offsets, vec![23]);
    }

    #[test]
    fn test_empty_forecast_stays_empty() {
        assert!(normalize_forecast(Vec::new(), 24).is_empty());
    }
}
