/// Open-Meteo hourly forecast parsing
///
/// Turns the JSON body of an Open-Meteo `/v1/forecast` response into the
/// engine's `ForecastSample`s. The HTTP request itself belongs to whatever
/// `ForecastSource` implementation the host application provides; this
/// module only builds the URL and interprets the response.
///
/// API Documentation: https://open-meteo.com/en/docs

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, Utc};
use log::debug;
use serde::Deserialize;

use crate::model::{Coordinates, FetchError, ForecastSample};

const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com";

/// Real-world UTC offsets stay within ±18 hours.
const MAX_UTC_OFFSET_SECONDS: i64 = 18 * 3600;

/// Hourly variables requested from the provider.
pub const HOURLY_VARIABLES: &str = "temperature_2m,precipitation_probability";

// ============================================================================
// Open-Meteo API Response Structures
// ============================================================================

/// Forecast response; only the fields the engine reads are modelled.
#[derive(Debug, Deserialize)]
pub struct OpenMeteoResponse {
    /// Offset of the `hourly.time` wall-clock values from UTC.
    #[serde(default)]
    pub utc_offset_seconds: i64,
    pub hourly: HourlyBlock,
}

/// Column-oriented hourly series: index `i` of every vector is one hour.
#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>, // local wall clock, e.g. "2024-05-01T13:00"
    pub temperature_2m: Vec<Option<f64>>,
    pub precipitation_probability: Vec<Option<i32>>,
}

// ============================================================================
// URL construction
// ============================================================================

/// Builds the hourly forecast URL for a coordinate.
pub fn build_forecast_url(at: Coordinates, timezone: &str) -> String {
    format!(
        "{}/v1/forecast?latitude={:.4}&longitude={:.4}&hourly={}&timezone={}",
        OPEN_METEO_BASE_URL,
        at.latitude,
        at.longitude,
        HOURLY_VARIABLES,
        timezone.replace('/', "%2F"),
    )
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a forecast response into samples relative to `now`.
///
/// - Hours before the current hour are dropped; the current hour is offset 0.
/// - Hours with a null temperature or probability are skipped.
/// - Temperatures are rounded to whole degrees; probabilities are clamped.
/// - At most `horizon_hours` samples are returned.
pub fn parse_hourly_response(
    body: &str,
    now: DateTime<Utc>,
    horizon_hours: usize,
) -> Result<Vec<ForecastSample>, FetchError> {
    let response: OpenMeteoResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;
    hourly_samples(&response, now, horizon_hours)
}

/// Converts an already-deserialized response into samples.
pub fn hourly_samples(
    response: &OpenMeteoResponse,
    now: DateTime<Utc>,
    horizon_hours: usize,
) -> Result<Vec<ForecastSample>, FetchError> {
    let hourly = &response.hourly;
    if hourly.time.len() != hourly.temperature_2m.len()
        || hourly.time.len() != hourly.precipitation_probability.len()
    {
        return Err(FetchError::Parse(format!(
            "hourly series lengths differ: time={}, temperature_2m={}, precipitation_probability={}",
            hourly.time.len(),
            hourly.temperature_2m.len(),
            hourly.precipitation_probability.len()
        )));
    }

    let current_hour = now
        .duration_trunc(Duration::hours(1))
        .map_err(|e| FetchError::Parse(format!("cannot truncate now to the hour: {}", e)))?;
    if !(-MAX_UTC_OFFSET_SECONDS..=MAX_UTC_OFFSET_SECONDS).contains(&response.utc_offset_seconds) {
        return Err(FetchError::Parse(format!(
            "utc_offset_seconds out of range: {}",
            response.utc_offset_seconds
        )));
    }
    let utc_offset = Duration::try_seconds(response.utc_offset_seconds)
        .ok_or_else(|| FetchError::Parse("utc_offset_seconds out of range".into()))?;

    let mut samples = Vec::new();
    for (i, time) in hourly.time.iter().enumerate() {
        let local = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M")
            .map_err(|e| FetchError::Parse(format!("bad hourly time '{}': {}", time, e)))?;
        let utc = local
            .checked_sub_signed(utc_offset)
            .ok_or_else(|| FetchError::Parse(format!("hourly time '{}' out of range", time)))?;
        let at = DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc);
        if at < current_hour {
            continue;
        }

        let (Some(temperature), Some(probability)) =
            (hourly.temperature_2m[i], hourly.precipitation_probability[i])
        else {
            debug!(target: "forecast", "skipping {} with missing values", time);
            continue;
        };

        let offset_hours = (at - current_hour).num_hours();
        samples.push(ForecastSample::new(
            u32::try_from(offset_hours).unwrap_or(u32::MAX),
            temperature.round() as i32,
            probability,
        ));
        if samples.len() >= horizon_hours {
            break;
        }
    }

    Ok(samples)
}

// ============================================================================
// Tests
// ============================================================================
