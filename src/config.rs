//! Monitoring configuration.
//!
//! All tunables for the rain-alert engine, loaded from a TOML file. Every
//! section and field is optional; anything left out takes the default
//! shown below.
//!
//! ```toml
//! [alerts]
//! precipitation_threshold = 30
//! cooldown_minutes = 30
//! fallback_minutes_until_rain = 30
//!
//! [schedule]
//! periodic_interval_minutes = 15
//! snooze_delay_minutes = 10
//!
//! [location]
//! default_latitude = 35.6762
//! default_longitude = 139.6503
//! max_age_minutes = 60
//!
//! [forecast]
//! horizon_hours = 24
//! timezone = "Asia/Tokyo"
//!
//! [logging]
//! level = "info"
//! console_timestamps = false
//! # file = "/var/log/laundry_alert.log"
//! ```

use std::path::Path;

use chrono::Duration;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::policy::{DEFAULT_COOLDOWN_MINUTES, FALLBACK_MINUTES_UNTIL_RAIN};
use crate::alert::thresholds::PrecipitationThreshold;
use crate::location::{DEFAULT_COORDINATES, DEFAULT_MAX_AGE_MINUTES};
use crate::model::Coordinates;

/// Upper bound for cooldown and location age: one week.
const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Minutes as a `Duration`, saturating for configs built in code that
/// skipped `validate()`.
fn minutes_saturating(minutes: i64) -> Duration {
    Duration::try_minutes(minutes).unwrap_or(if minutes < 0 { Duration::MIN } else { Duration::MAX })
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub alerts: AlertConfig,
    pub schedule: ScheduleConfig,
    pub location: LocationConfig,
    pub forecast: ForecastConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Probability (percent) above which rain is a concern.
    pub precipitation_threshold: PrecipitationThreshold,
    /// Minimum gap between two periodic alerts.
    pub cooldown_minutes: i64,
    /// Reported lead time when no onset can be estimated.
    pub fallback_minutes_until_rain: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub periodic_interval_minutes: i64,
    pub snooze_delay_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub default_latitude: f64,
    pub default_longitude: f64,
    /// Stored fixes older than this are refreshed from the location source.
    pub max_age_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of hourly samples kept from the provider response.
    pub horizon_hours: usize,
    /// Timezone the provider reports local times in.
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            precipitation_threshold: PrecipitationThreshold::default(),
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            fallback_minutes_until_rain: FALLBACK_MINUTES_UNTIL_RAIN,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            periodic_interval_minutes: 15,
            snooze_delay_minutes: 10,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_latitude: DEFAULT_COORDINATES.latitude,
            default_longitude: DEFAULT_COORDINATES.longitude,
            max_age_minutes: DEFAULT_MAX_AGE_MINUTES,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_hours: 24,
            timezone: "Asia/Tokyo".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console_timestamps: false,
        }
    }
}

impl MonitorConfig {
    /// Reads, parses and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_WINDOW_MINUTES).contains(&self.alerts.cooldown_minutes) {
            return Err(ConfigError::Invalid("alerts.cooldown_minutes must be 0–10080"));
        }
        if !(0..=24 * 60).contains(&self.alerts.fallback_minutes_until_rain) {
            return Err(ConfigError::Invalid(
                "alerts.fallback_minutes_until_rain must be 0–1440",
            ));
        }
        if !(1..=24 * 60).contains(&self.schedule.periodic_interval_minutes) {
            return Err(ConfigError::Invalid(
                "schedule.periodic_interval_minutes must be 1–1440",
            ));
        }
        if !(1..=24 * 60).contains(&self.schedule.snooze_delay_minutes) {
            return Err(ConfigError::Invalid("schedule.snooze_delay_minutes must be 1–1440"));
        }
        if !self.default_coordinates().is_valid() {
            return Err(ConfigError::Invalid(
                "location default coordinates must be valid WGS84",
            ));
        }
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.location.max_age_minutes) {
            return Err(ConfigError::Invalid("location.max_age_minutes must be 1–10080"));
        }
        if !(4..=168).contains(&self.forecast.horizon_hours) {
            return Err(ConfigError::Invalid("forecast.horizon_hours must be 4–168"));
        }
        if self.forecast.timezone.trim().is_empty() {
            return Err(ConfigError::Invalid("forecast.timezone must not be empty"));
        }
        if self.log_level().is_none() {
            return Err(ConfigError::Invalid(
                "logging.level must be one of off, error, warn, info, debug, trace",
            ));
        }
        Ok(())
    }

    pub fn threshold(&self) -> PrecipitationThreshold {
        self.alerts.precipitation_threshold
    }

    pub fn cooldown(&self) -> Duration {
        minutes_saturating(self.alerts.cooldown_minutes)
    }

    pub fn periodic_interval(&self) -> Duration {
        minutes_saturating(self.schedule.periodic_interval_minutes)
    }

    pub fn snooze_delay(&self) -> Duration {
        minutes_saturating(self.schedule.snooze_delay_minutes)
    }

    pub fn location_max_age(&self) -> Duration {
        minutes_saturating(self.location.max_age_minutes)
    }

    pub fn default_coordinates(&self) -> Coordinates {
        Coordinates::new(self.location.default_latitude, self.location.default_longitude)
    }

    pub fn log_level(&self) -> Option<LevelFilter> {
        self.logging.level.parse().ok()
    }
}
