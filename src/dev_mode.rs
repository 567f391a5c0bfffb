/// Development mode utilities for running without live collaborators
///
/// When no weather provider or device is available, use this module to
/// replay scripted forecasts and capture notifications and schedules in
/// the log instead of delivering them.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::Duration;
use log::info;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{Coordinates, FetchError, ForecastSample, LocationError};
use crate::ports::{ForecastSource, LocationSource, Notifier, Scheduler};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("could not read replay file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse replay file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("replay file contains no frames")]
    Empty,
}

// ---------------------------------------------------------------------------
// Forecast replay
// ---------------------------------------------------------------------------

/// One scripted forecast, as returned by a single fetch.
///
/// ```json
/// { "label": "showers arriving", "temperature_c": 18, "probabilities": [20, 40, 65, 80] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_temperature")]
    pub temperature_c: i32,
    /// Hourly probabilities starting at the current hour.
    pub probabilities: Vec<i32>,
}

fn default_temperature() -> i32 {
    20
}

impl ReplayFrame {
    pub fn samples(&self) -> Vec<ForecastSample> {
        self.probabilities
            .iter()
            .enumerate()
            .map(|(hour, &p)| ForecastSample::new(hour as u32, self.temperature_c, p))
            .collect()
    }
}

/// Forecast source that hands out scripted frames in order, wrapping
/// around at the end.
pub struct ReplayForecastSource {
    frames: Vec<ReplayFrame>,
    next: Mutex<usize>,
}

impl ReplayForecastSource {
    pub fn new(frames: Vec<ReplayFrame>) -> Self {
        Self {
            frames,
            next: Mutex::new(0),
        }
    }

    /// Loads frames from a JSON array file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        let frames: Vec<ReplayFrame> = serde_json::from_str(text)?;
        if frames.is_empty() {
            return Err(ReplayError::Empty);
        }
        Ok(Self::new(frames))
    }

    /// A dry morning that turns showery: quiet, rising, alert-worthy,
    /// then clearing again.
    pub fn builtin() -> Self {
        let frame = |label: &str, probabilities: &[i32]| ReplayFrame {
            label: label.to_string(),
            temperature_c: 21,
            probabilities: probabilities.to_vec(),
        };
        Self::new(vec![
            frame("dry", &[0, 5, 5, 10, 10, 10]),
            frame("clouding over", &[10, 20, 25, 35, 40, 45]),
            frame("showers arriving", &[40, 65, 80, 85, 70, 50]),
            frame("rain now", &[85, 90, 90, 75, 60, 40]),
            frame("clearing", &[20, 15, 10, 5, 5, 0]),
        ])
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl ForecastSource for ReplayForecastSource {
    fn fetch_hourly_forecast(&self, at: Coordinates) -> Result<Vec<ForecastSample>, FetchError> {
        if self.frames.is_empty() {
            return Err(FetchError::Transient("no replay frames loaded".into()));
        }
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let frame = &self.frames[*next % self.frames.len()];
        *next += 1;
        info!(
            target: "forecast",
            "replaying '{}' for ({:.4}, {:.4})",
            frame.label, at.latitude, at.longitude
        );
        Ok(frame.samples())
    }
}

// ---------------------------------------------------------------------------
// Logging notifier
// ---------------------------------------------------------------------------

/// Notifier that writes notifications to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_rain_alert(&self, minutes_until_rain: i64) {
        info!(target: "system", "🌧 RAIN ALERT: rain expected in about {} minutes", minutes_until_rain);
    }

    fn notify_general(&self, title: &str, message: &str) {
        info!(target: "system", "🔔 {}: {}", title, message);
    }

    fn cancel_rain_alert(&self) {
        info!(target: "system", "rain alert dismissed");
    }
}

// ---------------------------------------------------------------------------
// Recording scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleEvent {
    Periodic { name: String, interval: Duration },
    Once { name: String, delay: Duration },
    Cancelled { name: String },
}

impl ScheduleEvent {
    fn name(&self) -> &str {
        match self {
            ScheduleEvent::Periodic { name, .. }
            | ScheduleEvent::Once { name, .. }
            | ScheduleEvent::Cancelled { name } => name,
        }
    }
}

/// Scheduler that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    events: Mutex<Vec<ScheduleEvent>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScheduleEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether the last event for `name` left it scheduled.
    pub fn is_scheduled(&self, name: &str) -> bool {
        self.events()
            .iter()
            .rev()
            .find(|e| e.name() == name)
            .is_some_and(|e| !matches!(e, ScheduleEvent::Cancelled { .. }))
    }

    fn record(&self, event: ScheduleEvent) {
        info!(target: "system", "scheduler: {:?}", event);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_periodic(&self, name: &str, interval: Duration) {
        self.record(ScheduleEvent::Periodic {
            name: name.to_string(),
            interval,
        });
    }

    fn schedule_once(&self, name: &str, delay: Duration) {
        self.record(ScheduleEvent::Once {
            name: name.to_string(),
            delay,
        });
    }

    fn cancel(&self, name: &str) {
        self.record(ScheduleEvent::Cancelled {
            name: name.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Fixed location
// ---------------------------------------------------------------------------

/// Location source with a canned answer.
#[derive(Debug, Clone)]
pub struct FixedLocation(Result<Coordinates, LocationError>);

impl FixedLocation {
    pub fn at(coordinates: Coordinates) -> Self {
        Self(Ok(coordinates))
    }

    pub fn denied() -> Self {
        Self(Err(LocationError::PermissionDenied))
    }
}

impl LocationSource for FixedLocation {
    fn current_coordinates(&self) -> Result<Coordinates, LocationError> {
        self.0.clone()
    }
}
