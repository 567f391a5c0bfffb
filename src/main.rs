//! Development daemon: runs a simulated monitoring session against
//! replayed forecasts.
//!
//! Usage: `laundry_alert [config.toml]`
//!
//! The config path may also come from `LAUNDRY_ALERT_CONFIG` (read from
//! `.env` if present). `LAUNDRY_ALERT_REPLAY` names a JSON file of forecast
//! frames; without it the built-in frames are used.

use std::env;
use std::process;

use chrono::Utc;
use dotenv::dotenv;
use log::{LevelFilter, error, info, warn};

use laundry_alert::config::MonitorConfig;
use laundry_alert::dev_mode::{FixedLocation, LogNotifier, RecordingScheduler, ReplayForecastSource};
use laundry_alert::logging::init_logger;
use laundry_alert::monitor::{CheckKind, Collaborators, CycleOutcome, MonitoringLoop};
use laundry_alert::store::{InMemoryStore, LaundryStore};

fn main() {
    dotenv().ok();

    let config_path = env::args().nth(1).or_else(|| env::var("LAUNDRY_ALERT_CONFIG").ok());
    let config = match config_path {
        Some(path) => match MonitorConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("✗ {}: {}", path, e);
                process::exit(1);
            }
        },
        None => MonitorConfig::default(),
    };

    let level = config.log_level().unwrap_or(LevelFilter::Info);
    if let Err(e) = init_logger(level, config.logging.file.as_deref(), config.logging.console_timestamps) {
        eprintln!("✗ could not initialise logging: {}", e);
    }

    let forecast = match env::var("LAUNDRY_ALERT_REPLAY") {
        Ok(path) => match ReplayForecastSource::from_file(&path) {
            Ok(source) => source,
            Err(e) => {
                error!(target: "system", "{}: {}", path, e);
                process::exit(1);
            }
        },
        Err(_) => ReplayForecastSource::builtin(),
    };
    let cycles = forecast.frame_count();

    let location = FixedLocation::at(config.default_coordinates());
    let monitor = MonitoringLoop::new(
        config,
        Collaborators {
            store: LaundryStore::new(Box::new(InMemoryStore::new())),
            forecast: Box::new(forecast),
            location: Box::new(location),
            notifier: Box::new(LogNotifier),
            scheduler: Box::new(RecordingScheduler::new()),
        },
    );

    let start = Utc::now();
    let interval = monitor.config().periodic_interval();
    let snooze_delay = monitor.config().snooze_delay();

    info!(target: "system", "👕 simulating {} periodic checks", cycles);
    if let Err(e) = monitor.hang_laundry(start) {
        error!(target: "system", "could not hang laundry: {}", e);
        process::exit(1);
    }

    let mut now = start;
    for _ in 0..cycles {
        match monitor.run_cycle(CheckKind::Periodic, now) {
            Ok(CycleOutcome::Alerted { .. }) => match monitor.snooze(now) {
                Ok(true) => {
                    if let Err(failure) = monitor.run_cycle(CheckKind::Snooze, now + snooze_delay) {
                        warn!(target: "system", "snooze re-check dropped: {}", failure);
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(target: "system", "snooze failed: {}", e),
            },
            Ok(_) => {}
            Err(failure) if failure.retry => {
                warn!(target: "system", "periodic check failed, next attempt in {} min", interval.num_minutes());
            }
            Err(failure) => warn!(target: "system", "periodic check dropped: {}", failure),
        }
        now += interval;
    }

    match monitor.hanging_duration(now) {
        Ok(Some(out_for)) => info!(target: "system", "laundry was out for {} min", out_for.num_minutes()),
        Ok(None) => {}
        Err(e) => warn!(target: "system", "could not read laundry state: {}", e),
    }
    if let Err(e) = monitor.bring_in(now) {
        error!(target: "system", "could not bring laundry in: {}", e);
        process::exit(1);
    }
}
