/// Structured logging for the rain-alert service
///
/// Backend for the `log` facade with component targets, timestamps, and
/// severity levels. Supports both console output and file-based logging
/// for daemon operations. The engine modules only use the `log` macros;
/// this module decides where the lines end up.

use chrono::Utc;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;

use crate::model::{FetchError, StoreError};
use crate::monitor::{CheckKind, CycleFailure, CycleOutcome};

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - provider briefly unreachable, will clear on retry
    Expected,
    /// Unexpected failure - indicates provider degradation or a schema change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

pub struct Logger {
    /// Minimum log level to display
    min_level: LevelFilter,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    pub fn new(min_level: LevelFilter, log_file: Option<String>, console_timestamps: bool) -> Self {
        Self {
            min_level,
            log_file,
            console_timestamps,
        }
    }

    fn format_entry(record: &Record) -> String {
        format!(
            "{} {} {}: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            level_tag(record.level()),
            record.target().to_uppercase(),
            record.args()
        )
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.min_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = Self::format_entry(record);
        let target = record.target().to_uppercase();

        // Console output
        if self.console_timestamps {
            match record.level() {
                Level::Error => eprintln!("{}", entry),
                Level::Warn => eprintln!("   {}", entry),
                _ => println!("   {}", entry),
            }
        } else {
            match record.level() {
                Level::Error => eprintln!("   ✗ {}: {}", target, record.args()),
                Level::Warn => eprintln!("   ⚠ {}: {}", target, record.args()),
                Level::Info => println!("   {}", record.args()),
                Level::Debug => println!("   [DEBUG] {}", record.args()),
                Level::Trace => {} // Skip trace in non-timestamp mode
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn flush(&self) {}
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Install the global logger. Fails if a logger was already installed.
pub fn init_logger(
    min_level: LevelFilter,
    log_file: Option<&str>,
    console_timestamps: bool,
) -> Result<(), SetLoggerError> {
    let logger = Logger::new(min_level, log_file.map(String::from), console_timestamps);
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(min_level);
    Ok(())
}

/// Classify a forecast fetch failure
pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        // Timeouts and dropped connections clear up on their own
        FetchError::Transient(_) => FailureType::Expected,
        // 5xx is provider trouble; 4xx means our request is wrong
        FetchError::Http(code) if *code >= 500 => FailureType::Unknown,
        FetchError::Http(_) => FailureType::Unexpected,
        // Parse errors suggest API changes or bugs
        FetchError::Parse(_) => FailureType::Unexpected,
    }
}

/// Classify a persistence failure
pub fn classify_store_failure(err: &StoreError) -> FailureType {
    match err {
        StoreError::Backend(_) => FailureType::Unknown,
        StoreError::Corrupted { .. } => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed cycle at a level chosen by its classification
pub fn log_cycle_failure(kind: CheckKind, failure: &CycleFailure) {
    let failure_type = match &failure.error {
        crate::monitor::CycleError::Fetch(e) => classify_fetch_failure(e),
        crate::monitor::CycleError::Persistence(e) => classify_store_failure(e),
    };

    let message = format!(
        "{} check failed [{}]: {} ({})",
        kind,
        failure_type,
        failure.error,
        if failure.retry { "will retry" } else { "not retrying" }
    );

    match failure_type {
        FailureType::Expected => log::debug!(target: "monitor", "{}", message),
        FailureType::Unexpected => log::error!(target: "monitor", "{}", message),
        FailureType::Unknown => log::warn!(target: "monitor", "{}", message),
    }
}

// ---------------------------------------------------------------------------
// Cycle Summary Logging
// ---------------------------------------------------------------------------

/// Log a one-line summary of a completed cycle
pub fn log_cycle_summary(kind: CheckKind, outcome: &CycleOutcome) {
    log::info!(target: "monitor", "{} check complete: {}", kind, outcome);
}
