//! Laundry rain-alert engine.
//!
//! Decides whether to warn the user to bring their laundry in before rain,
//! from a short-term hourly precipitation forecast, the laundry status and
//! a persisted alert ledger. Weather, location, notifications, scheduling
//! and storage are injected through the traits in [`ports`].

pub mod alert;
pub mod analysis;
pub mod config;
pub mod dev_mode;
pub mod ingest;
pub mod location;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod ports;
pub mod store;
