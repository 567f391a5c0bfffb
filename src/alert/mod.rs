//! Alert decisions for hanging laundry.
//!
//! - `thresholds`: the configurable precipitation threshold.
//! - `policy`: turns a risk analysis into emit / suppress / recovered,
//!   including cooldown-based dedup against the alert ledger.

pub mod policy;
pub mod thresholds;

pub use policy::{AlertDecision, AlertOutcome, AlertPolicy, SuppressReason};
pub use thresholds::PrecipitationThreshold;
