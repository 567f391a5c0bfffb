/// Forecast analysis for the rain-alert engine.
///
/// Everything here is a pure function of its inputs: no I/O, no logging,
/// and no ambient clock. Callers pass `now` explicitly.
///
/// Submodules:
/// - `risk`: turns an hourly forecast into a `RainRiskAnalysis`.

pub mod risk;

pub use risk::analyze;
