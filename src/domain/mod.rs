//! Domain layer for checkpoint-telemetry.
//!
//! Contains the canonical types shared across all modules:
//! - `ReportRecord`: The record posted to the checkpoint endpoint
//! - `TelemetryError`: Top-level error type

pub mod error;
pub mod report;

pub use error::TelemetryError;
pub use report::ReportRecord;
