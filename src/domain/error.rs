use crate::identity::IdentityError;
use crate::sender::TransportError;
use thiserror::Error;

/// Top-level error type for the reporting pipeline.
///
/// Nothing outside `Reporter` ever sees this type from a public entry point;
/// it exists so that each stage can use `?` and the boundary can log a single
/// message.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Identity store error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Home directory could not be resolved")]
    HomeDirectoryUnavailable,
}
