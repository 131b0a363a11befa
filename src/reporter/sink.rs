use std::fmt::Debug;
use tracing::error;

/// Where absorbed telemetry failures end up.
///
/// Every failure is reported once through `error` and once through
/// `processor_error`; the latter feeds the host's separate error log.
pub trait DiagnosticSink: Send + Sync + Debug {
    fn error(&self, message: &str);
    fn processor_error(&self, message: &str);
}

/// Sink writing to the `tracing` subscriber installed by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn error(&self, message: &str) {
        error!(target: "checkpoint", "{}", message);
    }

    fn processor_error(&self, message: &str) {
        error!(target: "checkpoint::processor", "{}", message);
    }
}
