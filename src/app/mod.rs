pub mod config;
pub mod logging_system;

pub use config::{Config, ConfigError, LogLevel};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging_safe};

use crate::reporter::{ReportOutcome, Reporter};
use anyhow::Context;
use tracing::{info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Sends the report described by `config`.
///
/// Errors are only possible while assembling the reporter; the report itself
/// never fails.
pub async fn run(config: &Config) -> anyhow::Result<ReportOutcome> {
    let payload = config.payload_object().context("invalid --payload")?;
    let reporter = Reporter::from_config(config).context("failed to set up telemetry reporter")?;
    Ok(reporter.send_telemetry(&config.command, payload).await)
}

/// Binary entry point. Returns the process exit code.
pub async fn main() -> i32 {
    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("Error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    if let Err(e) = setup_logging_safe(config.log_level) {
        eprintln!("Warning: {e}");
    }

    info!(
        "checkpoint-telemetry v{} reporting command '{}' for {}",
        crate::VERSION,
        config.command,
        config.product
    );

    // Telemetry never changes the host's exit status
    match run(&config).await {
        Ok(outcome) => info!(?outcome, "telemetry report finished"),
        Err(e) => warn!("telemetry skipped: {e:#}"),
    }

    EXIT_SUCCESS
}
