#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond latencies fit in u64
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. IdentityError in identity module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod domain;
pub mod environment;
pub mod identity;
pub mod reporter;
pub mod sender;

// Re-export main types for easy access
pub use app::Config;
pub use domain::{ReportRecord, TelemetryError};
pub use reporter::{ReportOutcome, Reporter};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Product name reported by the cdktf CLI.
pub const DEFAULT_PRODUCT: &str = "cdktf";

/// Environment variable that turns every report into a no-op.
pub const DISABLE_ENV_VAR: &str = "CHECKPOINT_DISABLE";
