//! Facts about the environment a report is sent from.

pub mod ci;
pub mod host;

pub use ci::{CiDetector, EnvCiDetector, FixedCiDetector, detect_ci_with};
pub use host::HostInfo;
