pub mod client;

pub use client::{
    ACCEPTED_STATUS_CODES, CheckpointClient, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
    DEFAULT_USER_AGENT, Delivery, Transport, TransportError,
};

#[cfg(test)]
pub use client::MockTransport;
