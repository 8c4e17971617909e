//! Error types for the diagnostic access point

use std::time::Duration;

use thiserror::Error;

/// Result type for radio backend operations
pub type RadioResult<T> = Result<T, RadioError>;

/// Result type for system probe readings
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors related to radio backend operations
#[derive(Error, Debug, Clone)]
pub enum RadioError {
    #[error("WiFi scan failed: {0}")]
    ScanFailed(String),

    #[error("Control interface error: {0}")]
    ControlInterface(String),

    #[error("Network interface error: {0}")]
    InterfaceError(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected reply: {0}")]
    Parse(String),
}

/// Errors related to platform metric readings
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metric not available: {0}")]
    Missing(&'static str),

    #[error("Unexpected format: {0}")]
    Parse(String),
}

/// Errors related to the HTTP transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Timed out waiting for the client")]
    RequestTimeout,

    #[error("Transfer stalled after {sent} bytes (no progress for {stalled_for:?})")]
    TransferStalled { sent: u64, stalled_for: Duration },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while validating settings
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SSID must be 1 to 32 bytes, got {0}")]
    InvalidSsid(usize),

    #[error("Passphrase must be 8 to 63 characters, got {0}")]
    PassphraseLength(usize),

    #[error("Chunk size must be 1 to 4096 bytes, got {0}")]
    InvalidChunkSize(usize),
}
