//! Error types for resolution and batch scanning.

use thiserror::Error;

/// The domain could not be turned into a set of addresses.
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// The name exists but has no A records.
    #[error("no addresses found for {domain}")]
    NoAddresses { domain: String },

    /// NXDOMAIN, timeout or any other resolver failure.
    #[error("failed to resolve {domain}: {reason}")]
    Lookup { domain: String, reason: String },
}

/// The engine raised for an individual request instead of embedding the failure.
#[derive(Error, Debug)]
pub enum ScanRequestError {
    /// The worker task for this request died.
    #[error("scan task for {address} failed: {reason}")]
    Task { address: String, reason: String },

    #[error("scan engine error: {0}")]
    Engine(String),
}

/// Failure of a whole orchestration run.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Request(#[from] ScanRequestError),
}
