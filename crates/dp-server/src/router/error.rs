//! Router error types

use sas_proto::RevocationError;
use thiserror::Error;

/// Request routing errors
#[derive(Error, Debug)]
pub enum RouterError {
    /// The grouped request map was empty: an upstream logic bug, not a
    /// runtime retry case
    #[error("Empty requests dictionary")]
    EmptyRequests,

    /// The grouped request map carried a type with no SAS method mapping
    #[error("Unmapped request type: {0}")]
    UnmappedRequestType(String),

    /// Connection, timeout, or TLS failure talking to the SAS or the Radio
    /// Controller; callers do not distinguish transport subtypes
    #[error("Transport error: {0}")]
    Transport(String),

    /// The SAS endpoint's certificate failed the revocation check
    #[error("Revocation check failed: {0}")]
    Revocation(#[from] RevocationError),

    /// The SAS answered with a body that is not JSON
    #[error("Invalid SAS response: {0}")]
    InvalidResponse(String),

    /// Configuration error (bad URL, unreadable certificate, incomplete
    /// request mapping)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for router operations
pub type RouterResult<T> = Result<T, RouterError>;
