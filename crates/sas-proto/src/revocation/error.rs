//! Revocation-specific error types

use chrono::{DateTime, Utc};

/// Errors that can occur during certificate revocation checking
#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    /// Certificate has been revoked
    #[error("Certificate revoked: serial={serial} revoked_at={revoked_at}")]
    CertificateRevoked {
        /// Hex-encoded certificate serial number
        serial: String,
        /// Revocation date from the CRL entry
        revoked_at: DateTime<Utc>,
    },

    /// Failed to fetch CRL from distribution point
    #[error("CRL fetch failed: {0}")]
    FetchError(String),

    /// Failed to parse CRL data
    #[error("CRL parse error: {0}")]
    ParseError(String),

    /// CRL has expired (nextUpdate < current time)
    #[error("CRL expired: nextUpdate={0}")]
    CrlExpired(String),

    /// CRL is not yet valid (thisUpdate > current time)
    #[error("CRL not yet valid: thisUpdate={0}")]
    CrlNotYetValid(String),

    /// CRL exceeds maximum allowed size
    #[error("CRL size {0} bytes exceeds maximum {1} bytes")]
    CrlTooLarge(usize, usize),

    /// Certificate parsing error
    #[error("Certificate parsing error: {0}")]
    CertificateError(String),

    /// TLS handshake or protocol error while retrieving the peer certificate
    #[error("TLS error: {0}")]
    Tls(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid endpoint host or CRL distribution point URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
