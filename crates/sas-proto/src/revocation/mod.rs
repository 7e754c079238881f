//! Certificate revocation checking for SAS endpoints (CRL, RFC 5280)
//!
//! Before the Domain Proxy routes a request batch to a SAS, it can verify
//! that the endpoint's server certificate has not been revoked. The flow is:
//!
//! 1. **Retrieve peer certificate**: TLS handshake (1.2+) against the SAS
//!    host, capturing the DER-encoded leaf certificate
//! 2. **Extract CRL URLs**: parse the CRL Distribution Points extension
//! 3. **Fetch CRLs**: HTTP GET from each distribution point (with caching)
//! 4. **Parse & validate**: DER parse, `thisUpdate`/`nextUpdate` freshness
//! 5. **Check revocation**: look the leaf's serial up in the revoked sets
//!
//! A revocation hit is surfaced as [`RevocationError::CertificateRevoked`]
//! carrying the serial number and revocation date, an error rather than a boolean,
//! so callers cannot accidentally proceed with the outbound call.
//!
//! # Example
//!
//! ```no_run
//! use sas_proto::revocation::{CrlValidator, CrlConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = CrlValidator::new(CrlConfig::default())?;
//! // Errors with CertificateRevoked if the endpoint's cert is on a CRL.
//! validator.verify_endpoint("sas.example.com", 443).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod crl;
pub mod error;
pub mod fetch;
pub mod peer;
pub mod validator;

pub use cache::CrlCache;
pub use config::CrlConfig;
pub use crl::CrlInfo;
pub use error::RevocationError;
pub use fetch::CrlFetcher;
pub use validator::CrlValidator;
