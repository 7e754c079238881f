//! SAS Protocol Support
//!
//! This crate provides the message vocabulary for talking to a Spectrum
//! Access System (SAS) per WInnForum CBRS (SAS-CBSD protocol), plus
//! certificate revocation checking for SAS endpoints.
//!
//! # Features
//!
//! - Request-type vocabulary (registration, grant, heartbeat, ...) with the
//!   JSON envelope keys used to group batched requests and responses
//! - Response-code extraction helpers for the nested `response.responseCode`
//!   field carried by every SAS result object
//! - CRL-based certificate revocation checking (RFC 5280): peer certificate
//!   retrieval over TLS, CRL distribution point fetching, revocation lookup
//!
//! # Example
//!
//! ```rust
//! use sas_proto::{RequestTypeName, response_code, RESPONSE_CODE_SUCCESS};
//! use serde_json::json;
//!
//! let rt = RequestTypeName::Registration;
//! assert_eq!(rt.request_key(), "registrationRequest");
//! assert_eq!(rt.response_key(), "registrationResponse");
//!
//! let entry = json!({"cbsdId": "foo", "response": {"responseCode": 0}});
//! assert_eq!(response_code(&entry), Some(RESPONSE_CODE_SUCCESS));
//! ```

pub mod messages;
pub mod revocation;

pub use messages::{
    response_code, response_entries, RequestTypeName, RequestTypeParseError,
    RESPONSE_CODE_SUCCESS, RESPONSE_CODE_SUSPENDED_GRANT,
};
pub use revocation::{CrlValidator, RevocationError};
