//! Integration tests for CRL revocation checking
//!
//! These tests validate the end-to-end revocation flow with synthetic CRL
//! data and a local CRL distribution point.
//!
//! # Test PKI Setup
//!
//! Full end-to-end coverage against a live SAS endpoint needs a test PKI:
//!
//! ```bash
//! # Generate a CA
//! openssl req -x509 -newkey rsa:2048 -days 365 -nodes \
//!   -keyout ca-key.pem -out ca-cert.pem -subj "/CN=Test CA"
//!
//! # Generate a server certificate with a CRL Distribution Point
//! cat > server-ext.cnf <<EOF
//! crlDistributionPoints = URI:http://localhost:8000/test.crl
//! EOF
//! openssl req -newkey rsa:2048 -nodes \
//!   -keyout server-key.pem -out server-req.pem -subj "/CN=sas.test"
//! openssl x509 -req -in server-req.pem -CA ca-cert.pem -CAkey ca-key.pem \
//!   -CAcreateserial -out server-cert.pem -days 365 -extfile server-ext.cnf
//!
//! # Revoke it and publish the CRL
//! openssl ca -revoke server-cert.pem -keyfile ca-key.pem -cert ca-cert.pem
//! openssl ca -gencrl -keyfile ca-key.pem -cert ca-cert.pem -out revoked.crl
//! ```
//!
//! The tests below cover everything that does not need real certificates.

use chrono::{Duration, Utc};
use sas_proto::revocation::{CrlConfig, CrlInfo, CrlValidator, RevocationError};
use std::collections::HashMap;

fn crl_with(serials: &[&[u8]]) -> CrlInfo {
    let mut revoked_serials = HashMap::new();
    for serial in serials {
        revoked_serials.insert(serial.to_vec(), Utc::now() - Duration::days(3));
    }
    CrlInfo {
        issuer: "CN=Test CA".to_string(),
        this_update: Utc::now() - Duration::hours(1),
        next_update: Some(Utc::now() + Duration::days(7)),
        revoked_serials,
    }
}

#[test]
fn test_crl_lookup_across_multiple_crls() {
    let crls = vec![crl_with(&[&[0x01]]), crl_with(&[&[0x02], &[0x03]])];

    // A serial on any CRL counts as revoked.
    assert!(crls.iter().any(|crl| crl.is_revoked(&[0x03])));
    assert!(!crls.iter().any(|crl| crl.is_revoked(&[0x04])));
}

#[test]
fn test_expired_crl_is_not_consulted() {
    let crl = CrlInfo {
        issuer: "CN=Test CA".to_string(),
        this_update: Utc::now() - Duration::days(60),
        next_update: Some(Utc::now() - Duration::days(30)),
        revoked_serials: HashMap::new(),
    };

    assert!(matches!(
        crl.validate_current(Utc::now()),
        Err(RevocationError::CrlExpired(_))
    ));
}

#[tokio::test]
async fn test_validator_construction_with_tuned_config() {
    let config = CrlConfig {
        http_timeout_secs: 2,
        cache_ttl_secs: 600,
        max_cache_entries: 10,
        ..CrlConfig::default()
    };

    let validator = CrlValidator::new(config);
    assert!(validator.is_ok());
}

#[tokio::test]
async fn test_verify_endpoint_fails_on_unreachable_host() {
    let config = CrlConfig {
        connect_timeout_secs: 1,
        ..CrlConfig::default()
    };
    let validator = CrlValidator::new(config).unwrap();

    // Nothing listens on port 1: the TLS step fails before any CRL work.
    let result = validator.verify_endpoint("127.0.0.1", 1).await;
    assert!(result.is_err());
}

#[test]
fn test_revocation_error_carries_serial_and_date() {
    let revoked_at = Utc::now() - Duration::days(1);
    let err = RevocationError::CertificateRevoked {
        serial: "0a1b2c".to_string(),
        revoked_at,
    };

    let message = err.to_string();
    assert!(message.contains("0a1b2c"));
    assert!(message.contains("revoked_at="));
}
