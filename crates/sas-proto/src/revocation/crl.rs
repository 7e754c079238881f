//! CRL parsing and validation (RFC 5280)
//!
//! Parses DER-encoded Certificate Revocation Lists and answers revocation
//! lookups by certificate serial number. The revoked set is held as a map
//! from raw serial bytes to the revocation date, so a hit can report when
//! the certificate was revoked.

use super::error::RevocationError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use x509_parser::prelude::*;

/// Parsed CRL information
#[derive(Debug, Clone)]
pub struct CrlInfo {
    /// CRL issuer distinguished name
    pub issuer: String,

    /// CRL thisUpdate time (when this CRL was issued)
    pub this_update: DateTime<Utc>,

    /// CRL nextUpdate time (optional per RFC 5280)
    pub next_update: Option<DateTime<Utc>>,

    /// Revoked certificate serial numbers mapped to their revocation dates
    pub revoked_serials: HashMap<Vec<u8>, DateTime<Utc>>,
}

impl CrlInfo {
    /// Parse a CRL from DER-encoded bytes
    ///
    /// Extracts issuer, validity window, and the revoked-certificate set.
    /// The CRL signature is not verified here; the distribution points come
    /// out of a certificate that already passed the TLS handshake.
    pub fn parse_der(crl_der: &[u8]) -> Result<Self, RevocationError> {
        let (_, crl) = parse_x509_crl(crl_der)
            .map_err(|e| RevocationError::ParseError(format!("Failed to parse CRL DER: {}", e)))?;

        let issuer = crl.issuer().to_string();

        let this_update = asn1_time_to_chrono(&crl.last_update()).ok_or_else(|| {
            RevocationError::ParseError("Invalid thisUpdate time in CRL".to_string())
        })?;

        let next_update = crl.next_update().and_then(|t| asn1_time_to_chrono(&t));

        let mut revoked_serials = HashMap::new();
        for revoked_cert in crl.iter_revoked_certificates() {
            let revoked_at =
                asn1_time_to_chrono(&revoked_cert.revocation_date).unwrap_or_else(Utc::now);
            revoked_serials.insert(revoked_cert.raw_serial().to_vec(), revoked_at);
        }

        Ok(CrlInfo {
            issuer,
            this_update,
            next_update,
            revoked_serials,
        })
    }

    /// Look up a certificate serial number in the revoked set
    ///
    /// Returns the revocation date if the serial is revoked, `None` otherwise.
    pub fn revocation_date(&self, serial: &[u8]) -> Option<DateTime<Utc>> {
        self.revoked_serials.get(serial).copied()
    }

    /// Check if a certificate serial number is revoked
    pub fn is_revoked(&self, serial: &[u8]) -> bool {
        self.revoked_serials.contains_key(serial)
    }

    /// Validate the CRL is current (not expired and not future-dated)
    ///
    /// Per RFC 5280 Section 5.1.2.4, nextUpdate is optional. If not present,
    /// the CRL is considered valid indefinitely.
    pub fn validate_current(&self, now: DateTime<Utc>) -> Result<(), RevocationError> {
        if self.this_update > now {
            return Err(RevocationError::CrlNotYetValid(
                self.this_update.to_rfc3339(),
            ));
        }

        if let Some(next_update) = self.next_update {
            if next_update <= now {
                return Err(RevocationError::CrlExpired(next_update.to_rfc3339()));
            }
        }

        Ok(())
    }

    /// Number of revoked certificates in this CRL
    pub fn revoked_count(&self) -> usize {
        self.revoked_serials.len()
    }
}

/// Convert ASN.1 time (UTCTime or GeneralizedTime) to chrono DateTime
fn asn1_time_to_chrono(asn1_time: &ASN1Time) -> Option<DateTime<Utc>> {
    use chrono::TimeZone;

    let timestamp = asn1_time.timestamp();
    Utc.timestamp_opt(timestamp, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn crl_with_serials(serials: &[(&[u8], DateTime<Utc>)]) -> CrlInfo {
        CrlInfo {
            issuer: "CN=Test CA".to_string(),
            this_update: Utc::now() - Duration::hours(1),
            next_update: Some(Utc::now() + Duration::days(7)),
            revoked_serials: serials
                .iter()
                .map(|(s, t)| (s.to_vec(), *t))
                .collect(),
        }
    }

    #[test]
    fn test_is_revoked() {
        let revoked_at = Utc::now() - Duration::days(2);
        let crl = crl_with_serials(&[(&[0x01, 0x02, 0x03], revoked_at)]);

        assert!(crl.is_revoked(&[0x01, 0x02, 0x03]));
        assert_eq!(crl.revocation_date(&[0x01, 0x02, 0x03]), Some(revoked_at));

        assert!(!crl.is_revoked(&[0xFF]));
        assert_eq!(crl.revocation_date(&[0xFF]), None);
        assert!(!crl.is_revoked(&[]));
    }

    #[test]
    fn test_validate_current() {
        let crl = crl_with_serials(&[]);
        assert!(crl.validate_current(Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_expired() {
        let now = Utc::now();
        let crl = CrlInfo {
            issuer: "CN=Test CA".to_string(),
            this_update: now - Duration::days(30),
            next_update: Some(now - Duration::days(1)),
            revoked_serials: HashMap::new(),
        };

        let result = crl.validate_current(now);
        assert!(matches!(result, Err(RevocationError::CrlExpired(_))));
    }

    #[test]
    fn test_validate_future_dated() {
        let now = Utc::now();
        let crl = CrlInfo {
            issuer: "CN=Test CA".to_string(),
            this_update: now + Duration::hours(1),
            next_update: Some(now + Duration::days(7)),
            revoked_serials: HashMap::new(),
        };

        let result = crl.validate_current(now);
        assert!(matches!(result, Err(RevocationError::CrlNotYetValid(_))));
    }

    #[test]
    fn test_validate_no_next_update() {
        let now = Utc::now();
        let crl = CrlInfo {
            issuer: "CN=Test CA".to_string(),
            this_update: now - Duration::hours(1),
            next_update: None,
            revoked_serials: HashMap::new(),
        };

        assert!(crl.validate_current(now).is_ok());
    }

    #[test]
    fn test_parse_der_rejects_garbage() {
        let result = CrlInfo::parse_der(&[0x00, 0x01, 0x02]);
        assert!(matches!(result, Err(RevocationError::ParseError(_))));
    }
}
