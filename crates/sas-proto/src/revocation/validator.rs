//! End-to-end CRL revocation validation for an endpoint
//!
//! Composes peer-certificate retrieval, CRL distribution point fetching,
//! and revocation lookup into a single check invoked before routing a
//! request batch to a SAS endpoint.

use super::cache::CrlCache;
use super::config::CrlConfig;
use super::crl::CrlInfo;
use super::error::RevocationError;
use super::fetch::{extract_crl_distribution_points, extract_serial_number, CrlFetcher};
use super::peer::get_peer_certificate;
use pki_types::CertificateDer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// CRL-based revocation validator for SAS endpoints
#[derive(Debug)]
pub struct CrlValidator {
    config: CrlConfig,
    fetcher: CrlFetcher,
    cache: Arc<CrlCache>,
}

impl CrlValidator {
    /// Create a new validator
    pub fn new(config: CrlConfig) -> Result<Self, RevocationError> {
        let fetcher = CrlFetcher::new(config.http_timeout_secs, config.max_crl_size_bytes)?;
        let cache = CrlCache::new(config.max_cache_entries);

        Ok(Self {
            config,
            fetcher,
            cache,
        })
    }

    /// Retrieve the endpoint's current DER-encoded leaf certificate
    pub async fn get_certificate(
        &self,
        host: &str,
        port: u16,
    ) -> Result<CertificateDer<'static>, RevocationError> {
        get_peer_certificate(
            host,
            port,
            Duration::from_secs(self.config.connect_timeout_secs),
        )
        .await
    }

    /// Fetch and parse every CRL referenced by the certificate
    ///
    /// A certificate without a CRL Distribution Points extension yields an
    /// empty list. A fetch or parse failure for any referenced CRL fails the
    /// whole call; retry policy belongs to the caller.
    pub async fn get_certificate_crls(
        &self,
        cert_der: &[u8],
    ) -> Result<Vec<CrlInfo>, RevocationError> {
        let urls = extract_crl_distribution_points(cert_der)?;
        let mut crls = Vec::with_capacity(urls.len());

        for url in &urls {
            if let Some(cached) = self.cache.get(url) {
                if cached.validate_current(chrono::Utc::now()).is_ok() {
                    crls.push(cached);
                    continue;
                }
                // Stale cache entry; fall through to a fresh fetch.
            }

            let crl_der = self.fetcher.fetch_crl(url).await?;
            let crl = CrlInfo::parse_der(&crl_der)?;
            crl.validate_current(chrono::Utc::now())?;

            debug!(url = %url, revoked = crl.revoked_count(), "Fetched CRL");

            self.cache.insert(
                url.clone(),
                crl.clone(),
                Duration::from_secs(self.config.cache_ttl_secs),
            );
            crls.push(crl);
        }

        Ok(crls)
    }

    /// Look the certificate's serial number up in the supplied CRLs
    ///
    /// A match raises [`RevocationError::CertificateRevoked`] with the serial
    /// and revocation date so callers must abort the outbound call; no match
    /// returns `Ok(false)`.
    pub fn is_certificate_revoked(
        &self,
        cert_der: &[u8],
        crls: &[CrlInfo],
    ) -> Result<bool, RevocationError> {
        let serial = extract_serial_number(cert_der)?;

        for crl in crls {
            if let Some(revoked_at) = crl.revocation_date(&serial) {
                warn!(
                    serial = %hex_serial(&serial),
                    issuer = %crl.issuer,
                    "Certificate found on CRL"
                );
                return Err(RevocationError::CertificateRevoked {
                    serial: hex_serial(&serial),
                    revoked_at,
                });
            }
        }

        Ok(false)
    }

    /// Full endpoint check: retrieve certificate, fetch CRLs, look up serial
    pub async fn verify_endpoint(&self, host: &str, port: u16) -> Result<(), RevocationError> {
        let cert = self.get_certificate(host, port).await?;
        let crls = self.get_certificate_crls(cert.as_ref()).await?;
        self.is_certificate_revoked(cert.as_ref(), &crls)?;
        Ok(())
    }
}

fn hex_serial(serial: &[u8]) -> String {
    serial.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::collections::HashMap;

    fn crl_revoking(serial: &[u8]) -> CrlInfo {
        let mut revoked_serials = HashMap::new();
        revoked_serials.insert(serial.to_vec(), Utc::now() - ChronoDuration::days(1));
        CrlInfo {
            issuer: "CN=Test CA".to_string(),
            this_update: Utc::now() - ChronoDuration::hours(1),
            next_update: Some(Utc::now() + ChronoDuration::days(7)),
            revoked_serials,
        }
    }

    #[test]
    fn test_hex_serial_format() {
        assert_eq!(hex_serial(&[0x01, 0xab, 0xff]), "01abff");
        assert_eq!(hex_serial(&[]), "");
    }

    #[tokio::test]
    async fn test_is_certificate_revoked_rejects_unparseable_cert() {
        let validator = CrlValidator::new(CrlConfig::default()).unwrap();
        let result = validator.is_certificate_revoked(&[0x00], &[]);
        assert!(matches!(result, Err(RevocationError::CertificateError(_))));
    }

    #[test]
    fn test_revocation_lookup_against_synthetic_crl() {
        // Exercise the lookup path below the certificate parse: the serial
        // extraction is covered separately, so check CrlInfo matching here.
        let serial = vec![0x0a, 0x0b];
        let crl = crl_revoking(&serial);

        assert!(crl.is_revoked(&serial));
        assert!(crl.revocation_date(&serial).is_some());
        assert!(!crl.is_revoked(&[0x0a]));
    }
}
