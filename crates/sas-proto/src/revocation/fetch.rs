//! CRL HTTP fetching
//!
//! Downloads DER-encoded CRLs from the distribution point URLs referenced by
//! a certificate, with a bounded timeout and response size.

use super::error::RevocationError;
use std::time::Duration;
use x509_parser::extensions::{DistributionPointName, GeneralName, ParsedExtension};
use x509_parser::prelude::*;

/// CRL fetcher with a dedicated HTTP client
#[derive(Debug, Clone)]
pub struct CrlFetcher {
    client: reqwest::Client,
    max_crl_size_bytes: usize,
}

impl CrlFetcher {
    /// Create a new CRL fetcher
    ///
    /// # Arguments
    /// * `timeout_secs` - per-request HTTP timeout
    /// * `max_crl_size_bytes` - largest CRL body accepted
    pub fn new(timeout_secs: u64, max_crl_size_bytes: usize) -> Result<Self, RevocationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                RevocationError::ConfigError(format!("Failed to build CRL HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_crl_size_bytes,
        })
    }

    /// Fetch a DER-encoded CRL from an HTTP URL
    pub async fn fetch_crl(&self, url: &str) -> Result<Vec<u8>, RevocationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RevocationError::FetchError(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RevocationError::FetchError(format!(
                "GET {}: HTTP {}",
                url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RevocationError::FetchError(format!("GET {}: {}", url, e)))?;

        if body.len() > self.max_crl_size_bytes {
            return Err(RevocationError::CrlTooLarge(
                body.len(),
                self.max_crl_size_bytes,
            ));
        }

        Ok(body.to_vec())
    }
}

/// Extract CRL distribution point URLs from a DER-encoded certificate
///
/// Reads the CRL Distribution Points extension (OID 2.5.29.31) and collects
/// every URI-type general name. A certificate without the extension yields
/// an empty list; many certificates legitimately carry no CRL DPs.
pub fn extract_crl_distribution_points(cert_der: &[u8]) -> Result<Vec<String>, RevocationError> {
    let (_, cert) = parse_x509_certificate(cert_der).map_err(|e| {
        RevocationError::CertificateError(format!("Failed to parse certificate: {}", e))
    })?;

    let mut urls = Vec::new();

    for ext in cert.extensions() {
        if let ParsedExtension::CRLDistributionPoints(points) = ext.parsed_extension() {
            for point in points.iter() {
                if let Some(DistributionPointName::FullName(names)) = &point.distribution_point {
                    for name in names {
                        if let GeneralName::URI(uri) = name {
                            urls.push(uri.to_string());
                        }
                    }
                }
            }
        }
    }

    Ok(urls)
}

/// Extract the serial number (raw big-endian bytes) from a certificate
pub fn extract_serial_number(cert_der: &[u8]) -> Result<Vec<u8>, RevocationError> {
    let (_, cert) = parse_x509_certificate(cert_der).map_err(|e| {
        RevocationError::CertificateError(format!("Failed to parse certificate: {}", e))
    })?;

    Ok(cert.raw_serial().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_serial_invalid_cert() {
        let result = extract_serial_number(&[0x00, 0x01, 0x02]);
        assert!(matches!(result, Err(RevocationError::CertificateError(_))));
    }

    #[test]
    fn test_extract_distribution_points_invalid_cert() {
        let result = extract_crl_distribution_points(&[0xDE, 0xAD]);
        assert!(matches!(result, Err(RevocationError::CertificateError(_))));
    }

    #[tokio::test]
    async fn test_fetch_crl_bad_url() {
        let fetcher = CrlFetcher::new(1, 1024).unwrap();
        let result = fetcher.fetch_crl("http://127.0.0.1:1/missing.crl").await;
        assert!(matches!(result, Err(RevocationError::FetchError(_))));
    }
}
