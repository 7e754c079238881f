//! Peer certificate retrieval over TLS
//!
//! Connects to an endpoint, completes a TLS handshake (1.2 or newer), and
//! returns the peer's DER-encoded leaf certificate. The handshake uses a
//! capture-only certificate verifier: the certificate obtained here feeds
//! the revocation lookup only, while transport trust for the actual data
//! call is enforced separately by the HTTPS client making that call.

use super::error::RevocationError;
use pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, DigitallySignedStruct, Error as RustlsError, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

/// Server certificate verifier that accepts the presented chain
///
/// Handshake signatures are still verified against the provider's
/// algorithms; only chain/identity validation is skipped, since the sole
/// purpose of this handshake is obtaining the leaf certificate.
#[derive(Debug)]
struct CertCapture {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for CertCapture {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Retrieve the DER-encoded leaf certificate presented by `host:port`
///
/// Opens a TCP connection, completes a TLS handshake (TLS 1.2 minimum),
/// captures the peer's leaf certificate, and shuts the stream down cleanly
/// before returning.
pub async fn get_peer_certificate(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<CertificateDer<'static>, RevocationError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let config = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(rustls::DEFAULT_VERSIONS)
        .map_err(|e| RevocationError::Tls(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(CertCapture { provider }))
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| RevocationError::InvalidUrl(format!("Invalid TLS server name: {}", host)))?;

    let tcp = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| {
            RevocationError::Tls(format!(
                "Connect to {}:{} timed out after {:?}",
                host, port, connect_timeout
            ))
        })??;

    let connector = TlsConnector::from(Arc::new(config));
    let mut stream = tokio::time::timeout(connect_timeout, connector.connect(server_name, tcp))
        .await
        .map_err(|_| {
            RevocationError::Tls(format!("TLS handshake with {}:{} timed out", host, port))
        })?
        .map_err(|e| RevocationError::Tls(format!("TLS handshake with {}: {}", host, e)))?;

    let leaf = stream
        .get_ref()
        .1
        .peer_certificates()
        .and_then(|certs| certs.first())
        .map(|cert| cert.clone().into_owned())
        .ok_or_else(|| {
            RevocationError::Tls(format!("{}:{} presented no certificate", host, port))
        })?;

    // close_notify plus socket shutdown; the certificate is already in hand
    let _ = stream.shutdown().await;

    debug!(host = %host, port = port, "Retrieved peer certificate");

    Ok(leaf)
}
