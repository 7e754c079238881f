//! Request routing to the SAS and response relay to the Radio Controller
//!
//! The router takes a batch of requests already grouped under one
//! request-type key, validates the target endpoint's certificate against
//! CRLs when a validator is configured, POSTs the batch to the mapped SAS
//! method over mutual TLS, and hands the raw response back for processing.
//! It never interprets the response body itself.

pub mod error;
pub mod mapping;

pub use error::{RouterError, RouterResult};
pub use mapping::RequestMapping;

use crate::metrics::PipelineMetrics;
use sas_proto::revocation::{CrlValidator, RevocationError};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Pre-send endpoint validation seam
///
/// The production implementation checks CRLs; deployments that trust the
/// endpoint outright configure no validator at all.
pub trait EndpointValidator: Send + Sync {
    /// Validate the endpoint before a batch is sent to it
    fn validate<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = Result<(), RevocationError>> + Send + 'a>>;
}

/// CRL-backed [`EndpointValidator`]
pub struct CrlEndpointValidator {
    validator: CrlValidator,
}

impl CrlEndpointValidator {
    pub fn new(validator: CrlValidator) -> Self {
        Self { validator }
    }
}

impl EndpointValidator for CrlEndpointValidator {
    fn validate<'a>(
        &'a self,
        host: &'a str,
        port: u16,
    ) -> Pin<Box<dyn Future<Output = Result<(), RevocationError>> + Send + 'a>> {
        Box::pin(self.validator.verify_endpoint(host, port))
    }
}

/// TLS settings for the outbound SAS client
#[derive(Debug, Default)]
pub struct TlsOptions {
    /// Client certificate + key, concatenated PEM, for mutual TLS
    pub identity_pem: Option<Vec<u8>>,
    /// Verify the server certificate (disable only for lab endpoints)
    pub verify: bool,
    /// Additional trusted CA bundle, PEM
    pub ca_pem: Option<Vec<u8>>,
}

/// Raw SAS reply: status code plus parsed JSON body
#[derive(Debug, Clone)]
pub struct SasResponse {
    pub status: u16,
    pub body: Value,
}

/// Routes grouped request batches to the SAS
pub struct Router {
    sas_url: Url,
    rc_ingest_url: Url,
    mapping: RequestMapping,
    validator: Option<Arc<dyn EndpointValidator>>,
    client: reqwest::Client,
    metrics: Arc<PipelineMetrics>,
}

impl Router {
    /// Create a router
    ///
    /// # Arguments
    /// * `sas_url` - base URL of the SAS (method segments are appended)
    /// * `rc_ingest_url` - Radio Controller ingest endpoint for relayed responses
    /// * `mapping` - request-type to method table (validated at construction)
    /// * `tls` - client identity and verification settings
    /// * `timeout` - bound for every outbound HTTP call
    pub fn new(
        sas_url: &str,
        rc_ingest_url: &str,
        mapping: RequestMapping,
        tls: TlsOptions,
        timeout: Duration,
        metrics: Arc<PipelineMetrics>,
    ) -> RouterResult<Self> {
        let sas_url = Url::parse(sas_url)
            .map_err(|e| RouterError::Configuration(format!("Invalid SAS URL: {}", e)))?;
        let rc_ingest_url = Url::parse(rc_ingest_url).map_err(|e| {
            RouterError::Configuration(format!("Invalid Radio Controller URL: {}", e))
        })?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout);

        if let Some(pem) = &tls.identity_pem {
            let identity = reqwest::Identity::from_pem(pem).map_err(|e| {
                RouterError::Configuration(format!("Invalid client identity: {}", e))
            })?;
            builder = builder.identity(identity);
        }

        if let Some(pem) = &tls.ca_pem {
            let ca = reqwest::Certificate::from_pem(pem)
                .map_err(|e| RouterError::Configuration(format!("Invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(ca);
        }

        if !tls.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| RouterError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            sas_url,
            rc_ingest_url,
            mapping,
            validator: None,
            client,
            metrics,
        })
    }

    /// Attach a pre-send endpoint validator
    pub fn with_validator(mut self, validator: Arc<dyn EndpointValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Send a grouped request batch to the SAS
    ///
    /// `request_dict` must be a JSON object with exactly one top-level key
    /// (the request-type name) whose value is the ordered list of payloads.
    /// The raw response is returned uninterpreted.
    pub async fn post_to_sas(&self, request_dict: &Value) -> RouterResult<SasResponse> {
        let object = request_dict
            .as_object()
            .filter(|o| !o.is_empty())
            .ok_or(RouterError::EmptyRequests)?;

        if object.len() != 1 {
            return Err(RouterError::Configuration(format!(
                "Expected exactly one request type per batch, got {}",
                object.len()
            )));
        }

        // Single-entry map; the key is the request-type name.
        let request_type_key = object
            .keys()
            .next()
            .ok_or(RouterError::EmptyRequests)?;

        let method = self
            .mapping
            .method_for(request_type_key)
            .ok_or_else(|| RouterError::UnmappedRequestType(request_type_key.clone()))?;

        if let Some(validator) = &self.validator {
            let host = self
                .sas_url
                .host_str()
                .ok_or_else(|| RouterError::Configuration("SAS URL has no host".to_string()))?;
            let port = self.sas_url.port_or_known_default().unwrap_or(443);
            validator.validate(host, port).await?;
        }

        let url = self.method_url(method)?;
        debug!(url = %url, request_type = %request_type_key, "Posting batch to SAS");

        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .json(request_dict)
            .send()
            .await
            .map_err(|e| RouterError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| RouterError::InvalidResponse(e.to_string()))?;
        self.metrics.observe_sas_request(started.elapsed());

        info!(
            request_type = %request_type_key,
            status = status,
            "SAS responded"
        );

        Ok(SasResponse { status, body })
    }

    /// Relay a SAS response body to the Radio Controller ingest endpoint
    ///
    /// Best effort: callers log a failure and move on, because response
    /// processing has already happened by the time this runs.
    pub async fn redirect_sas_response_to_radio_controller(
        &self,
        body: &Value,
    ) -> RouterResult<()> {
        let response = self
            .client
            .post(self.rc_ingest_url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| RouterError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RouterError::Transport(format!(
                "Radio Controller ingest returned HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn method_url(&self, method: &str) -> RouterResult<Url> {
        let base = self.sas_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, method))
            .map_err(|e| RouterError::Configuration(format!("Invalid method URL: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_router() -> Router {
        Router::new(
            "https://sas.example.com/v1.2",
            "https://rc.example.com/ingest",
            RequestMapping::standard(),
            TlsOptions {
                verify: true,
                ..TlsOptions::default()
            },
            Duration::from_secs(5),
            Arc::new(PipelineMetrics::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_dict_is_rejected_before_any_io() {
        let router = test_router();
        let result = router.post_to_sas(&json!({})).await;
        assert!(matches!(result, Err(RouterError::EmptyRequests)));

        let result = router.post_to_sas(&Value::Null).await;
        assert!(matches!(result, Err(RouterError::EmptyRequests)));
    }

    #[tokio::test]
    async fn test_unmapped_type_is_rejected_before_any_io() {
        let router = test_router();
        let result = router.post_to_sas(&json!({"unknownType": [{}]})).await;
        match result {
            Err(RouterError::UnmappedRequestType(name)) => assert_eq!(name, "unknownType"),
            other => panic!("expected UnmappedRequestType, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_multiple_type_keys_are_rejected() {
        let router = test_router();
        let result = router
            .post_to_sas(&json!({"grantRequest": [], "heartbeatRequest": []}))
            .await;
        assert!(matches!(result, Err(RouterError::Configuration(_))));
    }

    #[test]
    fn test_method_url_joins_cleanly() {
        let router = test_router();
        let url = router.method_url("grant").unwrap();
        assert_eq!(url.as_str(), "https://sas.example.com/v1.2/grant");
    }

    #[test]
    fn test_invalid_urls_rejected_at_construction() {
        let result = Router::new(
            "not a url",
            "https://rc.example.com",
            RequestMapping::standard(),
            TlsOptions::default(),
            Duration::from_secs(5),
            Arc::new(PipelineMetrics::new()),
        );
        assert!(matches!(result, Err(RouterError::Configuration(_))));
    }
}
