//! Service configuration
//!
//! JSON configuration file loaded at startup; every field has a sensible
//! default except the endpoints and database URL.

use crate::router::{RequestMapping, TlsOptions};
use crate::storage::{GrantTransitionRule, GrantTransitionTable};
use sas_proto::revocation::CrlConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Domain Proxy worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Base URL of the SAS (method segments are appended)
    pub sas_url: String,

    /// Radio Controller ingest URL for relayed SAS responses
    pub rc_ingest_url: String,

    /// Client certificate path (PEM) for mutual TLS with the SAS
    #[serde(default)]
    pub cert_path: Option<String>,

    /// Client private key path (PEM)
    #[serde(default)]
    pub ssl_key_path: Option<String>,

    /// Verify the SAS server certificate (disable only for lab endpoints)
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// Additional trusted CA bundle path (PEM)
    #[serde(default)]
    pub ssl_ca_path: Option<String>,

    /// Request-type to SAS-method table; the standard SAS-CBSD table when absent
    #[serde(default)]
    pub request_mapping: Option<HashMap<String, String>>,

    /// Maximum requests claimed per type per cycle; 0 disables dequeue
    #[serde(default = "default_request_processing_limit")]
    pub request_processing_limit: i64,

    /// Seconds between pipeline cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout for outbound HTTP calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Monitoring listener address for /metrics and /healthz (disabled when absent)
    #[serde(default)]
    pub monitoring_listen: Option<String>,

    /// Audit journal file path (JSON lines, optional)
    #[serde(default)]
    pub audit_log_path: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Check the SAS certificate against CRLs before each batch
    #[serde(default)]
    pub check_revocation: bool,

    /// CRL fetching/caching settings
    #[serde(default)]
    pub crl: CrlConfig,

    /// Grant transition rules replacing the built-in lattice (optional)
    #[serde(default)]
    pub grant_transitions: Option<Vec<GrantTransitionRule>>,
}

fn default_ssl_verify() -> bool {
    true
}

fn default_request_processing_limit() -> i64 {
    100
}

fn default_poll_interval() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// An example configuration suitable as a starting point
    pub fn example() -> Self {
        Config {
            database_url: "postgresql://dp:dp@localhost/domain_proxy".to_string(),
            sas_url: "https://sas.example.com/v1.2".to_string(),
            rc_ingest_url: "http://localhost:8080/sas/ingest".to_string(),
            cert_path: Some("/etc/dp/certs/client.cert.pem".to_string()),
            ssl_key_path: Some("/etc/dp/certs/client.key.pem".to_string()),
            ssl_verify: true,
            ssl_ca_path: None,
            request_mapping: None,
            request_processing_limit: default_request_processing_limit(),
            poll_interval_secs: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            monitoring_listen: Some("0.0.0.0:9080".to_string()),
            audit_log_path: None,
            log_level: Some("info".to_string()),
            check_revocation: false,
            crl: CrlConfig::default(),
            grant_transitions: None,
        }
    }

    /// Validate endpoint URLs, certificate pairing, and table completeness
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.sas_url)
            .map_err(|e| ConfigError::Invalid(format!("Invalid sas_url: {}", e)))?;
        Url::parse(&self.rc_ingest_url)
            .map_err(|e| ConfigError::Invalid(format!("Invalid rc_ingest_url: {}", e)))?;

        if self.cert_path.is_some() != self.ssl_key_path.is_some() {
            return Err(ConfigError::Invalid(
                "cert_path and ssl_key_path must be set together".to_string(),
            ));
        }

        if let Some(table) = &self.request_mapping {
            RequestMapping::from_table(table.clone())
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        if let Some(rules) = &self.grant_transitions {
            GrantTransitionTable::from_rules(rules)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        Ok(())
    }

    /// The effective request mapping
    pub fn request_mapping(&self) -> Result<RequestMapping, ConfigError> {
        match &self.request_mapping {
            Some(table) => RequestMapping::from_table(table.clone())
                .map_err(|e| ConfigError::Invalid(e.to_string())),
            None => Ok(RequestMapping::standard()),
        }
    }

    /// The effective grant transition table
    pub fn grant_transitions(&self) -> Result<GrantTransitionTable, ConfigError> {
        match &self.grant_transitions {
            Some(rules) => GrantTransitionTable::from_rules(rules)
                .map_err(|e| ConfigError::Invalid(e.to_string())),
            None => Ok(GrantTransitionTable::standard()),
        }
    }

    /// Load certificate material into router TLS options
    pub fn tls_options(&self) -> Result<TlsOptions, ConfigError> {
        let identity_pem = match (&self.cert_path, &self.ssl_key_path) {
            (Some(cert), Some(key)) => {
                let mut pem = fs::read(cert)?;
                pem.extend_from_slice(&fs::read(key)?);
                Some(pem)
            }
            _ => None,
        };

        let ca_pem = match &self.ssl_ca_path {
            Some(path) => Some(fs::read(path)?),
            None => None,
        };

        Ok(TlsOptions {
            identity_pem,
            verify: self.ssl_verify,
            ca_pem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_is_valid() {
        assert!(Config::example().validate().is_ok());
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::example();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sas_url, config.sas_url);
        assert_eq!(back.request_processing_limit, config.request_processing_limit);
    }

    #[test]
    fn test_minimal_config_applies_defaults() {
        let json = r#"{
            "database_url": "postgresql://localhost/dp",
            "sas_url": "https://sas.example.com",
            "rc_ingest_url": "http://localhost:8080/ingest"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.ssl_verify);
        assert_eq!(config.request_processing_limit, 100);
        assert_eq!(config.poll_interval_secs, 10);
        assert!(!config.check_revocation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_sas_url_rejected() {
        let mut config = Config::example();
        config.sas_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unpaired_cert_rejected() {
        let mut config = Config::example();
        config.ssl_key_path = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_incomplete_mapping_rejected() {
        let mut config = Config::example();
        let mut table = HashMap::new();
        table.insert("grantRequest".to_string(), "grant".to_string());
        config.request_mapping = Some(table);
        assert!(config.validate().is_err());
    }
}
