//! Configuration for CRL-based revocation checking

use serde::{Deserialize, Serialize};

/// CRL fetching and caching configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrlConfig {
    /// HTTP request timeout in seconds for CRL distribution point fetches
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// TLS connect timeout in seconds for peer-certificate retrieval
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// CRL cache TTL in seconds
    ///
    /// Cached CRLs are reused until this TTL expires. Should be less than
    /// the typical CRL nextUpdate interval.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Maximum number of CRLs to cache (oldest entries evicted when full)
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,

    /// Maximum CRL size in bytes
    ///
    /// Protects against memory exhaustion from malicious/large CRLs.
    #[serde(default = "default_max_crl_size")]
    pub max_crl_size_bytes: usize,
}

impl Default for CrlConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            max_cache_entries: default_max_cache_entries(),
            max_crl_size_bytes: default_max_crl_size(),
        }
    }
}

fn default_http_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_max_cache_entries() -> usize {
    100
}

fn default_max_crl_size() -> usize {
    10 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crl_config_default() {
        let config = CrlConfig::default();
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.max_cache_entries, 100);
        assert_eq!(config.max_crl_size_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_crl_config_serde_round_trip() {
        let config = CrlConfig {
            http_timeout_secs: 2,
            ..CrlConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: CrlConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_crl_config_serde_defaults() {
        let config: CrlConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CrlConfig::default());
    }
}
