//! Request-type to SAS-method mapping
//!
//! A fixed table from the JSON key grouping a request batch to the URL path
//! segment of the SAS endpoint that accepts it. The table is immutable once
//! constructed and must cover every request type the consumer can dequeue;
//! an incomplete table is a startup configuration error, never a runtime
//! retry condition.

use super::error::{RouterError, RouterResult};
use sas_proto::RequestTypeName;
use std::collections::HashMap;

/// Immutable request-type to SAS-method table
#[derive(Debug, Clone)]
pub struct RequestMapping {
    map: HashMap<String, String>,
}

impl RequestMapping {
    /// The standard SAS-CBSD method table
    pub fn standard() -> Self {
        let map = [
            ("registrationRequest", "registration"),
            ("spectrumInquiryRequest", "spectrumInquiry"),
            ("grantRequest", "grant"),
            ("heartbeatRequest", "heartbeat"),
            ("relinquishmentRequest", "relinquishment"),
            ("deregistrationRequest", "deregistration"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { map }
    }

    /// Build a mapping from a configured table, validating completeness
    ///
    /// Every [`RequestTypeName`] must be covered.
    pub fn from_table(table: HashMap<String, String>) -> RouterResult<Self> {
        for rt in RequestTypeName::ALL {
            if !table.contains_key(rt.request_key()) {
                return Err(RouterError::Configuration(format!(
                    "Request mapping is missing an entry for {}",
                    rt.request_key()
                )));
            }
        }
        Ok(Self { map: table })
    }

    /// SAS method path segment for a request-type key
    pub fn method_for(&self, request_type_key: &str) -> Option<&str> {
        self.map.get(request_type_key).map(String::as_str)
    }
}

impl Default for RequestMapping {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_mapping_is_exhaustive() {
        let mapping = RequestMapping::standard();
        for rt in RequestTypeName::ALL {
            assert!(
                mapping.method_for(rt.request_key()).is_some(),
                "no method for {}",
                rt.request_key()
            );
        }
    }

    #[test]
    fn test_standard_mapping_paths() {
        let mapping = RequestMapping::standard();
        assert_eq!(mapping.method_for("registrationRequest"), Some("registration"));
        assert_eq!(mapping.method_for("heartbeatRequest"), Some("heartbeat"));
        assert_eq!(mapping.method_for("unknownRequest"), None);
    }

    #[test]
    fn test_from_table_rejects_incomplete_table() {
        let mut table = HashMap::new();
        table.insert("registrationRequest".to_string(), "registration".to_string());

        let result = RequestMapping::from_table(table);
        assert!(matches!(result, Err(RouterError::Configuration(_))));
    }

    #[test]
    fn test_from_table_accepts_complete_table() {
        let table = [
            ("registrationRequest", "reg"),
            ("spectrumInquiryRequest", "inquiry"),
            ("grantRequest", "grant"),
            ("heartbeatRequest", "hb"),
            ("relinquishmentRequest", "rel"),
            ("deregistrationRequest", "dereg"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mapping = RequestMapping::from_table(table).unwrap();
        assert_eq!(mapping.method_for("heartbeatRequest"), Some("hb"));
    }
}
