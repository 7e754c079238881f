//! SAS-CBSD request/response vocabulary
//!
//! The SAS-CBSD protocol batches individual request payloads under a single
//! top-level JSON key per request type (e.g. `{"grantRequest": [..]}`), and
//! answers with the matching response key (`{"grantResponse": [..]}`). Every
//! per-request result object nests its outcome under
//! `response.responseCode`, where `0` means success.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// SAS response code indicating the request was accepted
pub const RESPONSE_CODE_SUCCESS: i64 = 0;

/// SAS response code for a suspended grant (heartbeat may continue, no transmit)
pub const RESPONSE_CODE_SUSPENDED_GRANT: i64 = 501;

/// Logical request types exchanged with a SAS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestTypeName {
    /// CBSD registration
    Registration,
    /// Spectrum availability inquiry
    SpectrumInquiry,
    /// Spectrum grant request
    Grant,
    /// Grant heartbeat
    Heartbeat,
    /// Grant relinquishment
    Relinquishment,
    /// CBSD deregistration
    Deregistration,
}

impl RequestTypeName {
    /// All request types, in the order the pipeline processes them
    pub const ALL: [RequestTypeName; 6] = [
        RequestTypeName::Registration,
        RequestTypeName::SpectrumInquiry,
        RequestTypeName::Grant,
        RequestTypeName::Heartbeat,
        RequestTypeName::Relinquishment,
        RequestTypeName::Deregistration,
    ];

    /// The top-level JSON key grouping a batch of this request type
    pub fn request_key(self) -> &'static str {
        match self {
            RequestTypeName::Registration => "registrationRequest",
            RequestTypeName::SpectrumInquiry => "spectrumInquiryRequest",
            RequestTypeName::Grant => "grantRequest",
            RequestTypeName::Heartbeat => "heartbeatRequest",
            RequestTypeName::Relinquishment => "relinquishmentRequest",
            RequestTypeName::Deregistration => "deregistrationRequest",
        }
    }

    /// The top-level JSON key of the matching SAS response batch
    pub fn response_key(self) -> &'static str {
        match self {
            RequestTypeName::Registration => "registrationResponse",
            RequestTypeName::SpectrumInquiry => "spectrumInquiryResponse",
            RequestTypeName::Grant => "grantResponse",
            RequestTypeName::Heartbeat => "heartbeatResponse",
            RequestTypeName::Relinquishment => "relinquishmentResponse",
            RequestTypeName::Deregistration => "deregistrationResponse",
        }
    }

    /// Stable name used for persistence and logging
    pub fn as_str(self) -> &'static str {
        self.request_key()
    }
}

impl fmt::Display for RequestTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known request type
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown request type: {0}")]
pub struct RequestTypeParseError(pub String);

impl FromStr for RequestTypeName {
    type Err = RequestTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registrationRequest" => Ok(RequestTypeName::Registration),
            "spectrumInquiryRequest" => Ok(RequestTypeName::SpectrumInquiry),
            "grantRequest" => Ok(RequestTypeName::Grant),
            "heartbeatRequest" => Ok(RequestTypeName::Heartbeat),
            "relinquishmentRequest" => Ok(RequestTypeName::Relinquishment),
            "deregistrationRequest" => Ok(RequestTypeName::Deregistration),
            other => Err(RequestTypeParseError(other.to_string())),
        }
    }
}

/// Extract the numeric `response.responseCode` from a per-request SAS result
pub fn response_code(entry: &Value) -> Option<i64> {
    entry.get("response")?.get("responseCode")?.as_i64()
}

/// Extract the per-request result list for `request_type` from a SAS reply body
///
/// Returns `None` when the key is missing or not an array.
pub fn response_entries(body: &Value, request_type: RequestTypeName) -> Option<&Vec<Value>> {
    body.get(request_type.response_key())?.as_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_key_round_trip() {
        for rt in RequestTypeName::ALL {
            let parsed: RequestTypeName = rt.request_key().parse().unwrap();
            assert_eq!(parsed, rt);
        }
    }

    #[test]
    fn test_unknown_request_type() {
        let result = "unknownType".parse::<RequestTypeName>();
        assert!(result.is_err());
    }

    #[test]
    fn test_response_key_pairs_with_request_key() {
        assert_eq!(
            RequestTypeName::Heartbeat.response_key(),
            "heartbeatResponse"
        );
        assert_eq!(
            RequestTypeName::SpectrumInquiry.response_key(),
            "spectrumInquiryResponse"
        );
    }

    #[test]
    fn test_response_code_extraction() {
        let entry = json!({"response": {"responseCode": 400, "responseMessage": "INTERFERENCE"}});
        assert_eq!(response_code(&entry), Some(400));

        // Missing nesting yields None, not a panic
        assert_eq!(response_code(&json!({})), None);
        assert_eq!(response_code(&json!({"response": {}})), None);
    }

    #[test]
    fn test_response_entries() {
        let body = json!({
            "grantResponse": [
                {"response": {"responseCode": 0}},
                {"response": {"responseCode": 401}}
            ]
        });

        let entries = response_entries(&body, RequestTypeName::Grant).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(response_code(&entries[0]), Some(RESPONSE_CODE_SUCCESS));

        assert!(response_entries(&body, RequestTypeName::Heartbeat).is_none());
        assert!(response_entries(&json!({}), RequestTypeName::Grant).is_none());
    }
}
