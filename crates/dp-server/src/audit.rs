//! Audit journal for pipeline events
//!
//! Structured JSON-lines logging of request batches and their outcomes, for
//! compliance and forensic analysis of what was sent to the SAS and what
//! came back.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::error;

/// Audit event type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// Worker started
    ServerStart,
    /// Worker stopped
    ServerStop,
    /// A request batch was sent to the SAS
    BatchSent,
    /// A SAS response batch was processed into state updates
    ResponseProcessed,
    /// A batch failed to route
    RouterFailure,
    /// The Radio Controller relay failed (best-effort path)
    RelayFailure,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Timestamp (Unix epoch seconds)
    pub timestamp: u64,
    /// ISO 8601 formatted timestamp
    pub timestamp_iso: String,
    /// Event type
    pub event_type: AuditEventType,
    /// Request type key (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_type: Option<String>,
    /// Number of requests in the batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Server version
    pub server_version: String,
}

impl AuditEntry {
    /// Create a new audit entry
    pub fn new(event_type: AuditEventType) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        let timestamp = now.as_secs();
        let timestamp_iso = chrono::DateTime::from_timestamp(timestamp as i64, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        AuditEntry {
            timestamp,
            timestamp_iso,
            event_type,
            request_type: None,
            batch_size: None,
            details: None,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Set request type
    pub fn with_request_type(mut self, request_type: impl Into<String>) -> Self {
        self.request_type = Some(request_type.into());
        self
    }

    /// Set batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Audit logger
pub struct AuditLogger {
    file_path: Option<String>,
    file: Option<Arc<Mutex<std::fs::File>>>,
}

impl AuditLogger {
    /// Create a new audit logger; `None` disables journaling
    pub fn new(file_path: Option<String>) -> std::io::Result<Self> {
        let file = if let Some(ref path) = file_path {
            let f = OpenOptions::new().create(true).append(true).open(path)?;
            Some(Arc::new(Mutex::new(f)))
        } else {
            None
        };

        Ok(AuditLogger { file_path, file })
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditEntry) {
        if let Some(ref file) = self.file {
            match serde_json::to_string(&entry) {
                Ok(json) => {
                    let mut f = file.lock().await;
                    if let Err(e) = writeln!(f, "{}", json) {
                        error!("Failed to write audit log: {}", e);
                    }
                }
                Err(e) => {
                    error!("Failed to serialize audit entry: {}", e);
                }
            }
        }
    }

    /// Check if audit logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Get the audit log file path
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn test_audit_entry_creation() {
        let entry = AuditEntry::new(AuditEventType::BatchSent)
            .with_request_type("grantRequest")
            .with_batch_size(4);

        assert_eq!(entry.request_type, Some("grantRequest".to_string()));
        assert_eq!(entry.batch_size, Some(4));
    }

    #[test]
    fn test_audit_entry_serialization() {
        let entry = AuditEntry::new(AuditEventType::RouterFailure)
            .with_request_type("heartbeatRequest")
            .with_details("Transport error: connection refused");

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("router_failure"));
        assert!(json.contains("heartbeatRequest"));
        assert!(json.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_audit_logger() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let logger = AuditLogger::new(Some(path.clone())).unwrap();
        assert!(logger.is_enabled());

        logger
            .log(
                AuditEntry::new(AuditEventType::ResponseProcessed)
                    .with_request_type("registrationRequest")
                    .with_batch_size(2),
            )
            .await;

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("response_processed"));
        assert!(contents.contains("registrationRequest"));
    }

    #[test]
    fn test_disabled_logger() {
        let logger = AuditLogger::new(None).unwrap();
        assert!(!logger.is_enabled());
        assert!(logger.file_path().is_none());
    }
}
