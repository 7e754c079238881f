//! SAS response processing
//!
//! Pairs the SAS reply with the batch of requests that produced it and
//! applies the resulting state changes. Everything runs inside the caller's
//! transaction (the same one that holds the dequeue claim) and the
//! processor never commits: the pipeline driver does, once per batch, so a
//! rollback reverts the response row, the processed marking, and the
//! type-specific updates together.

use super::handlers::{HandlerRegistry, ResponseContext};
use super::models::Request;
use super::transitions::GrantTransitionTable;
use super::StorageResult;
use sas_proto::{response_code, response_entries, RequestTypeName};
use serde_json::Value;
use sqlx::{Postgres, Transaction};
use tracing::{debug, warn};

/// Processes SAS response batches into persisted state transitions
pub struct ResponseProcessor {
    handlers: HandlerRegistry,
    transitions: GrantTransitionTable,
}

impl ResponseProcessor {
    /// Create a processor with the standard handlers and transition table
    pub fn new(transitions: GrantTransitionTable) -> Self {
        Self {
            handlers: HandlerRegistry::standard(),
            transitions,
        }
    }

    /// Process one SAS reply against the batch of requests that was sent
    ///
    /// Pairs response entries with requests by position; when the SAS
    /// returns fewer entries than requests, the unmatched tail stays
    /// PENDING and is retried on a later cycle. An empty/falsy body mutates
    /// nothing. Returns the number of requests marked processed.
    pub async fn process_response(
        &self,
        request_type: RequestTypeName,
        requests: &[Request],
        response_body: &Value,
        tx: &mut Transaction<'_, Postgres>,
    ) -> StorageResult<usize> {
        if is_empty_body(response_body) {
            warn!(
                request_type = %request_type,
                requests = requests.len(),
                "Empty SAS response body; leaving requests pending"
            );
            return Ok(0);
        }

        let empty = Vec::new();
        let entries = match response_entries(response_body, request_type) {
            Some(entries) => entries,
            None => {
                warn!(
                    request_type = %request_type,
                    key = request_type.response_key(),
                    "SAS response missing result list"
                );
                &empty
            }
        };

        if entries.len() != requests.len() {
            warn!(
                request_type = %request_type,
                requests = requests.len(),
                responses = entries.len(),
                "SAS response count does not match request count"
            );
        }

        let mut processed = 0;
        for (request, entry) in requests.iter().zip(entries.iter()) {
            self.process_pair(request, entry, tx).await?;
            processed += 1;
        }

        debug!(
            request_type = %request_type,
            processed = processed,
            "Response batch processed"
        );
        Ok(processed)
    }

    /// Persist one response entry, mark its request processed, and apply the
    /// type-specific transition, in that order
    async fn process_pair(
        &self,
        request: &Request,
        entry: &Value,
        tx: &mut Transaction<'_, Postgres>,
    ) -> StorageResult<()> {
        let code = response_code(entry).unwrap_or_else(|| {
            warn!(
                request = request.id,
                "Response entry missing response.responseCode; recording as -1"
            );
            -1
        });

        sqlx::query(
            r#"
            INSERT INTO responses (request_id, response_code, payload)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(request.id)
        .bind(code)
        .bind(entry)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE requests SET state = 'processed', updated_at = NOW() WHERE id = $1
            "#,
        )
        .bind(request.id)
        .execute(&mut **tx)
        .await?;

        if let Some(handler) = self.handlers.get(request.request_type) {
            let ctx = ResponseContext {
                request,
                entry,
                response_code: code,
                transitions: &self.transitions,
            };
            handler.apply(ctx, &mut **tx).await?;
        }

        Ok(())
    }
}

/// A body the SAS returned that carries nothing to process
fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(list) => list.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_empty_body() {
        assert!(is_empty_body(&Value::Null));
        assert!(is_empty_body(&json!({})));
        assert!(is_empty_body(&json!([])));

        assert!(!is_empty_body(&json!({"registrationResponse": []})));
        assert!(!is_empty_body(&json!("text")));
    }
}
