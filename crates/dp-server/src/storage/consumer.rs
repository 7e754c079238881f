//! Pending-request dequeue with horizontal-scaling-safe locking
//!
//! Multiple worker processes share one database. A worker claims a batch of
//! pending requests with `FOR UPDATE SKIP LOCKED`, so rows claimed by an
//! open transaction are invisible to every other worker's dequeue rather
//! than blocking it. The claim lasts exactly as long as the caller's
//! transaction: commit makes the processed state durable, rollback (or a
//! dropped transaction) returns the rows to the pool untouched.

use super::models::Request;
use super::StorageResult;
use sas_proto::RequestTypeName;
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use tracing::debug;

/// Claim up to `limit` pending requests of one type for exclusive processing
///
/// Rows are selected in primary-key order for reproducible batching. A
/// `limit <= 0` fetches nothing: it is a guard against misconfiguration,
/// not an unlimited scan.
///
/// Returns a map from request type to the claimed requests (one key, kept
/// as a map for symmetry with the router's grouped-by-type input). Fewer
/// pending rows than `limit` is not an error.
pub async fn get_pending_requests(
    tx: &mut Transaction<'_, Postgres>,
    request_type: RequestTypeName,
    limit: i64,
) -> StorageResult<HashMap<RequestTypeName, Vec<Request>>> {
    let mut batches = HashMap::new();

    if limit <= 0 {
        return Ok(batches);
    }

    let rows = sqlx::query(
        r#"
        SELECT id, cbsd_id, type, state, payload, created_at, updated_at
        FROM requests
        WHERE state = 'pending' AND type = $1
        ORDER BY id
        LIMIT $2
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(request_type.as_str())
    .bind(limit)
    .fetch_all(&mut **tx)
    .await?;

    let mut requests = Vec::with_capacity(rows.len());
    for row in &rows {
        requests.push(Request::from_row(row)?);
    }

    debug!(
        request_type = %request_type,
        claimed = requests.len(),
        limit = limit,
        "Claimed pending requests"
    );

    if !requests.is_empty() {
        batches.insert(request_type, requests);
    }

    Ok(batches)
}
