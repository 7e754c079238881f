//! Per-request-type response handling
//!
//! The only behavioral variation across request types lives here: after the
//! processor has persisted the SAS response and marked the request
//! processed, the handler matching the request type applies the
//! type-specific state updates (CBSD registration state, grant lifecycle,
//! channel inventory). Handlers run inside the processor's transaction and
//! consult the [`GrantTransitionTable`] instead of hard-coding transitions.

use super::models::Request;
use super::transitions::{GrantTransitionTable, ResponseOutcome};
use super::StorageResult;
use sas_proto::{RequestTypeName, RESPONSE_CODE_SUCCESS};
use serde_json::Value;
use sqlx::PgConnection;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Everything a handler needs about one (request, response-entry) pair
pub struct ResponseContext<'a> {
    /// The originating request (already marked processed)
    pub request: &'a Request,
    /// The per-request SAS result object paired with it
    pub entry: &'a Value,
    /// Extracted `response.responseCode`
    pub response_code: i64,
    /// Configured grant transition lattice
    pub transitions: &'a GrantTransitionTable,
}

impl ResponseContext<'_> {
    fn outcome(&self) -> ResponseOutcome {
        ResponseOutcome::from_code(self.response_code)
    }

    /// Grant id from the response entry, falling back to the request payload
    fn grant_id(&self) -> Option<String> {
        self.entry
            .get("grantId")
            .and_then(Value::as_str)
            .or_else(|| self.request.payload.get("grantId").and_then(Value::as_str))
            .map(str::to_string)
    }
}

/// Type-specific state transition applied after a response is persisted
pub trait ResponseHandler: Send + Sync {
    /// Apply this request type's state updates for one response pair
    fn apply<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
        conn: &'a mut PgConnection,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + 'a>>;
}

/// Handler registry keyed by the same request-type name used for routing
pub struct HandlerRegistry {
    handlers: HashMap<RequestTypeName, Box<dyn ResponseHandler>>,
}

impl HandlerRegistry {
    /// Registry covering every request type the consumer can dequeue
    pub fn standard() -> Self {
        let mut handlers: HashMap<RequestTypeName, Box<dyn ResponseHandler>> = HashMap::new();
        handlers.insert(RequestTypeName::Registration, Box::new(RegistrationHandler));
        handlers.insert(
            RequestTypeName::SpectrumInquiry,
            Box::new(SpectrumInquiryHandler),
        );
        handlers.insert(RequestTypeName::Grant, Box::new(GrantHandler));
        handlers.insert(RequestTypeName::Heartbeat, Box::new(HeartbeatHandler));
        handlers.insert(
            RequestTypeName::Relinquishment,
            Box::new(RelinquishmentHandler),
        );
        handlers.insert(
            RequestTypeName::Deregistration,
            Box::new(DeregistrationHandler),
        );
        Self { handlers }
    }

    /// Handler for a request type
    pub fn get(&self, request_type: RequestTypeName) -> Option<&dyn ResponseHandler> {
        self.handlers.get(&request_type).map(|h| h.as_ref())
    }
}

/// Registration: assign the external cbsd_id (at most once) and flip state
pub struct RegistrationHandler;

impl ResponseHandler for RegistrationHandler {
    fn apply<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
        conn: &'a mut PgConnection,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.response_code == RESPONSE_CODE_SUCCESS {
                let sas_cbsd_id = ctx.entry.get("cbsdId").and_then(Value::as_str);

                // COALESCE keeps an already-assigned external id: the SAS
                // assigns it once and it must never be overwritten.
                sqlx::query(
                    r#"
                    UPDATE cbsds
                    SET cbsd_id = COALESCE(cbsd_id, $1),
                        state = 'registered',
                        last_seen = NOW(),
                        updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(sas_cbsd_id)
                .bind(ctx.request.cbsd_id)
                .execute(&mut *conn)
                .await?;

                debug!(cbsd = ctx.request.cbsd_id, "CBSD registered");
            } else {
                sqlx::query(
                    r#"
                    UPDATE cbsds SET state = 'unregistered', updated_at = NOW() WHERE id = $1
                    "#,
                )
                .bind(ctx.request.cbsd_id)
                .execute(&mut *conn)
                .await?;

                warn!(
                    cbsd = ctx.request.cbsd_id,
                    code = ctx.response_code,
                    "Registration rejected"
                );
            }
            Ok(())
        })
    }
}

/// Spectrum inquiry: rebuild the CBSD's channel inventory from the response
pub struct SpectrumInquiryHandler;

impl ResponseHandler for SpectrumInquiryHandler {
    fn apply<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
        conn: &'a mut PgConnection,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.response_code != RESPONSE_CODE_SUCCESS {
                return Ok(());
            }

            let channels = ctx
                .entry
                .get("availableChannel")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            sqlx::query("DELETE FROM channels WHERE cbsd_id = $1")
                .bind(ctx.request.cbsd_id)
                .execute(&mut *conn)
                .await?;

            for channel in &channels {
                let Some((low, high)) = frequency_range(channel.get("frequencyRange")) else {
                    warn!(
                        cbsd = ctx.request.cbsd_id,
                        "Skipping availableChannel entry without frequencyRange"
                    );
                    continue;
                };
                let max_eirp = channel.get("maxEirp").and_then(Value::as_f64);

                sqlx::query(
                    r#"
                    INSERT INTO channels (cbsd_id, low_frequency_hz, high_frequency_hz, max_eirp)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(ctx.request.cbsd_id)
                .bind(low)
                .bind(high)
                .bind(max_eirp)
                .execute(&mut *conn)
                .await?;
            }

            debug!(
                cbsd = ctx.request.cbsd_id,
                channels = channels.len(),
                "Channel inventory updated"
            );
            Ok(())
        })
    }
}

/// Grant: create/advance the grant row per the transition table
pub struct GrantHandler;

impl ResponseHandler for GrantHandler {
    fn apply<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
        conn: &'a mut PgConnection,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let Some(grant_id) = ctx.grant_id() else {
                // A rejected grant request may carry no grantId at all;
                // there is no row to move.
                return Ok(());
            };

            let Some(target) = ctx.transitions.target(ctx.request.request_type, ctx.outcome())
            else {
                return Ok(());
            };

            if ctx.response_code == RESPONSE_CODE_SUCCESS {
                let op_param = ctx.request.payload.get("operationParam");
                let (low, high) = op_param
                    .and_then(|p| frequency_range(p.get("operationFrequencyRange")))
                    .map_or((None, None), |(l, h)| (Some(l), Some(h)));
                let max_eirp = op_param
                    .and_then(|p| p.get("maxEirp"))
                    .and_then(Value::as_f64);
                let heartbeat_interval = ctx
                    .entry
                    .get("heartbeatInterval")
                    .and_then(Value::as_i64);

                sqlx::query(
                    r#"
                    INSERT INTO grants (
                        cbsd_id, grant_id, state, heartbeat_interval_secs,
                        low_frequency_hz, high_frequency_hz, max_eirp
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (cbsd_id, grant_id) DO UPDATE SET
                        state = EXCLUDED.state,
                        heartbeat_interval_secs = EXCLUDED.heartbeat_interval_secs,
                        low_frequency_hz = EXCLUDED.low_frequency_hz,
                        high_frequency_hz = EXCLUDED.high_frequency_hz,
                        max_eirp = EXCLUDED.max_eirp,
                        updated_at = NOW()
                    "#,
                )
                .bind(ctx.request.cbsd_id)
                .bind(&grant_id)
                .bind(target.as_str())
                .bind(heartbeat_interval)
                .bind(low)
                .bind(high)
                .bind(max_eirp)
                .execute(&mut *conn)
                .await?;

                // Remember the EIRP actually granted on the matching channel.
                if let (Some(low), Some(high), Some(eirp)) = (low, high, max_eirp) {
                    sqlx::query(
                        r#"
                        UPDATE channels SET last_used_max_eirp = $1
                        WHERE cbsd_id = $2 AND low_frequency_hz = $3 AND high_frequency_hz = $4
                        "#,
                    )
                    .bind(eirp)
                    .bind(ctx.request.cbsd_id)
                    .bind(low)
                    .bind(high)
                    .execute(&mut *conn)
                    .await?;
                }

                debug!(
                    cbsd = ctx.request.cbsd_id,
                    grant = %grant_id,
                    state = target.as_str(),
                    "Grant recorded"
                );
            } else {
                sqlx::query(
                    r#"
                    UPDATE grants SET state = $1, updated_at = NOW()
                    WHERE cbsd_id = $2 AND grant_id = $3
                    "#,
                )
                .bind(target.as_str())
                .bind(ctx.request.cbsd_id)
                .bind(&grant_id)
                .execute(&mut *conn)
                .await?;
            }

            Ok(())
        })
    }
}

/// Heartbeat: stamp the heartbeat time and advance the grant per the table
pub struct HeartbeatHandler;

impl ResponseHandler for HeartbeatHandler {
    fn apply<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
        conn: &'a mut PgConnection,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let Some(grant_id) = ctx.grant_id() else {
                warn!(
                    cbsd = ctx.request.cbsd_id,
                    "Heartbeat response without grantId"
                );
                return Ok(());
            };

            let target = ctx
                .transitions
                .target(ctx.request.request_type, ctx.outcome());
            let heartbeat_interval = ctx
                .entry
                .get("heartbeatInterval")
                .and_then(Value::as_i64);

            sqlx::query(
                r#"
                UPDATE grants
                SET last_heartbeat_request_time = $1,
                    heartbeat_interval_secs = COALESCE($2, heartbeat_interval_secs),
                    state = COALESCE($3, state),
                    updated_at = NOW()
                WHERE cbsd_id = $4 AND grant_id = $5
                "#,
            )
            .bind(ctx.request.created_at)
            .bind(heartbeat_interval)
            .bind(target.map(|s| s.as_str()))
            .bind(ctx.request.cbsd_id)
            .bind(&grant_id)
            .execute(&mut *conn)
            .await?;

            Ok(())
        })
    }
}

/// Relinquishment: return the grant to the table's target state
pub struct RelinquishmentHandler;

impl ResponseHandler for RelinquishmentHandler {
    fn apply<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
        conn: &'a mut PgConnection,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let Some(grant_id) = ctx.grant_id() else {
                return Ok(());
            };

            let Some(target) = ctx.transitions.target(ctx.request.request_type, ctx.outcome())
            else {
                return Ok(());
            };

            sqlx::query(
                r#"
                UPDATE grants SET state = $1, updated_at = NOW()
                WHERE cbsd_id = $2 AND grant_id = $3
                "#,
            )
            .bind(target.as_str())
            .bind(ctx.request.cbsd_id)
            .bind(&grant_id)
            .execute(&mut *conn)
            .await?;

            debug!(
                cbsd = ctx.request.cbsd_id,
                grant = %grant_id,
                "Grant relinquished"
            );
            Ok(())
        })
    }
}

/// Deregistration: soft-deregister the CBSD (row retained)
pub struct DeregistrationHandler;

impl ResponseHandler for DeregistrationHandler {
    fn apply<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
        conn: &'a mut PgConnection,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.response_code != RESPONSE_CODE_SUCCESS {
                return Ok(());
            }

            sqlx::query(
                r#"
                UPDATE cbsds SET state = 'deregistered', updated_at = NOW() WHERE id = $1
                "#,
            )
            .bind(ctx.request.cbsd_id)
            .execute(&mut *conn)
            .await?;

            debug!(cbsd = ctx.request.cbsd_id, "CBSD deregistered");
            Ok(())
        })
    }
}

/// Extract `(lowFrequency, highFrequency)` from a frequencyRange object
fn frequency_range(range: Option<&Value>) -> Option<(i64, i64)> {
    let range = range?;
    let low = range.get("lowFrequency")?.as_i64()?;
    let high = range.get("highFrequency")?.as_i64()?;
    Some((low, high))
}
