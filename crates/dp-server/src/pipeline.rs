//! Pipeline driver
//!
//! Ties dequeue -> route -> process-response into a periodic cycle. Each
//! request type is handled in its own transaction: the dequeue claim, the
//! response rows, the processed markings, and the state transitions commit
//! together, and a routing failure rolls the whole claim back so the
//! requests retry on a later cycle. One driver runs per worker process;
//! horizontal scaling adds processes, not threads; all coordination lives
//! in the database's row locks.

use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::metrics::PipelineMetrics;
use crate::router::{Router, RouterError};
use crate::storage::{self, ResponseProcessor, StorageError};
use sas_proto::RequestTypeName;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Pipeline errors surfaced per request-type batch
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Router error
    #[error("Router error: {0}")]
    Router(#[from] RouterError),
}

/// Outcome of one pipeline cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    /// Requests claimed across all types
    pub dequeued: usize,
    /// Requests marked processed
    pub processed: usize,
    /// Request-type batches that failed and rolled back
    pub failures: usize,
}

/// Periodic dequeue/route/process driver
pub struct PipelineDriver {
    pool: PgPool,
    router: Router,
    processor: ResponseProcessor,
    metrics: Arc<PipelineMetrics>,
    audit: Arc<AuditLogger>,
    request_processing_limit: i64,
    poll_interval: Duration,
}

impl PipelineDriver {
    pub fn new(
        pool: PgPool,
        router: Router,
        processor: ResponseProcessor,
        metrics: Arc<PipelineMetrics>,
        audit: Arc<AuditLogger>,
        request_processing_limit: i64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pool,
            router,
            processor,
            metrics,
            audit,
            request_processing_limit,
            poll_interval,
        }
    }

    /// Run cycles forever
    ///
    /// A failed batch never stops the loop; the affected requests stay
    /// pending and retry on the next tick.
    pub async fn run(&self) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            limit = self.request_processing_limit,
            "Pipeline driver started"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let stats = self.run_cycle().await;
            if stats.dequeued > 0 || stats.failures > 0 {
                info!(
                    dequeued = stats.dequeued,
                    processed = stats.processed,
                    failures = stats.failures,
                    "Pipeline cycle finished"
                );
            }
        }
    }

    /// Run one full cycle over all request types
    pub async fn run_cycle(&self) -> CycleStats {
        let mut stats = CycleStats::default();

        for request_type in RequestTypeName::ALL {
            match self.process_request_type(request_type).await {
                Ok((dequeued, processed)) => {
                    stats.dequeued += dequeued;
                    stats.processed += processed;
                }
                Err(e) => {
                    stats.failures += 1;
                    error!(
                        request_type = %request_type,
                        error = %e,
                        "Request batch failed; requests stay pending for the next cycle"
                    );
                }
            }
        }

        self.metrics.cycles_total.fetch_add(1, Ordering::Relaxed);
        if stats.failures > 0 {
            self.metrics
                .cycle_errors_total
                .fetch_add(1, Ordering::Relaxed);
        }

        stats
    }

    /// Dequeue, route, and process one request type inside one transaction
    async fn process_request_type(
        &self,
        request_type: RequestTypeName,
    ) -> Result<(usize, usize), PipelineError> {
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        let mut batches = storage::get_pending_requests(
            &mut tx,
            request_type,
            self.request_processing_limit,
        )
        .await?;

        let Some(requests) = batches.remove(&request_type) else {
            tx.rollback().await.map_err(StorageError::from)?;
            return Ok((0, 0));
        };

        let dequeued = requests.len();
        self.metrics
            .requests_dequeued_total
            .fetch_add(dequeued as u64, Ordering::Relaxed);

        let payloads: Vec<Value> = requests.iter().map(|r| r.payload.clone()).collect();
        let body = json!({ request_type.request_key(): payloads });

        self.audit
            .log(
                AuditEntry::new(AuditEventType::BatchSent)
                    .with_request_type(request_type.as_str())
                    .with_batch_size(dequeued),
            )
            .await;

        let response = match self.router.post_to_sas(&body).await {
            Ok(response) => response,
            Err(e) => {
                // Releasing the transaction releases the claim; the rows go
                // back to the pool untouched.
                tx.rollback().await.map_err(StorageError::from)?;
                self.metrics
                    .router_errors_total
                    .fetch_add(1, Ordering::Relaxed);
                self.audit
                    .log(
                        AuditEntry::new(AuditEventType::RouterFailure)
                            .with_request_type(request_type.as_str())
                            .with_batch_size(dequeued)
                            .with_details(e.to_string()),
                    )
                    .await;
                return Err(e.into());
            }
        };

        let processed = self
            .processor
            .process_response(request_type, &requests, &response.body, &mut tx)
            .await?;
        tx.commit().await.map_err(StorageError::from)?;

        self.metrics
            .requests_processed_total
            .fetch_add(processed as u64, Ordering::Relaxed);
        self.audit
            .log(
                AuditEntry::new(AuditEventType::ResponseProcessed)
                    .with_request_type(request_type.as_str())
                    .with_batch_size(processed),
            )
            .await;

        debug!(
            request_type = %request_type,
            dequeued = dequeued,
            processed = processed,
            "Batch committed"
        );

        // Best-effort relay; processing is already durable.
        if let Err(e) = self
            .router
            .redirect_sas_response_to_radio_controller(&response.body)
            .await
        {
            warn!(error = %e, "Radio Controller relay failed");
            self.metrics
                .rc_relay_failures_total
                .fetch_add(1, Ordering::Relaxed);
            self.audit
                .log(
                    AuditEntry::new(AuditEventType::RelayFailure)
                        .with_request_type(request_type.as_str())
                        .with_details(e.to_string()),
                )
                .await;
        }

        Ok((dequeued, processed))
    }
}
