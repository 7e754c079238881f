//! Persistent state for the Domain Proxy pipeline
//!
//! The database is the only shared mutable resource between worker
//! processes: pending requests are claimed with row-level locks
//! ([`consumer`]), and all CBSD/Grant/Request mutations happen inside the
//! claiming transaction ([`processor`]). Nothing outside this module touches
//! the request tables.

pub mod consumer;
pub mod handlers;
pub mod models;
pub mod processor;
pub mod transitions;

pub use consumer::get_pending_requests;
pub use models::{Cbsd, CbsdState, Channel, Grant, GrantState, Request, RequestState};
pub use processor::ResponseProcessor;
pub use transitions::{GrantTransitionRule, GrantTransitionTable, ResponseOutcome};

use sqlx::PgPool;

/// Storage operation errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted value failed to parse back into its domain type
    #[error("Invalid persisted value: {0}")]
    InvalidValue(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the Domain Proxy schema if it does not exist
///
/// Idempotent; safe to run on every worker start. The partial index on
/// `requests(state, type, id)` backs the dequeue query's scan order.
pub async fn migrate(pool: &PgPool) -> StorageResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cbsds (
            id BIGSERIAL PRIMARY KEY,
            cbsd_id VARCHAR(255) UNIQUE,
            fcc_id VARCHAR(255) NOT NULL,
            user_id VARCHAR(255) NOT NULL,
            serial_number VARCHAR(255) NOT NULL,
            network_id VARCHAR(255) NOT NULL DEFAULT '',
            state VARCHAR(32) NOT NULL DEFAULT 'unregistered',
            last_seen TIMESTAMPTZ,
            min_power DOUBLE PRECISION,
            max_power DOUBLE PRECISION,
            antenna_gain DOUBLE PRECISION,
            number_of_ports INTEGER,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (fcc_id, serial_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS requests (
            id BIGSERIAL PRIMARY KEY,
            cbsd_id BIGINT NOT NULL REFERENCES cbsds(id),
            type VARCHAR(64) NOT NULL,
            state VARCHAR(32) NOT NULL DEFAULT 'pending',
            payload JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_requests_state_type_id
            ON requests(state, type, id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS responses (
            id BIGSERIAL PRIMARY KEY,
            request_id BIGINT NOT NULL UNIQUE REFERENCES requests(id),
            response_code BIGINT NOT NULL,
            payload JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grants (
            id BIGSERIAL PRIMARY KEY,
            cbsd_id BIGINT NOT NULL REFERENCES cbsds(id),
            grant_id VARCHAR(255) NOT NULL,
            state VARCHAR(32) NOT NULL DEFAULT 'idle',
            heartbeat_interval_secs BIGINT,
            last_heartbeat_request_time TIMESTAMPTZ,
            low_frequency_hz BIGINT,
            high_frequency_hz BIGINT,
            max_eirp DOUBLE PRECISION,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (cbsd_id, grant_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            id BIGSERIAL PRIMARY KEY,
            cbsd_id BIGINT NOT NULL REFERENCES cbsds(id),
            low_frequency_hz BIGINT NOT NULL,
            high_frequency_hz BIGINT NOT NULL,
            max_eirp DOUBLE PRECISION,
            last_used_max_eirp DOUBLE PRECISION,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_channels_cbsd ON channels(cbsd_id)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
