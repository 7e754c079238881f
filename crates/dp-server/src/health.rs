//! Health check endpoint
//!
//! Liveness/readiness probe for orchestrators: reports overall status and
//! database connectivity.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    /// Database connectivity
    pub database: DatabaseHealth,
}

/// Database health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    /// "up" or "down"
    pub status: String,
    /// Error message if down
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health routes for the monitoring listener
pub fn router(pool: PgPool) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .with_state(pool)
}

async fn health_handler(State(pool): State<PgPool>) -> Response {
    let database = match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => DatabaseHealth {
            status: "up".to_string(),
            error: None,
        },
        Err(e) => DatabaseHealth {
            status: "down".to_string(),
            error: Some(e.to_string()),
        },
    };

    let healthy = database.status == "up";
    let status = HealthStatus {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        database,
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status)).into_response()
}
