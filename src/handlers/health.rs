//! Service health endpoint.
//!
//! GET /health - Liveness plus a database connectivity probe. The endpoint
//! is public: load balancers and uptime monitors call it without a session.

use crate::{error::AppError, state::AppState};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Body of a successful health probe.
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "timestamp": "2026-08-05T19:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Probe the service.
///
/// Runs one trivial query against the pool; an unreachable database turns
/// into the standard error envelope (HTTP 500), which is what monitors key
/// off. Provider reachability is intentionally not probed here — a flaky
/// upstream should page nobody while the service itself is fine.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        database: "connected",
        timestamp: Utc::now(),
    }))
}
