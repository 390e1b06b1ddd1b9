//! API route definitions
//!
//! Endpoints for the session dashboard:
//! - /api/v1/health - Liveness and system status
//! - /api/v1/status - Latest frame, calibration and alert state
//! - /api/v1/session - Posture split, alerts, durations, risk score
//! - /api/v1/fatigue/history - Fatigue chart points
//! - /api/v1/config - Active configuration (GET) and validation (POST /validate)

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, DashboardState};

/// Create all API routes for the dashboard
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/status", get(handlers::get_status))
        .route("/session", get(handlers::get_session))
        .route("/fatigue/history", get(handlers::get_fatigue_history))
        .route("/config", get(handlers::get_config))
        .route("/config/validate", post(handlers::validate_config))
        .with_state(state)
}
