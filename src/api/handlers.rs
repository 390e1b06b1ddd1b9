//! API route handlers
//!
//! Read-only views of the published session snapshot plus config validation.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::envelope::{ApiErrorResponse, ApiResponse, ErrorCode};
use crate::alerts::AlertPhase;
use crate::calibration::CalibrationState;
use crate::config::defaults::FATIGUE_HISTORY_MAX_RESPONSE_POINTS;
use crate::config::{ConfigError, MonitorConfig};
use crate::metrics::FatiguePoint;
use crate::pipeline::{AppState, SessionStats};
use crate::types::{TickOutput, Timestamp};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Snapshot published by the processing loop
    pub app_state: Arc<RwLock<AppState>>,
    /// Active configuration
    pub config: Arc<MonitorConfig>,
}

impl DashboardState {
    pub fn new(app_state: Arc<RwLock<AppState>>, config: MonitorConfig) -> Self {
        Self {
            app_state,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub system_status: String,
    pub session: String,
    pub uptime_secs: u64,
}

/// GET /api/v1/health
pub async fn get_health(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;
    ApiResponse::ok(HealthResponse {
        status: "ok",
        system_status: app_state.status.to_string(),
        session: app_state.session_name.clone(),
        uptime_secs: app_state.uptime_secs(),
    })
}

// ============================================================================
// Status
// ============================================================================

/// Alert channel view for the dashboard.
#[derive(Debug, Serialize)]
pub struct AlertSnapshot {
    pub phase: AlertPhase,
    pub break_started_at: Option<Timestamp>,
    pub break_cooldown_until: Option<Timestamp>,
    pub absent_since: Option<Timestamp>,
    pub last_posture_beep: Option<Timestamp>,
    pub last_break_trigger: Option<Timestamp>,
    pub alerts_issued: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub system_status: String,
    pub source: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub latest: Option<TickOutput>,
    pub prompt: Option<&'static str>,
    pub calibration: CalibrationState,
    pub alerts: Option<AlertSnapshot>,
    pub stats: SessionStats,
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;

    let alerts = app_state.alerts.map(|a| AlertSnapshot {
        phase: a.phase(),
        break_started_at: a.break_started_at,
        break_cooldown_until: a.break_cooldown_until,
        absent_since: a.absent_since,
        last_posture_beep: a.posture_beep.last_fired(),
        last_break_trigger: a.break_trigger.last_fired(),
        alerts_issued: a.alerts_issued,
    });

    ApiResponse::ok(StatusResponse {
        system_status: app_state.status.to_string(),
        source: app_state.source.clone(),
        last_update: app_state.last_update,
        latest: app_state.latest_tick,
        prompt: app_state.latest_tick.as_ref().and_then(TickOutput::prompt),
        calibration: app_state.calibration,
        alerts,
        stats: app_state.stats,
    })
}

// ============================================================================
// Session summary
// ============================================================================

/// GET /api/v1/session
pub async fn get_session(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;
    match app_state.summary {
        Some(summary) => ApiResponse::ok(summary),
        None => ApiErrorResponse::new(ErrorCode::NoFramesYet, "No frames processed yet"),
    }
}

// ============================================================================
// Fatigue history
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum points to return (most recent)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FatigueHistoryResponse {
    pub points: Vec<FatiguePoint>,
    /// Points held in the buffer
    pub total: usize,
}

/// GET /api/v1/fatigue/history?limit=N
pub async fn get_fatigue_history(
    State(state): State<DashboardState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(FATIGUE_HISTORY_MAX_RESPONSE_POINTS)
        .min(FATIGUE_HISTORY_MAX_RESPONSE_POINTS);
    if limit == 0 {
        return ApiErrorResponse::new(ErrorCode::InvalidLimit, "limit must be > 0");
    }

    let app_state = state.app_state.read().await;
    ApiResponse::ok(FatigueHistoryResponse {
        points: app_state.recent_fatigue_history(limit),
        total: app_state.fatigue_history.len(),
    })
}

// ============================================================================
// Configuration
// ============================================================================

/// GET /api/v1/config
pub async fn get_config(State(state): State<DashboardState>) -> Response {
    ApiResponse::ok(state.config.as_ref())
}

/// Result of validating a candidate config
#[derive(Debug, Serialize)]
pub struct ValidateConfigResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// POST /api/v1/config/validate - Check a candidate config without applying it
///
/// Missing fields take their defaults, as in a TOML file.
pub async fn validate_config(Json(candidate): Json<MonitorConfig>) -> Response {
    match candidate.validate() {
        Ok(()) => ApiResponse::ok(ValidateConfigResponse {
            valid: true,
            errors: Vec::new(),
        }),
        Err(ConfigError::Validation(errors)) => ApiResponse::ok(ValidateConfigResponse {
            valid: false,
            errors,
        }),
        Err(e) => ApiErrorResponse::new(ErrorCode::InvalidConfig, e.to_string()),
    }
}
