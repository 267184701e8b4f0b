//! HTTP service wrapping the analysis engine.
//!
//! Endpoints:
//!   POST /analyze             analyze one message
//!   GET  /health              liveness probe
//!   GET  /analytics?hours=N   detection statistics (1..=168 hours)
//!   GET  /threat-intelligence 24 h / 7 d threat report
//!   GET  /                    service description

use crate::analytics::AnalyticsTracker;
use crate::engine::{AnalysisEngine, AnalysisResult};
use crate::error::AnalysisError;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state. The engine is immutable after startup and
/// the tracker synchronizes internally, so handlers just clone the arcs.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AnalysisEngine>,
    pub tracker: Arc<AnalyticsTracker>,
}

impl AppState {
    pub fn new(engine: AnalysisEngine, analytics_capacity: usize) -> Self {
        Self {
            engine: Arc::new(engine),
            tracker: Arc::new(AnalyticsTracker::new(analytics_capacity)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default = "default_hours")]
    pub hours: u32,
}

fn default_hours() -> u32 {
    24
}

const MAX_ANALYTICS_HOURS: u32 = 168;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Client errors become a 400 with a JSON body; everything else is a 500.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidInput { .. } => ApiError::bad_request(err.to_string()),
            AnalysisError::Extraction { .. } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/analytics", get(analytics))
        .route("/threat-intelligence", get(threat_intelligence))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    log::info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let result = state.engine.analyze(&request.message)?;
    state
        .tracker
        .record(&result, request.message.chars().count());
    log::info!(
        "analyzed hash={} class={} score={:.2}",
        result.message_hash,
        result.classification,
        result.risk_score
    );
    Ok(Json(result))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, ApiError> {
    if query.hours == 0 || query.hours > MAX_ANALYTICS_HOURS {
        return Err(ApiError::bad_request(format!(
            "hours must be between 1 and {MAX_ANALYTICS_HOURS}"
        )));
    }
    Ok(Json(state.tracker.statistics(query.hours)).into_response())
}

async fn threat_intelligence(State(state): State<AppState>) -> Response {
    Json(state.tracker.threat_intelligence()).into_response()
}

#[derive(Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    endpoints: Vec<&'static str>,
}

async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "scamshield",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "POST /analyze",
            "GET /health",
            "GET /analytics?hours=N",
            "GET /threat-intelligence",
        ],
    })
}
