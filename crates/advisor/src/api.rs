//! HTTP API: prediction endpoints, health checks and Prometheus metrics

use advisor_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::AdvisorMetrics,
    AdvisorService, MaintenanceRequest, RangeRequest, ServiceError,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared application state
pub struct AppState {
    pub service: AdvisorService,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: AdvisorService, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

/// Error returned by the prediction handlers
pub enum ApiError {
    Service(ServiceError),
    Malformed(JsonRejection),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Malformed(rejection) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: rejection.body_text(),
                    code: "malformed_request",
                    field: None,
                    value: None,
                },
            ),
            ApiError::Service(err) => {
                let status = match &err {
                    ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                    ServiceError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    ServiceError::Domain(_) | ServiceError::Estimator(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let (field, value) = match &err {
                    ServiceError::Validation(v) => (Some(v.field().to_string()), v.value()),
                    _ => (None, None),
                };
                if !err.is_client_error() {
                    warn!(code = err.code(), error = %err, "Prediction failed");
                }
                (
                    status,
                    ErrorBody {
                        error: err.to_string(),
                        code: err.code(),
                        field,
                        value,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Service banner
async fn index() -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "message": "Vehicle advisor API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "predict_range": "/api/ev/predict-range",
            "predict_maintenance": "/api/maintenance/predict",
            "health": "/healthz",
            "ready": "/readyz",
            "metrics": "/metrics"
        }
    }))
}

async fn predict_range(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RangeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let response = state.service.predict_range(&request)?;
    Ok(Json(response))
}

async fn predict_maintenance(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MaintenanceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let today = chrono::Local::now().date_naive();
    let response = state.service.predict_maintenance(&request, today)?;
    Ok(Json(response))
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    match AdvisorMetrics::render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// CORS for the configured browser origins; unparsable origins are skipped
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/ev/predict-range", post(predict_range))
        .route("/api/maintenance/predict", post(predict_maintenance))
        .route("/predict", post(predict_maintenance))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    addr: &str,
    router: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting API server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
