//! Integration tests for the advisor API endpoints

use advisor_lib::{
    AdvisorService, HealthRegistry, ModelKind, StructuredLogger, SyntheticTrainer, TrainerConfig,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use vehicle_advisor::{
    api::{create_router, AppState},
    config::AdvisorConfig,
    initialize_service,
};

fn test_config(dir: &TempDir) -> AdvisorConfig {
    AdvisorConfig {
        instance_name: "api-test".to_string(),
        range_artifact_path: dir.path().join("range.bin"),
        maintenance_artifact_path: dir.path().join("maintenance.bin"),
        trainer: TrainerConfig::small(),
        ..AdvisorConfig::default()
    }
}

async fn setup_test_app(dir: &TempDir) -> Router {
    let config = test_config(dir);
    let health_registry = HealthRegistry::new();
    let service = initialize_service(&config, StructuredLogger::new("api-test"), &health_registry)
        .await
        .unwrap();

    create_router(
        Arc::new(AppState::new(service, health_registry)),
        &config.cors_origins,
    )
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn range_payload() -> Value {
    json!({
        "battery_temp": 25.0,
        "current_charging": 0.0,
        "soc": 60.0,
        "battery_capacity": 75.0,
        "elevation": 200.0,
        "traffic_status": "Moderate",
        "speed": 70.0,
        "wind_speed": 10.0,
        "ac_usage": 1
    })
}

fn maintenance_payload() -> Value {
    json!({
        "engine_rpm": 800.0,
        "lub_oil_pressure": 3.2,
        "fuel_pressure": 6.5,
        "coolant_pressure": 2.3,
        "lub_oil_temp": 78.0,
        "coolant_temp": 80.0,
        "fuel_type": "diesel",
        "mileage": 60000.0,
        "fuel_consumption_rate": 8.5,
        "engine_runtime": 1200.0,
        "temperature_difference": 2.0
    })
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let (status, body) = send(app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["endpoints"]["predict_range"], "/api/ev/predict-range");
}

#[tokio::test]
async fn test_predict_range_without_trip_has_no_suggestion() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let (status, body) = send(app, post_json("/api/ev/predict-range", &range_payload())).await;

    assert_eq!(status, StatusCode::OK);
    let range = body["predicted_range"].as_f64().unwrap();
    assert!(range.is_finite());
    // rounded to two decimals
    assert!(((range * 100.0).round() - range * 100.0).abs() < 1e-6);
    assert!(body.get("charging_suggestion").is_none());
}

#[tokio::test]
async fn test_predict_range_with_trip_returns_suggestion() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let mut payload = range_payload();
    payload["trip_distance"] = json!(5000.0);
    let (status, body) = send(app, post_json("/api/ev/predict-range", &payload)).await;

    assert_eq!(status, StatusCode::OK);
    let suggestion = body["charging_suggestion"].as_str().unwrap();
    assert!(suggestion.starts_with("Charge"), "unexpected suggestion: {}", suggestion);
}

#[tokio::test]
async fn test_predict_range_uses_defaults_for_missing_fields() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let (status, body) = send(app, post_json("/api/ev/predict-range", &json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["predicted_range"].is_number());
}

#[tokio::test]
async fn test_invalid_traffic_status_names_field() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let mut payload = range_payload();
    payload["traffic_status"] = json!("Jammed");
    let (status, body) = send(app, post_json("/api/ev/predict-range", &payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(body["field"], "traffic_status");
    assert_eq!(body["value"], "Jammed");
}

#[tokio::test]
async fn test_invalid_ac_usage_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let mut payload = range_payload();
    payload["ac_usage"] = json!(2);
    let (status, body) = send(app, post_json("/api/ev/predict-range", &payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "ac_usage");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/ev/predict-range")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"soc\": "))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "malformed_request");
}

#[tokio::test]
async fn test_maintenance_missing_field_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let mut payload = maintenance_payload();
    payload.as_object_mut().unwrap().remove("engine_rpm");
    let (status, body) = send(app, post_json("/api/maintenance/predict", &payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "malformed_request");
}

#[tokio::test]
async fn test_predict_maintenance_returns_consistent_projection() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let (status, body) = send(app, post_json("/api/maintenance/predict", &maintenance_payload())).await;

    assert_eq!(status, StatusCode::OK);
    let probability = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    assert_eq!(body["threshold"], 0.6);

    let label = body["predicted_class"].as_u64().unwrap();
    let expected_condition = if label == 1 { "Needs Maintenance" } else { "Normal" };
    assert_eq!(body["engine_condition"], expected_condition);

    let due = body["maintenance_due"].as_bool().unwrap();
    assert_eq!(due, probability > 0.6);
    assert_eq!(body["days_to_maintenance"].is_u64(), due);
    assert_eq!(body["maintenance_date"].is_string(), due);
}

#[tokio::test]
async fn test_predict_alias_serves_maintenance() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let (status, body) = send(app, post_json("/predict", &maintenance_payload())).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["engine_condition"].is_string());
}

#[tokio::test]
async fn test_predict_alias_accepts_numeric_fuel_codes() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let payload = json!({
        "engine_rpm": 700.0,
        "lub_oil_pressure": 2.5,
        "fuel_pressure": 11.8,
        "coolant_pressure": 3.2,
        "lub_oil_temp": 84.1,
        "coolant_temp": 81.6,
        "fuel_type": 1.0,
        "mileage": 50000.0,
        "fuel_consumption_rate": 8.5,
        "engine_runtime": 1200.0,
        "temperature_difference": -2.5
    });
    let (status, body) = send(app.clone(), post_json("/predict", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["engine_condition"].is_string());

    let mut unknown = payload;
    unknown["fuel_type"] = json!(3.0);
    let (status, body) = send(app, post_json("/predict", &unknown)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(body["field"], "fuel_type");
    assert_eq!(body["value"], "3");
}

#[tokio::test]
async fn test_invalid_fuel_type_names_field() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let mut payload = maintenance_payload();
    payload["fuel_type"] = json!("Hydrogen");
    let (status, body) = send(app, post_json("/api/maintenance/predict", &payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "fuel_type");
}

#[tokio::test]
async fn test_missing_model_returns_503() {
    let artifact = SyntheticTrainer::new(TrainerConfig::small())
        .train(ModelKind::Range)
        .unwrap()
        .artifact;
    let service = AdvisorService::new(StructuredLogger::new("api-test"))
        .with_range_artifact(Arc::new(artifact))
        .unwrap();
    let app = create_router(
        Arc::new(AppState::new(service, HealthRegistry::new())),
        &[],
    );

    let (status, body) = send(
        app.clone(),
        post_json("/api/maintenance/predict", &maintenance_payload()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "model_unavailable");

    let (status, _) = send(app, post_json("/api/ev/predict-range", &range_payload())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_validation_precedes_availability() {
    let service = AdvisorService::new(StructuredLogger::new("api-test"));
    let app = create_router(
        Arc::new(AppState::new(service, HealthRegistry::new())),
        &[],
    );

    let mut payload = range_payload();
    payload["traffic_status"] = json!("Jammed");
    let (status, _) = send(app, post_json("/api/ev/predict-range", &payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_readiness_after_startup() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let (status, health) = send(app.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"].as_object().unwrap().len(), 2);

    let (status, readiness) = send(app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_unsaved_models_report_degraded() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let config = AdvisorConfig {
        range_artifact_path: blocker.join("range.bin"),
        maintenance_artifact_path: blocker.join("maintenance.bin"),
        ..test_config(&dir)
    };
    let health_registry = HealthRegistry::new();
    let service = initialize_service(&config, StructuredLogger::new("api-test"), &health_registry)
        .await
        .unwrap();
    assert!(service.has_model(ModelKind::Range));
    assert!(service.has_model(ModelKind::Maintenance));

    let app = create_router(Arc::new(AppState::new(service, health_registry)), &[]);
    let (status, health) = send(app.clone(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");

    let (status, _) = send(app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_readyz_returns_503_before_initialization() {
    let service = AdvisorService::new(StructuredLogger::new("api-test"));
    let app = create_router(
        Arc::new(AppState::new(service, HealthRegistry::new())),
        &[],
    );

    let (status, readiness) = send(app, get("/readyz")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prediction_counters() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(&dir).await;

    let (status, _) = send(app.clone(), post_json("/api/ev/predict-range", &range_payload())).await;
    assert_eq!(status, StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("vehicle_advisor_predictions_total"));
    assert!(text.contains("vehicle_advisor_prediction_latency_seconds"));
}
