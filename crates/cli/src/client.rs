//! API client for the vehicle advisor server

use advisor_lib::{
    HealthResponse, MaintenanceRequest, MaintenanceResponse, RangeRequest, RangeResponse,
    ReadinessResponse,
};
use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Error body returned by the server for rejected requests
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub field: Option<String>,
}

/// A non-success response from the server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message} ({code}, HTTP {status})")]
    Rejected {
        status: StatusCode,
        code: String,
        field: Option<String>,
        message: String,
    },

    #[error("API error ({status}): {body}")]
    Unexpected { status: StatusCode, body: String },
}

/// API client for the advisor server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn predict_range(&self, request: &RangeRequest) -> Result<RangeResponse> {
        self.post("api/ev/predict-range", request).await
    }

    pub async fn predict_maintenance(
        &self,
        request: &MaintenanceRequest,
    ) -> Result<MaintenanceResponse> {
        self.post("api/maintenance/predict", request).await
    }

    /// Health is reported with a body even when the server answers 503
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_allowing_unavailable("healthz").await
    }

    pub async fn readiness(&self) -> Result<ReadinessResponse> {
        self.get_allowing_unavailable("readyz").await
    }

    async fn get_allowing_unavailable<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.context("Failed to parse response");
        }
        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(parsed) => ApiError::Rejected {
                    status,
                    code: parsed.code,
                    field: parsed.field,
                    message: parsed.error,
                },
                Err(_) => ApiError::Unexpected { status, body },
            };
            return Err(err.into());
        }

        response.json().await.context("Failed to parse response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_lib::ComponentStatus;

    fn range_request() -> RangeRequest {
        RangeRequest {
            soc: 40.0,
            battery_capacity: 75.0,
            trip_distance: 250.0,
            ..RangeRequest::default()
        }
    }

    #[tokio::test]
    async fn test_predict_range_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/ev/predict-range")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"predicted_range": 212.5, "charging_suggestion": "Charge to 80% for optimal range and battery health."}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.predict_range(&range_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.predicted_range, 212.5);
        assert!(response.charging_suggestion.unwrap().starts_with("Charge to 80%"));
    }

    #[tokio::test]
    async fn test_validation_error_surfaces_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/ev/predict-range")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error": "invalid traffic_status 'Jammed'", "code": "validation_error", "field": "traffic_status", "value": "Jammed"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.predict_range(&range_request()).await.unwrap_err();

        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Rejected {
                status, code, field, ..
            }) => {
                assert_eq!(*status, StatusCode::BAD_REQUEST);
                assert_eq!(code, "validation_error");
                assert_eq!(field.as_deref(), Some("traffic_status"));
            }
            other => panic!("expected rejected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_is_unexpected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/maintenance/predict")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let request: MaintenanceRequest = serde_json::from_value(serde_json::json!({
            "engine_rpm": 800.0, "lub_oil_pressure": 3.0, "fuel_pressure": 6.0,
            "coolant_pressure": 2.0, "lub_oil_temp": 77.0, "coolant_temp": 79.0,
            "fuel_type": "petrol", "mileage": 1000.0, "fuel_consumption_rate": 7.0,
            "engine_runtime": 100.0, "temperature_difference": 2.0
        }))
        .unwrap();
        let err = client.predict_maintenance(&request).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Unexpected { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_accepts_503_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status": "unhealthy", "components": {"maintenance_model": {"status": "unhealthy", "message": "training failed", "last_check_timestamp": 0}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();

        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert!(health.components.contains_key("maintenance_model"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
