//! # Backend Validation Client
//!
//! Best-effort HTTP client for the bridge backend (`/api`). Nothing here
//! ever returns an error to the caller: every call resolves to an
//! [`ApiResponse`], with transport failures, timeouts and non-2xx statuses
//! folded into `success: false`.
//!
//! | Method | Path | Used for |
//! |--------|------|----------|
//! | GET | `/locations/` | location lookup, connectivity probe |
//! | POST | `/geometry/validate/` | server-side geometry check |
//! | GET | `/materials/` | material option lists |
//! | POST | `/submit/` | design submission |
//! | POST | `/custom-params/` | custom loading rows (404 tolerated) |
//!
//! The [`BridgeBackend`] trait is the seam the resolver and the sync
//! helpers are written against, so they can run against a stub.

use std::future::Future;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::custom_params::CustomParamPayload;
use crate::errors::{BridgeError, BridgeResult};
use crate::form::DesignSubmission;
use crate::geometry::GeometryInputs;
use crate::location::{LocationRecord, SeismicZone};
use crate::materials::MaterialOptions;

/// Uniform result of every backend call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            message: message.into(),
        }
    }

    pub fn failed(error: impl Into<String>, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error.into()),
            message: message.into(),
        }
    }

    /// Data on success, the error text otherwise
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or(self.message)),
        }
    }
}

/// Result of the connectivity probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
    pub error: Option<String>,
}

/// Location row as served by `/locations/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDto {
    #[serde(default)]
    pub id: Option<i64>,
    pub state: String,
    pub district: String,
    pub basic_wind_speed: f64,
    pub seismic_zone: SeismicZone,
    pub seismic_factor: f64,
    pub temperature_max: f64,
    pub temperature_min: f64,
}

impl From<LocationDto> for LocationRecord {
    fn from(dto: LocationDto) -> Self {
        LocationRecord {
            wind_speed_mps: dto.basic_wind_speed,
            seismic_zone: dto.seismic_zone,
            seismic_factor: dto.seismic_factor,
            min_temp_c: dto.temperature_min,
            max_temp_c: dto.temperature_max,
            state_name: dto.state,
            district_name: dto.district,
        }
    }
}

/// `/locations/` answers either paginated or as a bare array
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LocationList {
    Page { results: Vec<LocationDto> },
    Bare(Vec<LocationDto>),
}

impl LocationList {
    fn into_first(self) -> Option<LocationDto> {
        match self {
            LocationList::Page { results } => results.into_iter().next(),
            LocationList::Bare(list) => list.into_iter().next(),
        }
    }
}

/// Body of `POST /geometry/validate/`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryValidationRequest {
    pub carriageway_width: f64,
    pub girder_spacing: f64,
    pub num_girders: u32,
    pub deck_overhang_width: f64,
}

impl GeometryValidationRequest {
    /// `None` unless every member is present
    pub fn from_inputs(inputs: &GeometryInputs) -> Option<Self> {
        Some(GeometryValidationRequest {
            carriageway_width: inputs.carriageway_width_m?,
            girder_spacing: inputs.spacing_m?,
            num_girders: inputs.girder_count?,
            deck_overhang_width: inputs.overhang_m?,
        })
    }
}

/// Server verdict on a geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryValidationResponse {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub overall_width: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub geometry_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct CustomParamsRequest<'a> {
    parameters: &'a [CustomParamPayload],
}

/// Operations the rest of the crate needs from a backend
pub trait BridgeBackend {
    /// Short-timeout reachability check
    fn check_connection(&self) -> impl Future<Output = ConnectionStatus> + Send;

    /// First location matching the state and district display names
    fn location_by_name(&self, state: &str, district: &str) -> impl Future<Output = ApiResponse<LocationRecord>> + Send;

    fn validate_geometry(
        &self,
        request: &GeometryValidationRequest,
    ) -> impl Future<Output = ApiResponse<GeometryValidationResponse>> + Send;

    fn material_options(&self) -> impl Future<Output = ApiResponse<MaterialOptions>> + Send;

    fn submit_design(&self, submission: &DesignSubmission) -> impl Future<Output = ApiResponse<SubmitResponse>> + Send;

    /// Persist custom loading rows; a 404 counts as saved locally
    fn save_custom_parameters(
        &self,
        rows: &[CustomParamPayload],
    ) -> impl Future<Output = ApiResponse<Vec<CustomParamPayload>>> + Send;
}

/// reqwest-backed [`BridgeBackend`]
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    probe_timeout: Duration,
}

impl BackendClient {
    pub fn new(config: &ApiConfig) -> BridgeResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("Bridgeform/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BridgeError::config("api", format!("Failed to create HTTP client: {}", e)))?;

        Ok(BackendClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            probe_timeout: config.probe_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a 2xx JSON body
    async fn execute<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> BridgeResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| BridgeError::transport(endpoint, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| error_detail(&body))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(BridgeError::status(endpoint, status.as_u16(), detail));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BridgeError::serialization(format!("{}: {}", endpoint, e)))
    }

    pub async fn check_connection(&self) -> ConnectionStatus {
        let request = self.http.get(self.url("/locations/")).timeout(self.probe_timeout);
        let result = request.send().await.and_then(|r| r.error_for_status());
        match result {
            Ok(_) => {
                tracing::info!(base_url = %self.base_url, "backend connected");
                ConnectionStatus {
                    connected: true,
                    message: "Backend connected".to_string(),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(base_url = %self.base_url, error = %e, "backend not reachable");
                ConnectionStatus {
                    connected: false,
                    message: "Backend not reachable".to_string(),
                    error: Some(describe(&e)),
                }
            }
        }
    }

    /// All locations known to the backend
    pub async fn locations(&self) -> ApiResponse<Vec<LocationRecord>> {
        let request = self.http.get(self.url("/locations/"));
        match self.execute::<LocationList>("/locations/", request).await {
            Ok(list) => {
                let dtos = match list {
                    LocationList::Page { results } => results,
                    LocationList::Bare(list) => list,
                };
                ApiResponse::ok(
                    dtos.into_iter().map(LocationRecord::from).collect(),
                    "Locations fetched successfully",
                )
            }
            Err(e) => failure(&e, "Failed to fetch locations"),
        }
    }

    pub async fn location_by_name(&self, state: &str, district: &str) -> ApiResponse<LocationRecord> {
        let request = self
            .http
            .get(self.url("/locations/"))
            .query(&[("state", state), ("district", district)]);

        match self.execute::<LocationList>("/locations/", request).await {
            Ok(list) => match list.into_first() {
                Some(dto) => ApiResponse::ok(LocationRecord::from(dto), "Location fetched successfully"),
                None => ApiResponse::failed("Location not found", "Location not found in database"),
            },
            Err(e) => failure(&e, "Failed to fetch location"),
        }
    }

    pub async fn validate_geometry(&self, body: &GeometryValidationRequest) -> ApiResponse<GeometryValidationResponse> {
        let request = self.http.post(self.url("/geometry/validate/")).json(body);
        match self
            .execute::<GeometryValidationResponse>("/geometry/validate/", request)
            .await
        {
            Ok(verdict) => {
                let message = verdict
                    .message
                    .clone()
                    .unwrap_or_else(|| "Geometry validated successfully".to_string());
                ApiResponse::ok(verdict, message)
            }
            Err(e) => failure(&e, "Geometry validation failed"),
        }
    }

    pub async fn material_options(&self) -> ApiResponse<MaterialOptions> {
        let request = self.http.get(self.url("/materials/"));
        match self.execute::<MaterialOptions>("/materials/", request).await {
            Ok(options) => ApiResponse::ok(options, "Material options fetched successfully"),
            Err(e) => failure(&e, "Failed to fetch material options"),
        }
    }

    pub async fn submit_design(&self, submission: &DesignSubmission) -> ApiResponse<SubmitResponse> {
        let request = self.http.post(self.url("/submit/")).json(submission);
        match self.execute::<SubmitResponse>("/submit/", request).await {
            Ok(reply) => {
                let message = reply
                    .message
                    .clone()
                    .unwrap_or_else(|| "Design submitted successfully".to_string());
                ApiResponse::ok(reply, message)
            }
            Err(e) => failure(&e, "Design submission failed"),
        }
    }

    pub async fn save_custom_parameters(&self, rows: &[CustomParamPayload]) -> ApiResponse<Vec<CustomParamPayload>> {
        let request = self
            .http
            .post(self.url("/custom-params/"))
            .json(&CustomParamsRequest { parameters: rows });

        match self
            .execute::<serde_json::Value>("/custom-params/", request)
            .await
        {
            Ok(_) => ApiResponse::ok(rows.to_vec(), "Custom parameters saved successfully"),
            Err(e) if e.http_status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                tracing::debug!("custom-params endpoint not implemented, keeping rows locally");
                ApiResponse::ok(rows.to_vec(), "Custom parameters saved locally")
            }
            Err(e) => failure(&e, "Failed to save custom parameters"),
        }
    }
}

impl BridgeBackend for BackendClient {
    fn check_connection(&self) -> impl Future<Output = ConnectionStatus> + Send {
        BackendClient::check_connection(self)
    }

    fn location_by_name(&self, state: &str, district: &str) -> impl Future<Output = ApiResponse<LocationRecord>> + Send {
        BackendClient::location_by_name(self, state, district)
    }

    fn validate_geometry(
        &self,
        request: &GeometryValidationRequest,
    ) -> impl Future<Output = ApiResponse<GeometryValidationResponse>> + Send {
        BackendClient::validate_geometry(self, request)
    }

    fn material_options(&self) -> impl Future<Output = ApiResponse<MaterialOptions>> + Send {
        BackendClient::material_options(self)
    }

    fn submit_design(&self, submission: &DesignSubmission) -> impl Future<Output = ApiResponse<SubmitResponse>> + Send {
        BackendClient::submit_design(self, submission)
    }

    fn save_custom_parameters(
        &self,
        rows: &[CustomParamPayload],
    ) -> impl Future<Output = ApiResponse<Vec<CustomParamPayload>>> + Send {
        BackendClient::save_custom_parameters(self, rows)
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Fold a failed call into a `success: false` response
fn failure<T>(e: &BridgeError, message: &str) -> ApiResponse<T> {
    tracing::debug!(code = e.error_code(), retryable = e.is_recoverable(), error = %e, "{}", message);
    ApiResponse::failed(reason(e), message)
}

/// Text shown to the user for a failed call
fn reason(e: &BridgeError) -> String {
    match e {
        BridgeError::Status { detail, .. } => detail.clone(),
        BridgeError::Transport { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Pull a human-readable message out of an error body
fn error_detail(body: &serde_json::Value) -> Option<String> {
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(|v| v.as_str()))
        .or_else(|| body.get("errors")?.get(0)?.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_list_shapes() {
        let row = json!({
            "id": 3,
            "state": "Maharashtra",
            "district": "Mumbai",
            "basic_wind_speed": 44.0,
            "seismic_zone": "III",
            "seismic_factor": 0.16,
            "temperature_max": 34.0,
            "temperature_min": 22.0
        });

        let page: LocationList = serde_json::from_value(json!({ "count": 1, "results": [row.clone()] })).unwrap();
        let bare: LocationList = serde_json::from_value(json!([row])).unwrap();
        let a = page.into_first().unwrap();
        let b = bare.into_first().unwrap();
        assert_eq!(a, b);

        let record = LocationRecord::from(a);
        assert_eq!(record.district_name, "Mumbai");
        assert_eq!(record.min_temp_c, 22.0);
        assert_eq!(record.seismic_zone, SeismicZone::III);
    }

    #[test]
    fn test_empty_location_list() {
        let page: LocationList = serde_json::from_value(json!({ "results": [] })).unwrap();
        assert!(page.into_first().is_none());
    }

    #[test]
    fn test_geometry_request_needs_all_members() {
        let mut inputs = GeometryInputs {
            carriageway_width_m: Some(7.5),
            spacing_m: Some(2.5),
            overhang_m: Some(2.5),
            girder_count: None,
        };
        assert!(GeometryValidationRequest::from_inputs(&inputs).is_none());

        inputs.girder_count = Some(4);
        let request = GeometryValidationRequest::from_inputs(&inputs).unwrap();
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({
                "carriageway_width": 7.5,
                "girder_spacing": 2.5,
                "num_girders": 4,
                "deck_overhang_width": 2.5
            })
        );
    }

    #[test]
    fn test_error_detail_priority() {
        assert_eq!(error_detail(&json!({ "detail": "Not found." })).as_deref(), Some("Not found."));
        assert_eq!(
            error_detail(&json!({ "valid": false, "errors": ["All parameters must be valid numbers"] })).as_deref(),
            Some("All parameters must be valid numbers")
        );
        assert_eq!(
            error_detail(&json!({ "message": "Invalid input parameters", "errors": ["x"] })).as_deref(),
            Some("Invalid input parameters")
        );
        assert_eq!(error_detail(&json!({ "ok": true })), None);
    }

    #[test]
    fn test_into_result() {
        let ok: ApiResponse<u32> = ApiResponse::ok(4, "fine");
        assert_eq!(ok.into_result(), Ok(4));
        let failed: ApiResponse<u32> = ApiResponse::failed("Request timed out", "Failed to fetch");
        assert_eq!(failed.into_result(), Err("Request timed out".to_string()));
    }

    #[test]
    fn test_failure_keeps_user_facing_reason() {
        let timeout: ApiResponse<()> = failure(
            &BridgeError::transport("/locations/", "Request timed out"),
            "Failed to fetch location",
        );
        assert!(!timeout.success);
        assert_eq!(timeout.error.as_deref(), Some("Request timed out"));
        assert_eq!(timeout.message, "Failed to fetch location");

        let rejected: ApiResponse<()> = failure(
            &BridgeError::status("/submit/", 400, "num_girders must be positive"),
            "Design submission failed",
        );
        assert_eq!(rejected.error.as_deref(), Some("num_girders must be positive"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ApiConfig {
            base_url: "http://localhost:9/api/".to_string(),
            ..ApiConfig::default()
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:9/api");
        assert_eq!(client.url("/submit/"), "http://localhost:9/api/submit/");
    }
}
