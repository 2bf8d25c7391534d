//! # Location Resolver
//!
//! Turns a (state id, district id) selection into a [`LocationRecord`] by
//! trying sources in order:
//!
//! 1. the backend, queried with the display names from the static table
//! 2. the static table, by district id
//!
//! The first source that answers wins outright; results are never merged.
//! The answer is tagged with its [`LocationSource`], and a failed remote
//! attempt is kept as a warning so the caller can show it.

use serde::{Deserialize, Serialize};

use crate::client::BridgeBackend;
use crate::errors::{BridgeError, BridgeResult};
use crate::location::{LocationRecord, LocationTable};

/// Where a location record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Remote,
    StaticTable,
    Custom,
}

impl std::fmt::Display for LocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LocationSource::Remote => "backend",
            LocationSource::StaticTable => "static table",
            LocationSource::Custom => "custom parameters",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub record: LocationRecord,
    pub source: LocationSource,
    /// Why the backend was not used, when it was tried and failed
    pub warning: Option<String>,
}

impl ResolvedLocation {
    /// Wrap a user-entered record
    pub fn custom(record: LocationRecord) -> Self {
        ResolvedLocation {
            record,
            source: LocationSource::Custom,
            warning: None,
        }
    }
}

/// Ordered backend → static table lookup
pub struct LocationResolver<'a, B> {
    table: &'a LocationTable,
    backend: Option<&'a B>,
}

impl<'a, B: BridgeBackend> LocationResolver<'a, B> {
    /// `backend` is `None` when the backend is known to be unreachable
    pub fn new(table: &'a LocationTable, backend: Option<&'a B>) -> Self {
        LocationResolver { table, backend }
    }

    pub fn table(&self) -> &LocationTable {
        self.table
    }

    pub async fn resolve(&self, state_id: &str, district_id: &str) -> BridgeResult<ResolvedLocation> {
        if state_id.trim().is_empty() {
            return Err(BridgeError::missing_field("state"));
        }
        if district_id.trim().is_empty() {
            return Err(BridgeError::missing_field("district"));
        }
        let mut warning = None;

        if let Some(backend) = self.backend {
            let names = self.table.state(state_id).and_then(|state| {
                state
                    .districts
                    .iter()
                    .find(|d| d.id == district_id)
                    .map(|district| (state.name.as_str(), district.name.as_str()))
            });

            match names {
                Some((state_name, district_name)) => {
                    match backend.location_by_name(state_name, district_name).await.into_result() {
                        Ok(record) => {
                            tracing::debug!(state = state_name, district = district_name, "location from backend");
                            return Ok(ResolvedLocation {
                                record,
                                source: LocationSource::Remote,
                                warning: None,
                            });
                        }
                        Err(e) => {
                            tracing::warn!(
                                state = state_name,
                                district = district_name,
                                error = %e,
                                "backend location lookup failed, using static table"
                            );
                            warning = Some(e);
                        }
                    }
                }
                None => {
                    tracing::debug!(state_id, district_id, "selection not in table, skipping backend");
                }
            }
        }

        match self.table.record(district_id) {
            Some(record) => Ok(ResolvedLocation {
                record,
                source: LocationSource::StaticTable,
                warning,
            }),
            None => Err(BridgeError::location_not_found(state_id, district_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::Mutex;

    use super::*;
    use crate::client::{ApiResponse, ConnectionStatus, GeometryValidationRequest, GeometryValidationResponse, SubmitResponse};
    use crate::custom_params::CustomParamPayload;
    use crate::form::DesignSubmission;
    use crate::location::SeismicZone;
    use crate::materials::MaterialOptions;

    /// Backend stub answering location lookups from a canned reply
    struct StubBackend {
        reply: Option<LocationRecord>,
        queries: Mutex<Vec<(String, String)>>,
    }

    impl StubBackend {
        fn answering(reply: Option<LocationRecord>) -> Self {
            StubBackend {
                reply,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl BridgeBackend for StubBackend {
        fn check_connection(&self) -> impl Future<Output = ConnectionStatus> + Send {
            async {
                ConnectionStatus {
                    connected: true,
                    message: "Backend connected".to_string(),
                    error: None,
                }
            }
        }

        fn location_by_name(&self, state: &str, district: &str) -> impl Future<Output = ApiResponse<LocationRecord>> + Send {
            if let Ok(mut q) = self.queries.lock() {
                q.push((state.to_string(), district.to_string()));
            }
            let reply = self.reply.clone();
            async move {
                match reply {
                    Some(record) => ApiResponse::ok(record, "Location fetched successfully"),
                    None => ApiResponse::failed("Request timed out", "Failed to fetch location"),
                }
            }
        }

        fn validate_geometry(
            &self,
            _request: &GeometryValidationRequest,
        ) -> impl Future<Output = ApiResponse<GeometryValidationResponse>> + Send {
            async { ApiResponse::failed("unused", "unused") }
        }

        fn material_options(&self) -> impl Future<Output = ApiResponse<MaterialOptions>> + Send {
            async { ApiResponse::failed("unused", "unused") }
        }

        fn submit_design(&self, _submission: &DesignSubmission) -> impl Future<Output = ApiResponse<SubmitResponse>> + Send {
            async { ApiResponse::failed("unused", "unused") }
        }

        fn save_custom_parameters(
            &self,
            _rows: &[CustomParamPayload],
        ) -> impl Future<Output = ApiResponse<Vec<CustomParamPayload>>> + Send {
            async { ApiResponse::failed("unused", "unused") }
        }
    }

    fn remote_mumbai() -> LocationRecord {
        LocationRecord {
            wind_speed_mps: 44.0,
            seismic_zone: SeismicZone::III,
            seismic_factor: 0.16,
            min_temp_c: 20.0,
            max_temp_c: 35.0,
            state_name: "Maharashtra".to_string(),
            district_name: "Mumbai".to_string(),
        }
    }

    #[tokio::test]
    async fn test_remote_answer_is_authoritative() {
        let table = LocationTable::builtin().unwrap();
        let backend = StubBackend::answering(Some(remote_mumbai()));
        let resolver = LocationResolver::new(table, Some(&backend));

        let resolved = resolver.resolve("maharashtra", "mumbai").await.unwrap();
        assert_eq!(resolved.source, LocationSource::Remote);
        // remote wind speed, not the table's 39
        assert_eq!(resolved.record.wind_speed_mps, 44.0);
        assert!(resolved.warning.is_none());

        let queries = backend.queries.lock().unwrap();
        assert_eq!(queries.as_slice(), &[("Maharashtra".to_string(), "Mumbai".to_string())]);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_table() {
        let table = LocationTable::builtin().unwrap();
        let backend = StubBackend::answering(None);
        let resolver = LocationResolver::new(table, Some(&backend));

        let resolved = resolver.resolve("maharashtra", "mumbai").await.unwrap();
        assert_eq!(resolved.source, LocationSource::StaticTable);
        assert_eq!(resolved.record.wind_speed_mps, 39.0);
        assert_eq!(resolved.warning.as_deref(), Some("Request timed out"));
    }

    #[tokio::test]
    async fn test_offline_uses_table_only() {
        let table = LocationTable::builtin().unwrap();
        let resolver: LocationResolver<'_, StubBackend> = LocationResolver::new(table, None);

        let resolved = resolver.resolve("assam", "guwahati").await.unwrap();
        assert_eq!(resolved.source, LocationSource::StaticTable);
        assert_eq!(resolved.record.seismic_zone, SeismicZone::V);
        assert!(resolved.warning.is_none());
    }

    #[tokio::test]
    async fn test_unknown_district() {
        let table = LocationTable::builtin().unwrap();
        let backend = StubBackend::answering(Some(remote_mumbai()));
        let resolver = LocationResolver::new(table, Some(&backend));

        let err = resolver.resolve("goa", "margao").await.unwrap_err();
        assert_eq!(err.error_code(), "LOCATION_NOT_FOUND");
        // names unknown, so the backend is never asked
        assert!(backend.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_selection_is_missing_field() {
        let table = LocationTable::builtin().unwrap();
        let backend = StubBackend::answering(Some(remote_mumbai()));
        let resolver = LocationResolver::new(table, Some(&backend));

        let err = resolver.resolve("maharashtra", "").await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_FIELD");
        assert_eq!(err, BridgeError::missing_field("district"));
        let err = resolver.resolve(" ", "mumbai").await.unwrap_err();
        assert_eq!(err, BridgeError::missing_field("state"));
        assert!(backend.queries.lock().unwrap().is_empty());
    }
}
