//! # Error Types
//!
//! Structured error types for bridge_core. Local validation problems are
//! never reported through this type (validators return structured results);
//! `BridgeError` covers the things that can actually fail: parsing option
//! names, loading reference data and configuration, and talking to the
//! backend.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::errors::{BridgeError, BridgeResult};
//!
//! fn parse_count(raw: &str) -> BridgeResult<u32> {
//!     raw.trim()
//!         .parse()
//!         .map_err(|_| BridgeError::invalid_input("num_girders", raw, "Must be a whole number"))
//! }
//!
//! assert!(parse_count("four").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bridge_core operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Structured error type for bridge_core operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum BridgeError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A named option (material grade, seismic zone, ...) is not recognized
    #[error("Unknown {kind}: {value}")]
    UnknownOption { kind: String, value: String },

    /// No location data for the given state/district
    #[error("Location not found: {district}, {state}")]
    LocationNotFound { state: String, district: String },

    /// Request never produced a response (connect error, timeout, ...)
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// Backend answered with a non-success status
    #[error("{endpoint} returned HTTP {status}: {detail}")]
    Status {
        endpoint: String,
        status: u16,
        detail: String,
    },

    /// Configuration or reference data could not be loaded
    #[error("Config error in '{path}': {reason}")]
    Config { path: String, reason: String },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl BridgeError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        BridgeError::MissingField { field: field.into() }
    }

    /// Create an UnknownOption error
    pub fn unknown_option(kind: impl Into<String>, value: impl Into<String>) -> Self {
        BridgeError::UnknownOption {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Create a LocationNotFound error
    pub fn location_not_found(state: impl Into<String>, district: impl Into<String>) -> Self {
        BridgeError::LocationNotFound {
            state: state.into(),
            district: district.into(),
        }
    }

    /// Create a Transport error
    pub fn transport(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Transport {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Create a Status error
    pub fn status(endpoint: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        BridgeError::Status {
            endpoint: endpoint.into(),
            status,
            detail: detail.into(),
        }
    }

    /// Create a Config error
    pub fn config(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        BridgeError::SerializationError { reason: reason.into() }
    }

    /// HTTP status code, if the backend answered at all
    pub fn http_status(&self) -> Option<u16> {
        match self {
            BridgeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this is a recoverable error (a retry may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            BridgeError::Transport { .. } => true,
            BridgeError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            BridgeError::InvalidInput { .. } => "INVALID_INPUT",
            BridgeError::MissingField { .. } => "MISSING_FIELD",
            BridgeError::UnknownOption { .. } => "UNKNOWN_OPTION",
            BridgeError::LocationNotFound { .. } => "LOCATION_NOT_FOUND",
            BridgeError::Transport { .. } => "TRANSPORT_ERROR",
            BridgeError::Status { .. } => "HTTP_STATUS",
            BridgeError::Config { .. } => "CONFIG_ERROR",
            BridgeError::SerializationError { .. } => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = BridgeError::status("/geometry/validate/", 500, "Internal Server Error");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"Status\""));
        let roundtrip: BridgeError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BridgeError::missing_field("span").error_code(), "MISSING_FIELD");
        assert_eq!(BridgeError::unknown_option("steel grade", "E999").error_code(), "UNKNOWN_OPTION");
        assert_eq!(BridgeError::location_not_found("Goa", "Nowhere").error_code(), "LOCATION_NOT_FOUND");
    }

    #[test]
    fn test_recoverable() {
        assert!(BridgeError::transport("/locations/", "timed out").is_recoverable());
        assert!(BridgeError::status("/submit/", 503, "busy").is_recoverable());
        assert!(!BridgeError::status("/submit/", 400, "bad").is_recoverable());
        assert!(!BridgeError::config("bridgeform.toml", "bad").is_recoverable());
    }

    #[test]
    fn test_display_includes_context() {
        let e = BridgeError::location_not_found("Goa", "Margao");
        assert_eq!(e.to_string(), "Location not found: Margao, Goa");
        assert_eq!(BridgeError::status("/x/", 404, "Not Found").http_status(), Some(404));
    }
}
