//! # bridge_core - Preliminary Bridge Input Engine
//!
//! `bridge_core` holds the logic behind the Bridgeform design-parameter form:
//! range checks on the primary inputs, the girder-layout consistency solver,
//! location lookup with a static fallback, custom loading parameters and a
//! best-effort client for the validation backend. Every type is
//! JSON-serializable so a form can be captured, restored and submitted as-is.
//!
//! ## Design Philosophy
//!
//! - **Local first**: validation and geometry checks run synchronously and
//!   never need the backend
//! - **Best-effort remote**: backend failures degrade to warnings or local
//!   data, never to errors
//! - **Latest edit wins**: remote answers are tagged and stale ones dropped
//!
//! ## Quick Start
//!
//! ```rust
//! use bridge_core::geometry::{solve, GeometryField, GeometryInputs};
//!
//! let inputs = GeometryInputs {
//!     carriageway_width_m: Some(7.5),
//!     spacing_m: Some(2.5),
//!     girder_count: Some(4),
//!     ..Default::default()
//! };
//!
//! let solution = solve(&inputs, GeometryField::Spacing);
//! assert_eq!(solution.inputs.overhang_m, Some(2.5));
//! assert!(solution.report.is_valid());
//! ```
//!
//! ## Modules
//!
//! - [`validation`] - Span, carriageway width and skew angle range checks
//! - [`geometry`] - Girder layout inference and consistency checks
//! - [`location`] - Seismic zones, location records and the reference table
//! - [`resolver`] - Backend-then-table location lookup
//! - [`custom_params`] - User-entered loading parameter tables
//! - [`materials`] - Steel and concrete grade catalog
//! - [`form`] - Form session, snapshots and submission payloads
//! - [`client`] - HTTP client for the validation backend
//! - [`sync`] - Async glue between a form session and the backend
//! - [`debounce`] - Trailing debounce for edit-driven checks
//! - [`config`] - TOML configuration
//! - [`errors`] - Structured error types

pub mod client;
pub mod config;
pub mod custom_params;
pub mod debounce;
pub mod errors;
pub mod form;
pub mod geometry;
pub mod location;
pub mod materials;
pub mod resolver;
pub mod sync;
pub mod validation;

// Re-export commonly used types at crate root for convenience
pub use client::{ApiResponse, BackendClient, BridgeBackend};
pub use config::BridgeConfig;
pub use errors::{BridgeError, BridgeResult};
pub use form::{FormSession, FormSnapshot};
pub use location::{LocationRecord, LocationTable, SeismicZone};
