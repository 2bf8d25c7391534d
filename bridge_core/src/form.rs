//! # Form Session
//!
//! The `FormSession` owns everything a user has entered for one bridge:
//!
//! ```text
//! FormSnapshot
//! ├── structure_type: StructureType
//! ├── location: ProjectLocation (mode, state/district ids, resolved record)
//! ├── geometry: GeometricDetails (span, width, footpath, skew, girder layout)
//! └── materials: MaterialSelection
//! ```
//!
//! Every update method returns the new snapshot as an `Arc<FormSnapshot>`;
//! snapshots handed out earlier are never changed underneath their holders.
//!
//! Remote work (location lookups, backend geometry checks) is described by
//! requests carrying a [`RequestToken`]. Each geometry edit and each location
//! selection bumps a generation counter, and answers are only applied when
//! their token still matches, so a slow response cannot overwrite a newer
//! edit.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::form::{FormSession, GeometricUpdate};
//! use bridge_core::geometry::GeometryField;
//!
//! let mut session = FormSession::new();
//! session.update_geometric_details(GeometricUpdate {
//!     carriageway_width: Some("7.5".into()),
//!     ..Default::default()
//! });
//!
//! session.edit_layout(GeometryField::GirderCount, "4");
//! let edit = session.edit_layout(GeometryField::Spacing, "2.5");
//!
//! assert_eq!(edit.snapshot.geometry.layout.overhang_m, Some(2.5));
//! assert!(edit.report.is_valid());
//! assert!(edit.pending.is_some());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ApiResponse, GeometryValidationRequest, GeometryValidationResponse};
use crate::custom_params::{validate_rows, AcceptedCustomParams, CustomParamErrors, CustomParamRow};
use crate::errors::BridgeResult;
use crate::geometry::{self, GeometryField, GeometryInputs, GeometryReport};
use crate::location::LocationRecord;
use crate::materials::{ConcreteGrade, MaterialSelection, SteelGrade};
use crate::resolver::{LocationSource, ResolvedLocation};
use crate::validation::{validate_carriageway_width, validate_skew_angle, validate_span, FieldValue};

// ============================================================================
// Snapshot Sections
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StructureType {
    #[default]
    Highway,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Footpath {
    #[serde(rename = "Single-sided")]
    SingleSided,
    Both,
    #[default]
    None,
}

/// How the project location is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMode {
    /// Picked from the state/district lists
    #[default]
    Location,
    /// Entered through the custom loading table
    Custom,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectLocation {
    pub mode: LocationMode,
    pub state_id: Option<String>,
    pub district_id: Option<String>,
    /// Environmental data for the selection, once known
    pub resolved: Option<ResolvedLocation>,
}

/// Spacing, overhang and girder count (entered in the geometry dialog)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GirderLayout {
    pub spacing_m: Option<f64>,
    pub overhang_m: Option<f64>,
    pub girder_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometricDetails {
    pub span: FieldValue,
    pub carriageway_width: FieldValue,
    pub footpath: Footpath,
    pub skew_angle: FieldValue,
    #[serde(default)]
    pub layout: GirderLayout,
}

impl GeometricDetails {
    /// Solver inputs for the current width and layout
    pub fn geometry_inputs(&self) -> GeometryInputs {
        GeometryInputs {
            carriageway_width_m: self.carriageway_width.as_number(),
            spacing_m: self.layout.spacing_m,
            overhang_m: self.layout.overhang_m,
            girder_count: self.layout.girder_count,
        }
    }
}

/// Everything entered so far
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub structure_type: StructureType,
    pub location: ProjectLocation,
    pub geometry: GeometricDetails,
    pub materials: MaterialSelection,
}

impl FormSnapshot {
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Partial Updates
// ============================================================================

/// Partial update of the geometric-details section; `None` leaves a field alone
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometricUpdate {
    pub span: Option<FieldValue>,
    pub carriageway_width: Option<FieldValue>,
    pub footpath: Option<Footpath>,
    pub skew_angle: Option<FieldValue>,
}

/// Partial update of the materials section
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialUpdate {
    pub girder_steel: Option<SteelGrade>,
    pub cross_bracing_steel: Option<SteelGrade>,
    pub deck_concrete: Option<ConcreteGrade>,
}

// ============================================================================
// Field Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Span,
    CarriagewayWidth,
    SkewAngle,
}

/// Inline error per field; empty when every field is valid
pub type FieldErrors = BTreeMap<FormField, String>;

/// Run the range validators over a geometric-details section
pub fn validate_geometric_details(details: &GeometricDetails) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let checks = [
        (FormField::Span, validate_span(&details.span)),
        (FormField::CarriagewayWidth, validate_carriageway_width(&details.carriageway_width)),
        (FormField::SkewAngle, validate_skew_angle(&details.skew_angle)),
    ];
    for (field, check) in checks {
        if !check.is_valid {
            errors.insert(field, check.message);
        }
    }
    errors
}

// ============================================================================
// Request Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Geometry,
    Location,
}

/// Identifies the edit a remote request was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestToken {
    pub kind: RequestKind,
    pub generation: u64,
}

/// A backend geometry check waiting to be sent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingGeometryCheck {
    pub token: RequestToken,
    pub request: GeometryValidationRequest,
}

/// A location lookup waiting to be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRequest {
    pub token: RequestToken,
    pub state_id: String,
    pub district_id: String,
}

/// Result of one girder-layout edit
#[derive(Debug, Clone)]
pub struct LayoutEdit {
    pub snapshot: Arc<FormSnapshot>,
    /// Member inferred from the edit, if any
    pub inferred: Option<GeometryField>,
    pub report: GeometryReport,
    /// Backend check to run (after debouncing) when the layout is complete
    pub pending: Option<PendingGeometryCheck>,
}

// ============================================================================
// Submission
// ============================================================================

/// Body of `POST /submit/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSubmission {
    pub session_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub structure_type: StructureType,
    pub location: Option<LocationRecord>,
    pub location_source: Option<LocationSource>,
    pub span: f64,
    pub carriageway_width: f64,
    pub overall_width: f64,
    pub footpath: Footpath,
    pub skew_angle: Option<f64>,
    pub girder_spacing: f64,
    pub num_girders: u32,
    pub deck_overhang_width: f64,
    pub materials: MaterialSelection,
}

/// Why a snapshot cannot be submitted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmissionErrors {
    pub fields: FieldErrors,
    pub geometry: Vec<String>,
    pub location: Option<String>,
}

impl SubmissionErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.geometry.is_empty() && self.location.is_none()
    }
}

impl std::fmt::Display for SubmissionErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self.fields.values().cloned().collect();
        parts.extend(self.geometry.iter().cloned());
        parts.extend(self.location.iter().cloned());
        write!(f, "{}", parts.join("; "))
    }
}

// ============================================================================
// Session
// ============================================================================

/// One user's form, from first input to submission
#[derive(Debug, Clone)]
pub struct FormSession {
    id: Uuid,
    snapshot: Arc<FormSnapshot>,
    field_errors: FieldErrors,
    geometry_report: Option<GeometryReport>,
    remote_geometry: Option<GeometryValidationResponse>,
    warning: Option<String>,
    backend_available: Option<bool>,
    geometry_generation: u64,
    location_generation: u64,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    pub fn new() -> Self {
        Self::with_snapshot(FormSnapshot::default())
    }

    /// Resume from a previously captured snapshot
    pub fn with_snapshot(snapshot: FormSnapshot) -> Self {
        let session = FormSession {
            id: Uuid::new_v4(),
            snapshot: Arc::new(snapshot),
            field_errors: FieldErrors::new(),
            geometry_report: None,
            remote_geometry: None,
            warning: None,
            backend_available: None,
            geometry_generation: 0,
            location_generation: 0,
        };
        tracing::debug!(session = %session.id, "form session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn snapshot(&self) -> Arc<FormSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Local report on the girder layout, once it has been checked
    pub fn geometry_report(&self) -> Option<&GeometryReport> {
        self.geometry_report.as_ref()
    }

    /// Latest backend verdict for the current layout
    pub fn remote_geometry(&self) -> Option<&GeometryValidationResponse> {
        self.remote_geometry.as_ref()
    }

    /// Non-fatal problem to show as a banner
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn clear_warning(&mut self) {
        self.warning = None;
    }

    /// Cached connectivity probe result; `None` before the first probe
    pub fn backend_available(&self) -> Option<bool> {
        self.backend_available
    }

    pub fn set_backend_available(&mut self, available: bool) {
        self.backend_available = Some(available);
    }

    /// Whether an answer for `token` would still be applied
    pub fn is_current(&self, token: RequestToken) -> bool {
        let generation = match token.kind {
            RequestKind::Geometry => self.geometry_generation,
            RequestKind::Location => self.location_generation,
        };
        token.generation == generation
    }

    fn next_token(&mut self, kind: RequestKind) -> RequestToken {
        let generation = match kind {
            RequestKind::Geometry => {
                self.geometry_generation += 1;
                self.geometry_generation
            }
            RequestKind::Location => {
                self.location_generation += 1;
                self.location_generation
            }
        };
        RequestToken { kind, generation }
    }

    fn snapshot_mut(&mut self) -> &mut FormSnapshot {
        Arc::make_mut(&mut self.snapshot)
    }

    // ------------------------------------------------------------------
    // Structure type and location
    // ------------------------------------------------------------------

    /// Anything but a highway bridge drops loaded location data
    pub fn set_structure_type(&mut self, structure_type: StructureType) -> Arc<FormSnapshot> {
        self.snapshot_mut().structure_type = structure_type;
        if structure_type != StructureType::Highway {
            self.clear_location_data();
        }
        self.snapshot()
    }

    /// Any mode change invalidates in-flight lookups. Switching back to
    /// list selection also clears the selection and any custom data.
    pub fn set_location_mode(&mut self, mode: LocationMode) -> Arc<FormSnapshot> {
        self.snapshot_mut().location.mode = mode;
        self.next_token(RequestKind::Location);
        if mode == LocationMode::Location {
            let location = &mut self.snapshot_mut().location;
            location.state_id = None;
            location.district_id = None;
            location.resolved = None;
            self.warning = None;
        }
        self.snapshot()
    }

    fn in_custom_mode(&self) -> bool {
        self.snapshot.location.mode == LocationMode::Custom
    }

    /// In custom mode the active custom record is kept
    pub fn select_state(&mut self, state_id: impl Into<String>) -> Arc<FormSnapshot> {
        let state_id: String = state_id.into();
        let keep_resolved = self.in_custom_mode();
        let location = &mut self.snapshot_mut().location;
        location.state_id = Some(state_id).filter(|s| !s.is_empty());
        location.district_id = None;
        if !keep_resolved {
            location.resolved = None;
            self.warning = None;
        }
        self.next_token(RequestKind::Location);
        self.snapshot()
    }

    /// Select a district. Returns the lookup to run, if the form is in
    /// list-selection mode for a highway bridge and a state is selected.
    /// In custom mode the active custom record is kept.
    pub fn select_district(&mut self, district_id: impl Into<String>) -> (Arc<FormSnapshot>, Option<LocationRequest>) {
        let district_id: String = district_id.into();
        let district_id = Some(district_id).filter(|d| !d.is_empty());
        let keep_resolved = self.in_custom_mode();
        let location = &mut self.snapshot_mut().location;
        location.district_id = district_id.clone();
        if !keep_resolved {
            location.resolved = None;
            self.warning = None;
        }
        let token = self.next_token(RequestKind::Location);

        let snapshot = self.snapshot();
        let request = match (&snapshot.location.state_id, district_id) {
            (Some(state_id), Some(district_id))
                if snapshot.structure_type == StructureType::Highway
                    && snapshot.location.mode == LocationMode::Location =>
            {
                Some(LocationRequest {
                    token,
                    state_id: state_id.clone(),
                    district_id,
                })
            }
            _ => None,
        };
        (snapshot, request)
    }

    /// Apply a resolved location. Returns false (and changes nothing) when
    /// the selection has moved on since the request was made.
    pub fn apply_location(&mut self, token: RequestToken, result: BridgeResult<ResolvedLocation>) -> bool {
        if !self.is_current(token) {
            tracing::debug!(session = %self.id, generation = token.generation, "discarding stale location answer");
            return false;
        }
        match result {
            Ok(resolved) => {
                self.warning = resolved
                    .warning
                    .as_ref()
                    .map(|w| format!("Backend lookup failed, using reference table: {}", w));
                self.snapshot_mut().location.resolved = Some(resolved);
            }
            Err(e) => {
                self.warning = Some(e.to_string());
                self.snapshot_mut().location.resolved = None;
            }
        }
        true
    }

    /// Validate a custom loading table and, if accepted, make its first
    /// complete row the active location data.
    pub fn accept_custom_parameters(&mut self, rows: &[CustomParamRow]) -> Result<AcceptedCustomParams, CustomParamErrors> {
        let accepted = validate_rows(rows)?;
        self.set_custom_location(accepted.active.clone());
        Ok(accepted)
    }

    /// Install a user-entered record, bypassing both lookup sources
    pub fn set_custom_location(&mut self, record: LocationRecord) -> Arc<FormSnapshot> {
        let location = &mut self.snapshot_mut().location;
        location.mode = LocationMode::Custom;
        location.resolved = Some(ResolvedLocation::custom(record));
        self.warning = None;
        self.next_token(RequestKind::Location);
        self.snapshot()
    }

    pub fn clear_location_data(&mut self) -> Arc<FormSnapshot> {
        self.snapshot_mut().location.resolved = None;
        self.next_token(RequestKind::Location);
        self.snapshot()
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Apply a partial update and re-run the range validators. A width
    /// change re-checks the girder layout without inferring anything.
    pub fn update_geometric_details(&mut self, update: GeometricUpdate) -> Arc<FormSnapshot> {
        let width_changed = update.carriageway_width.is_some();
        let details = &mut self.snapshot_mut().geometry;
        if let Some(span) = update.span {
            details.span = span;
        }
        if let Some(width) = update.carriageway_width {
            details.carriageway_width = width;
        }
        if let Some(footpath) = update.footpath {
            details.footpath = footpath;
        }
        if let Some(skew) = update.skew_angle {
            details.skew_angle = skew;
        }

        self.validate_geometric_details();

        if width_changed {
            self.next_token(RequestKind::Geometry);
            self.remote_geometry = None;
            let inputs = self.snapshot.geometry.geometry_inputs();
            self.geometry_report = Some(geometry::check(&inputs));
        }
        self.snapshot()
    }

    /// Re-run the range validators; true when all pass
    pub fn validate_geometric_details(&mut self) -> bool {
        self.field_errors = validate_geometric_details(&self.snapshot.geometry);
        self.field_errors.is_empty()
    }

    /// Edit one member of the girder layout.
    ///
    /// Blank input clears the member. Non-numeric input is ignored and the
    /// layout is left unchanged. Girder counts are truncated to whole
    /// numbers; negative counts are ignored.
    pub fn edit_layout(&mut self, field: GeometryField, value: impl Into<FieldValue>) -> LayoutEdit {
        let value = value.into();
        let parsed = value.as_number();

        if !value.is_empty() && parsed.is_none() {
            return self.layout_unchanged();
        }
        let count = match (field, parsed) {
            (GeometryField::GirderCount, Some(n)) if n < 0.0 || n.trunc() > f64::from(u32::MAX) => {
                return self.layout_unchanged();
            }
            (GeometryField::GirderCount, Some(n)) => Some(n.trunc() as u32),
            _ => None,
        };

        let mut inputs = self.snapshot.geometry.geometry_inputs();
        match field {
            GeometryField::Spacing => inputs.spacing_m = parsed,
            GeometryField::Overhang => inputs.overhang_m = parsed,
            GeometryField::GirderCount => inputs.girder_count = count,
        }

        let (inputs, inferred) = if parsed.is_some() {
            geometry::infer(&inputs, field)
        } else {
            (inputs, None)
        };
        let report = geometry::check(&inputs);

        self.snapshot_mut().geometry.layout = GirderLayout {
            spacing_m: inputs.spacing_m,
            overhang_m: inputs.overhang_m,
            girder_count: inputs.girder_count,
        };
        self.geometry_report = Some(report.clone());
        self.remote_geometry = None;
        let token = self.next_token(RequestKind::Geometry);

        LayoutEdit {
            snapshot: self.snapshot(),
            inferred,
            report,
            pending: GeometryValidationRequest::from_inputs(&inputs).map(|request| PendingGeometryCheck { token, request }),
        }
    }

    fn layout_unchanged(&self) -> LayoutEdit {
        let inputs = self.snapshot.geometry.geometry_inputs();
        LayoutEdit {
            snapshot: self.snapshot(),
            inferred: None,
            report: self.geometry_report.clone().unwrap_or_else(|| geometry::check(&inputs)),
            pending: None,
        }
    }

    /// Backend check for the current layout, if it is complete
    pub fn pending_geometry_check(&self) -> Option<PendingGeometryCheck> {
        let request = GeometryValidationRequest::from_inputs(&self.snapshot.geometry.geometry_inputs())?;
        Some(PendingGeometryCheck {
            token: RequestToken {
                kind: RequestKind::Geometry,
                generation: self.geometry_generation,
            },
            request,
        })
    }

    /// Accept the layout for saving: every member present and consistent
    pub fn commit_layout(&mut self) -> Result<GirderLayout, Vec<String>> {
        let report = geometry::check_complete(&self.snapshot.geometry.geometry_inputs());
        let valid = report.is_valid();
        let errors = report.errors.clone();
        self.geometry_report = Some(report);
        if valid {
            Ok(self.snapshot.geometry.layout)
        } else {
            Err(errors)
        }
    }

    /// Apply the backend's geometry verdict. Failures become a warning and
    /// never touch the local report. Returns false for a stale answer.
    pub fn apply_geometry_verdict(&mut self, token: RequestToken, response: ApiResponse<GeometryValidationResponse>) -> bool {
        if !self.is_current(token) {
            tracing::debug!(session = %self.id, generation = token.generation, "discarding stale geometry verdict");
            return false;
        }
        match response.into_result() {
            Ok(verdict) => {
                self.remote_geometry = Some(verdict);
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "backend geometry check failed");
                self.warning = Some(format!("Backend geometry check unavailable: {}", e));
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Materials and submission
    // ------------------------------------------------------------------

    pub fn update_materials(&mut self, update: MaterialUpdate) -> Arc<FormSnapshot> {
        let materials = &mut self.snapshot_mut().materials;
        if let Some(grade) = update.girder_steel {
            materials.girder_steel = grade;
        }
        if let Some(grade) = update.cross_bracing_steel {
            materials.cross_bracing_steel = grade;
        }
        if let Some(grade) = update.deck_concrete {
            materials.deck_concrete = grade;
        }
        self.snapshot()
    }

    /// Validate everything and build the submission payload
    pub fn prepare_submission(&self) -> Result<DesignSubmission, SubmissionErrors> {
        let snapshot = &self.snapshot;
        let details = &snapshot.geometry;
        let inputs = details.geometry_inputs();

        let mut errors = SubmissionErrors {
            fields: validate_geometric_details(details),
            geometry: geometry::check_complete(&inputs).errors,
            location: None,
        };
        let resolved = snapshot.location.resolved.as_ref();
        if snapshot.structure_type == StructureType::Highway && resolved.is_none() {
            errors.location = Some("Project location is required".to_string());
        }

        let fields = (
            details.span.as_number(),
            inputs.carriageway_width_m,
            inputs.overall_width_m(),
            GeometryValidationRequest::from_inputs(&inputs),
        );
        match fields {
            (Some(span), Some(width), Some(overall), Some(layout)) if errors.is_empty() => Ok(DesignSubmission {
                session_id: self.id,
                submitted_at: Utc::now(),
                structure_type: snapshot.structure_type,
                location: resolved.map(|r| r.record.clone()),
                location_source: resolved.map(|r| r.source),
                span,
                carriageway_width: width,
                overall_width: overall,
                footpath: details.footpath,
                skew_angle: details.skew_angle.as_number(),
                girder_spacing: layout.girder_spacing,
                num_girders: layout.num_girders,
                deck_overhang_width: layout.deck_overhang_width,
                materials: snapshot.materials,
            }),
            _ => Err(errors),
        }
    }
}
