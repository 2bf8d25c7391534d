//! # Backend Sync
//!
//! Async glue between a [`FormSession`] and a [`BridgeBackend`]. The session
//! itself never awaits anything: it hands out requests tagged with a
//! [`RequestToken`], and the helpers here run those requests and give the
//! answers back for the session to apply (or discard, if stale).
//!
//! Remote failures never become errors here. They are logged and either
//! surface as session warnings or fall back to local data.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{ApiResponse, BridgeBackend, ConnectionStatus, GeometryValidationResponse, SubmitResponse};
use crate::config::{BridgeConfig, FormConfig};
use crate::custom_params::{AcceptedCustomParams, CustomParamPayload};
use crate::debounce::{DebounceTicket, Debouncer};
use crate::errors::BridgeResult;
use crate::form::{FormSession, LayoutEdit, LocationRequest, PendingGeometryCheck, RequestToken, SubmissionErrors};
use crate::location::LocationTable;
use crate::materials::MaterialOptions;
use crate::resolver::{LocationResolver, ResolvedLocation};

/// Probe the backend and cache the result on the session
pub async fn probe_backend<B: BridgeBackend>(session: &mut FormSession, backend: &B) -> ConnectionStatus {
    let status = backend.check_connection().await;
    session.set_backend_available(status.connected);
    status
}

/// The backend to use for a session, or `None` if the cached probe says
/// it is unreachable. An unprobed backend is tried.
pub fn usable_backend<'a, B>(session: &FormSession, backend: Option<&'a B>) -> Option<&'a B> {
    match session.backend_available() {
        Some(false) => None,
        _ => backend,
    }
}

/// Run a location lookup; the answer is for [`FormSession::apply_location`]
pub async fn lookup_location<B: BridgeBackend>(
    table: &LocationTable,
    backend: Option<&B>,
    request: &LocationRequest,
) -> (RequestToken, BridgeResult<ResolvedLocation>) {
    let resolver = LocationResolver::new(table, backend);
    let result = resolver.resolve(&request.state_id, &request.district_id).await;
    (request.token, result)
}

/// Select a district and resolve it in one step
pub async fn select_district<B: BridgeBackend>(
    session: &mut FormSession,
    table: &LocationTable,
    backend: Option<&B>,
    district_id: &str,
) -> Option<ResolvedLocation> {
    let (_, request) = session.select_district(district_id);
    let request = request?;
    let backend = usable_backend(session, backend);
    let (token, result) = lookup_location(table, backend, &request).await;
    session.apply_location(token, result);
    session.snapshot().location.resolved.clone()
}

/// Wait out the debounce quiet period, then ask the backend to check the
/// layout. `None` when a later edit superseded this one.
pub async fn cross_check_geometry<B: BridgeBackend>(
    backend: &B,
    pending: PendingGeometryCheck,
    ticket: DebounceTicket,
) -> Option<(RequestToken, ApiResponse<GeometryValidationResponse>)> {
    if !ticket.settled().await {
        tracing::trace!(generation = pending.token.generation, "geometry check superseded before sending");
        return None;
    }
    let response = backend.validate_geometry(&pending.request).await;
    Some((pending.token, response))
}

/// Debounced backend geometry checks for one form.
///
/// Every layout edit goes through [`GeometryAutoCheck::schedule`]. Only the
/// last edit of a burst reaches the backend, once the form's quiet period
/// has passed. An edit that leaves the layout incomplete cancels whatever
/// check is still waiting.
#[derive(Debug, Clone)]
pub struct GeometryAutoCheck {
    debouncer: Debouncer,
}

/// A geometry check waiting out its quiet period
#[derive(Debug)]
pub struct ScheduledGeometryCheck {
    pending: PendingGeometryCheck,
    ticket: DebounceTicket,
}

impl GeometryAutoCheck {
    pub fn new(config: &FormConfig) -> Self {
        GeometryAutoCheck {
            debouncer: Debouncer::new(config.debounce()),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.form)
    }

    pub fn delay(&self) -> Duration {
        self.debouncer.delay()
    }

    /// Queue the backend check for a layout edit
    pub fn schedule(&self, edit: &LayoutEdit) -> Option<ScheduledGeometryCheck> {
        match edit.pending {
            Some(pending) => Some(self.schedule_pending(pending)),
            None => {
                self.debouncer.cancel();
                None
            }
        }
    }

    pub fn schedule_pending(&self, pending: PendingGeometryCheck) -> ScheduledGeometryCheck {
        ScheduledGeometryCheck {
            pending,
            ticket: self.debouncer.schedule(),
        }
    }

    /// Schedule, wait, send and apply the verdict to the session.
    /// Returns whether a verdict was applied.
    pub async fn check_edit<B: BridgeBackend>(&self, session: &mut FormSession, backend: &B, edit: &LayoutEdit) -> bool {
        let Some(scheduled) = self.schedule(edit) else {
            return false;
        };
        match scheduled.run(backend).await {
            Some((token, response)) => session.apply_geometry_verdict(token, response),
            None => false,
        }
    }
}

impl ScheduledGeometryCheck {
    pub fn token(&self) -> RequestToken {
        self.pending.token
    }

    /// Wait for the quiet period and send, unless superseded meanwhile
    pub async fn run<B: BridgeBackend>(self, backend: &B) -> Option<(RequestToken, ApiResponse<GeometryValidationResponse>)> {
        cross_check_geometry(backend, self.pending, self.ticket).await
    }
}

/// Persist accepted custom rows. Best-effort: a failure is logged and
/// the rows stay active locally.
pub async fn persist_custom_rows<B: BridgeBackend>(
    backend: &B,
    accepted: &AcceptedCustomParams,
) -> ApiResponse<Vec<CustomParamPayload>> {
    let response = backend.save_custom_parameters(&accepted.rows).await;
    if response.success {
        tracing::info!(rows = accepted.rows.len(), message = %response.message, "custom parameters saved");
    } else {
        tracing::warn!(
            rows = accepted.rows.len(),
            error = response.error.as_deref().unwrap_or("unknown"),
            "failed to save custom parameters"
        );
    }
    response
}

/// Where a material option list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsSource {
    Remote,
    Builtin,
}

impl std::fmt::Display for OptionsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsSource::Remote => write!(f, "backend"),
            OptionsSource::Builtin => write!(f, "built-in catalog"),
        }
    }
}

/// Material options from the backend, else the built-in catalog
pub async fn load_material_options<B: BridgeBackend>(backend: Option<&B>) -> (MaterialOptions, OptionsSource) {
    let Some(backend) = backend else {
        return (MaterialOptions::builtin(), OptionsSource::Builtin);
    };
    match backend.material_options().await.into_result() {
        Ok(options) if !options.steel_options.is_empty() && !options.concrete_options.is_empty() => {
            (options, OptionsSource::Remote)
        }
        Ok(_) => {
            tracing::warn!("backend returned an empty material catalog, using built-in");
            (MaterialOptions::builtin(), OptionsSource::Builtin)
        }
        Err(e) => {
            tracing::warn!(error = %e, "material options unavailable, using built-in");
            (MaterialOptions::builtin(), OptionsSource::Builtin)
        }
    }
}

/// Validate the session and send it. Local validation failures are
/// returned as `Err` and nothing is sent; backend failures come back as an
/// unsuccessful response.
pub async fn submit<B: BridgeBackend>(
    session: &FormSession,
    backend: &B,
) -> Result<ApiResponse<SubmitResponse>, SubmissionErrors> {
    let submission = session.prepare_submission()?;
    let response = backend.submit_design(&submission).await;
    if response.success {
        tracing::info!(session = %session.id(), "design submitted");
    } else {
        tracing::warn!(
            session = %session.id(),
            error = response.error.as_deref().unwrap_or("unknown"),
            "design submission failed"
        );
    }
    Ok(response)
}
