//! # Geometry Consistency Solver
//!
//! Relates the four cross-section variables of a girder deck:
//!
//! ```text
//! overall_width = carriageway_width + 5
//! num_girders   = (overall_width - overhang) / spacing
//! ```
//!
//! When the user edits one of spacing, overhang or girder count, the solver
//! infers at most one other member from the edited one, then reports every
//! violated constraint. Inference and checking are separate steps so a
//! caller can check without inferring (e.g. when only the carriageway width
//! changed).
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::geometry::{solve, GeometryField, GeometryInputs};
//!
//! let inputs = GeometryInputs {
//!     carriageway_width_m: Some(7.5),
//!     spacing_m: Some(2.5),
//!     overhang_m: None,
//!     girder_count: Some(4),
//! };
//!
//! let solution = solve(&inputs, GeometryField::Spacing);
//! assert_eq!(solution.inputs.overhang_m, Some(2.5));
//! assert!(solution.report.is_valid());
//! ```

use serde::{Deserialize, Serialize};

/// Parapet/kerb allowance added to the carriageway width (m)
pub const EDGE_ALLOWANCE_M: f64 = 5.0;

/// Absolute tolerance for the girder-count identity
pub const GIRDER_COUNT_TOLERANCE: f64 = 0.01;

/// Overall deck width for a carriageway width
pub fn overall_width(carriageway_width_m: f64) -> f64 {
    carriageway_width_m + EDGE_ALLOWANCE_M
}

/// The three members of the girder layout a user can edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryField {
    Spacing,
    Overhang,
    GirderCount,
}

impl GeometryField {
    pub fn display_name(&self) -> &'static str {
        match self {
            GeometryField::Spacing => "Girder Spacing",
            GeometryField::Overhang => "Deck Overhang Width",
            GeometryField::GirderCount => "No. of Girders",
        }
    }

    /// Parse from common spellings ("spacing", "num_girders", "overhang", ...)
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "spacing" | "girder_spacing" => Some(GeometryField::Spacing),
            "overhang" | "deck_overhang" | "deck_overhang_width" => Some(GeometryField::Overhang),
            "girder_count" | "girders" | "num_girders" | "numgirders" => Some(GeometryField::GirderCount),
            _ => None,
        }
    }
}

impl std::fmt::Display for GeometryField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Partially specified deck geometry. All widths in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometryInputs {
    pub carriageway_width_m: Option<f64>,
    pub spacing_m: Option<f64>,
    pub overhang_m: Option<f64>,
    pub girder_count: Option<u32>,
}

impl GeometryInputs {
    pub fn overall_width_m(&self) -> Option<f64> {
        self.carriageway_width_m.map(overall_width)
    }

    /// True when spacing, overhang and girder count are all present
    pub fn is_complete(&self) -> bool {
        self.spacing_m.is_some() && self.overhang_m.is_some() && self.girder_count.is_some()
    }
}

/// Errors found in a geometry, in check order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryReport {
    pub errors: Vec<String>,
    /// `None` when the carriageway width is missing
    pub overall_width_m: Option<f64>,
}

impl GeometryReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Inputs after inference, plus the report on them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySolution {
    pub inputs: GeometryInputs,
    /// Which member was inferred from the edit, if any
    pub inferred: Option<GeometryField>,
    pub report: GeometryReport,
}

/// Infer one missing member from the field the user just changed.
///
/// Rules are tried in order and the first applicable one fires:
///
/// 1. spacing or girder count changed, both known → overhang
/// 2. overhang or girder count changed, both known → spacing
/// 3. spacing or overhang changed, both known → girder count
///
/// Returns the updated inputs and the inferred field. Nothing is inferred
/// without a carriageway width, or when the division would be by zero.
pub fn infer(inputs: &GeometryInputs, changed: GeometryField) -> (GeometryInputs, Option<GeometryField>) {
    let mut out = *inputs;
    let Some(overall) = inputs.overall_width_m() else {
        return (out, None);
    };

    use GeometryField::*;

    if matches!(changed, Spacing | GirderCount) {
        if let (Some(s), Some(n)) = (inputs.spacing_m, inputs.girder_count) {
            out.overhang_m = Some(overall - s * f64::from(n));
            return (out, Some(Overhang));
        }
    }

    if matches!(changed, Overhang | GirderCount) {
        if let (Some(o), Some(n)) = (inputs.overhang_m, inputs.girder_count) {
            if n > 0 {
                out.spacing_m = Some((overall - o) / f64::from(n));
                return (out, Some(Spacing));
            }
        }
    }

    if matches!(changed, Spacing | Overhang) {
        if let (Some(s), Some(o)) = (inputs.spacing_m, inputs.overhang_m) {
            if s != 0.0 {
                let count = ((overall - o) / s).round();
                if count.is_finite() && count >= 0.0 && count <= f64::from(u32::MAX) {
                    out.girder_count = Some(count as u32);
                    return (out, Some(GirderCount));
                }
            }
        }
    }

    (out, None)
}

/// Check the constraints on whatever members are present.
///
/// Missing spacing, overhang or girder count are not errors here; see
/// [`check_complete`] for the commit-time variant.
pub fn check(inputs: &GeometryInputs) -> GeometryReport {
    let Some(overall) = inputs.overall_width_m() else {
        return GeometryReport {
            errors: vec!["Carriageway Width is required to validate geometry".to_string()],
            overall_width_m: None,
        };
    };

    let mut errors = Vec::new();

    if let Some(s) = inputs.spacing_m {
        if s <= 0.0 {
            errors.push(format!("Girder Spacing ({}) must be > 0", s));
        }
        if s >= overall {
            errors.push(format!(
                "Girder Spacing ({}) must be < Overall Width ({:.2})",
                s, overall
            ));
        }
    }

    if let Some(o) = inputs.overhang_m {
        if o < 0.0 {
            errors.push(format!("Deck Overhang ({}) must be ≥ 0", o));
        }
        if o >= overall {
            errors.push(format!(
                "Deck Overhang ({}) must be < Overall Width ({:.2})",
                o, overall
            ));
        }
    }

    if let Some(0) = inputs.girder_count {
        errors.push("No. of Girders (0) must be ≥ 1".to_string());
    }

    if let (Some(s), Some(o), Some(n)) = (inputs.spacing_m, inputs.overhang_m, inputs.girder_count) {
        if s > 0.0 {
            let expected = (overall - o) / s;
            if (expected - f64::from(n)).abs() > GIRDER_COUNT_TOLERANCE {
                errors.push(format!(
                    "Geometry mismatch: (Overall Width - Overhang) / Spacing should equal No. of Girders. \
                     Expected: {:.2}, Got: {}",
                    expected, n
                ));
            }
        }
    }

    GeometryReport {
        errors,
        overall_width_m: Some(overall),
    }
}

/// Like [`check`], but every member must be present.
pub fn check_complete(inputs: &GeometryInputs) -> GeometryReport {
    let mut report = check(inputs);
    if report.overall_width_m.is_none() {
        return report;
    }

    let mut missing = Vec::new();
    if inputs.spacing_m.is_none() {
        missing.push("Girder Spacing is required".to_string());
    }
    if inputs.overhang_m.is_none() {
        missing.push("Deck Overhang Width is required".to_string());
    }
    if inputs.girder_count.is_none() {
        missing.push("No. of Girders is required".to_string());
    }
    missing.append(&mut report.errors);
    report.errors = missing;
    report
}

/// Infer from the changed field, then check the result.
pub fn solve(inputs: &GeometryInputs, changed: GeometryField) -> GeometrySolution {
    let (inputs, inferred) = infer(inputs, changed);
    let report = check(&inputs);
    GeometrySolution {
        inputs,
        inferred,
        report,
    }
}
