//! # Custom Loading Parameters
//!
//! Spreadsheet-style entry of site parameters when the project location is
//! not in the reference table. Cells hold raw text; [`validate_rows`] checks
//! every non-empty row and, if the table is acceptable, promotes the first
//! complete row to the active [`LocationRecord`].
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::custom_params::{validate_rows, CustomParamRow};
//!
//! let rows = vec![CustomParamRow::from_cells(1, ["47", "IV", "0.24", "5", "45"])];
//! let accepted = validate_rows(&rows).unwrap();
//! assert_eq!(accepted.active.wind_speed_mps, 47.0);
//! assert_eq!(accepted.active.district_name, "Custom");
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::location::{LocationRecord, SeismicZone};

/// State/district name carried by a user-entered record
pub const CUSTOM_LOCATION_NAME: &str = "Custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomParamField {
    WindSpeed,
    SeismicZone,
    SeismicFactor,
    MinTemp,
    MaxTemp,
}

impl CustomParamField {
    pub fn display_name(&self) -> &'static str {
        match self {
            CustomParamField::WindSpeed => "Wind Speed",
            CustomParamField::SeismicZone => "Seismic Zone",
            CustomParamField::SeismicFactor => "Seismic Factor",
            CustomParamField::MinTemp => "Min Temp",
            CustomParamField::MaxTemp => "Max Temp",
        }
    }
}

/// One row of the entry table. Cells are raw text as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomParamRow {
    pub id: u32,
    pub wind_speed: String,
    pub seismic_zone: String,
    pub seismic_factor: String,
    pub min_temp: String,
    pub max_temp: String,
}

impl CustomParamRow {
    /// Blank row
    pub fn new(id: u32) -> Self {
        CustomParamRow {
            id,
            ..Default::default()
        }
    }

    /// Row from cells in column order: wind speed, zone, factor, min, max
    pub fn from_cells(id: u32, cells: [&str; 5]) -> Self {
        let [wind_speed, seismic_zone, seismic_factor, min_temp, max_temp] = cells;
        CustomParamRow {
            id,
            wind_speed: wind_speed.to_string(),
            seismic_zone: seismic_zone.to_string(),
            seismic_factor: seismic_factor.to_string(),
            min_temp: min_temp.to_string(),
            max_temp: max_temp.to_string(),
        }
    }

    /// Parse a comma-separated row, e.g. `"47,IV,0.24,5,45"`.
    /// Missing trailing cells are left blank.
    pub fn parse_csv(id: u32, line: &str) -> BridgeResult<Self> {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() > 5 {
            return Err(BridgeError::invalid_input(
                "custom row",
                line,
                "Expected at most 5 comma-separated cells: wind,zone,factor,min,max",
            ));
        }
        let cell = |i: usize| cells.get(i).copied().unwrap_or("");
        Ok(Self::from_cells(id, [cell(0), cell(1), cell(2), cell(3), cell(4)]))
    }

    fn cell(&self, field: CustomParamField) -> &str {
        match field {
            CustomParamField::WindSpeed => &self.wind_speed,
            CustomParamField::SeismicZone => &self.seismic_zone,
            CustomParamField::SeismicFactor => &self.seismic_factor,
            CustomParamField::MinTemp => &self.min_temp,
            CustomParamField::MaxTemp => &self.max_temp,
        }
    }

    fn number(&self, field: CustomParamField) -> Option<f64> {
        self.cell(field).trim().parse::<f64>().ok().filter(|n| n.is_finite())
    }

    fn filled(&self, field: CustomParamField) -> bool {
        !self.cell(field).trim().is_empty()
    }

    /// True when every cell is blank
    pub fn is_empty(&self) -> bool {
        !(self.filled(CustomParamField::WindSpeed)
            || self.filled(CustomParamField::SeismicZone)
            || self.filled(CustomParamField::SeismicFactor)
            || self.filled(CustomParamField::MinTemp)
            || self.filled(CustomParamField::MaxTemp))
    }

    /// Wind speed and seismic zone both entered
    pub fn is_eligible(&self) -> bool {
        self.filled(CustomParamField::WindSpeed) && self.filled(CustomParamField::SeismicZone)
    }

    /// Wire form for `/custom-params/`; blank or non-numeric cells become null
    pub fn to_payload(&self) -> CustomParamPayload {
        let zone = self.seismic_zone.trim();
        CustomParamPayload {
            wind_speed: self.number(CustomParamField::WindSpeed),
            seismic_zone: (!zone.is_empty()).then(|| zone.to_string()),
            seismic_factor: self.number(CustomParamField::SeismicFactor),
            min_temp: self.number(CustomParamField::MinTemp),
            max_temp: self.number(CustomParamField::MaxTemp),
        }
    }

    fn errors(&self) -> Vec<CellError> {
        let mut errors = Vec::new();
        let mut push = |field, message: &str| {
            errors.push(CellError {
                row_id: self.id,
                field,
                message: message.to_string(),
            })
        };

        if self.number(CustomParamField::WindSpeed).is_none() {
            push(CustomParamField::WindSpeed, "Required, numeric");
        }
        if !self.filled(CustomParamField::SeismicZone) {
            push(CustomParamField::SeismicZone, "Required");
        } else if self.seismic_zone.parse::<SeismicZone>().is_err() {
            push(CustomParamField::SeismicZone, "Must be one of I, II, III, IV, V");
        }
        if self.number(CustomParamField::SeismicFactor).is_none() {
            push(CustomParamField::SeismicFactor, "Required, numeric");
        }
        if self.number(CustomParamField::MinTemp).is_none() {
            push(CustomParamField::MinTemp, "Required, numeric");
        }
        match (self.number(CustomParamField::MinTemp), self.number(CustomParamField::MaxTemp)) {
            (_, None) => push(CustomParamField::MaxTemp, "Required, numeric"),
            (Some(min), Some(max)) if min >= max => push(CustomParamField::MaxTemp, "Max must be > Min"),
            _ => {}
        }
        errors
    }

    fn to_record(&self) -> Option<LocationRecord> {
        Some(LocationRecord {
            wind_speed_mps: self.number(CustomParamField::WindSpeed)?,
            seismic_zone: self.seismic_zone.parse().ok()?,
            seismic_factor: self.number(CustomParamField::SeismicFactor)?,
            min_temp_c: self.number(CustomParamField::MinTemp)?,
            max_temp_c: self.number(CustomParamField::MaxTemp)?,
            state_name: CUSTOM_LOCATION_NAME.to_string(),
            district_name: CUSTOM_LOCATION_NAME.to_string(),
        })
    }
}

/// Row as sent to `/custom-params/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomParamPayload {
    pub wind_speed: Option<f64>,
    pub seismic_zone: Option<String>,
    pub seismic_factor: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
}

/// A problem with one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellError {
    pub row_id: u32,
    pub field: CustomParamField,
    pub message: String,
}

/// Why a table was rejected
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomParamErrors {
    pub cells: Vec<CellError>,
    /// Table-level problem (no usable row at all)
    pub aggregate: Option<String>,
}

impl CustomParamErrors {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.aggregate.is_none()
    }

    /// Error for one cell, if any
    pub fn for_cell(&self, row_id: u32, field: CustomParamField) -> Option<&str> {
        self.cells
            .iter()
            .find(|e| e.row_id == row_id && e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl std::fmt::Display for CustomParamErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .cells
            .iter()
            .map(|e| format!("row {} {}: {}", e.row_id, e.field.display_name(), e.message))
            .collect();
        if let Some(aggregate) = &self.aggregate {
            parts.push(aggregate.clone());
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// An accepted table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedCustomParams {
    /// Record built from the first eligible row
    pub active: LocationRecord,
    pub active_row_id: u32,
    /// Every non-empty row, for best-effort remote save
    pub rows: Vec<CustomParamPayload>,
}

/// Validate an entry table.
///
/// Blank rows are skipped. Every other row must be complete and numeric with
/// `min_temp < max_temp`, and at least one row must have both wind speed and
/// seismic zone.
pub fn validate_rows(rows: &[CustomParamRow]) -> Result<AcceptedCustomParams, CustomParamErrors> {
    let mut errors = CustomParamErrors::default();

    for row in rows.iter().filter(|r| !r.is_empty()) {
        errors.cells.extend(row.errors());
    }

    let eligible = rows.iter().find(|r| r.is_eligible());
    if eligible.is_none() {
        errors.aggregate = Some("Please enter at least one parameter set".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // An eligible row is non-empty, so it passed the cell checks above
    let Some((row, active)) = eligible.and_then(|r| r.to_record().map(|rec| (r, rec))) else {
        return Err(CustomParamErrors {
            cells: Vec::new(),
            aggregate: Some("Please enter at least one parameter set".to_string()),
        });
    };

    Ok(AcceptedCustomParams {
        active,
        active_row_id: row.id,
        rows: rows
            .iter()
            .filter(|r| !r.is_empty())
            .map(CustomParamRow::to_payload)
            .collect(),
    })
}
