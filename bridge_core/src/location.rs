//! # Location Reference Data
//!
//! Environmental loading parameters per site: basic wind speed, seismic zone
//! and zone factor, and the shade air temperature range.
//!
//! The static table is TOML compiled into the crate (`data/locations.toml`)
//! and can be swapped for a file at runtime. Districts are addressed by a
//! slug id (`"mumbai"`); display names are what the backend is queried with.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::location::{LocationTable, SeismicZone};
//!
//! let table = LocationTable::builtin().unwrap();
//! let mumbai = table.record("mumbai").unwrap();
//! assert_eq!(mumbai.state_name, "Maharashtra");
//! assert_eq!(mumbai.seismic_zone, SeismicZone::III);
//! ```

use std::path::Path;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};

const BUILTIN_TABLE: &str = include_str!("../data/locations.toml");

static BUILTIN: OnceCell<LocationTable> = OnceCell::new();

/// Seismic zone classification (IS 1893).
///
/// Serializes as the bare numeral; also accepts the `"Zone IV"` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeismicZone {
    #[serde(alias = "Zone I")]
    I,
    #[serde(alias = "Zone II")]
    II,
    #[serde(alias = "Zone III")]
    III,
    #[serde(alias = "Zone IV")]
    IV,
    #[serde(alias = "Zone V")]
    V,
}

impl SeismicZone {
    pub fn numeral(&self) -> &'static str {
        match self {
            SeismicZone::I => "I",
            SeismicZone::II => "II",
            SeismicZone::III => "III",
            SeismicZone::IV => "IV",
            SeismicZone::V => "V",
        }
    }

    pub fn display_name(&self) -> String {
        format!("Zone {}", self.numeral())
    }
}

impl FromStr for SeismicZone {
    type Err = BridgeError;

    /// Accepts "IV", "iv", "Zone IV", "zone-iv" and "4"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let bare = upper
            .strip_prefix("ZONE")
            .map(|rest| rest.trim_start_matches([' ', '-', '_']))
            .unwrap_or(upper.as_str());
        let zone = match bare {
            "I" | "1" => SeismicZone::I,
            "II" | "2" => SeismicZone::II,
            "III" | "3" => SeismicZone::III,
            "IV" | "4" => SeismicZone::IV,
            "V" | "5" => SeismicZone::V,
            _ => return Err(BridgeError::unknown_option("seismic zone", s)),
        };
        Ok(zone)
    }
}

impl std::fmt::Display for SeismicZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.numeral())
    }
}

/// Environmental parameters for one bridge site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Basic wind speed (m/s)
    pub wind_speed_mps: f64,
    pub seismic_zone: SeismicZone,
    /// Zone factor Z
    pub seismic_factor: f64,
    /// Minimum shade air temperature (°C)
    pub min_temp_c: f64,
    /// Maximum shade air temperature (°C)
    pub max_temp_c: f64,
    pub state_name: String,
    pub district_name: String,
}

/// One district row of the static table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictEntry {
    pub id: String,
    pub name: String,
    pub basic_wind_speed: f64,
    pub seismic_zone: SeismicZone,
    pub seismic_factor: f64,
    pub min_temp: f64,
    pub max_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub districts: Vec<DistrictEntry>,
}

/// Static location table, grouped by state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTable {
    pub states: Vec<StateEntry>,
}

impl LocationTable {
    /// The table compiled into this crate.
    pub fn builtin() -> BridgeResult<&'static LocationTable> {
        BUILTIN.get_or_try_init(|| LocationTable::from_toml_str(BUILTIN_TABLE, "<builtin>"))
    }

    /// Parse a table from TOML. `origin` names the source in errors.
    pub fn from_toml_str(text: &str, origin: &str) -> BridgeResult<Self> {
        let table: LocationTable =
            toml::from_str(text).map_err(|e| BridgeError::config(origin, e.to_string()))?;

        for (state, district) in table.iter() {
            if district.min_temp >= district.max_temp {
                return Err(BridgeError::config(
                    origin,
                    format!(
                        "{}, {}: min_temp {} must be below max_temp {}",
                        district.name, state.name, district.min_temp, district.max_temp
                    ),
                ));
            }
        }
        Ok(table)
    }

    /// Load a table from a TOML file
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn state(&self, state_id: &str) -> Option<&StateEntry> {
        self.states.iter().find(|s| s.id == state_id)
    }

    /// Districts of a state; empty for an unknown state
    pub fn districts_of(&self, state_id: &str) -> &[DistrictEntry] {
        self.state(state_id)
            .map(|s| s.districts.as_slice())
            .unwrap_or(&[])
    }

    /// Find a district by id across all states
    pub fn find_district(&self, district_id: &str) -> Option<(&StateEntry, &DistrictEntry)> {
        self.iter().find(|(_, d)| d.id == district_id)
    }

    /// Location record for a district id
    pub fn record(&self, district_id: &str) -> Option<LocationRecord> {
        self.find_district(district_id)
            .map(|(state, district)| district.to_record(&state.name))
    }

    /// Iterate (state, district) pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (&StateEntry, &DistrictEntry)> {
        self.states
            .iter()
            .flat_map(|s| s.districts.iter().map(move |d| (s, d)))
    }

    pub fn district_count(&self) -> usize {
        self.states.iter().map(|s| s.districts.len()).sum()
    }
}

impl DistrictEntry {
    pub fn to_record(&self, state_name: &str) -> LocationRecord {
        LocationRecord {
            wind_speed_mps: self.basic_wind_speed,
            seismic_zone: self.seismic_zone,
            seismic_factor: self.seismic_factor,
            min_temp_c: self.min_temp,
            max_temp_c: self.max_temp,
            state_name: state_name.to_string(),
            district_name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let table = LocationTable::builtin().unwrap();
        assert_eq!(table.states.len(), 25);
        assert_eq!(table.district_count(), 27);
    }

    #[test]
    fn test_lookup_by_district_id() {
        let table = LocationTable::builtin().unwrap();
        let shimla = table.record("shimla").unwrap();
        assert_eq!(shimla.state_name, "Himachal Pradesh");
        assert_eq!(shimla.district_name, "Shimla");
        assert_eq!(shimla.wind_speed_mps, 39.0);
        assert_eq!(shimla.seismic_zone, SeismicZone::IV);
        assert_eq!(shimla.seismic_factor, 0.24);
        assert_eq!(shimla.min_temp_c, -2.0);
        assert_eq!(shimla.max_temp_c, 28.0);

        assert!(table.record("atlantis").is_none());
    }

    #[test]
    fn test_districts_of_state() {
        let table = LocationTable::builtin().unwrap();
        let names: Vec<&str> = table
            .districts_of("uttar-pradesh")
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Lucknow", "Kanpur"]);
        assert!(table.districts_of("nowhere").is_empty());
    }

    #[test]
    fn test_table_temperatures_ordered() {
        let table = LocationTable::builtin().unwrap();
        for (_, d) in table.iter() {
            assert!(d.min_temp < d.max_temp, "{}", d.id);
        }
    }

    #[test]
    fn test_zone_parsing() {
        assert_eq!("IV".parse::<SeismicZone>().unwrap(), SeismicZone::IV);
        assert_eq!("Zone III".parse::<SeismicZone>().unwrap(), SeismicZone::III);
        assert_eq!("zone-v".parse::<SeismicZone>().unwrap(), SeismicZone::V);
        assert_eq!(" 2 ".parse::<SeismicZone>().unwrap(), SeismicZone::II);
        assert!("VI".parse::<SeismicZone>().is_err());
        assert!("".parse::<SeismicZone>().is_err());
    }

    #[test]
    fn test_zone_serde() {
        assert_eq!(serde_json::to_string(&SeismicZone::IV).unwrap(), "\"IV\"");
        let z: SeismicZone = serde_json::from_str("\"Zone II\"").unwrap();
        assert_eq!(z, SeismicZone::II);
    }

    #[test]
    fn test_custom_table_rejects_inverted_temps() {
        let text = r#"
            [[states]]
            id = "x"
            name = "X"

            [[states.districts]]
            id = "y"
            name = "Y"
            basic_wind_speed = 44.0
            seismic_zone = "III"
            seismic_factor = 0.16
            min_temp = 40.0
            max_temp = 10.0
        "#;
        let err = LocationTable::from_toml_str(text, "test.toml").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_malformed_table() {
        let err = LocationTable::from_toml_str("states = 3", "bad.toml").unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
