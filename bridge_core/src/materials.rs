//! # Materials
//!
//! Structural steel and deck concrete grades offered by the form.
//!
//! - **Steel** (IS 2062): E250, E350, E450, used for girders and cross bracing
//! - **Concrete** (IS 456): M25 through M60, used for the deck slab
//!
//! Grades serialize as their code strings (`"E250"`, `"M30"`), which is also
//! what the backend's `/materials/` endpoint returns.
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::materials::{ConcreteGrade, MaterialSelection, SteelGrade};
//!
//! let selection = MaterialSelection::default();
//! assert_eq!(selection.girder_steel, SteelGrade::E250);
//! assert_eq!(selection.deck_concrete, ConcreteGrade::M25);
//! assert_eq!(SteelGrade::E350.display_name(), "E350 (350 MPa)");
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Structural steel grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SteelGrade {
    #[default]
    E250,
    E350,
    E450,
}

impl SteelGrade {
    /// All steel grades for UI selection
    pub const ALL: [SteelGrade; 3] = [SteelGrade::E250, SteelGrade::E350, SteelGrade::E450];

    pub fn code(&self) -> &'static str {
        match self {
            SteelGrade::E250 => "E250",
            SteelGrade::E350 => "E350",
            SteelGrade::E450 => "E450",
        }
    }

    /// Yield stress fy (MPa)
    pub fn yield_stress_mpa(&self) -> f64 {
        match self {
            SteelGrade::E250 => 250.0,
            SteelGrade::E350 => 350.0,
            SteelGrade::E450 => 450.0,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} ({:.0} MPa)", self.code(), self.yield_stress_mpa())
    }
}

impl FromStr for SteelGrade {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        SteelGrade::ALL
            .into_iter()
            .find(|g| g.code() == code)
            .ok_or_else(|| BridgeError::unknown_option("steel grade", s))
    }
}

impl std::fmt::Display for SteelGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Deck concrete grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConcreteGrade {
    #[default]
    M25,
    M30,
    M35,
    M40,
    M45,
    M50,
    M55,
    M60,
}

impl ConcreteGrade {
    /// All concrete grades for UI selection
    pub const ALL: [ConcreteGrade; 8] = [
        ConcreteGrade::M25,
        ConcreteGrade::M30,
        ConcreteGrade::M35,
        ConcreteGrade::M40,
        ConcreteGrade::M45,
        ConcreteGrade::M50,
        ConcreteGrade::M55,
        ConcreteGrade::M60,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ConcreteGrade::M25 => "M25",
            ConcreteGrade::M30 => "M30",
            ConcreteGrade::M35 => "M35",
            ConcreteGrade::M40 => "M40",
            ConcreteGrade::M45 => "M45",
            ConcreteGrade::M50 => "M50",
            ConcreteGrade::M55 => "M55",
            ConcreteGrade::M60 => "M60",
        }
    }

    /// Characteristic cube strength fck (MPa)
    pub fn fck_mpa(&self) -> f64 {
        match self {
            ConcreteGrade::M25 => 25.0,
            ConcreteGrade::M30 => 30.0,
            ConcreteGrade::M35 => 35.0,
            ConcreteGrade::M40 => 40.0,
            ConcreteGrade::M45 => 45.0,
            ConcreteGrade::M50 => 50.0,
            ConcreteGrade::M55 => 55.0,
            ConcreteGrade::M60 => 60.0,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} ({:.0} MPa)", self.code(), self.fck_mpa())
    }
}

impl FromStr for ConcreteGrade {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_uppercase();
        ConcreteGrade::ALL
            .into_iter()
            .find(|g| g.code() == code)
            .ok_or_else(|| BridgeError::unknown_option("concrete grade", s))
    }
}

impl std::fmt::Display for ConcreteGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Materials section of the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MaterialSelection {
    pub girder_steel: SteelGrade,
    pub cross_bracing_steel: SteelGrade,
    pub deck_concrete: ConcreteGrade,
}

/// Option lists, as served by `GET /materials/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOptions {
    pub steel_options: Vec<String>,
    pub concrete_options: Vec<String>,
}

impl MaterialOptions {
    /// The option lists compiled into this crate
    pub fn builtin() -> Self {
        MaterialOptions {
            steel_options: SteelGrade::ALL.iter().map(|g| g.code().to_string()).collect(),
            concrete_options: ConcreteGrade::ALL.iter().map(|g| g.code().to_string()).collect(),
        }
    }

    /// Steel grades from the lists that this crate understands
    pub fn steel_grades(&self) -> Vec<SteelGrade> {
        self.steel_options.iter().filter_map(|s| s.parse().ok()).collect()
    }

    /// Concrete grades from the lists that this crate understands
    pub fn concrete_grades(&self) -> Vec<ConcreteGrade> {
        self.concrete_options.iter().filter_map(|s| s.parse().ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let m = MaterialSelection::default();
        assert_eq!(m.girder_steel, SteelGrade::E250);
        assert_eq!(m.cross_bracing_steel, SteelGrade::E250);
        assert_eq!(m.deck_concrete, ConcreteGrade::M25);
    }

    #[test]
    fn test_parse_grades() {
        assert_eq!("e350".parse::<SteelGrade>().unwrap(), SteelGrade::E350);
        assert_eq!(" M45 ".parse::<ConcreteGrade>().unwrap(), ConcreteGrade::M45);
        let err = "E300".parse::<SteelGrade>().unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_OPTION");
        assert!("M20".parse::<ConcreteGrade>().is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SteelGrade::E450.display_name(), "E450 (450 MPa)");
        assert_eq!(ConcreteGrade::M60.display_name(), "M60 (60 MPa)");
    }

    #[test]
    fn test_serialized_as_codes() {
        let json = serde_json::to_string(&MaterialSelection::default()).unwrap();
        assert_eq!(
            json,
            r#"{"girder_steel":"E250","cross_bracing_steel":"E250","deck_concrete":"M25"}"#
        );
    }

    #[test]
    fn test_builtin_options() {
        let opts = MaterialOptions::builtin();
        assert_eq!(opts.steel_options, vec!["E250", "E350", "E450"]);
        assert_eq!(opts.concrete_options.len(), 8);
        assert_eq!(opts.concrete_grades().last(), Some(&ConcreteGrade::M60));
    }

    #[test]
    fn test_unknown_remote_options_skipped() {
        let opts = MaterialOptions {
            steel_options: vec!["E250".into(), "E550".into()],
            concrete_options: vec!["M90".into()],
        };
        assert_eq!(opts.steel_grades(), vec![SteelGrade::E250]);
        assert!(opts.concrete_grades().is_empty());
    }
}
