//! # Range Validators
//!
//! Pure checks for the fields of the geometric-details section. Every
//! validator accepts anything convertible into a [`FieldValue`] (text typed
//! into a form, a number, or nothing) and returns a [`FieldCheck`]; bad
//! input is a failed check, never an error.
//!
//! | Field | Accepted range | Required |
//! |-------|----------------|----------|
//! | Span | 20 ≤ x ≤ 45 m | yes |
//! | Carriageway width | 4.25 ≤ x < 24 m | yes |
//! | Skew angle | -15 ≤ x ≤ 15 ° | no |
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::validation::{validate_span, validate_carriageway_width};
//!
//! assert!(validate_span("32.5").is_valid);
//! assert!(!validate_carriageway_width(24.0).is_valid);
//! ```

use serde::{Deserialize, Serialize};

/// Span range (m), inclusive both ends
pub const SPAN_MIN_M: f64 = 20.0;
pub const SPAN_MAX_M: f64 = 45.0;

/// Carriageway width range (m), inclusive low, exclusive high
pub const CARRIAGEWAY_MIN_M: f64 = 4.25;
pub const CARRIAGEWAY_MAX_M: f64 = 24.0;

/// Skew angle limit (degrees either side of square)
pub const SKEW_LIMIT_DEG: f64 = 15.0;

/// Raw value of a form field.
///
/// Serializes untagged: `null`, a JSON number, or a string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric value, if the field holds one. Text is trimmed and parsed;
    /// NaN and infinities count as non-numeric.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Empty => return None,
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// True when nothing was entered (no value, or blank text)
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Number(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(n: Option<f64>) -> Self {
        n.map_or(FieldValue::Empty, FieldValue::Number)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<&FieldValue> for FieldValue {
    fn from(v: &FieldValue) -> Self {
        v.clone()
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Outcome of a single field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub is_valid: bool,
    /// Empty when valid
    pub message: String,
}

impl FieldCheck {
    pub fn ok() -> Self {
        FieldCheck {
            is_valid: true,
            message: String::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        FieldCheck {
            is_valid: false,
            message: message.into(),
        }
    }
}

/// Validate span length (20 to 45 m inclusive)
pub fn validate_span(value: impl Into<FieldValue>) -> FieldCheck {
    let Some(span) = value.into().as_number() else {
        return FieldCheck::fail("Span is required");
    };
    if !(SPAN_MIN_M..=SPAN_MAX_M).contains(&span) {
        return FieldCheck::fail("Outside the software range. (Valid range: 20-45 m)");
    }
    FieldCheck::ok()
}

/// Validate carriageway width (4.25 m inclusive to 24 m exclusive)
pub fn validate_carriageway_width(value: impl Into<FieldValue>) -> FieldCheck {
    let Some(width) = value.into().as_number() else {
        return FieldCheck::fail("Carriageway Width is required");
    };
    if !(CARRIAGEWAY_MIN_M..CARRIAGEWAY_MAX_M).contains(&width) {
        return FieldCheck::fail("Must be ≥4.25 and <24 m");
    }
    FieldCheck::ok()
}

/// Validate skew angle. The field is optional: nothing entered is valid.
pub fn validate_skew_angle(value: impl Into<FieldValue>) -> FieldCheck {
    let value = value.into();
    if value.is_empty() {
        return FieldCheck::ok();
    }
    let Some(angle) = value.as_number() else {
        return FieldCheck::fail("Skew Angle must be numeric");
    };
    if !(-SKEW_LIMIT_DEG..=SKEW_LIMIT_DEG).contains(&angle) {
        return FieldCheck::fail("IRC 24 (2010) requires detailed analysis. (Valid range: ±15°)");
    }
    FieldCheck::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_range() {
        for span in [20.0, 27.5, 32.0, 45.0] {
            assert!(validate_span(span).is_valid, "span {} should pass", span);
        }
        assert!(!validate_span(19.9).is_valid);
        assert!(!validate_span(45.1).is_valid);
        assert_eq!(
            validate_span(45.1).message,
            "Outside the software range. (Valid range: 20-45 m)"
        );
    }

    #[test]
    fn test_span_required() {
        assert_eq!(validate_span("").message, "Span is required");
        assert_eq!(validate_span("abc").message, "Span is required");
        assert_eq!(validate_span(FieldValue::Empty).message, "Span is required");
        assert!(validate_span(" 30 ").is_valid);
    }

    #[test]
    fn test_carriageway_boundaries() {
        assert!(validate_carriageway_width(4.25).is_valid);
        assert!(validate_carriageway_width("23.99").is_valid);
        assert!(!validate_carriageway_width(24.0).is_valid);
        assert!(!validate_carriageway_width(4.24).is_valid);
        assert_eq!(validate_carriageway_width(24.0).message, "Must be ≥4.25 and <24 m");
        assert_eq!(
            validate_carriageway_width("").message,
            "Carriageway Width is required"
        );
    }

    #[test]
    fn test_carriageway_sweep() {
        let mut w = 4.25;
        while w < 24.0 {
            assert!(validate_carriageway_width(w).is_valid, "width {} should pass", w);
            w += 0.25;
        }
    }

    #[test]
    fn test_skew_optional() {
        assert!(validate_skew_angle(FieldValue::Empty).is_valid);
        assert!(validate_skew_angle("  ").is_valid);
        assert!(validate_skew_angle(0.0).is_valid);
        assert!(validate_skew_angle(-15.0).is_valid);
        assert!(validate_skew_angle(15.0).is_valid);
        assert!(!validate_skew_angle(15.5).is_valid);
        assert!(!validate_skew_angle("-20").is_valid);
        assert_eq!(validate_skew_angle("steep").message, "Skew Angle must be numeric");
    }

    #[test]
    fn test_field_value_parsing() {
        assert_eq!(FieldValue::from("7.5").as_number(), Some(7.5));
        assert_eq!(FieldValue::from("NaN").as_number(), None);
        assert_eq!(FieldValue::from(None).as_number(), None);
        assert_eq!(FieldValue::Number(f64::INFINITY).as_number(), None);

        let v: FieldValue = serde_json::from_str("12.5").unwrap();
        assert_eq!(v, FieldValue::Number(12.5));
        let v: FieldValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, FieldValue::Empty);
        let v: FieldValue = serde_json::from_str("\"30\"").unwrap();
        assert_eq!(v.as_number(), Some(30.0));
    }
}
