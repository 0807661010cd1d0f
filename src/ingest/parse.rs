//! Sensor line parsing

use std::num::ParseFloatError;

/// Angle and distance fields of one sensor line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fields {
    pub angle: f64,
    pub distance: f64,
}

/// Which field failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Angle,
    Distance,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Angle => write!(f, "angle"),
            Field::Distance => write!(f, "distance"),
        }
    }
}

/// Why a field could not be turned into a number
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumberError {
    #[error("{0}")]
    Invalid(#[from] ParseFloatError),
    /// `nan`, `inf` and friends parse but cannot be stored
    #[error("non-finite value {0}")]
    NonFinite(f64),
}

/// Split a stripped line into `angle,distance`.
///
/// Returns `Ok(None)` when the line does not have exactly two comma-separated
/// parts; such lines are skipped without error. A two-part line whose parts
/// are not finite numbers is an error.
pub fn parse_line(line: &str) -> Result<Option<Fields>, (Field, NumberError)> {
    let parts: Vec<&str> = line.split(',').collect();
    let [angle, distance] = parts.as_slice() else {
        return Ok(None);
    };

    let angle = parse_number(angle).map_err(|e| (Field::Angle, e))?;
    let distance = parse_number(distance).map_err(|e| (Field::Distance, e))?;
    Ok(Some(Fields { angle, distance }))
}

/// Number of comma-separated parts in a line
pub fn field_count(line: &str) -> usize {
    line.split(',').count()
}

fn parse_number(raw: &str) -> Result<f64, NumberError> {
    let value = raw.trim().parse::<f64>()?;
    if !value.is_finite() {
        return Err(NumberError::NonFinite(value));
    }
    Ok(value)
}
