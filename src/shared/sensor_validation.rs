//! Input/result guards shared by the calculators.
//!
//! A missing field is not an error: callers substitute the documented default
//! before computing. A field that is present but not finite, or a result that
//! overflows, is a genuine computation failure and surfaces as
//! [`CalculationError`], which each calculator converts into an
//! error-tagged result at its own boundary.

/// Failure inside a calculator body. Never escapes the calculator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalculationError {
    #[error("non-finite input for {field}: {value}")]
    NonFiniteInput { field: &'static str, value: f64 },

    #[error("non-finite result for {field}")]
    NonFiniteResult { field: &'static str },

    #[error("negative maintenance interval: {0} days")]
    NegativeMaintenanceDays(i64),
}

/// Use `value` when present, otherwise `default`. Present values must be finite.
pub fn input_or(
    field: &'static str,
    value: Option<f64>,
    default: f64,
) -> Result<f64, CalculationError> {
    match value {
        None => Ok(default),
        Some(v) => finite_input(field, v),
    }
}

pub fn finite_input(field: &'static str, value: f64) -> Result<f64, CalculationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalculationError::NonFiniteInput { field, value })
    }
}

pub fn finite_result(field: &'static str, value: f64) -> Result<f64, CalculationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalculationError::NonFiniteResult { field })
    }
}

/// True when `value` lies inside the closed band `[min, max]`
pub fn within(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}
