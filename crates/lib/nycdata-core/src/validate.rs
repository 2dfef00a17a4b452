//! Boundary validation for tool parameters.
//!
//! Validators never panic or error out on expected bad input: each returns a
//! [`Validation`] carrying either the normalized value or an [`InvalidInput`]
//! naming the parameter and a remediation. [`ValidationBatch`] collects several
//! results and fails them together so the caller sees every problem at once.

use nycdata_model::Borough;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CoreError, InvalidInput};
use crate::geo::Bbl;

pub type Validation<T> = Result<T, InvalidInput>;

const VALID_BOROUGHS: &str = "MANHATTAN, BRONX, BROOKLYN, QUEENS, STATEN ISLAND";

/// Bounds for an integer parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeOptions {
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl RangeOptions {
    #[must_use]
    pub const fn new(min: i64, max: i64, default: i64) -> Self {
        Self { min, max, default }
    }
}

/// Treats empty or whitespace-only input as absent.
fn provided(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|value| !value.is_empty())
}

/// Doubles single quotes so text can sit inside a SoQL string literal.
#[must_use]
pub fn escape_soql_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

/// Validates an optional borough given as a name, short code, or number 1-5.
///
/// # Errors
/// Returns `InvalidInput` naming the five valid boroughs when the value is unknown.
pub fn validate_borough(raw: Option<&str>) -> Validation<Option<Borough>> {
    let Some(value) = provided(raw) else {
        return Ok(None);
    };
    Borough::from_code(value).map(Some).ok_or_else(|| {
        InvalidInput::new(
            "borough",
            format!("Invalid borough '{value}'. Valid boroughs: {VALID_BOROUGHS}"),
            format!("Use one of {VALID_BOROUGHS}, a short code such as BX, or 1-5."),
        )
    })
}

/// Validates an optional whole number against inclusive bounds.
///
/// # Errors
/// Returns `InvalidInput` for fractional, non-finite, or out-of-range values.
pub fn validate_int_range(name: &str, raw: Option<f64>, options: RangeOptions) -> Validation<i64> {
    let Some(value) = raw else {
        return Ok(options.default);
    };
    let RangeOptions { min, max, .. } = options;
    let out_of_range = || {
        InvalidInput::new(
            name,
            format!("{name} must be a whole number between {min} and {max}, got {value}"),
            format!("Pass {name} as an integer from {min} to {max}."),
        )
    };
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(out_of_range());
    }
    #[allow(clippy::cast_precision_loss)]
    let (low, high) = (min as f64, max as f64);
    if value < low || value > high {
        return Err(out_of_range());
    }
    #[allow(clippy::cast_possible_truncation)]
    let whole = value as i64;
    Ok(whole)
}

/// Validates optional free text, escaping it for use in a SoQL literal.
///
/// # Errors
/// Returns `InvalidInput` when the text is longer than `max_len` characters.
pub fn validate_text(name: &str, raw: Option<&str>, max_len: usize) -> Validation<Option<String>> {
    let Some(value) = provided(raw) else {
        return Ok(None);
    };
    let length = value.chars().count();
    if length > max_len {
        return Err(InvalidInput::new(
            name,
            format!("{name} is {length} characters long; the maximum is {max_len}"),
            format!("Shorten {name} to at most {max_len} characters."),
        ));
    }
    Ok(Some(escape_soql_literal(value)))
}

/// Like [`validate_text`] but the value must be present.
///
/// # Errors
/// Returns `InvalidInput` when the text is missing, empty, or too long.
pub fn validate_required_text(name: &str, raw: Option<&str>, max_len: usize) -> Validation<String> {
    validate_text(name, raw, max_len)?.ok_or_else(|| {
        InvalidInput::new(
            name,
            format!("{name} is required"),
            format!("Provide a value for {name}."),
        )
    })
}

/// Case-insensitive match against a fixed option list.
///
/// Returns the option as it is cased in `options`.
///
/// # Errors
/// Returns `InvalidInput` listing the options when nothing matches.
pub fn validate_enum(
    name: &str,
    raw: Option<&str>,
    options: &[&'static str],
) -> Validation<Option<&'static str>> {
    let Some(value) = provided(raw) else {
        return Ok(None);
    };
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(value))
        .copied()
        .map(Some)
        .ok_or_else(|| {
            let listed = options.join(", ");
            InvalidInput::new(
                name,
                format!("Invalid {name} '{value}'. Valid values: {listed}"),
                format!("Use one of: {listed}."),
            )
        })
}

/// Validates a ten-digit Borough-Block-Lot identifier.
///
/// # Errors
/// Returns `InvalidInput` when the value is missing or malformed.
pub fn validate_bbl(raw: Option<&str>) -> Validation<Bbl> {
    let value = provided(raw).ok_or_else(|| {
        InvalidInput::new(
            "bbl",
            "bbl is required",
            "Provide a 10-digit BBL such as 1000010010 (borough, 5-digit block, 4-digit lot).",
        )
    })?;
    Bbl::parse(value).ok_or_else(|| {
        InvalidInput::new(
            "bbl",
            format!("Invalid BBL '{value}'"),
            "A BBL is 10 digits: borough 1-5, then a 5-digit block and a 4-digit lot.",
        )
    })
}

/// Collects several validation results and fails them together.
#[derive(Debug, Default)]
pub struct ValidationBatch {
    normalized: Map<String, Value>,
    errors: Vec<InvalidInput>,
}

impl ValidationBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one result, returning the normalized value when it passed.
    pub fn check<T: Serialize>(&mut self, name: &str, result: Validation<T>) -> Option<T> {
        match result {
            Ok(value) => {
                let json = serde_json::to_value(&value).unwrap_or(Value::Null);
                self.normalized.insert(name.to_string(), json);
                Some(value)
            }
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    /// Returns the normalized values by parameter name, or one aggregated error.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidInput` listing every failed parameter.
    pub fn finish(self) -> Result<Map<String, Value>, CoreError> {
        if self.errors.is_empty() {
            Ok(self.normalized)
        } else {
            Err(CoreError::InvalidInput(self.errors))
        }
    }
}
