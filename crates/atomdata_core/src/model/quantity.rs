//! Measured quantities and uncertainty reconciliation.
//!
//! # Responsibility
//! - Represent a measured value as `(nominal_value, std_dev)`.
//! - Reconcile interval-style and value+uncertainty encodings into that pair.
//! - Parse concise uncertainty notation such as `1.00782503223(9)`.
//!
//! # Invariants
//! - `Interval` always satisfies `lower <= upper`.
//! - Interval reconciliation yields `nominal = (upper + lower) / 2` and
//!   `std_dev = (upper - lower) / 2`, so `std_dev >= 0`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Best estimate of a measured quantity with its one-sigma uncertainty.
///
/// `std_dev` is `None` when the source states a bare value without any
/// uncertainty notation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertainValue {
    pub nominal_value: f64,
    pub std_dev: Option<f64>,
}

impl UncertainValue {
    pub fn new(nominal_value: f64, std_dev: f64) -> Self {
        Self {
            nominal_value,
            std_dev: Some(std_dev),
        }
    }

    /// Value stated without uncertainty.
    pub fn exact(nominal_value: f64) -> Self {
        Self {
            nominal_value,
            std_dev: None,
        }
    }
}

/// Raised when interval bounds are reversed or not finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidIntervalError {
    pub lower: f64,
    pub upper: f64,
}

impl Display for InvalidIntervalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid interval [{}, {}]: upper bound must not be below lower bound",
            self.lower, self.upper
        )
    }
}

impl Error for InvalidIntervalError {}

/// Closed interval of plausible values, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    lower: f64,
    upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Result<Self, InvalidIntervalError> {
        if !lower.is_finite() || !upper.is_finite() || upper < lower {
            return Err(InvalidIntervalError { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Midpoint as nominal value, half-span as standard deviation.
    pub fn to_uncertain_value(&self) -> UncertainValue {
        UncertainValue::new(
            (self.upper + self.lower) / 2.0,
            (self.upper - self.lower) / 2.0,
        )
    }
}

/// Raw encodings a source may use for one quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawQuantity {
    /// Value with explicitly stated uncertainty.
    Measured { value: f64, std_dev: f64 },
    /// Lower/upper bound pair.
    Bounds { lower: f64, upper: f64 },
}

/// Converts either raw encoding into one canonical `UncertainValue`.
///
/// # Errors
/// - Returns `InvalidIntervalError` when `Bounds` has `upper < lower`.
pub fn reconcile(raw: RawQuantity) -> Result<UncertainValue, InvalidIntervalError> {
    match raw {
        RawQuantity::Measured { value, std_dev } => Ok(UncertainValue::new(value, std_dev)),
        RawQuantity::Bounds { lower, upper } => {
            Interval::new(lower, upper).map(|interval| interval.to_uncertain_value())
        }
    }
}

/// Shorthand for reconciling a `(lower, upper)` pair.
pub fn to_nominal_and_std_dev(lower: f64, upper: f64) -> Result<(f64, f64), InvalidIntervalError> {
    let interval = Interval::new(lower, upper)?;
    let value = interval.to_uncertain_value();
    Ok((value.nominal_value, value.std_dev.unwrap_or(0.0)))
}

/// Parses concise uncertainty notation.
///
/// Accepted forms: `12`, `4.002602`, `4.002602(2)`, `1.5(3)e-5`. The digits in
/// parentheses apply to the last digits of the nominal value, so
/// `1.00782503223(9)` has std_dev `9e-11`. Returns `None` for anything else.
pub fn parse_uncertain(text: &str) -> Option<UncertainValue> {
    let text = text.trim();
    let (mantissa, exponent) = split_exponent(text)?;

    let (nominal_text, uncertainty_digits) = match mantissa.find('(') {
        Some(open) => {
            let close = mantissa.strip_suffix(')')?;
            (&mantissa[..open], Some(&close[open + 1..]))
        }
        None => (mantissa, None),
    };

    if !is_decimal(nominal_text) {
        return None;
    }
    let nominal_value = format!("{nominal_text}e{exponent}").parse::<f64>().ok()?;

    let std_dev = match uncertainty_digits {
        None => None,
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            let fraction_len = nominal_text
                .split_once('.')
                .map_or(0, |(_, fraction)| fraction.len());
            let scale = exponent.checked_sub(i32::try_from(fraction_len).ok()?)?;
            Some(format!("{digits}e{scale}").parse::<f64>().ok()?)
        }
        Some(_) => return None,
    };

    Some(UncertainValue {
        nominal_value,
        std_dev,
    })
}

fn split_exponent(text: &str) -> Option<(&str, i32)> {
    match text.find(['e', 'E']) {
        Some(index) => {
            let exponent = text[index + 1..].parse::<i32>().ok()?;
            Some((&text[..index], exponent))
        }
        None => Some((text, 0)),
    }
}

fn is_decimal(value: &str) -> bool {
    let (integer, fraction) = match value.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (value, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(integer) && fraction.map_or(true, digits)
}
