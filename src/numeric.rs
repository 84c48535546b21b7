//! Numeric normalization of raw edge weight values.
//!
//! Edge attributes arrive either as numbers (branch lengths parsed from
//! Newick) or as raw text (BEAST annotations such as `rate=0.0012`). Before
//! any arithmetic the value is read into a [`Numeric`], which rejects
//! anything that is not a number and canonicalizes integral values.

use std::fmt;
use std::str::FromStr;

use crate::errors::DistanceError;
use crate::tree::AttrValue;

/// A validated numeric weight.
///
/// Integral values are held as [`Numeric::Integer`] so that `3`, `3.0` and
/// `3.000` all normalize to the same thing.
///
/// # Example
/// ```
/// use bipartition_distances::numeric::Numeric;
///
/// assert_eq!(Numeric::parse("2.500").unwrap().to_string(), "2.5");
/// assert_eq!(Numeric::parse("3.0").unwrap(), Numeric::Integer(3));
/// assert!(Numeric::parse("abc").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Real(f64),
}

/// Largest magnitude below which every integer is exactly representable as f64.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

impl Numeric {
    /// Parses a raw token, ignoring surrounding whitespace.
    ///
    /// # Errors
    /// [`DistanceError::NotANumber`] when the token is not numeric, is NaN or
    /// is infinite.
    pub fn parse(token: &str) -> Result<Self, DistanceError> {
        let trimmed = token.trim();
        if let Ok(int) = trimmed.parse::<i64>() {
            return Ok(Numeric::Integer(int));
        }
        let value = trimmed
            .parse::<f64>()
            .map_err(|_| DistanceError::NotANumber(token.to_string()))?;
        Self::from_f64(value).map_err(|_| DistanceError::NotANumber(token.to_string()))
    }

    /// Normalizes a float, folding integral values into [`Numeric::Integer`].
    ///
    /// # Errors
    /// [`DistanceError::NotANumber`] for NaN and infinities.
    pub fn from_f64(value: f64) -> Result<Self, DistanceError> {
        if !value.is_finite() {
            return Err(DistanceError::NotANumber(value.to_string()));
        }
        if value.fract() == 0.0 && value.abs() < EXACT_INTEGER_LIMIT {
            Ok(Numeric::Integer(value as i64))
        } else {
            Ok(Numeric::Real(value))
        }
    }

    /// Reads an edge attribute value. The attribute itself is left untouched.
    pub fn from_attr(value: &AttrValue) -> Result<Self, DistanceError> {
        match value {
            AttrValue::Number(v) => Self::from_f64(*v),
            AttrValue::Text(s) => Self::parse(s),
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Numeric::Integer(i) => i as f64,
            Numeric::Real(v) => v,
        }
    }
}

impl FromStr for Numeric {
    type Err = DistanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Numeric::parse(s)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Integer(i) => write!(f, "{i}"),
            // f64's Display is the shortest round-tripping form: no trailing zeros
            Numeric::Real(v) => write!(f, "{v}"),
        }
    }
}

/// How raw edge attributes are turned into numbers before distance arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub enum Coercion {
    /// Anything [`Numeric`] accepts, as an f64.
    #[default]
    FloatLike,
    /// A caller-supplied conversion.
    Custom(fn(&AttrValue) -> Result<f64, DistanceError>),
}

impl Coercion {
    pub fn coerce(&self, value: &AttrValue) -> Result<f64, DistanceError> {
        match self {
            Coercion::FloatLike => float_like(value),
            Coercion::Custom(f) => f(value),
        }
    }

    /// The coerced value used for a split an edge does not have.
    pub fn zero(&self) -> Result<f64, DistanceError> {
        self.coerce(&AttrValue::Number(0.0))
    }
}

/// Default coercion: validate through [`Numeric`] and widen to f64.
pub fn float_like(value: &AttrValue) -> Result<f64, DistanceError> {
    Numeric::from_attr(value).map(Numeric::to_f64)
}
