//! Dimension expressions: absolute pixel counts or percentages of a base.
//!
//! ## Usage
//!
//! Parse markup tokens such as `"640"`, `"640px"` or `"50%"` and resolve them
//! against a base dimension.

use std::str::FromStr;

use thiserror::Error;

use crate::px::Px;

/// Errors produced while parsing a dimension token.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DimensionError {
    /// The token was empty or whitespace only.
    #[error("empty dimension expression")]
    Empty,
    /// A `%` token whose numeric part is not a finite number.
    #[error("invalid percentage `{0}`")]
    InvalidPercent(String),
    /// A pixel token without leading digits.
    #[error("invalid pixel value `{0}`")]
    InvalidPixels(String),
}

/// A parsed dimension expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DimensionExpr {
    /// An absolute pixel count.
    Pixels(i64),
    /// A percentage of the base dimension, e.g. `50.0` for `"50%"`.
    Percent(f64),
}

impl DimensionExpr {
    /// Parses a markup token.
    ///
    /// Pixel tokens use integer-prefix parsing: an optional sign followed by
    /// digits, with any trailing text (`px`, a fractional part) ignored.
    ///
    /// ```
    /// use tilestack_ui::dimension::DimensionExpr;
    ///
    /// assert_eq!(DimensionExpr::parse("50%"), Ok(DimensionExpr::Percent(50.0)));
    /// assert_eq!(DimensionExpr::parse(" 640px "), Ok(DimensionExpr::Pixels(640)));
    /// assert_eq!(DimensionExpr::parse("12.9"), Ok(DimensionExpr::Pixels(12)));
    /// assert!(DimensionExpr::parse("wide").is_err());
    /// ```
    pub fn parse(token: &str) -> Result<Self, DimensionError> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(DimensionError::Empty);
        }

        if let Some(number) = trimmed.strip_suffix('%') {
            return match number.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(Self::Percent(value)),
                _ => Err(DimensionError::InvalidPercent(trimmed.to_string())),
            };
        }

        parse_integer_prefix(trimmed)
            .map(Self::Pixels)
            .ok_or_else(|| DimensionError::InvalidPixels(trimmed.to_string()))
    }

    /// Resolves the expression against `base`.
    ///
    /// Percentages compute `round(base * pct / 100)` with halves rounded away
    /// from zero. Any result that is not a positive pixel count, and any
    /// percentage applied to a zero, negative or non-finite base, yields
    /// `fallback` instead.
    ///
    /// ```
    /// use tilestack_ui::{dimension::DimensionExpr, px::Px};
    ///
    /// let half = DimensionExpr::Percent(50.0);
    /// assert_eq!(half.resolve(1600.0, Px::new(1600)), Px::new(800));
    /// assert_eq!(half.resolve(0.0, Px::new(1600)), Px::new(1600));
    /// assert_eq!(DimensionExpr::Pixels(-4).resolve(1600.0, Px::new(1600)), Px::new(1600));
    /// ```
    pub fn resolve(&self, base: f64, fallback: Px) -> Px {
        let resolved = match *self {
            Self::Percent(percent) => {
                if !base.is_finite() || base <= 0.0 {
                    return fallback;
                }
                Px::round_from_f64(base * percent / 100.0)
            }
            Self::Pixels(pixels) => match i32::try_from(pixels) {
                Ok(value) => Px(value),
                Err(_) => return fallback,
            },
        };

        if resolved.is_positive() {
            resolved
        } else {
            fallback
        }
    }
}

impl FromStr for DimensionExpr {
    type Err = DimensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A dimension as it appeared in configuration.
///
/// Unparsable tokens are kept so that resolution can fall back to the base
/// instead of failing the whole stack.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionSpec {
    /// A well-formed expression.
    Expr(DimensionExpr),
    /// The raw token that failed to parse.
    Invalid(String),
}

impl DimensionSpec {
    /// Parses a token, keeping the raw text on failure.
    pub fn from_token(token: &str) -> Self {
        match DimensionExpr::parse(token) {
            Ok(expr) => Self::Expr(expr),
            Err(err) => {
                tracing::warn!("{err}; falling back to base dimension");
                Self::Invalid(token.to_string())
            }
        }
    }

    /// Resolves the dimension; invalid tokens resolve to `fallback`.
    pub fn resolve(&self, base: f64, fallback: Px) -> Px {
        match self {
            Self::Expr(expr) => expr.resolve(base, fallback),
            Self::Invalid(_) => fallback,
        }
    }
}

impl From<DimensionExpr> for DimensionSpec {
    fn from(expr: DimensionExpr) -> Self {
        Self::Expr(expr)
    }
}

/// Parses an optional sign followed by ASCII digits, ignoring the rest.
pub(crate) fn parse_integer_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    // Saturate absurdly long digit runs rather than rejecting them.
    let magnitude = rest[..digits_len].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
