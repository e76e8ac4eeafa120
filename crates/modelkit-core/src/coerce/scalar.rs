//! Scalar strategies
//!
//! Each converting strategy documents its total conversion policy - what
//! it accepts, what it rejects, and how lossy steps behave. The boolean
//! strategy is the non-converting member of the family: anything that is
//! not already a boolean (and not blankish) is a mismatch.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use crate::coerce::registry::TypeRegistry;
use crate::coerce::strategy::CoercionStrategy;
use crate::error::CoerceError;
use crate::value::Value;

/// Coerces to `Value::Int`
///
/// # Conversion policy
///
/// - `Float`: truncates toward zero; non-finite floats and magnitudes
///   outside the `i64` range mismatch
/// - `Str`: parsed as a base-10 integer after trimming ASCII whitespace;
///   no radix prefixes, no decimal points
/// - everything else mismatches
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegerStrategy;

impl CoercionStrategy for IntegerStrategy {
    fn target_name(&self) -> &str {
        "integer"
    }

    fn is_native(&self, value: &Value) -> bool {
        matches!(value, Value::Int(_))
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        match &value {
            Value::Float(f) if f.is_finite() => {
                let truncated = f.trunc();
                // 2^63 is the first float past i64::MAX; -2^63 is exact
                if (-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0)
                    .contains(&truncated)
                {
                    #[allow(clippy::cast_possible_truncation)]
                    let i = truncated as i64;
                    Ok(Value::Int(i))
                } else {
                    Err(CoerceError::mismatch(
                        &value,
                        "integer",
                        "out of integer range",
                    ))
                }
            }
            Value::Float(_) => Err(CoerceError::mismatch(&value, "integer", "non-finite float")),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| CoerceError::mismatch(&value, "integer", e.to_string())),
            other => Err(CoerceError::mismatch(
                other,
                "integer",
                format!("no conversion from {}", other.type_name()),
            )),
        }
    }
}

/// Coerces to `Value::Float`
///
/// # Conversion policy
///
/// - `Int`: widened exactly (within f64 precision)
/// - `Str`: parsed as a decimal float after trimming ASCII whitespace
/// - everything else mismatches
#[derive(Debug, Default, Clone, Copy)]
pub struct FloatStrategy;

impl CoercionStrategy for FloatStrategy {
    fn target_name(&self) -> &str {
        "float"
    }

    fn is_native(&self, value: &Value) -> bool {
        matches!(value, Value::Float(_))
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        match &value {
            Value::Int(i) => Ok(Value::Float(*i as f64)),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| CoerceError::mismatch(&value, "float", e.to_string())),
            other => Err(CoerceError::mismatch(
                other,
                "float",
                format!("no conversion from {}", other.type_name()),
            )),
        }
    }
}

/// Coerces to `Value::Str`
///
/// Symbols, integers, floats, and booleans render via `Display`.
/// Containers and records mismatch - stringifying structure is a
/// serialization concern, not a coercion.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringStrategy;

impl CoercionStrategy for StringStrategy {
    fn target_name(&self) -> &str {
        "string"
    }

    fn is_native(&self, value: &Value) -> bool {
        matches!(value, Value::Str(_))
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        match &value {
            Value::Sym(s) => Ok(Value::Str(s.clone())),
            Value::Int(i) => Ok(Value::Str(i.to_string())),
            Value::Float(f) => Ok(Value::Str(f.to_string())),
            Value::Bool(b) => Ok(Value::Str(b.to_string())),
            other => Err(CoerceError::mismatch(
                other,
                "string",
                format!("no conversion from {}", other.type_name()),
            )),
        }
    }
}

/// Coerces to `Value::Sym`
///
/// Only strings convert; everything else mismatches.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolStrategy;

impl CoercionStrategy for SymbolStrategy {
    fn target_name(&self) -> &str {
        "symbol"
    }

    fn is_native(&self, value: &Value) -> bool {
        matches!(value, Value::Sym(_))
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        match value {
            Value::Str(s) => Ok(Value::Sym(s)),
            other => Err(CoerceError::mismatch(
                &other,
                "symbol",
                format!("no conversion from {}", other.type_name()),
            )),
        }
    }
}

/// Non-converting boolean strategy
///
/// `convert` is never reached through `receive`: any non-native,
/// non-blankish value mismatches up front. "truthiness" of strings or
/// numbers is deliberately not a coercion.
#[derive(Debug, Default, Clone, Copy)]
pub struct BooleanStrategy;

impl CoercionStrategy for BooleanStrategy {
    fn target_name(&self) -> &str {
        "boolean"
    }

    fn is_native(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        Err(CoerceError::mismatch(
            &value,
            "boolean",
            "boolean accepts no conversions",
        ))
    }
}

/// Coerces to `Value::Time` (UTC)
///
/// # Conversion policy
///
/// - `Int`: interpreted as a Unix timestamp in seconds
/// - `Str`: RFC 3339 first, then `%Y-%m-%d %H:%M:%S` assumed UTC
/// - an unparseable string is the documented fallback case: it yields
///   the absence marker plus a warning instead of an error
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeStrategy;

impl CoercionStrategy for TimeStrategy {
    fn target_name(&self) -> &str {
        "time"
    }

    fn is_native(&self, value: &Value) -> bool {
        matches!(value, Value::Time(_))
    }

    fn convert(&self, value: Value, _registry: &TypeRegistry) -> Result<Value, CoerceError> {
        match &value {
            Value::Int(secs) => match DateTime::<Utc>::from_timestamp(*secs, 0) {
                Some(t) => Ok(Value::Time(t)),
                None => Err(CoerceError::mismatch(
                    &value,
                    "time",
                    "timestamp out of range",
                )),
            },
            Value::Str(s) => {
                if let Ok(t) = DateTime::parse_from_rfc3339(s.trim()) {
                    return Ok(Value::Time(t.with_timezone(&Utc)));
                }
                if let Ok(t) = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S") {
                    return Ok(Value::Time(t.and_utc()));
                }
                warn!(input = %s, "unparseable time string, coercing to null");
                Ok(Value::Null)
            }
            other => Err(CoerceError::mismatch(
                other,
                "time",
                format!("no conversion from {}", other.type_name()),
            )),
        }
    }
}
