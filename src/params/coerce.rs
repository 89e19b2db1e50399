use super::value::TypedValue;
use crate::spec::{CollectionFormat, ScalarType};

/// Parse one raw string into `ty`. `None` means the string is not a valid
/// literal of that type (including out-of-range integers and non-finite
/// floats).
#[must_use]
pub fn coerce_scalar(ty: ScalarType, raw: &str) -> Option<TypedValue> {
    let value = match ty {
        ScalarType::Bool => match raw {
            "true" => TypedValue::Bool(true),
            "false" => TypedValue::Bool(false),
            _ => return None,
        },
        ScalarType::Int8 => TypedValue::I8(raw.parse().ok()?),
        ScalarType::Int16 => TypedValue::I16(raw.parse().ok()?),
        ScalarType::Int32 => TypedValue::I32(raw.parse().ok()?),
        ScalarType::Int64 => TypedValue::I64(raw.parse().ok()?),
        ScalarType::Uint8 => TypedValue::U8(raw.parse().ok()?),
        ScalarType::Uint16 => TypedValue::U16(raw.parse().ok()?),
        ScalarType::Uint32 => TypedValue::U32(raw.parse().ok()?),
        ScalarType::Uint64 => TypedValue::U64(raw.parse().ok()?),
        ScalarType::Float32 => {
            let v: f32 = raw.parse().ok()?;
            if !v.is_finite() {
                return None;
            }
            TypedValue::F32(v)
        }
        ScalarType::Float64 => {
            let v: f64 = raw.parse().ok()?;
            if !v.is_finite() {
                return None;
            }
            TypedValue::F64(v)
        }
        ScalarType::String => TypedValue::String(raw.to_string()),
    };
    Some(value)
}

/// Split a packed sequence value by its collection format's delimiter.
/// Elements are trimmed and empty elements dropped. `multi` values arrive
/// pre-split and are returned as one element.
#[must_use]
pub fn split_collection(format: CollectionFormat, raw: &str) -> Vec<&str> {
    match format.delimiter() {
        Some(delim) => raw
            .split(delim)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect(),
        None => vec![raw],
    }
}
