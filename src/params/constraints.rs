use super::value::TypedValue;
use crate::errors::ApiError;
use crate::spec::{Constraints, ParameterSpec};
use std::cmp::Ordering;

/// Check sequence-level constraints: item counts, then uniqueness.
pub(crate) fn check_items(
    spec: &ParameterSpec,
    items: &[TypedValue],
    raw: &str,
) -> Result<(), ApiError> {
    let c = &spec.constraints;
    let fail = |desc: String| Err(ApiError::validation(&spec.name, spec.location, Some(raw), desc));

    if let Some(max) = c.max_items {
        if items.len() > max {
            return fail(format!("should have at most {max} items"));
        }
    }
    if let Some(min) = c.min_items {
        if items.len() < min {
            return fail(format!("should have at least {min} items"));
        }
    }
    if c.unique_items {
        for (i, item) in items.iter().enumerate() {
            if items[..i].contains(item) {
                return fail("shouldn't contain duplicates".to_string());
            }
        }
    }
    Ok(())
}

/// Check scalar constraints against one coerced value. The first violated
/// constraint wins: maximum, minimum, multipleOf, format, maxLength,
/// minLength, pattern, enum.
pub(crate) fn check_scalar(
    spec: &ParameterSpec,
    value: &TypedValue,
    raw: &str,
) -> Result<(), ApiError> {
    match describe_violation(&spec.constraints, value) {
        Some(desc) => Err(ApiError::validation(
            &spec.name,
            spec.location,
            Some(raw),
            desc,
        )),
        None => Ok(()),
    }
}

fn describe_violation(c: &Constraints, value: &TypedValue) -> Option<String> {
    if let Some(max) = c.maximum {
        match compare_to_bound(value, max) {
            Some(Ordering::Greater) if !c.exclusive_maximum => {
                return Some(format!("should be less than or equal to {max}"));
            }
            Some(Ordering::Greater | Ordering::Equal) if c.exclusive_maximum => {
                return Some(format!("should be less than {max}"));
            }
            _ => {}
        }
    }
    if let Some(min) = c.minimum {
        match compare_to_bound(value, min) {
            Some(Ordering::Less) if !c.exclusive_minimum => {
                return Some(format!("should be greater than or equal to {min}"));
            }
            Some(Ordering::Less | Ordering::Equal) if c.exclusive_minimum => {
                return Some(format!("should be greater than {min}"));
            }
            _ => {}
        }
    }
    if let Some(factor) = c.multiple_of {
        if factor > 0.0 && !is_multiple_of(value, factor) {
            return Some(format!("should be a multiple of {factor}"));
        }
    }

    if let Some(s) = value.as_str() {
        if let Some(format) = &c.format {
            if !format.is_match(s) {
                return Some(format!("must be of type {}", format.as_str()));
            }
        }
        let len = s.chars().count();
        if let Some(max) = c.max_length {
            if len > max {
                return Some(format!("should be at most {max} chars long"));
            }
        }
        if let Some(min) = c.min_length {
            if len < min {
                return Some(format!("should be at least {min} chars long"));
            }
        }
        if let Some(pattern) = &c.pattern {
            if !pattern.is_match(s) {
                return Some(format!("should match '{}'", pattern.as_str()));
            }
        }
    }

    if !c.enum_values.is_empty() && !in_enum(&c.enum_values, value) {
        let listed: Vec<String> = c.enum_values.iter().map(ToString::to_string).collect();
        return Some(format!("should be one of [{}]", listed.join(" ")));
    }
    None
}

// Integral values are compared exactly; widening an i64 or u64 to f64
// rounds above 2^53.
fn compare_to_bound(value: &TypedValue, bound: f64) -> Option<Ordering> {
    if let Some(n) = value.as_i128() {
        let floor = bound.floor();
        if floor.abs() < 1e38 {
            let whole = floor as i128;
            return Some(match n.cmp(&whole) {
                Ordering::Equal if bound > floor => Ordering::Less,
                other => other,
            });
        }
    }
    value.as_f64()?.partial_cmp(&bound)
}

fn is_multiple_of(value: &TypedValue, factor: f64) -> bool {
    if let Some(n) = value.as_i128() {
        if factor.fract() == 0.0 && factor < 1e38 {
            return n % (factor as i128) == 0;
        }
    }
    match value.as_f64() {
        Some(n) => {
            let q = n / factor;
            (q - q.round()).abs() < 1e-9
        }
        None => true,
    }
}

// Enum values may have been declared with a different numeric width than
// the parameter, so fall back to comparing the textual form.
fn in_enum(allowed: &[TypedValue], value: &TypedValue) -> bool {
    allowed
        .iter()
        .any(|e| e == value || e.to_string() == value.to_string())
}
