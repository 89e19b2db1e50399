use super::coerce::{coerce_scalar, split_collection};
use super::constraints::{check_items, check_scalar};
use super::value::{FromTypedValue, TypedValue};
use super::values::Gettable;
use crate::errors::ApiError;
use crate::spec::{CollectionFormat, ParamType, ParameterLocation, ParameterSpec};
use serde_json::Value;
use tracing::debug;

/// Raw value sources for one request, one per parameter location.
pub struct ParamSources<'a> {
    pub path: &'a dyn Gettable,
    pub query: &'a dyn Gettable,
    pub header: &'a dyn Gettable,
    pub form: Option<&'a dyn Gettable>,
    pub body: Option<&'a Value>,
}

/// Parameters bound for one request, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParams {
    values: Vec<(String, TypedValue)>,
}

impl BoundParams {
    /// Typed access by parameter name.
    #[must_use]
    pub fn get<T: FromTypedValue>(&self, name: &str) -> Option<T> {
        self.value(name).and_then(T::from_typed)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&TypedValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every bound value as a JSON object keyed by parameter name.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(n, v)| (n.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Bind every declared parameter in order, stopping at the first failure.
pub fn bind_all(
    params: &[ParameterSpec],
    sources: &ParamSources<'_>,
) -> Result<BoundParams, ApiError> {
    let mut values = Vec::with_capacity(params.len());
    for spec in params {
        let value = bind_param(spec, sources)?;
        values.push((spec.name.clone(), value));
    }
    Ok(BoundParams { values })
}

/// Bind a single parameter from its declared location.
pub fn bind_param(spec: &ParameterSpec, sources: &ParamSources<'_>) -> Result<TypedValue, ApiError> {
    if spec.location == ParameterLocation::Body {
        return bind_body(spec, sources.body);
    }
    let source: Option<&dyn Gettable> = match spec.location {
        ParameterLocation::Path => Some(sources.path),
        ParameterLocation::Query => Some(sources.query),
        ParameterLocation::Header => Some(sources.header),
        ParameterLocation::FormData => sources.form,
        ParameterLocation::Body => None,
    };
    let raw: Vec<&str> = match source {
        Some(src) => read_raw(spec, src),
        None => Vec::new(),
    };
    coerce_param(spec, &raw)
}

fn read_raw<'s>(spec: &ParameterSpec, source: &'s dyn Gettable) -> Vec<&'s str> {
    let multi = matches!(spec.param_type, ParamType::Array(_))
        && spec.collection_format == CollectionFormat::Multi;
    if multi {
        source
            .get_all(&spec.name)
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        source
            .get(&spec.name)
            .filter(|s| !s.is_empty())
            .into_iter()
            .collect()
    }
}

/// Apply the required/default/zero rules, then coerce and check
/// constraints. `raw` is empty when the value is absent; for scalars and
/// packed sequences it holds one string, for `multi` one per occurrence.
/// A packed sequence that splits into no elements counts as absent.
pub fn coerce_param(spec: &ParameterSpec, raw: &[&str]) -> Result<TypedValue, ApiError> {
    let elements: Vec<&str> = match (spec.param_type, raw.first()) {
        (ParamType::Array(_), Some(packed)) if spec.collection_format != CollectionFormat::Multi => {
            split_collection(spec.collection_format, packed)
        }
        _ => raw.to_vec(),
    };
    if elements.is_empty() {
        if let Some(default) = &spec.default_value {
            debug!(param = %spec.name, location = %spec.location, "using default value");
            return Ok(default.clone());
        }
        if spec.required {
            return Err(ApiError::required(&spec.name, spec.location));
        }
        return Ok(TypedValue::zero(spec.param_type));
    }

    match spec.param_type {
        ParamType::Scalar(ty) => {
            let text = elements[0];
            let value = coerce_scalar(ty, text)
                .ok_or_else(|| ApiError::invalid_type(&spec.name, spec.location, ty.name(), text))?;
            check_scalar(spec, &value, text)?;
            Ok(value)
        }
        ParamType::Array(ty) => {
            let mut items = Vec::with_capacity(elements.len());
            for element in &elements {
                let item = coerce_scalar(ty, element).ok_or_else(|| {
                    ApiError::invalid_type(&spec.name, spec.location, ty.name(), element)
                })?;
                items.push(item);
            }
            check_items(spec, &items, &raw.join(","))?;
            for (item, element) in items.iter().zip(&elements) {
                check_scalar(spec, item, element)?;
            }
            Ok(TypedValue::List(items))
        }
        ParamType::Body => Ok(TypedValue::Json(Value::String(elements[0].to_string()))),
    }
}

fn bind_body(spec: &ParameterSpec, body: Option<&Value>) -> Result<TypedValue, ApiError> {
    match body {
        Some(v) if !v.is_null() => {
            if let Some(schema) = &spec.schema {
                let violations = schema.violations(v);
                if !violations.is_empty() {
                    debug!(param = %spec.name, count = violations.len(), "body schema violations");
                    return Err(ApiError::validation(
                        &spec.name,
                        ParameterLocation::Body,
                        None,
                        format!("does not match its schema: {}", violations.join("; ")),
                    ));
                }
            }
            Ok(TypedValue::Json(v.clone()))
        }
        _ => {
            if let Some(default) = &spec.default_value {
                return Ok(default.clone());
            }
            if spec.required {
                return Err(ApiError::required(&spec.name, ParameterLocation::Body));
            }
            Ok(TypedValue::Json(Value::Null))
        }
    }
}
