//! Loader for already-resolved operation descriptions.
//!
//! The input is a flat list of operations, with every reference already
//! inlined, written as YAML (`.yaml`/`.yml`) or JSON:
//!
//! ```yaml
//! base_path: /api          # optional, informational
//! operations:
//!   - id: listPets
//!     method: GET
//!     path: /pets
//!     produces: [application/json]
//!     parameters:
//!       - { name: limit, in: query, type: integer, format: int32, maximum: 100, default: 20 }
//!       - { name: tags, in: query, type: array, items: { type: string }, collectionFormat: multi }
//!       - { name: since, in: query, type: string, format: date }
//!     security:
//!       - [{ scheme: api_key }]
//!       - []                  # anonymous alternative
//! ```
//!
//! A bare top-level list of operations is accepted as well.

use super::schema::{BodySchema, StringFormat};
use super::types::{
    CollectionFormat, Constraints, Operation, ParamType, ParameterLocation, ParameterSpec,
    PathTemplate, Pattern, ScalarType, SecurityAlternative,
};
use crate::params::{coerce_scalar, TypedValue};
use anyhow::{anyhow, bail, Context, Result};
use http::Method;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped {
        #[serde(default)]
        base_path: Option<String>,
        operations: Vec<RawOperation>,
    },
    List(Vec<RawOperation>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOperation {
    id: String,
    method: String,
    path: String,
    #[serde(default)]
    parameters: Vec<RawParameter>,
    #[serde(default)]
    consumes: Vec<String>,
    #[serde(default)]
    produces: Vec<String>,
    #[serde(default)]
    security: Vec<Vec<RawRequirement>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(rename = "type", default)]
    ty: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    items: Option<RawItems>,
    #[serde(default)]
    collection_format: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default: Option<Value>,
    #[serde(rename = "enum", default)]
    enum_values: Vec<Value>,
    #[serde(default)]
    maximum: Option<f64>,
    #[serde(default)]
    exclusive_maximum: bool,
    #[serde(default)]
    minimum: Option<f64>,
    #[serde(default)]
    exclusive_minimum: bool,
    #[serde(default)]
    multiple_of: Option<f64>,
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    max_items: Option<usize>,
    #[serde(default)]
    min_items: Option<usize>,
    #[serde(default)]
    unique_items: bool,
    #[serde(default)]
    schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawItems {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequirement {
    scheme: String,
    #[serde(default)]
    scopes: Vec<String>,
}

/// Load operations from a resolved description file.
///
/// Format is chosen by extension: `.yaml`/`.yml` as YAML, anything else as
/// JSON. Every invalid entry fails the load with the operation and
/// parameter it came from.
pub fn load_operations<P: AsRef<Path>>(path: P) -> Result<Vec<Operation>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read description {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let operations = if is_yaml {
        operations_from_yaml(&content)
    } else {
        operations_from_json(&content)
    }
    .with_context(|| format!("Invalid description {}", path.display()))?;
    info!(
        path = %path.display(),
        operations = operations.len(),
        "Loaded operation description"
    );
    Ok(operations)
}

pub fn operations_from_yaml(content: &str) -> Result<Vec<Operation>> {
    let doc: RawDocument =
        serde_yaml::from_str(content).context("Failed to parse YAML description")?;
    convert_document(doc)
}

pub fn operations_from_json(content: &str) -> Result<Vec<Operation>> {
    let doc: RawDocument =
        serde_json::from_str(content).context("Failed to parse JSON description")?;
    convert_document(doc)
}

fn convert_document(doc: RawDocument) -> Result<Vec<Operation>> {
    let raw_ops = match doc {
        RawDocument::Wrapped {
            base_path,
            operations,
        } => {
            if let Some(base_path) = base_path {
                debug!(base_path = %base_path, "Description declares a base path");
            }
            operations
        }
        RawDocument::List(operations) => operations,
    };
    raw_ops
        .into_iter()
        .map(|raw| {
            let id = raw.id.clone();
            convert_operation(raw).with_context(|| format!("operation {id:?}"))
        })
        .collect()
}

fn convert_operation(raw: RawOperation) -> Result<Operation> {
    if raw.id.trim().is_empty() {
        bail!("operation id must not be empty");
    }
    let method = Method::from_bytes(raw.method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method {:?}", raw.method))?;
    let path_template = PathTemplate::parse_strict(&raw.path).map_err(|e| anyhow!(e))?;

    let mut parameters = Vec::with_capacity(raw.parameters.len());
    for param in raw.parameters {
        let name = param.name.clone();
        let spec = convert_parameter(param).with_context(|| format!("parameter {name:?}"))?;
        if spec.location == ParameterLocation::Path
            && !path_template.placeholders().any(|p| p == spec.name)
        {
            bail!(
                "path parameter {:?} does not appear in {}",
                spec.name,
                path_template
            );
        }
        parameters.push(spec);
    }

    let security = raw
        .security
        .into_iter()
        .map(|alt| {
            alt.into_iter()
                .fold(SecurityAlternative::anonymous(), |acc, r| acc.and(r.scheme, r.scopes))
        })
        .collect();

    Ok(Operation {
        id: raw.id,
        method,
        path_template,
        parameters,
        consumes: raw.consumes.iter().map(|m| m.trim().to_ascii_lowercase()).collect(),
        produces: raw.produces.iter().map(|m| m.trim().to_ascii_lowercase()).collect(),
        security,
    })
}

fn convert_parameter(raw: RawParameter) -> Result<ParameterSpec> {
    let location: ParameterLocation = raw.location.parse().map_err(|e: String| anyhow!(e))?;
    let param_type = if location == ParameterLocation::Body {
        ParamType::Body
    } else {
        match raw.ty.as_deref() {
            Some("array") => {
                let items = raw
                    .items
                    .as_ref()
                    .ok_or_else(|| anyhow!("array parameter needs an items type"))?;
                ParamType::Array(scalar_type(&items.ty, items.format.as_deref())?)
            }
            Some(ty) => ParamType::Scalar(scalar_type(ty, raw.format.as_deref())?),
            None => bail!("missing type"),
        }
    };

    let collection_format = match raw.collection_format.as_deref() {
        Some(cf) => cf.parse().map_err(|e: String| anyhow!(e))?,
        None => CollectionFormat::default(),
    };
    if collection_format == CollectionFormat::Multi
        && !matches!(location, ParameterLocation::Query | ParameterLocation::FormData)
    {
        bail!("collection format multi is only valid for query and formData parameters");
    }

    let mut constraints = Constraints {
        maximum: raw.maximum,
        exclusive_maximum: raw.exclusive_maximum,
        minimum: raw.minimum,
        exclusive_minimum: raw.exclusive_minimum,
        multiple_of: raw.multiple_of,
        max_length: raw.max_length,
        min_length: raw.min_length,
        max_items: raw.max_items,
        min_items: raw.min_items,
        unique_items: raw.unique_items,
        ..Constraints::default()
    };
    if let Some(factor) = constraints.multiple_of {
        if factor <= 0.0 {
            bail!("multipleOf must be positive, got {factor}");
        }
    }
    if let Some(source) = &raw.pattern {
        let pattern =
            Pattern::new(source).with_context(|| format!("invalid pattern {source:?}"))?;
        constraints = constraints.pattern(pattern);
    }
    let string_format = match (raw.ty.as_deref(), &raw.items) {
        (Some("string"), _) => raw.format.as_deref(),
        (Some("array"), Some(items)) if items.ty == "string" => items.format.as_deref(),
        _ => None,
    };
    if let Some(name) = string_format {
        let format = StringFormat::new(name)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("invalid format {name:?}"))?;
        if !format.is_known() {
            debug!(format = %name, "Unknown string format, values are not checked");
        }
        constraints = constraints.format(format);
    }
    if !raw.enum_values.is_empty() {
        let element = param_type
            .element()
            .ok_or_else(|| anyhow!("enum is not supported on body parameters"))?;
        let values = raw
            .enum_values
            .iter()
            .map(|v| typed_scalar(element, v))
            .collect::<Result<Vec<_>>>()
            .context("invalid enum value")?;
        constraints = constraints.one_of(values);
    }

    let default_value = raw
        .default
        .as_ref()
        .map(|v| typed_default(param_type, collection_format, v))
        .transpose()
        .context("invalid default")?;

    let schema = match raw.schema {
        Some(_) if location != ParameterLocation::Body => {
            bail!("schema is only supported on body parameters")
        }
        Some(source) => Some(
            BodySchema::new(source)
                .map_err(|e| anyhow!(e))
                .context("invalid body schema")?,
        ),
        None => None,
    };

    let mut spec = ParameterSpec::new(raw.name, location, param_type)
        .required(raw.required || location == ParameterLocation::Path)
        .collection_format(collection_format)
        .constraints(constraints);
    if let Some(value) = default_value {
        spec = spec.default_value(value);
    }
    if let Some(schema) = schema {
        spec = spec.schema(schema);
    }
    Ok(spec)
}

/// Map a description `type` (+ optional `format`) onto a scalar type.
fn scalar_type(ty: &str, format: Option<&str>) -> Result<ScalarType> {
    let scalar = match (ty, format) {
        ("integer", Some("int32")) => ScalarType::Int32,
        ("integer", Some("int64")) => ScalarType::Int64,
        ("number", Some("float")) => ScalarType::Float32,
        ("number", Some("double")) => ScalarType::Float64,
        ("string" | "file", _) => ScalarType::String,
        (ty, _) => ty.parse().map_err(|e: String| anyhow!(e))?,
    };
    Ok(scalar)
}

fn raw_text(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => bail!("expected a scalar, got {other}"),
    }
}

fn typed_scalar(ty: ScalarType, value: &Value) -> Result<TypedValue> {
    let text = raw_text(value)?;
    coerce_scalar(ty, &text).ok_or_else(|| anyhow!("{text:?} is not a valid {ty}"))
}

fn typed_default(
    param_type: ParamType,
    format: CollectionFormat,
    value: &Value,
) -> Result<TypedValue> {
    match param_type {
        ParamType::Body => Ok(TypedValue::Json(value.clone())),
        ParamType::Scalar(ty) => typed_scalar(ty, value),
        ParamType::Array(ty) => match value {
            Value::Array(items) => items
                .iter()
                .map(|v| typed_scalar(ty, v))
                .collect::<Result<Vec<_>>>()
                .map(TypedValue::List),
            other => {
                let text = raw_text(other)?;
                let parts = match format.delimiter() {
                    Some(_) => crate::params::split_collection(format, &text),
                    None => vec![text.as_str()],
                };
                parts
                    .into_iter()
                    .map(|part| {
                        coerce_scalar(ty, part)
                            .ok_or_else(|| anyhow!("{part:?} is not a valid {ty}"))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(TypedValue::List)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const PETSTORE: &str = r#"
operations:
  - id: listPets
    method: get
    path: /pets
    produces: [application/json, application/x-yaml]
    parameters:
      - { name: limit, in: query, type: integer, format: int32, maximum: 100, minimum: 1, default: 20 }
      - { name: tags, in: query, type: array, items: { type: string }, collectionFormat: multi, maxItems: 3 }
      - { name: status, in: query, type: string, enum: [available, sold], default: available }
    security:
      - [{ scheme: api_key }]
      - []
  - id: getPet
    method: GET
    path: /pets/{id}
    parameters:
      - { name: id, in: path, type: integer }
      - { name: X-Trace, in: header, type: string, pattern: "^[a-f0-9]+$" }
    security:
      - [{ scheme: oauth, scopes: [read] }, { scheme: api_key }]
  - id: addPet
    method: POST
    path: /pets
    consumes: [application/json]
    parameters:
      - { name: pet, in: body, required: true }
"#;

    #[test]
    fn test_loads_operations_from_yaml() {
        let ops = operations_from_yaml(PETSTORE).unwrap();
        assert_eq!(ops.len(), 3);

        let list = &ops[0];
        assert_eq!(list.method, Method::GET);
        assert_eq!(list.produces, vec!["application/json", "application/x-yaml"]);
        assert_eq!(list.security.len(), 2);
        assert!(list.security[1].is_anonymous());

        let limit = &list.parameters[0];
        assert_eq!(limit.param_type, ParamType::Scalar(ScalarType::Int32));
        assert_eq!(limit.constraints.maximum, Some(100.0));
        assert_eq!(limit.default_value, Some(TypedValue::I32(20)));

        let tags = &list.parameters[1];
        assert_eq!(tags.param_type, ParamType::Array(ScalarType::String));
        assert_eq!(tags.collection_format, CollectionFormat::Multi);
        assert_eq!(tags.constraints.max_items, Some(3));

        let status = &list.parameters[2];
        assert_eq!(status.constraints.enum_values.len(), 2);
    }

    #[test]
    fn test_path_params_are_required_and_security_is_ordered() {
        let ops = operations_from_yaml(PETSTORE).unwrap();
        let get = &ops[1];
        assert!(get.parameters[0].required);
        assert_eq!(get.parameters[0].param_type, ParamType::Scalar(ScalarType::Int64));
        assert_eq!(get.scheme_names(), vec!["oauth", "api_key"]);
        assert_eq!(get.security[0].requirements()[0].scopes, vec!["read"]);
        assert!(get.parameters[1].constraints.pattern.is_some());

        let add = &ops[2];
        assert_eq!(add.parameters[0].param_type, ParamType::Body);
        assert_eq!(add.consumes, vec!["application/json"]);
    }

    #[test]
    fn test_bare_json_list() {
        let ops = operations_from_json(
            r#"[{"id": "ping", "method": "HEAD", "path": "/ping"}]"#,
        )
        .unwrap();
        assert_eq!(ops[0].method, Method::HEAD);
        assert!(ops[0].parameters.is_empty());
    }

    #[test]
    fn test_array_default_from_delimited_string() {
        let ops = operations_from_yaml(
            r#"
- id: search
  method: GET
  path: /search
  parameters:
    - { name: ids, in: query, type: array, items: { type: integer }, default: "1,2" }
"#,
        )
        .unwrap();
        assert_eq!(
            ops[0].parameters[0].default_value,
            Some(TypedValue::List(vec![TypedValue::I64(1), TypedValue::I64(2)]))
        );
    }

    #[test]
    fn test_invalid_entries_name_their_origin() {
        let err = operations_from_yaml(
            r#"
- id: broken
  method: GET
  path: /things
  parameters:
    - { name: limit, in: query, type: integer, default: ten }
"#,
        )
        .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("broken"), "{chain}");
        assert!(chain.contains("limit"), "{chain}");
    }

    #[test]
    fn test_rejects_bad_templates_and_patterns() {
        assert!(operations_from_yaml("- { id: a, method: GET, path: pets }").is_err());
        assert!(operations_from_yaml("- { id: a, method: GET, path: /pets/{id }").is_err());
        assert!(operations_from_yaml(
            "- { id: a, method: GET, path: /p, parameters: [{ name: q, in: query, type: string, pattern: '(' }] }"
        )
        .is_err());
        assert!(operations_from_yaml(
            "- { id: a, method: GET, path: /p, parameters: [{ name: id, in: path, type: string }] }"
        )
        .is_err());
    }

    #[test]
    fn test_body_schema_and_string_formats() {
        let ops = operations_from_yaml(
            r#"
- id: addEvent
  method: POST
  path: /events
  parameters:
    - name: event
      in: body
      required: true
      schema: { type: object, required: [title], properties: { title: { type: string } } }
    - { name: day, in: query, type: string, format: date }
    - { name: ids, in: query, type: array, items: { type: string, format: uuid } }
    - { name: secret, in: query, type: string, format: password }
"#,
        )
        .unwrap();
        let params = &ops[0].parameters;

        let schema = params[0].schema.as_ref().unwrap();
        assert!(schema.violations(&json!({ "title": "launch" })).is_empty());
        assert!(!schema.violations(&json!({})).is_empty());

        let format_of = |i: usize| params[i].constraints.format.as_ref().map(|f| f.as_str().to_string());
        assert_eq!(format_of(1).as_deref(), Some("date"));
        assert_eq!(format_of(2).as_deref(), Some("uuid"));
        assert!(!params[3].constraints.format.as_ref().unwrap().is_known());
    }

    #[test]
    fn test_rejects_misplaced_or_broken_schema() {
        let err = operations_from_yaml(
            "- { id: a, method: GET, path: /p, parameters: [{ name: q, in: query, type: string, schema: { type: string } }] }",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("only supported on body parameters"));

        let err = operations_from_yaml(
            "- { id: a, method: POST, path: /p, parameters: [{ name: b, in: body, schema: { type: 12 } }] }",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("invalid body schema"));
    }

    #[test]
    fn test_load_operations_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("api.yaml");
        std::fs::File::create(&yaml_path)
            .unwrap()
            .write_all(PETSTORE.as_bytes())
            .unwrap();
        assert_eq!(load_operations(&yaml_path).unwrap().len(), 3);

        let json_path = dir.path().join("api.json");
        std::fs::write(
            &json_path,
            r#"{"operations": [{"id": "ping", "method": "GET", "path": "/ping"}]}"#,
        )
        .unwrap();
        assert_eq!(load_operations(&json_path).unwrap()[0].id, "ping");

        let err = load_operations(dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read description"));
    }
}
