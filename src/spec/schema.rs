use base64::Engine;
use jsonschema::Validator;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

fn compile(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| e.to_string())
}

/// A JSON schema for a body parameter, compiled once when the operation is
/// built and shared by every request.
#[derive(Clone)]
pub struct BodySchema {
    source: Value,
    validator: Arc<Validator>,
}

impl BodySchema {
    pub fn new(source: Value) -> Result<Self, String> {
        let validator = compile(&source)?;
        Ok(Self {
            source,
            validator: Arc::new(validator),
        })
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.source
    }

    /// Every violation in `instance`, rendered as text. Empty when valid.
    #[must_use]
    pub fn violations(&self, instance: &Value) -> Vec<String> {
        self.validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect()
    }
}

impl fmt::Debug for BodySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BodySchema").field(&self.source).finish()
    }
}

#[derive(Clone)]
enum FormatCheck {
    Base64,
    Schema(Arc<Validator>),
}

/// A string `format` such as `date-time` or `uuid`.
///
/// Format names match with or without dashes (`datetime` and `date-time`).
/// Unknown formats are kept for documentation but accept any value.
#[derive(Clone)]
pub struct StringFormat {
    name: String,
    check: Option<FormatCheck>,
}

impl StringFormat {
    pub fn new(name: &str) -> Result<Self, String> {
        let canonical = match name.replace('-', "").to_ascii_lowercase().as_str() {
            "byte" => return Ok(Self::with_check(name, Some(FormatCheck::Base64))),
            "date" => "date",
            "datetime" => "date-time",
            "uri" => "uri",
            "email" => "email",
            "hostname" => "hostname",
            "ipv4" => "ipv4",
            "ipv6" => "ipv6",
            "uuid" => "uuid",
            _ => return Ok(Self::with_check(name, None)),
        };
        let validator = compile(&json!({ "type": "string", "format": canonical }))?;
        Ok(Self::with_check(
            name,
            Some(FormatCheck::Schema(Arc::new(validator))),
        ))
    }

    fn with_check(name: &str, check: Option<FormatCheck>) -> Self {
        Self {
            name: name.to_string(),
            check,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Whether values are actually checked for this format.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.check.is_some()
    }

    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        match &self.check {
            None => true,
            Some(FormatCheck::Base64) => base64::engine::general_purpose::STANDARD
                .decode(value)
                .is_ok(),
            Some(FormatCheck::Schema(validator)) => {
                validator.is_valid(&Value::String(value.to_string()))
            }
        }
    }
}

impl fmt::Debug for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StringFormat").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_formats() {
        let cases = [
            ("date", "2024-02-29", "2024-13-01"),
            ("date-time", "2024-02-29T10:00:00Z", "2024-02-29 noon"),
            ("datetime", "2024-02-29T10:00:00+02:00", "yesterday"),
            ("uuid", "67e55044-10b1-426f-9247-bb680e5fe0c8", "67e55044"),
            ("ipv4", "192.168.0.1", "300.1.1.1"),
            ("email", "ops@example.com", "ops.example.com"),
            ("byte", "aGVsbG8=", "not base64!"),
        ];
        for (name, good, bad) in cases {
            let format = StringFormat::new(name).unwrap();
            assert!(format.is_known(), "{name}");
            assert!(format.is_match(good), "{name} should accept {good}");
            assert!(!format.is_match(bad), "{name} should reject {bad}");
        }
    }

    #[test]
    fn test_unknown_format_accepts_anything() {
        let format = StringFormat::new("password").unwrap();
        assert!(!format.is_known());
        assert!(format.is_match("hunter2"));
        assert_eq!(format.as_str(), "password");
    }

    #[test]
    fn test_body_schema_lists_violations() {
        let schema = BodySchema::new(json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" }, "age": { "type": "integer", "minimum": 0 } }
        }))
        .unwrap();
        assert!(schema.violations(&json!({ "name": "Rex", "age": 3 })).is_empty());
        assert_eq!(schema.violations(&json!({ "age": -1 })).len(), 2);
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        assert!(BodySchema::new(json!({ "type": 12 })).is_err());
    }
}
