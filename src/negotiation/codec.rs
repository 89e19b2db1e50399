use crate::params::{Gettable, Values};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// Failure inside a consumer or producer.
#[derive(Debug)]
pub enum CodecError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    InvalidUtf8,
    Unsupported(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Io(e) => write!(f, "{e}"),
            CodecError::Json(e) => write!(f, "{e}"),
            CodecError::Yaml(e) => write!(f, "{e}"),
            CodecError::InvalidUtf8 => write!(f, "body is not valid UTF-8"),
            CodecError::Unsupported(what) => write!(f, "{what}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Io(e) => Some(e),
            CodecError::Json(e) => Some(e),
            CodecError::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(e)
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::Json(e)
    }
}

impl From<serde_yaml::Error> for CodecError {
    fn from(e: serde_yaml::Error) -> Self {
        CodecError::Yaml(e)
    }
}

/// Decodes a request body stream into a value.
pub trait Consumer: Send + Sync {
    fn consume(&self, reader: &mut dyn Read) -> Result<Value, CodecError>;
}

/// Encodes a response value onto a stream.
pub trait Producer: Send + Sync {
    fn produce(&self, writer: &mut dyn Write, value: &Value) -> Result<(), CodecError>;
}

/// `application/json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Consumer for JsonCodec {
    fn consume(&self, reader: &mut dyn Read) -> Result<Value, CodecError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Producer for JsonCodec {
    fn produce(&self, writer: &mut dyn Write, value: &Value) -> Result<(), CodecError> {
        Ok(serde_json::to_writer(writer, value)?)
    }
}

/// `application/x-yaml` and `application/yaml`
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Consumer for YamlCodec {
    fn consume(&self, reader: &mut dyn Read) -> Result<Value, CodecError> {
        Ok(serde_yaml::from_reader(reader)?)
    }
}

impl Producer for YamlCodec {
    fn produce(&self, writer: &mut dyn Write, value: &Value) -> Result<(), CodecError> {
        Ok(serde_yaml::to_writer(writer, value)?)
    }
}

/// `text/plain`: the body is one string; non-string values are written as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Consumer for TextCodec {
    fn consume(&self, reader: &mut dyn Read) -> Result<Value, CodecError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        let text = String::from_utf8(buf).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(Value::String(text))
    }
}

impl Producer for TextCodec {
    fn produce(&self, writer: &mut dyn Write, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::String(s) => writer.write_all(s.as_bytes())?,
            Value::Null => {}
            other => serde_json::to_writer(writer, other)?,
        }
        Ok(())
    }
}

/// `application/x-www-form-urlencoded`: decodes into a JSON object whose
/// repeated keys become arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl FormCodec {
    /// Form values as a JSON object, preserving first-seen key order.
    #[must_use]
    pub fn to_object(values: &Values) -> Value {
        let mut map = Map::new();
        for (key, _) in values.iter() {
            if map.contains_key(key) {
                continue;
            }
            let all = values.get_all(key);
            let entry = if all.len() == 1 {
                Value::String(all[0].to_string())
            } else {
                Value::Array(all.iter().map(|v| Value::String((*v).to_string())).collect())
            };
            map.insert(key.to_string(), entry);
        }
        Value::Object(map)
    }
}

impl Consumer for FormCodec {
    fn consume(&self, reader: &mut dyn Read) -> Result<Value, CodecError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self::to_object(&Values::parse_bytes(&buf)))
    }
}

impl Producer for FormCodec {
    fn produce(&self, writer: &mut dyn Write, value: &Value) -> Result<(), CodecError> {
        let Value::Object(map) = value else {
            return Err(CodecError::Unsupported(
                "only objects can be form encoded".to_string(),
            ));
        };
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (key, v) in map {
            match v {
                Value::Array(items) => {
                    for item in items {
                        ser.append_pair(key, &scalar_text(item));
                    }
                }
                other => {
                    ser.append_pair(key, &scalar_text(other));
                }
            }
        }
        writer.write_all(ser.finish().as_bytes())?;
        Ok(())
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub const JSON: &str = "application/json";
pub const YAML: &str = "application/x-yaml";
pub const YAML_ALT: &str = "application/yaml";
pub const TEXT: &str = "text/plain";
pub const FORM: &str = "application/x-www-form-urlencoded";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Media type -> codec maps, populated before serving and read-only after.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    consumers: HashMap<String, Arc<dyn Consumer>>,
    producers: HashMap<String, Arc<dyn Producer>>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut consumers: Vec<&String> = self.consumers.keys().collect();
        let mut producers: Vec<&String> = self.producers.keys().collect();
        consumers.sort();
        producers.sort();
        f.debug_struct("CodecRegistry")
            .field("consumers", &consumers)
            .field("producers", &producers)
            .finish()
    }
}

impl CodecRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON, YAML, plain text and url-encoded form in both directions.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(JSON, JsonCodec);
        registry.register(YAML, YamlCodec);
        registry.register(YAML_ALT, YamlCodec);
        registry.register(TEXT, TextCodec);
        registry.register(FORM, FormCodec);
        registry
    }

    /// Register a codec that both consumes and produces `media_type`.
    pub fn register<C>(&mut self, media_type: &str, codec: C)
    where
        C: Consumer + Producer + Clone + 'static,
    {
        self.register_consumer(media_type, codec.clone());
        self.register_producer(media_type, codec);
    }

    pub fn register_consumer(&mut self, media_type: &str, consumer: impl Consumer + 'static) {
        self.consumers
            .insert(media_type.to_ascii_lowercase(), Arc::new(consumer));
    }

    pub fn register_producer(&mut self, media_type: &str, producer: impl Producer + 'static) {
        self.producers
            .insert(media_type.to_ascii_lowercase(), Arc::new(producer));
    }

    #[must_use]
    pub fn consumer(&self, media_type: &str) -> Option<Arc<dyn Consumer>> {
        self.consumers
            .get(&media_type.to_ascii_lowercase())
            .map(Arc::clone)
    }

    #[must_use]
    pub fn producer(&self, media_type: &str) -> Option<Arc<dyn Producer>> {
        self.producers
            .get(&media_type.to_ascii_lowercase())
            .map(Arc::clone)
    }

    pub fn consumer_types(&self) -> impl Iterator<Item = &str> {
        self.consumers.keys().map(String::as_str)
    }

    pub fn producer_types(&self) -> impl Iterator<Item = &str> {
        self.producers.keys().map(String::as_str)
    }
}
