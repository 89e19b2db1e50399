use super::schema::{BodySchema, StringFormat};
use crate::params::TypedValue;
use http::Method;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Where a parameter's raw value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    FormData,
    Body,
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::FormData => write!(f, "formData"),
            ParameterLocation::Body => write!(f, "body"),
        }
    }
}

impl FromStr for ParameterLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(ParameterLocation::Path),
            "query" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            "formdata" | "form" => Ok(ParameterLocation::FormData),
            "body" => Ok(ParameterLocation::Body),
            other => Err(format!("unknown parameter location {other:?}")),
        }
    }
}

/// Scalar target types a raw parameter string can be coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
}

impl ScalarType {
    /// Type name used in validation messages (`must be of type int64`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int8 => "int8",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint8 => "uint8",
            ScalarType::Uint16 => "uint16",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::String => "string",
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarType::Bool | ScalarType::String)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarType {
    type Err = String;

    /// Accepts the width-qualified names plus the description-level
    /// aliases `boolean`, `integer` (int64) and `number` (float64).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" | "boolean" => Ok(ScalarType::Bool),
            "int8" => Ok(ScalarType::Int8),
            "int16" => Ok(ScalarType::Int16),
            "int32" => Ok(ScalarType::Int32),
            "int64" | "integer" => Ok(ScalarType::Int64),
            "uint8" => Ok(ScalarType::Uint8),
            "uint16" => Ok(ScalarType::Uint16),
            "uint32" => Ok(ScalarType::Uint32),
            "uint64" => Ok(ScalarType::Uint64),
            "float32" | "float" => Ok(ScalarType::Float32),
            "float64" | "double" | "number" => Ok(ScalarType::Float64),
            "string" => Ok(ScalarType::String),
            other => Err(format!("{other} is an invalid type name")),
        }
    }
}

/// Declared target type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Scalar(ScalarType),
    /// A sequence of one scalar type, packed per the parameter's collection format.
    Array(ScalarType),
    /// The request body, decoded by the negotiated consumer.
    Body,
}

impl ParamType {
    #[must_use]
    pub fn scalar(ty: ScalarType) -> Self {
        ParamType::Scalar(ty)
    }

    #[must_use]
    pub fn array(ty: ScalarType) -> Self {
        ParamType::Array(ty)
    }

    #[must_use]
    pub fn element(&self) -> Option<ScalarType> {
        match self {
            ParamType::Scalar(t) | ParamType::Array(t) => Some(*t),
            ParamType::Body => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Scalar(t) => write!(f, "{t}"),
            ParamType::Array(t) => write!(f, "[]{t}"),
            ParamType::Body => write!(f, "body"),
        }
    }
}

/// String-encoding convention for sequence parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFormat {
    #[default]
    Csv,
    Ssv,
    Tsv,
    Pipes,
    /// One raw occurrence per element (`?tag=a&tag=b`).
    Multi,
}

impl CollectionFormat {
    /// Element delimiter, or `None` for [`CollectionFormat::Multi`].
    #[must_use]
    pub fn delimiter(&self) -> Option<char> {
        match self {
            CollectionFormat::Csv => Some(','),
            CollectionFormat::Ssv => Some(' '),
            CollectionFormat::Tsv => Some('\t'),
            CollectionFormat::Pipes => Some('|'),
            CollectionFormat::Multi => None,
        }
    }
}

impl FromStr for CollectionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "csv" => Ok(CollectionFormat::Csv),
            "ssv" => Ok(CollectionFormat::Ssv),
            "tsv" => Ok(CollectionFormat::Tsv),
            "pipes" => Ok(CollectionFormat::Pipes),
            "multi" => Ok(CollectionFormat::Multi),
            other => Err(format!("the collection format {other:?} is not supported")),
        }
    }
}

/// A compiled `pattern` constraint that remembers its source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Value constraints applied after a successful coercion.
///
/// Numeric bounds apply to numeric scalars, format, length and pattern to
/// strings, item counts and uniqueness to sequences. For sequences the scalar
/// constraints apply to every element.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub maximum: Option<f64>,
    pub exclusive_maximum: bool,
    pub minimum: Option<f64>,
    pub exclusive_minimum: bool,
    pub multiple_of: Option<f64>,
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub format: Option<StringFormat>,
    pub enum_values: Vec<TypedValue>,
    pub max_items: Option<usize>,
    pub min_items: Option<usize>,
    pub unique_items: bool,
}

impl Constraints {
    #[must_use]
    pub fn maximum(mut self, max: f64, exclusive: bool) -> Self {
        self.maximum = Some(max);
        self.exclusive_maximum = exclusive;
        self
    }

    #[must_use]
    pub fn minimum(mut self, min: f64, exclusive: bool) -> Self {
        self.minimum = Some(min);
        self.exclusive_minimum = exclusive;
        self
    }

    #[must_use]
    pub fn multiple_of(mut self, factor: f64) -> Self {
        self.multiple_of = Some(factor);
        self
    }

    #[must_use]
    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    #[must_use]
    pub fn format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub fn one_of(mut self, values: Vec<TypedValue>) -> Self {
        self.enum_values = values;
        self
    }

    #[must_use]
    pub fn items(mut self, min: Option<usize>, max: Option<usize>, unique: bool) -> Self {
        self.min_items = min;
        self.max_items = max;
        self.unique_items = unique;
        self
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub location: ParameterLocation,
    pub param_type: ParamType,
    pub collection_format: CollectionFormat,
    pub required: bool,
    pub default_value: Option<TypedValue>,
    pub constraints: Constraints,
    /// Schema the decoded body must satisfy. Body parameters only.
    pub schema: Option<BodySchema>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, location: ParameterLocation, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            location,
            param_type,
            collection_format: CollectionFormat::default(),
            required: false,
            default_value: None,
            constraints: Constraints::default(),
            schema: None,
        }
    }

    /// Path parameters are always required.
    pub fn path(name: impl Into<String>, param_type: ParamType) -> Self {
        Self::new(name, ParameterLocation::Path, param_type).required(true)
    }

    pub fn query(name: impl Into<String>, param_type: ParamType) -> Self {
        Self::new(name, ParameterLocation::Query, param_type)
    }

    pub fn header(name: impl Into<String>, param_type: ParamType) -> Self {
        Self::new(name, ParameterLocation::Header, param_type)
    }

    pub fn form(name: impl Into<String>, param_type: ParamType) -> Self {
        Self::new(name, ParameterLocation::FormData, param_type)
    }

    pub fn body(name: impl Into<String>) -> Self {
        Self::new(name, ParameterLocation::Body, ParamType::Body)
    }

    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: TypedValue) -> Self {
        self.default_value = Some(value);
        self
    }

    #[must_use]
    pub fn collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = format;
        self
    }

    #[must_use]
    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: BodySchema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// A single `(scheme, scopes)` pair inside a security alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRequirement {
    pub scheme: String,
    pub scopes: Vec<String>,
}

/// Schemes that must all succeed together. An empty alternative is the
/// anonymous alternative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityAlternative {
    requirements: Vec<SecurityRequirement>,
}

impl SecurityAlternative {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Alternative with a single scheme.
    pub fn scheme<S: Into<String>>(scheme: impl Into<String>, scopes: Vec<S>) -> Self {
        Self::anonymous().and(scheme, scopes)
    }

    /// Append another scheme that must also succeed.
    #[must_use]
    pub fn and<S: Into<String>>(mut self, scheme: impl Into<String>, scopes: Vec<S>) -> Self {
        self.requirements.push(SecurityRequirement {
            scheme: scheme.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        });
        self
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.requirements.is_empty()
    }

    #[must_use]
    pub fn requirements(&self) -> &[SecurityRequirement] {
        &self.requirements
    }
}

/// One segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// An ordered list of literal segments and named placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Lenient parse: a segment is a placeholder only when it is exactly
    /// `{name}`; anything else is matched literally. Empty segments are
    /// dropped so `/a//b/` and `/a/b` are the same template.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match placeholder_name(s) {
                Some(name) => Segment::Placeholder(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// Strict parse used when loading descriptions: braces are only
    /// allowed as a whole-segment placeholder with a non-empty name.
    pub fn parse_strict(raw: &str) -> Result<Self, String> {
        if !raw.starts_with('/') {
            return Err(format!("path template {raw:?} must start with '/'"));
        }
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            if (segment.contains('{') || segment.contains('}')) && placeholder_name(segment).is_none()
            {
                return Err(format!(
                    "path template {raw:?} has a malformed placeholder segment {segment:?}"
                ));
            }
        }
        Ok(Self::parse(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Template with placeholder names erased (`/pets/{}`); two templates
    /// with the same normalized form match exactly the same paths.
    #[must_use]
    pub fn normalized(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Placeholder(_) => out.push_str("{}"),
            }
        }
        out
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn placeholder_name(segment: &str) -> Option<&str> {
    let name = segment.strip_prefix('{')?.strip_suffix('}')?;
    if name.is_empty() || name.contains(['{', '}']) {
        return None;
    }
    Some(name)
}

/// One API endpoint, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    pub method: Method,
    pub path_template: PathTemplate,
    pub parameters: Vec<ParameterSpec>,
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
    pub security: Vec<SecurityAlternative>,
}

impl Operation {
    pub fn new(id: impl Into<String>, method: Method, path: &str) -> Self {
        Self {
            id: id.into(),
            method,
            path_template: PathTemplate::parse(path),
            parameters: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
            security: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.parameters.push(param);
        self
    }

    #[must_use]
    pub fn consumes(mut self, media_types: &[&str]) -> Self {
        self.consumes = media_types.iter().map(|m| m.to_ascii_lowercase()).collect();
        self
    }

    #[must_use]
    pub fn produces(mut self, media_types: &[&str]) -> Self {
        self.produces = media_types.iter().map(|m| m.to_ascii_lowercase()).collect();
        self
    }

    #[must_use]
    pub fn security(mut self, alternative: SecurityAlternative) -> Self {
        self.security.push(alternative);
        self
    }

    /// Names of every scheme referenced by any alternative, in declaration
    /// order without duplicates.
    #[must_use]
    pub fn scheme_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for req in self.security.iter().flat_map(|alt| alt.requirements()) {
            if !names.contains(&req.scheme.as_str()) {
                names.push(req.scheme.as_str());
            }
        }
        names
    }
}
