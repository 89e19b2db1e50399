use crate::spec::ParameterLocation;
use http::{Method, StatusCode};
use std::fmt;

/// Every failure the dispatch core can report to a client.
///
/// Each variant maps to one fixed HTTP status (see [`ApiError::code`]).
/// Components return these by value; the request pipeline is the only
/// place that turns an untyped error into [`ApiError::Internal`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No operation matches the request path under any method.
    NotFound {
        message: String,
    },
    /// The path matches, but only under other methods.
    MethodNotAllowed {
        requested: Method,
        /// Methods that would have matched, in declaration-encounter order.
        allowed: Vec<Method>,
    },
    /// The request `Content-Type` is not consumed by the operation.
    UnsupportedMediaType {
        got: String,
        allowed: Vec<String>,
    },
    /// Nothing in `Accept` is produced by the operation.
    NotAcceptable {
        allowed: Vec<String>,
    },
    /// A header or body could not be parsed at all.
    ParseFailure {
        name: String,
        location: ParameterLocation,
        value: String,
        cause: String,
    },
    /// A parameter was missing, of the wrong type, or violated a constraint.
    ValidationFailure {
        name: String,
        location: ParameterLocation,
        /// The offending raw value, `None` when the value was absent.
        value: Option<String>,
        constraint: String,
    },
    Unauthenticated {
        scheme: String,
    },
    Forbidden {
        reason: String,
    },
    Internal {
        cause: String,
    },
}

impl ApiError {
    /// HTTP status code for this variant. Stable per variant.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            ApiError::NotFound { .. } => 404,
            ApiError::MethodNotAllowed { .. } => 405,
            ApiError::UnsupportedMediaType { .. } => 415,
            ApiError::NotAcceptable { .. } => 406,
            ApiError::ParseFailure { .. } => 400,
            ApiError::ValidationFailure { .. } => 422,
            ApiError::Unauthenticated { .. } => 401,
            ApiError::Forbidden { .. } => 403,
            ApiError::Internal { .. } => 500,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Short machine-friendly variant name, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "not_found",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::UnsupportedMediaType { .. } => "unsupported_media_type",
            ApiError::NotAcceptable { .. } => "not_acceptable",
            ApiError::ParseFailure { .. } => "parse_failure",
            ApiError::ValidationFailure { .. } => "validation_failure",
            ApiError::Unauthenticated { .. } => "unauthenticated",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::Internal { .. } => "internal",
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    /// Router miss for `path`.
    #[must_use]
    pub fn path_not_found(path: &str) -> Self {
        ApiError::not_found(format!("path {path} was not found"))
    }

    #[must_use]
    pub fn method_not_allowed(requested: Method, allowed: Vec<Method>) -> Self {
        ApiError::MethodNotAllowed { requested, allowed }
    }

    pub fn unsupported_media_type(got: impl Into<String>, allowed: &[String]) -> Self {
        ApiError::UnsupportedMediaType {
            got: got.into(),
            allowed: allowed.to_vec(),
        }
    }

    #[must_use]
    pub fn not_acceptable(allowed: &[String]) -> Self {
        ApiError::NotAcceptable {
            allowed: allowed.to_vec(),
        }
    }

    pub fn parse_failure(
        name: impl Into<String>,
        location: ParameterLocation,
        value: impl Into<String>,
        cause: impl fmt::Display,
    ) -> Self {
        ApiError::ParseFailure {
            name: name.into(),
            location,
            value: value.into(),
            cause: cause.to_string(),
        }
    }

    pub fn validation(
        name: impl Into<String>,
        location: ParameterLocation,
        value: Option<&str>,
        constraint: impl Into<String>,
    ) -> Self {
        ApiError::ValidationFailure {
            name: name.into(),
            location,
            value: value.map(str::to_string),
            constraint: constraint.into(),
        }
    }

    /// Required value missing.
    pub fn required(name: impl Into<String>, location: ParameterLocation) -> Self {
        ApiError::validation(name, location, None, "is required")
    }

    /// Raw value could not be coerced into the declared type.
    pub fn invalid_type(
        name: impl Into<String>,
        location: ParameterLocation,
        type_name: &str,
        value: &str,
    ) -> Self {
        ApiError::validation(
            name,
            location,
            Some(value),
            format!("must be of type {type_name}"),
        )
    }

    pub fn unauthenticated(scheme: impl Into<String>) -> Self {
        ApiError::Unauthenticated {
            scheme: scheme.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        ApiError::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn internal(cause: impl fmt::Display) -> Self {
        ApiError::Internal {
            cause: cause.to_string(),
        }
    }

    /// Recover a typed error from a handler failure, wrapping anything
    /// else as [`ApiError::Internal`].
    #[must_use]
    pub fn from_any(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => ApiError::Internal {
                cause: format!("{other:#}"),
            },
        }
    }
}

fn join_methods(methods: &[Method], sep: &str) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound { message } if message.is_empty() => write!(f, "Not found"),
            ApiError::NotFound { message } => write!(f, "{message}"),
            ApiError::MethodNotAllowed { requested, allowed } => write!(
                f,
                "method {requested} is not allowed, but [{}] are",
                join_methods(allowed, ",")
            ),
            ApiError::UnsupportedMediaType { got, allowed } => write!(
                f,
                "unsupported media type {got:?}, only [{}] are allowed",
                allowed.join(" ")
            ),
            ApiError::NotAcceptable { allowed } => write!(
                f,
                "unsupported media type requested, only [{}] are available",
                allowed.join(" ")
            ),
            ApiError::ParseFailure {
                name,
                location,
                value,
                cause,
            } => write!(
                f,
                "parsing {name} {location} from {value:?} failed, because {cause}"
            ),
            ApiError::ValidationFailure {
                name,
                location,
                constraint,
                ..
            } => write!(f, "{name} in {location} {constraint}"),
            ApiError::Unauthenticated { scheme } => write!(f, "unauthenticated for {scheme}"),
            ApiError::Forbidden { reason } => write!(f, "{reason}"),
            ApiError::Internal { cause } => write!(f, "{cause}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Value of the `Allow` header for a 405: methods joined by `,` without spaces.
#[must_use]
pub fn allow_header_value(methods: &[Method]) -> String {
    join_methods(methods, ",")
}
