use super::api::{allow_header_value, ApiError};
use crate::context::ResponseSink;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;
use tracing::{error, warn};

/// Wire representation of an error response.
#[derive(Debug, Clone)]
pub struct RenderedError {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'a [String]>,
}

const FALLBACK_BODY: &[u8] = br#"{"code":500,"message":"error rendering failed"}"#;

/// Map an error to `(status, headers, json body)`. Never fails.
#[must_use]
pub fn render(err: &ApiError) -> RenderedError {
    let mut body = ErrorBody {
        code: err.code(),
        message: err.to_string(),
        name: None,
        location: None,
        value: None,
        values: None,
    };
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    match err {
        ApiError::MethodNotAllowed { allowed, .. } => {
            match HeaderValue::from_str(&allow_header_value(allowed)) {
                Ok(v) => {
                    headers.insert(ALLOW, v);
                }
                Err(e) => warn!(error = %e, "Allow header value rejected"),
            }
        }
        ApiError::UnsupportedMediaType { allowed, .. } | ApiError::NotAcceptable { allowed } => {
            body.values = Some(allowed);
        }
        ApiError::ValidationFailure {
            name,
            location,
            value,
            ..
        } => {
            body.name = Some(name);
            body.location = Some(location.to_string());
            body.value = value.as_deref();
        }
        ApiError::ParseFailure {
            name,
            location,
            value,
            ..
        } => {
            body.name = Some(name);
            body.location = Some(location.to_string());
            body.value = Some(value);
        }
        _ => {}
    }

    let bytes = match serde_json::to_vec(&body) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "failed to serialize error body");
            FALLBACK_BODY.to_vec()
        }
    };

    RenderedError {
        status: err.status(),
        headers,
        body: bytes,
    }
}

/// Render `err` and write it to the response sink.
pub fn write_error(sink: &mut dyn ResponseSink, err: &ApiError) {
    let rendered = render(err);
    sink.set_status(rendered.status);
    for (name, value) in &rendered.headers {
        sink.set_header(name.clone(), value.clone());
    }
    if let Err(e) = sink.write_body(&rendered.body) {
        warn!(error = %e, status = rendered.status.as_u16(), "failed to write error body");
    }
}
