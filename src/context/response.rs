use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde_json::Value;
use tracing::warn;

/// Outbound response the dispatch core writes into.
pub trait ResponseSink {
    fn set_status(&mut self, status: StatusCode);
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);
    fn append_header(&mut self, name: HeaderName, value: HeaderValue);
    fn write_body(&mut self, body: &[u8]) -> std::io::Result<()>;
}

/// In-memory sink, useful for hosts that buffer and for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Convert into an `http::Response`.
    #[must_use]
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for RecordedResponse {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    fn write_body(&mut self, body: &[u8]) -> std::io::Result<()> {
        self.body.extend_from_slice(body);
        Ok(())
    }
}

/// What a handler returns: status, extra headers and a body value that the
/// negotiated producer encodes.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// A response without a body (e.g. `204`).
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, Value::Null)
    }

    /// Add a response header. Invalid names or values are dropped with a warning.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
            }
            _ => warn!(header = %name, "dropping invalid response header"),
        }
        self
    }

    #[must_use]
    pub fn has_content_type(&self) -> bool {
        self.headers.contains_key(CONTENT_TYPE)
    }
}
