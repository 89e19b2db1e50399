use crate::params::Values;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::warn;

/// Read-only view of an inbound HTTP request.
#[derive(Debug, Clone)]
pub struct RequestView {
    pub method: Method,
    /// Request path without the query string.
    pub path: String,
    pub headers: HeaderMap,
    pub query: Values,
    /// Pre-parsed form values, when the host already decoded the body.
    pub form: Option<Values>,
    pub body: Vec<u8>,
}

impl RequestView {
    /// Build a view from a method and a request target (`/pets?limit=5`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Values::parse(q)),
            None => (target, Values::new()),
        };
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            query,
            form: None,
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    /// Append a header. Invalid names or values are dropped with a warning.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.append(n, v);
            }
            _ => warn!(header = %name, "dropping invalid request header"),
        }
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching `Content-Type`.
    #[must_use]
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string())
    }

    #[must_use]
    pub fn form(mut self, values: Values) -> Self {
        self.form = Some(values);
        self
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn accept(&self) -> Option<&str> {
        self.headers.get(ACCEPT).and_then(|v| v.to_str().ok())
    }

    /// Whether the request body should be run through a consumer: only
    /// methods that carry a body, and only when there is a body or a
    /// declared `Content-Type`.
    #[must_use]
    pub fn has_consumable_body(&self) -> bool {
        let body_method = matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        );
        body_method && (!self.body.is_empty() || self.headers.contains_key(CONTENT_TYPE))
    }
}

impl From<http::Request<Vec<u8>>> for RequestView {
    fn from(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let query = parts.uri.query().map(Values::parse).unwrap_or_default();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            query,
            form: None,
            body,
        }
    }
}
