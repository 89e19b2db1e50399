use crate::params::{Gettable, Values};
use http::HeaderMap;
use serde_json::Value;

/// Read-only view of the credential-bearing parts of a request.
pub struct SecurityRequest<'a> {
    pub headers: &'a HeaderMap,
    pub query: &'a Values,
}

impl<'a> SecurityRequest<'a> {
    #[must_use]
    pub fn new(headers: &'a HeaderMap, query: &'a Values) -> Self {
        Self { headers, query }
    }

    /// Header by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&'a str> {
        Gettable::get(self.headers, name)
    }

    #[inline]
    #[must_use]
    pub fn get_query(&self, name: &str) -> Option<&'a str> {
        Gettable::get(self.query, name)
    }

    /// Cookie by name from the `Cookie` header(s).
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&'a str> {
        self.headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

/// Identity produced by a successful authenticator.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub subject: String,
    /// Scheme-specific details (token claims, key metadata).
    pub claims: Value,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            claims: Value::Null,
        }
    }

    #[must_use]
    pub fn with_claims(mut self, claims: Value) -> Self {
        self.claims = claims;
        self
    }
}
