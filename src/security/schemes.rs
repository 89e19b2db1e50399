use super::request::{Principal, SecurityRequest};
use crate::errors::ApiError;
use base64::Engine;
use std::fmt;
use std::str::FromStr;

/// Result of running one authenticator against a request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// The request carries no credential material for this scheme.
    NotApplicable,
    Authenticated(Principal),
    /// Credentials were present but rejected.
    Rejected(ApiError),
}

impl AuthOutcome {
    #[must_use]
    pub fn applies(&self) -> bool {
        !matches!(self, AuthOutcome::NotApplicable)
    }

    fn from_result(result: Result<Principal, ApiError>) -> Self {
        match result {
            Ok(p) => AuthOutcome::Authenticated(p),
            Err(e) => AuthOutcome::Rejected(e),
        }
    }
}

/// One named authentication scheme.
///
/// `scopes` are the scopes the operation requires for this scheme; checking
/// them is up to the implementation.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, scopes: &[String], req: &SecurityRequest<'_>) -> AuthOutcome;
}

type CredentialsFn = dyn Fn(&str, &str) -> Result<Principal, ApiError> + Send + Sync;
type TokenFn = dyn Fn(&str) -> Result<Principal, ApiError> + Send + Sync;
type ScopedTokenFn = dyn Fn(&str, &[String]) -> Result<Principal, ApiError> + Send + Sync;

/// HTTP basic authentication from the `Authorization` header.
pub struct BasicAuth {
    check: Box<CredentialsFn>,
}

impl BasicAuth {
    /// `check(user, password)` validates decoded credentials.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&str, &str) -> Result<Principal, ApiError> + Send + Sync + 'static,
    {
        Self {
            check: Box::new(check),
        }
    }

    fn credentials(header: &str) -> Option<(String, String)> {
        let (scheme, encoded) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (user, pass) = text.split_once(':')?;
        Some((user.to_string(), pass.to_string()))
    }
}

impl Authenticator for BasicAuth {
    fn authenticate(&self, _scopes: &[String], req: &SecurityRequest<'_>) -> AuthOutcome {
        match req.get_header("authorization").and_then(Self::credentials) {
            Some((user, pass)) => AuthOutcome::from_result((self.check)(&user, &pass)),
            None => AuthOutcome::NotApplicable,
        }
    }
}

/// Where an API key is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyLocation {
    Header,
    Query,
}

impl fmt::Display for ApiKeyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKeyLocation::Header => write!(f, "header"),
            ApiKeyLocation::Query => write!(f, "query"),
        }
    }
}

impl FromStr for ApiKeyLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "header" => Ok(ApiKeyLocation::Header),
            "query" => Ok(ApiKeyLocation::Query),
            other => Err(format!("api key can't be carried in {other:?}")),
        }
    }
}

/// API key read from a named header or query parameter.
pub struct ApiKeyAuth {
    name: String,
    location: ApiKeyLocation,
    check: Box<TokenFn>,
}

impl ApiKeyAuth {
    pub fn new<F>(name: impl Into<String>, location: ApiKeyLocation, check: F) -> Self
    where
        F: Fn(&str) -> Result<Principal, ApiError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            location,
            check: Box::new(check),
        }
    }

    pub fn header<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> Result<Principal, ApiError> + Send + Sync + 'static,
    {
        Self::new(name, ApiKeyLocation::Header, check)
    }

    pub fn query<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> Result<Principal, ApiError> + Send + Sync + 'static,
    {
        Self::new(name, ApiKeyLocation::Query, check)
    }
}

impl Authenticator for ApiKeyAuth {
    fn authenticate(&self, _scopes: &[String], req: &SecurityRequest<'_>) -> AuthOutcome {
        let token = match self.location {
            ApiKeyLocation::Header => req.get_header(&self.name),
            ApiKeyLocation::Query => req.get_query(&self.name),
        };
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => AuthOutcome::from_result((self.check)(token)),
            None => AuthOutcome::NotApplicable,
        }
    }
}

/// Bearer token from `Authorization: Bearer`, an optional cookie, or the
/// `access_token` query parameter, in that order.
pub struct BearerAuth {
    cookie_name: Option<String>,
    check: Box<ScopedTokenFn>,
}

impl BearerAuth {
    /// `check(token, required_scopes)` validates the token and its scopes.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&str, &[String]) -> Result<Principal, ApiError> + Send + Sync + 'static,
    {
        Self {
            cookie_name: None,
            check: Box::new(check),
        }
    }

    /// Also accept the token from this cookie.
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into());
        self
    }

    fn extract_token<'a>(&self, req: &SecurityRequest<'a>) -> Option<&'a str> {
        if let Some(header) = req.get_header("authorization") {
            if let Some((scheme, token)) = header.trim().split_once(' ') {
                if scheme.eq_ignore_ascii_case("bearer") {
                    return Some(token.trim());
                }
            }
        }
        if let Some(name) = &self.cookie_name {
            if let Some(token) = req.get_cookie(name) {
                return Some(token);
            }
        }
        req.get_query("access_token")
    }
}

impl Authenticator for BearerAuth {
    fn authenticate(&self, scopes: &[String], req: &SecurityRequest<'_>) -> AuthOutcome {
        match self.extract_token(req).filter(|t| !t.is_empty()) {
            Some(token) => AuthOutcome::from_result((self.check)(token, scopes)),
            None => AuthOutcome::NotApplicable,
        }
    }
}
