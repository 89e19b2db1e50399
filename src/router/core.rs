//! Route table and per-request matched route.
//!
//! The table is built once from the full operation list and is read-only
//! afterwards, so it can be shared across request tasks behind an `Arc`
//! without locking.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use once_cell::unsync::OnceCell;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::radix::RadixMatcher;
use crate::errors::ApiError;
use crate::negotiation::{ResolvedConsumer, ResolvedProducer};
use crate::security::AuthDecision;
use crate::spec::Operation;

/// Captured placeholders kept inline for the common case.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path placeholders as `(name, decoded value)` in path order.
///
/// Names are shared with the route tree; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// The resolved operation for one request, with its path captures and
/// write-once slots for results computed later in the pipeline.
///
/// A `MatchedRoute` is created per request and never shared across
/// requests; the slots are filled at most once.
#[derive(Debug)]
pub struct MatchedRoute {
    operation: Arc<Operation>,
    path_params: ParamVec,
    consumer: OnceCell<Result<Option<ResolvedConsumer>, ApiError>>,
    producer: OnceCell<Result<ResolvedProducer, ApiError>>,
    auth: OnceCell<AuthDecision>,
}

impl MatchedRoute {
    #[must_use]
    pub fn new(operation: Arc<Operation>, path_params: ParamVec) -> Self {
        Self {
            operation,
            path_params,
            consumer: OnceCell::new(),
            producer: OnceCell::new(),
            auth: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn operation(&self) -> &Arc<Operation> {
        &self.operation
    }

    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation.id
    }

    #[must_use]
    pub fn path_params(&self) -> &ParamVec {
        &self.path_params
    }

    /// Captured value for `name`. A repeated name resolves to the last capture.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Negotiated consumer, computed by `init` on first use. `Ok(None)`
    /// means the request has no body to decode.
    pub fn consumer_with<F>(&self, init: F) -> Result<Option<ResolvedConsumer>, ApiError>
    where
        F: FnOnce() -> Result<Option<ResolvedConsumer>, ApiError>,
    {
        self.consumer.get_or_init(init).clone()
    }

    pub fn producer_with<F>(&self, init: F) -> Result<ResolvedProducer, ApiError>
    where
        F: FnOnce() -> Result<ResolvedProducer, ApiError>,
    {
        self.producer.get_or_init(init).clone()
    }

    pub fn auth_with<F>(&self, init: F) -> &AuthDecision
    where
        F: FnOnce() -> AuthDecision,
    {
        self.auth.get_or_init(init)
    }

    #[must_use]
    pub fn cached_consumer(&self) -> Option<&Result<Option<ResolvedConsumer>, ApiError>> {
        self.consumer.get()
    }

    #[must_use]
    pub fn cached_producer(&self) -> Option<&Result<ResolvedProducer, ApiError>> {
        self.producer.get()
    }

    #[must_use]
    pub fn cached_auth(&self) -> Option<&AuthDecision> {
        self.auth.get()
    }
}

/// Compiled route table: one radix matcher per method.
#[derive(Clone, Debug)]
pub struct Router {
    /// Matchers in the order their method was first encountered.
    matchers: Vec<(Method, RadixMatcher)>,
    base_segments: Vec<String>,
    base_path: String,
    operations: Vec<Arc<Operation>>,
}

impl Router {
    /// Build a table with no base path.
    #[must_use]
    pub fn new(operations: Vec<Operation>) -> Self {
        Self::with_base_path(operations, "")
    }

    /// Build a table whose routes all live under `base_path` (e.g. `/api/v1`).
    ///
    /// A second operation with the same method and normalized template
    /// replaces the first.
    #[must_use]
    pub fn with_base_path(operations: Vec<Operation>, base_path: &str) -> Self {
        let mut matchers: Vec<(Method, RadixMatcher)> = Vec::new();
        let mut registered: Vec<Arc<Operation>> = Vec::with_capacity(operations.len());

        for op in operations {
            let op = Arc::new(op);
            let idx = match matchers.iter().position(|(m, _)| *m == op.method) {
                Some(i) => i,
                None => {
                    matchers.push((op.method.clone(), RadixMatcher::new()));
                    matchers.len() - 1
                }
            };
            if let Some(replaced) = matchers[idx].1.insert(Arc::clone(&op)) {
                warn!(
                    method = %op.method,
                    path = %op.path_template,
                    replaced_operation = %replaced.id,
                    operation = %op.id,
                    "Duplicate route registration, last one wins"
                );
                registered.retain(|r| !Arc::ptr_eq(r, &replaced));
            }
            registered.push(op);
        }

        let base_segments: Vec<String> = split_path(base_path).map(str::to_string).collect();
        let base_path = if base_segments.is_empty() {
            String::new()
        } else {
            format!("/{}", base_segments.join("/"))
        };

        let routes_summary: Vec<String> = registered
            .iter()
            .take(10)
            .map(|op| format!("{} {}{}", op.method, base_path, op.path_template))
            .collect();
        info!(
            routes_count = registered.len(),
            methods = matchers.len(),
            base_path = %base_path,
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self {
            matchers,
            base_segments,
            base_path,
            operations: registered,
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Every registered operation, in registration order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        self.operations.iter()
    }

    #[must_use]
    pub fn route_count(&self) -> usize {
        self.operations.len()
    }

    /// Methods with at least one route, in declaration-encounter order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.matchers.iter().map(|(m, _)| m)
    }

    /// Resolve `(method, path)` to a matched route. `None` covers both a
    /// path nobody serves and a path served only under other methods; use
    /// [`Router::other_methods`] to tell them apart.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Option<MatchedRoute> {
        let segments = self.relative_segments(path)?;
        let (_, matcher) = self.matchers.iter().find(|(m, _)| m == method)?;
        let mut params = ParamVec::new();
        let op = matcher.search(&segments, &mut params)?;
        debug!(
            method = %method,
            path = %path,
            operation = %op.id,
            route_pattern = %op.path_template,
            path_params = ?params,
            "Route matched"
        );
        Some(MatchedRoute::new(op, params))
    }

    /// Methods other than `method` whose matcher structurally accepts
    /// `path`, in declaration-encounter order.
    #[must_use]
    pub fn other_methods(&self, method: &Method, path: &str) -> Vec<Method> {
        let Some(segments) = self.relative_segments(path) else {
            return Vec::new();
        };
        self.matchers
            .iter()
            .filter(|(m, matcher)| m != method && matcher.matches(&segments))
            .map(|(m, _)| m.clone())
            .collect()
    }

    /// Lookup that reports misses as `NotFound` or `MethodNotAllowed`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<MatchedRoute, ApiError> {
        if let Some(matched) = self.lookup(method, path) {
            return Ok(matched);
        }
        let allowed = self.other_methods(method, path);
        if allowed.is_empty() {
            warn!(method = %method, path = %path, "No route matched");
            Err(ApiError::path_not_found(path))
        } else {
            warn!(
                method = %method,
                path = %path,
                allowed = ?allowed,
                "Path matched under other methods"
            );
            Err(ApiError::method_not_allowed(method.clone(), allowed))
        }
    }

    /// Request path split into segments with the base path removed, or
    /// `None` when the path lies outside the base path.
    fn relative_segments<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        let mut segments = split_path(path);
        for base in &self.base_segments {
            if segments.next()? != base.as_str() {
                return None;
            }
        }
        Some(segments.collect())
    }
}

/// Non-empty segments of a path, ignoring any query string.
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/').filter(|s| !s.is_empty())
}
