//! # Router Module
//!
//! Compiles operations into a lookup structure and resolves incoming
//! `(method, path)` pairs to a [`MatchedRoute`].
//!
//! ## Architecture
//!
//! 1. **Build**: operations are grouped by HTTP method and each method gets
//!    its own radix tree over path templates. Literal segments match
//!    exactly; `{name}` placeholders match any single non-empty segment and
//!    capture it by name.
//!
//! 2. **Lookup**: the request path is split on `/` (empty segments are
//!    ignored), the configured base path is stripped, and the method's tree
//!    is searched. On a miss, [`Router::other_methods`] probes every other
//!    method's tree so the caller can answer `405` with an `Allow` header
//!    instead of `404`.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use specroute::router::Router;
//! use specroute::spec::Operation;
//!
//! let router = Router::new(vec![
//!     Operation::new("addPet", Method::POST, "/pets"),
//!     Operation::new("deletePet", Method::DELETE, "/pets/{id}"),
//! ]);
//!
//! assert!(router.lookup(&Method::GET, "/pets").is_none());
//! assert_eq!(router.other_methods(&Method::GET, "/pets"), vec![Method::POST]);
//!
//! let matched = router.lookup(&Method::DELETE, "/pets/42").unwrap();
//! assert_eq!(matched.operation_id(), "deletePet");
//! assert_eq!(matched.path_param("id"), Some("42"));
//! ```

mod core;
mod radix;

pub use core::{MatchedRoute, ParamVec, Router, MAX_INLINE_PARAMS};
