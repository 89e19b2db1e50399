//! # Security Module
//!
//! Named authentication schemes and the composition of an operation's
//! security alternatives.
//!
//! ## Overview
//!
//! Each scheme named in an operation's security alternatives is backed by
//! an [`Authenticator`] registered under that name:
//! - **Basic** - [`BasicAuth`] decodes `Authorization: Basic ...`
//! - **API key** - [`ApiKeyAuth`] reads a named header or query parameter
//! - **Bearer** - [`BearerAuth`] reads `Authorization: Bearer ...`, an
//!   optional cookie, or `access_token`
//!
//! An authenticator reports [`AuthOutcome::NotApplicable`] when the request
//! carries no credentials for it, so the composer can move on to the next
//! alternative.
//!
//! ## Composition
//!
//! [`compose`] walks the alternatives in declaration order. Schemes inside
//! an alternative are AND'ed, alternatives are OR'ed, and the first
//! alternative that applies (successfully or not) decides the outcome. An
//! anonymous alternative only grants access when nothing else applied.
//!
//! ```rust
//! use http::HeaderMap;
//! use specroute::params::Values;
//! use specroute::security::{compose, ApiKeyAuth, Authenticators, Principal, SecurityRequest};
//! use specroute::spec::SecurityAlternative;
//!
//! let mut authenticators = Authenticators::new();
//! authenticators.register("api_key", ApiKeyAuth::header("X-Key", |key| {
//!     Ok(Principal::new(format!("key:{}", key.len())))
//! }));
//!
//! let alternatives = vec![SecurityAlternative::scheme("api_key", Vec::<String>::new())];
//! let headers = HeaderMap::new();
//! let query = Values::new();
//! let decision = compose(&alternatives, &authenticators, &SecurityRequest::new(&headers, &query));
//! assert_eq!(decision.error.map(|e| e.code()), Some(401));
//! ```

mod composer;
mod request;
mod schemes;

pub use composer::{compose, AuthDecision, Authenticators, Authorizer};
pub use request::{Principal, SecurityRequest};
pub use schemes::{ApiKeyAuth, ApiKeyLocation, AuthOutcome, Authenticator, BasicAuth, BearerAuth};
