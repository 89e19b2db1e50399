//! # specroute
//!
//! **specroute** is the request-dispatch core of an API-description-first HTTP
//! service. Given a set of resolved operations (method + templated path,
//! declared parameters, content types and security alternatives) it turns
//! incoming requests into validated, authenticated, strongly-typed calls into
//! user handlers, and turns every failure into a well-formed HTTP error.
//!
//! It does not own a socket: hosts adapt their request type to
//! [`context::RequestView`] and receive the response through a
//! [`context::ResponseSink`].
//!
//! ## Architecture
//!
//! - **[`spec`]** - operation model and the resolved description loader
//! - **[`router`]** - per-method radix matchers, 404 vs 405 resolution
//! - **[`negotiation`]** - `Content-Type` / `Accept` negotiation and codecs
//! - **[`params`]** - raw string coercion, constraint checks, typed access
//! - **[`security`]** - authenticators and the OR-of-ANDs composer
//! - **[`context`]** - request scope, handler interface and the staged pipeline
//! - **[`errors`]** - the closed error taxonomy and its HTTP rendering
//! - **[`api`]** - startup wiring and verification
//!
//! ### Request flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Router
//!     participant Negotiator
//!     participant Security
//!     participant Binder
//!     participant Handler
//!
//!     Host->>Router: resolve(method, path)
//!     alt no template matches
//!         Router-->>Host: 404 Not Found
//!     else template matches other methods
//!         Router-->>Host: 405 + Allow
//!     end
//!     Router->>Negotiator: MatchedRoute
//!     Negotiator->>Negotiator: Content-Type vs consumes (415)
//!     Negotiator->>Negotiator: Accept vs produces (406)
//!     Negotiator->>Security: consumer + producer
//!     Security->>Security: try alternatives in order (401)
//!     Security->>Security: authorizer (403)
//!     Security->>Binder: principal
//!     Binder->>Binder: decode body (400), coerce and validate (422)
//!     Binder->>Handler: HandlerRequest
//!     Handler-->>Host: body encoded by the negotiated producer
//! ```
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use specroute::api::ApiBuilder;
//! use specroute::context::{HandlerResponse, RecordedResponse, RequestView};
//! use specroute::spec::{Operation, ParamType, ParameterSpec, ScalarType};
//!
//! let api = ApiBuilder::new()
//!     .with_default_codecs()
//!     .operation(
//!         Operation::new("listPets", Method::GET, "/pets").param(
//!             ParameterSpec::query("limit", ParamType::scalar(ScalarType::Int32))
//!                 .required(true),
//!         ),
//!     )
//!     .handler("listPets", |req| {
//!         let limit: i32 = req.param("limit").unwrap_or(10);
//!         Ok(HandlerResponse::ok(json!({ "limit": limit })))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut sink = RecordedResponse::default();
//! api.serve(&RequestView::get("/pets"), &mut sink);
//! assert_eq!(sink.status.as_u16(), 422);
//! assert_eq!(sink.body_json().unwrap()["message"], "limit in query is required");
//! ```
//!
//! ## Logging
//!
//! Every stage emits `tracing` events inside a per-request `request` span.
//! [`logging::init_logging_with_config`] installs a JSON or pretty subscriber
//! configured from `SPECROUTE_LOG_*` variables.

pub mod api;
pub mod config;
pub mod context;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod negotiation;
pub mod params;
pub mod router;
pub mod security;
pub mod spec;

pub use api::{Api, ApiBuilder};
pub use config::DispatchConfig;
pub use context::{HandlerRequest, HandlerResponse, RecordedResponse, RequestView, ResponseSink};
pub use errors::ApiError;
pub use ids::RequestId;
pub use router::{MatchedRoute, Router};
pub use spec::{load_operations, Operation, ParameterSpec, SecurityAlternative};
