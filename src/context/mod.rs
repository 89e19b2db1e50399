//! # Request context
//!
//! The per-request side of dispatch: the inbound [`RequestView`], the
//! outbound [`ResponseSink`], the [`RequestScope`] threaded through every
//! stage, and the handler interface.
//!
//! Stages run strictly in order (router, negotiation, security, binding,
//! handler) and the first failure is rendered through
//! [`write_error`](crate::errors::write_error). Untyped handler errors are
//! wrapped as `Internal` here and nowhere else.

mod handler;
pub(crate) mod pipeline;
mod request;
mod response;
mod scope;

pub use handler::{HandlerRequest, OperationHandler};
pub use request::RequestView;
pub use response::{HandlerResponse, RecordedResponse, ResponseSink};
pub use scope::RequestScope;
