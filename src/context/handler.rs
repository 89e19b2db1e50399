use super::request::RequestView;
use super::response::HandlerResponse;
use crate::ids::RequestId;
use crate::params::{BoundParams, FromTypedValue};
use crate::security::Principal;
use crate::spec::Operation;

/// Everything a handler gets for one validated, authenticated request.
pub struct HandlerRequest<'a> {
    pub request_id: RequestId,
    pub operation: &'a Operation,
    pub params: BoundParams,
    pub principal: Option<Principal>,
    pub request: &'a RequestView,
}

impl HandlerRequest<'_> {
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation.id
    }

    /// Typed parameter by name.
    #[inline]
    #[must_use]
    pub fn param<T: FromTypedValue>(&self, name: &str) -> Option<T> {
        self.params.get(name)
    }
}

/// User-supplied operation implementation.
///
/// An `Err` carrying an [`ApiError`](crate::errors::ApiError) is rendered
/// as that error; any other error becomes a `500`.
pub trait OperationHandler: Send + Sync {
    fn handle(&self, req: HandlerRequest<'_>) -> anyhow::Result<HandlerResponse>;
}

impl<F> OperationHandler for F
where
    F: Fn(HandlerRequest<'_>) -> anyhow::Result<HandlerResponse> + Send + Sync,
{
    fn handle(&self, req: HandlerRequest<'_>) -> anyhow::Result<HandlerResponse> {
        self(req)
    }
}
