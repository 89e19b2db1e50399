use super::request::RequestView;
use crate::errors::ApiError;
use crate::ids::RequestId;
use crate::negotiation::{ResolvedConsumer, FORM};
use crate::params::Values;
use crate::router::MatchedRoute;
use crate::spec::ParameterLocation;
use once_cell::unsync::OnceCell;
use serde_json::Value;

/// Per-request state threaded through every dispatch stage.
///
/// Created by the entry point once the route is known and dropped when the
/// response is written. Nothing in here outlives or is shared across
/// requests.
pub struct RequestScope<'r> {
    request_id: RequestId,
    request: &'r RequestView,
    route: MatchedRoute,
    form: OnceCell<Values>,
    body: OnceCell<Result<Value, ApiError>>,
}

impl<'r> RequestScope<'r> {
    #[must_use]
    pub fn new(request_id: RequestId, request: &'r RequestView, route: MatchedRoute) -> Self {
        Self {
            request_id,
            request,
            route,
            form: OnceCell::new(),
            body: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn request(&self) -> &'r RequestView {
        self.request
    }

    #[must_use]
    pub fn route(&self) -> &MatchedRoute {
        &self.route
    }

    /// Form values: the host's pre-parsed form if any, otherwise the body
    /// parsed once when it was negotiated as url-encoded.
    pub fn form(&self, consumer: Option<&ResolvedConsumer>) -> &Values {
        self.form.get_or_init(|| {
            if let Some(form) = &self.request.form {
                return form.clone();
            }
            match consumer {
                Some(c) if c.media_type == FORM => Values::parse_bytes(&self.request.body),
                _ => Values::new(),
            }
        })
    }

    /// Body decoded by the negotiated consumer, once per request.
    pub fn body(&self, consumer: &ResolvedConsumer) -> Result<&Value, ApiError> {
        self.body
            .get_or_init(|| {
                if self.request.body.is_empty() {
                    return Ok(Value::Null);
                }
                let mut reader = self.request.body.as_slice();
                consumer
                    .consumer
                    .consume(&mut reader)
                    .map_err(|e| ApiError::parse_failure("body", ParameterLocation::Body, "", e))
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}
