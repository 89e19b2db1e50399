//! The staged request pipeline:
//! router -> negotiation -> security -> binding -> handler.
//!
//! Each stage either hands its result to the next or fails the request;
//! nothing after a failing stage runs.

use super::handler::HandlerRequest;
use super::request::RequestView;
use super::response::{HandlerResponse, ResponseSink};
use super::scope::RequestScope;
use crate::api::ApiShared;
use crate::errors::{write_error, ApiError};
use crate::ids::RequestId;
use crate::negotiation::{resolve_consumer, resolve_producer, ResolvedProducer};
use crate::params::{bind_all, Gettable, ParamSources, Values};
use crate::security::{compose, Principal, SecurityRequest};
use crate::spec::ParameterLocation;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

/// Serve one request end to end, writing either the handler's response or
/// a rendered error into `sink`.
pub(crate) fn serve(shared: &ApiShared, request: &RequestView, sink: &mut dyn ResponseSink) {
    let request_id = RequestId::from_header_or_new(
        request
            .headers
            .get(&shared.request_id_header)
            .and_then(|v| v.to_str().ok()),
    );
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method,
        path = %request.path,
    );
    let _entered = span.enter();
    let start = Instant::now();

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        sink.set_header(shared.request_id_header.clone(), value);
    }

    let status = match run_stages(shared, request, request_id) {
        Ok((response, producer)) => match write_response(sink, response, &producer) {
            Ok(status) => status,
            Err(err) => fail(sink, &err),
        },
        Err(err) => fail(sink, &err),
    };

    info!(
        status = status.as_u16(),
        duration_us = start.elapsed().as_micros(),
        "Request completed"
    );
}

fn fail(sink: &mut dyn ResponseSink, err: &ApiError) -> StatusCode {
    if err.code() >= 500 {
        error!(kind = err.kind(), error = %err, "Request failed");
    } else {
        warn!(kind = err.kind(), code = err.code(), error = %err, "Request rejected");
    }
    write_error(sink, err);
    err.status()
}

fn run_stages(
    shared: &ApiShared,
    request: &RequestView,
    request_id: RequestId,
) -> Result<(HandlerResponse, ResolvedProducer), ApiError> {
    let route = shared.router.resolve(&request.method, &request.path)?;
    let scope = RequestScope::new(request_id, request, route);
    let route = scope.route();
    let operation = route.operation();

    // Negotiation
    let consumer = route.consumer_with(|| {
        if request.has_consumable_body() {
            resolve_consumer(request.content_type(), operation, &shared.codecs).map(Some)
        } else {
            Ok(None)
        }
    })?;
    let producer = route.producer_with(|| {
        resolve_producer(request.accept(), operation, &shared.codecs)
    })?;
    debug!(
        operation = %operation.id,
        consumes = ?consumer.as_ref().map(|c| c.media_type.as_str()),
        charset = ?consumer.as_ref().and_then(|c| c.charset.as_deref()),
        produces = %producer.media_type,
        "Content negotiated"
    );

    // Security
    let decision = route.auth_with(|| {
        compose(
            &operation.security,
            &shared.authenticators,
            &SecurityRequest::new(&request.headers, &request.query),
        )
    });
    let principal: Option<Principal> = decision.result()?.cloned();
    if decision.applies || !operation.security.is_empty() {
        debug!(
            operation = %operation.id,
            alternative = ?decision.alternative,
            principal = ?principal.as_ref().map(|p| p.subject.as_str()),
            "Authenticated"
        );
    }
    if let Some(authorizer) = &shared.authorizer {
        authorizer
            .authorize(operation, principal.as_ref())
            .map_err(ApiError::forbidden)?;
    }

    // Binding
    let needs_body = operation
        .parameters
        .iter()
        .any(|p| p.location == ParameterLocation::Body);
    let needs_form = operation
        .parameters
        .iter()
        .any(|p| p.location == ParameterLocation::FormData);

    let body = match (&consumer, needs_body) {
        (Some(c), true) => Some(scope.body(c)?),
        _ => None,
    };
    let empty_form = Values::new();
    let form = if needs_form {
        scope.form(consumer.as_ref())
    } else {
        &empty_form
    };
    let sources = ParamSources {
        path: route.path_params(),
        query: &request.query,
        header: &request.headers,
        form: Some(form as &dyn Gettable),
        body,
    };
    let params = bind_all(&operation.parameters, &sources)?;

    // Handler
    let handler = shared.handlers.get(&operation.id).ok_or_else(|| {
        ApiError::internal(format!("no handler registered for {}", operation.id))
    })?;
    debug!(operation = %operation.id, "Dispatching to handler");
    let response = handler
        .handle(HandlerRequest {
            request_id,
            operation,
            params,
            principal,
            request,
        })
        .map_err(ApiError::from_any)?;

    Ok((response, producer))
}

/// Encode the handler's body with the negotiated producer and write it.
fn write_response(
    sink: &mut dyn ResponseSink,
    response: HandlerResponse,
    producer: &ResolvedProducer,
) -> Result<StatusCode, ApiError> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|_| ApiError::internal(format!("handler returned invalid status {}", response.status)))?;

    // 204 and 304 carry no body whatever the handler returned.
    let bodiless = matches!(status, StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED);
    let mut body = Vec::new();
    if !bodiless && !response.body.is_null() {
        producer
            .producer
            .produce(&mut body, &response.body)
            .map_err(|e| ApiError::internal(format!("encoding {} response failed: {e}", producer.media_type)))?;
    }

    sink.set_status(status);
    let has_content_type = response.has_content_type();
    for (name, value) in &response.headers {
        sink.append_header(name.clone(), value.clone());
    }
    if !body.is_empty() && !has_content_type {
        if let Ok(value) = HeaderValue::from_str(&producer.media_type) {
            sink.set_header(CONTENT_TYPE, value);
        }
    }
    if let Err(e) = sink.write_body(&body) {
        warn!(error = %e, "failed to write response body");
    }
    Ok(status)
}
