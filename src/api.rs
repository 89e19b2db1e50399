//! # Api assembly
//!
//! [`ApiBuilder`] collects operations, codecs, authenticators and handlers,
//! verifies that every reference resolves, and freezes the result into an
//! [`Api`]. After `build` nothing is mutable; an `Api` is a cheap clone
//! around shared read-only state and can serve from any number of threads.
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
//!         Operation::new("getPet", Method::GET, "/pets/{id}")
//!             .param(ParameterSpec::path("id", ParamType::scalar(ScalarType::Int64))),
//!     )
//!     .handler("getPet", |req| {
//!         let id: i64 = req.param("id").unwrap_or_default();
//!         Ok(HandlerResponse::ok(json!({ "id": id })))
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut sink = RecordedResponse::default();
//! api.serve(&RequestView::get("/pets/7"), &mut sink);
//! assert_eq!(sink.status.as_u16(), 200);
//! assert_eq!(sink.body_json().unwrap(), json!({ "id": 7 }));
//! ```

use crate::config::DispatchConfig;
use crate::context::pipeline;
use crate::context::{HandlerRequest, HandlerResponse, OperationHandler, RequestView, ResponseSink};
use crate::negotiation::{
    CodecRegistry, Consumer, FormCodec, JsonCodec, MediaType, Producer, TextCodec, YamlCodec, FORM,
    JSON, TEXT, YAML, YAML_ALT,
};
use crate::router::Router;
use crate::security::{Authenticator, Authenticators, Authorizer, Principal};
use crate::spec::Operation;
use anyhow::{anyhow, Context, Result};
use http::HeaderName;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only state shared by every request.
pub(crate) struct ApiShared {
    pub(crate) router: Router,
    pub(crate) codecs: CodecRegistry,
    pub(crate) authenticators: Authenticators,
    pub(crate) authorizer: Option<Arc<dyn Authorizer>>,
    pub(crate) handlers: HashMap<String, Arc<dyn OperationHandler>>,
    pub(crate) request_id_header: HeaderName,
}

/// A verified, immutable API ready to serve requests.
#[derive(Clone)]
pub struct Api {
    shared: Arc<ApiShared>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("router", &self.shared.router)
            .field("codecs", &self.shared.codecs)
            .field("authenticators", &self.shared.authenticators)
            .field("request_id_header", &self.shared.request_id_header)
            .finish_non_exhaustive()
    }
}

impl Api {
    /// Serve one request, writing the response or rendered error into `sink`.
    pub fn serve(&self, request: &RequestView, sink: &mut dyn ResponseSink) {
        pipeline::serve(&self.shared, request, sink);
    }

    /// Convenience wrapper around [`serve`](Self::serve) for hosts speaking
    /// `http` types.
    pub fn serve_http(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let view = RequestView::from(request);
        let mut sink = crate::context::RecordedResponse::default();
        self.serve(&view, &mut sink);
        sink.into_http()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.shared.router
    }

    #[must_use]
    pub fn codecs(&self) -> &CodecRegistry {
        &self.shared.codecs
    }

    #[must_use]
    pub fn request_id_header(&self) -> &HeaderName {
        &self.shared.request_id_header
    }
}

/// Collects registrations; [`build`](Self::build) verifies and freezes them.
#[derive(Default)]
pub struct ApiBuilder {
    config: DispatchConfig,
    operations: Vec<Operation>,
    codecs: CodecRegistry,
    authenticators: Authenticators,
    authorizer: Option<Arc<dyn Authorizer>>,
    handlers: HashMap<String, Arc<dyn OperationHandler>>,
}

impl ApiBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    #[must_use]
    pub fn operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations.extend(operations);
        self
    }

    /// Register the JSON, YAML, text and form codecs.
    #[must_use]
    pub fn with_default_codecs(mut self) -> Self {
        self.codecs.register(JSON, JsonCodec);
        self.codecs.register(YAML, YamlCodec);
        self.codecs.register(YAML_ALT, YamlCodec);
        self.codecs.register(TEXT, TextCodec);
        self.codecs.register(FORM, FormCodec);
        self
    }

    #[must_use]
    pub fn consumer(mut self, media_type: &str, consumer: impl Consumer + 'static) -> Self {
        self.codecs.register_consumer(media_type, consumer);
        self
    }

    #[must_use]
    pub fn producer(mut self, media_type: &str, producer: impl Producer + 'static) -> Self {
        self.codecs.register_producer(media_type, producer);
        self
    }

    /// Register one codec for both directions.
    #[must_use]
    pub fn codec<C>(mut self, media_type: &str, codec: C) -> Self
    where
        C: Consumer + Producer + Clone + 'static,
    {
        self.codecs.register(media_type, codec);
        self
    }

    #[must_use]
    pub fn authenticator(
        mut self,
        scheme: impl Into<String>,
        authenticator: impl Authenticator + 'static,
    ) -> Self {
        self.authenticators.register(scheme, authenticator);
        self
    }

    #[must_use]
    pub fn authorizer<F>(mut self, authorizer: F) -> Self
    where
        F: Fn(&Operation, Option<&Principal>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    #[must_use]
    pub fn handler<F>(self, operation_id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(HandlerRequest<'_>) -> anyhow::Result<HandlerResponse> + Send + Sync + 'static,
    {
        self.handler_impl(operation_id, handler)
    }

    #[must_use]
    pub fn handler_impl(
        mut self,
        operation_id: impl Into<String>,
        handler: impl OperationHandler + 'static,
    ) -> Self {
        let operation_id = operation_id.into();
        if self
            .handlers
            .insert(operation_id.clone(), Arc::new(handler))
            .is_some()
        {
            warn!(operation = %operation_id, "Handler replaced");
        }
        self
    }

    /// Apply media type defaults, verify every registration an operation
    /// relies on, and freeze the API.
    ///
    /// Fails listing every missing consumer, producer, authenticator and
    /// handler at once.
    pub fn build(self) -> Result<Api> {
        let ApiBuilder {
            config,
            operations,
            codecs,
            authenticators,
            authorizer,
            handlers,
        } = self;

        let operations = operations
            .into_iter()
            .map(|op| apply_defaults(op, &config))
            .collect::<Result<Vec<_>>>()?;

        verify(&operations, &codecs, &authenticators, &handlers)?;

        let request_id_header = HeaderName::from_bytes(config.request_id_header.trim().as_bytes())
            .with_context(|| format!("invalid request id header {:?}", config.request_id_header))?;

        let router = Router::with_base_path(operations, &config.base_path);
        info!(
            operations = router.route_count(),
            handlers = handlers.len(),
            request_id_header = %request_id_header,
            "Api built"
        );

        Ok(Api {
            shared: Arc::new(ApiShared {
                router,
                codecs,
                authenticators,
                authorizer,
                handlers,
                request_id_header,
            }),
        })
    }
}

/// Fill empty consumes/produces from config and reduce every media type to
/// its lowercase essence.
fn apply_defaults(mut op: Operation, config: &DispatchConfig) -> Result<Operation> {
    if op.consumes.is_empty() {
        op.consumes = config.default_consumes.clone();
    }
    if op.produces.is_empty() {
        op.produces = config.default_produces.clone();
    }
    op.consumes = essences(&op.consumes)
        .with_context(|| format!("operation {} has an invalid consumes entry", op.id))?;
    op.produces = essences(&op.produces)
        .with_context(|| format!("operation {} has an invalid produces entry", op.id))?;
    Ok(op)
}

fn essences(media_types: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(media_types.len());
    for raw in media_types {
        let media_type = MediaType::parse(raw).map_err(|e| anyhow!("{raw:?}: {e}"))?;
        let essence = media_type.essence().to_string();
        if !out.contains(&essence) {
            out.push(essence);
        }
    }
    Ok(out)
}

fn verify(
    operations: &[Operation],
    codecs: &CodecRegistry,
    authenticators: &Authenticators,
    handlers: &HashMap<String, Arc<dyn OperationHandler>>,
) -> Result<()> {
    let mut missing_consumers: Vec<&str> = Vec::new();
    let mut missing_producers: Vec<&str> = Vec::new();
    let mut missing_auth: Vec<&str> = Vec::new();
    let mut missing_handlers: Vec<&str> = Vec::new();

    for op in operations {
        for media_type in &op.consumes {
            if codecs.consumer(media_type).is_none() {
                push_unique(&mut missing_consumers, media_type);
            }
        }
        for media_type in &op.produces {
            if codecs.producer(media_type).is_none() {
                push_unique(&mut missing_producers, media_type);
            }
        }
        for scheme in op.scheme_names() {
            if !authenticators.contains(scheme) {
                push_unique(&mut missing_auth, scheme);
            }
        }
        if !handlers.contains_key(&op.id) {
            push_unique(&mut missing_handlers, &op.id);
        }
    }

    warn_unused(
        "consumer",
        codecs.consumer_types(),
        operations.iter().flat_map(|op| op.consumes.iter().map(String::as_str)),
    );
    warn_unused(
        "producer",
        codecs.producer_types(),
        operations.iter().flat_map(|op| op.produces.iter().map(String::as_str)),
    );
    warn_unused(
        "authenticator",
        authenticators.schemes(),
        operations.iter().flat_map(Operation::scheme_names),
    );
    warn_unused(
        "handler",
        handlers.keys().map(String::as_str),
        operations.iter().map(|op| op.id.as_str()),
    );

    let problems: Vec<String> = [
        (missing_consumers, "consumer"),
        (missing_producers, "producer"),
        (missing_auth, "authenticator"),
        (missing_handlers, "handler"),
    ]
    .into_iter()
    .filter(|(names, _)| !names.is_empty())
    .map(|(names, section)| format!("missing [{}] {section} registrations", names.join(", ")))
    .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(problems.join("; ")))
    }
}

fn push_unique<'a>(names: &mut Vec<&'a str>, name: &'a str) {
    if !names.contains(&name) {
        names.push(name);
    }
}

fn warn_unused<'a>(
    section: &str,
    registered: impl Iterator<Item = &'a str>,
    used: impl Iterator<Item = &'a str>,
) {
    let used: Vec<&str> = used.collect();
    let mut unused: Vec<&str> = registered
        .filter(|name| !used.iter().any(|u| u.eq_ignore_ascii_case(name)))
        .collect();
    if !unused.is_empty() {
        unused.sort_unstable();
        warn!(section, unused = ?unused, "Registrations not used by any operation");
    }
}
