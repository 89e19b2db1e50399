//! # Content negotiation
//!
//! Media-type parsing and consumer/producer selection.
//!
//! [`resolve_consumer`] maps a `Content-Type` header onto one of an
//! operation's consumed media types, [`resolve_producer`] maps an `Accept`
//! header onto one of its produced media types. Both are pure functions of
//! `(header, operation, registry)`; the request pipeline caches their
//! results on the [`MatchedRoute`](crate::router::MatchedRoute).
//!
//! The built-in codecs cover JSON, YAML, `text/plain` and url-encoded
//! forms. Hosts can register their own through [`CodecRegistry`].

mod codec;
mod media_type;
mod negotiator;

pub use codec::{
    CodecError, CodecRegistry, Consumer, FormCodec, JsonCodec, Producer, TextCodec, YamlCodec,
    FORM, JSON, OCTET_STREAM, TEXT, YAML, YAML_ALT,
};
pub use media_type::{parse_accept, MediaRange, MediaType, MediaTypeError};
pub use negotiator::{
    parse_content_type, resolve_consumer, resolve_producer, ResolvedConsumer, ResolvedProducer,
};
