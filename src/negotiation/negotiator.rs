use super::codec::{CodecRegistry, Consumer, Producer, OCTET_STREAM};
use super::media_type::{parse_accept, MediaType};
use crate::errors::ApiError;
use crate::spec::{Operation, ParameterLocation};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// The consumer chosen for a request body.
#[derive(Clone)]
pub struct ResolvedConsumer {
    pub media_type: String,
    pub charset: Option<String>,
    pub consumer: Arc<dyn Consumer>,
}

impl fmt::Debug for ResolvedConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConsumer")
            .field("media_type", &self.media_type)
            .field("charset", &self.charset)
            .finish_non_exhaustive()
    }
}

/// The producer chosen for the response body.
#[derive(Clone)]
pub struct ResolvedProducer {
    pub media_type: String,
    pub producer: Arc<dyn Producer>,
}

impl fmt::Debug for ResolvedProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProducer")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// Parse a `Content-Type` value. Absent or blank means
/// `application/octet-stream`.
pub fn parse_content_type(header: Option<&str>) -> Result<MediaType, ApiError> {
    let raw = header.map(str::trim).unwrap_or_default();
    let raw = if raw.is_empty() { OCTET_STREAM } else { raw };
    MediaType::parse(raw)
        .map_err(|e| ApiError::parse_failure("Content-Type", ParameterLocation::Header, raw, e))
}

/// Pick the consumer for `content_type` among the operation's consumed
/// media types.
pub fn resolve_consumer(
    content_type: Option<&str>,
    operation: &Operation,
    registry: &CodecRegistry,
) -> Result<ResolvedConsumer, ApiError> {
    let media_type = parse_content_type(content_type)?;
    let essence = media_type.essence();
    if !operation.consumes.iter().any(|c| c == essence) {
        debug!(
            operation = %operation.id,
            content_type = %essence,
            allowed = ?operation.consumes,
            "Unsupported request media type"
        );
        return Err(ApiError::unsupported_media_type(essence, &operation.consumes));
    }
    let consumer = registry.consumer(essence).ok_or_else(|| {
        error!(operation = %operation.id, media_type = %essence, "no consumer registered");
        ApiError::internal(format!("no consumer registered for {essence}"))
    })?;
    Ok(ResolvedConsumer {
        media_type: essence.to_string(),
        charset: media_type.charset(),
        consumer,
    })
}

/// Pick the producer for an `Accept` header among the operation's produced
/// media types.
///
/// Each produced type takes the quality of its most specific matching
/// range. The highest quality wins, then the more specific match, then
/// declaration order. Quality 0 excludes a type.
pub fn resolve_producer(
    accept: Option<&str>,
    operation: &Operation,
    registry: &CodecRegistry,
) -> Result<ResolvedProducer, ApiError> {
    let ranges = parse_accept(accept.unwrap_or_default());

    let mut best: Option<(&str, f32, u8)> = None;
    for produced in &operation.produces {
        let matched = ranges
            .iter()
            .filter_map(|r| r.specificity(produced).map(|s| (s, r.quality)))
            .max_by_key(|(s, _)| *s);
        let Some((specificity, quality)) = matched else {
            continue;
        };
        if quality <= 0.0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, q, s)) => quality > q || (quality == q && specificity > s),
        };
        if better {
            best = Some((produced.as_str(), quality, specificity));
        }
    }

    let Some((essence, _, _)) = best else {
        debug!(
            operation = %operation.id,
            accept = ?accept,
            available = ?operation.produces,
            "No acceptable response media type"
        );
        return Err(ApiError::not_acceptable(&operation.produces));
    };
    let producer = registry.producer(essence).ok_or_else(|| {
        error!(operation = %operation.id, media_type = %essence, "no producer registered");
        ApiError::internal(format!("no producer registered for {essence}"))
    })?;
    Ok(ResolvedProducer {
        media_type: essence.to_string(),
        producer,
    })
}
