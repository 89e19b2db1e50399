#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::send;
use http::Method;
use serde_json::{json, Value};
use specroute::api::ApiBuilder;
use specroute::context::{HandlerResponse, RequestView};
use specroute::negotiation::{
    resolve_consumer, resolve_producer, CodecError, CodecRegistry, Producer,
};
use specroute::router::Router;
use specroute::spec::Operation;
use std::io::Write;

fn upload() -> Operation {
    Operation::new("upload", Method::POST, "/uploads")
        .consumes(&["application/json", "text/plain"])
        .produces(&["application/json", "application/x-yaml", "text/plain"])
}

#[test]
fn test_resolution_is_pure_and_cached_value_matches() {
    let registry = CodecRegistry::with_defaults();
    let router = Router::new(vec![upload()]);
    let matched = router.lookup(&Method::POST, "/uploads").unwrap();
    let op = matched.operation();

    let headers = [
        Some("text/plain; charset=latin1"),
        Some("application/json"),
        None,
    ];
    for header in headers {
        let a = resolve_consumer(header, op, &registry).map(|c| (c.media_type, c.charset));
        let b = resolve_consumer(header, op, &registry).map(|c| (c.media_type, c.charset));
        assert_eq!(a, b);
    }

    let accepts = [
        Some("application/x-yaml"),
        Some("text/*;q=0.9, application/json;q=0.1"),
        Some("image/png"),
        None,
    ];
    for accept in accepts {
        let a = resolve_producer(accept, op, &registry).map(|p| p.media_type);
        let b = resolve_producer(accept, op, &registry).map(|p| p.media_type);
        assert_eq!(a, b);
    }

    let accept = Some("text/*;q=0.9, application/json;q=0.1");
    let cached = matched
        .producer_with(|| resolve_producer(accept, op, &registry))
        .map(|p| p.media_type);
    let recomputed = resolve_producer(accept, op, &registry).map(|p| p.media_type);
    assert_eq!(cached, recomputed);
    assert_eq!(cached.unwrap(), "text/plain");

    // The slot is write-once for the lifetime of the match.
    let again = matched
        .producer_with(|| resolve_producer(Some("application/json"), op, &registry))
        .map(|p| p.media_type);
    assert_eq!(again.unwrap(), "text/plain");
}

#[test]
fn test_accept_preferences() {
    let registry = CodecRegistry::with_defaults();
    let op = upload();
    let pick = |accept: &str| {
        resolve_producer(Some(accept), &op, &registry)
            .map(|p| p.media_type)
            .map_err(|e| e.code())
    };

    assert_eq!(pick("*/*"), Ok("application/json".to_string()));
    assert_eq!(pick(""), Ok("application/json".to_string()));
    assert_eq!(pick("text/*"), Ok("text/plain".to_string()));
    assert_eq!(
        pick("application/json;q=0.4, application/x-yaml;q=0.8"),
        Ok("application/x-yaml".to_string())
    );
    assert_eq!(
        pick("*/*;q=0.5, application/json;q=0"),
        Ok("application/x-yaml".to_string())
    );
    assert_eq!(pick("APPLICATION/X-YAML"), Ok("application/x-yaml".to_string()));
    assert_eq!(pick("garbage, text/plain"), Ok("text/plain".to_string()));
    assert_eq!(pick("image/*"), Err(406));
}

#[derive(Clone)]
struct CsvProducer;

impl Producer for CsvProducer {
    fn produce(&self, writer: &mut dyn Write, value: &Value) -> Result<(), CodecError> {
        let rows = value
            .as_array()
            .ok_or_else(|| CodecError::Unsupported("csv needs an array".to_string()))?;
        for row in rows {
            let cells: Vec<String> = row
                .as_array()
                .map(|cells| cells.iter().map(|c| c.to_string()).collect())
                .unwrap_or_default();
            writeln!(writer, "{}", cells.join(","))?;
        }
        Ok(())
    }
}

fn report_api() -> specroute::api::Api {
    ApiBuilder::new()
        .with_default_codecs()
        .producer("text/csv", CsvProducer)
        .operation(
            Operation::new("report", Method::GET, "/report").produces(&["text/csv", "application/json"]),
        )
        .handler("report", |_req| Ok(HandlerResponse::ok(json!([[1, 2], [3, 4]]))))
        .build()
        .unwrap()
}

#[test]
fn test_custom_producer_is_used() {
    let api = report_api();
    let resp = send(&api, RequestView::get("/report").header("accept", "text/csv"));
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(resp.header("content-type"), Some("text/csv"));
    assert_eq!(resp.body_text(), "1,2\n3,4\n");

    let resp = send(&api, RequestView::get("/report").header("accept", "application/json"));
    assert_eq!(resp.body_json().unwrap(), json!([[1, 2], [3, 4]]));
}

#[test]
fn test_encoding_failure_is_internal() {
    let api = ApiBuilder::new()
        .with_default_codecs()
        .producer("text/csv", CsvProducer)
        .operation(Operation::new("bad", Method::GET, "/bad").produces(&["text/csv"]))
        .handler("bad", |_req| Ok(HandlerResponse::ok(json!({"not": "rows"}))))
        .build()
        .unwrap();
    let resp = send(&api, RequestView::get("/bad"));
    assert_eq!(resp.status.as_u16(), 500);
    assert_eq!(resp.header("content-type"), Some("application/json"));
}

#[test]
fn test_plain_text_round_trip() {
    let api = ApiBuilder::new()
        .with_default_codecs()
        .operation(upload())
        .handler("upload", |req| {
            let text = String::from_utf8_lossy(&req.request.body).to_uppercase();
            Ok(HandlerResponse::ok(Value::String(text)))
        })
        .build()
        .unwrap();
    let resp = send(
        &api,
        RequestView::post("/uploads")
            .header("content-type", "text/plain")
            .header("accept", "text/plain")
            .body("hello"),
    );
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(resp.body_text(), "HELLO");
}
