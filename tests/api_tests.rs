#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use base64::Engine;
use common::{petstore_api, petstore_api_with, petstore_builder, send, API_KEY, BEARER_TOKEN};
use http::Method;
use serde_json::json;
use specroute::api::ApiBuilder;
use specroute::config::DispatchConfig;
use specroute::context::{HandlerResponse, RequestView};
use specroute::errors::ApiError;
use specroute::params::Values;
use specroute::spec::{operations_from_yaml, Operation, ParamType, ParameterSpec, ScalarType};

fn basic(user: &str, pass: &str) -> String {
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"))
    )
}

#[test]
fn test_list_pets_uses_defaults_and_zero_values() {
    let api = petstore_api();
    let resp = send(&api, RequestView::get("/pets"));
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(resp.header("content-type"), Some("application/json"));
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "limit": 20, "tags": [], "status": "" })
    );
}

#[test]
fn test_list_pets_binds_query_values() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::get("/pets?limit=5&tags=cat&tags=dog&status=sold"),
    );
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "limit": 5, "tags": ["cat", "dog"], "status": "sold" })
    );
}

#[test]
fn test_query_constraint_failures() {
    let api = petstore_api();

    let resp = send(&api, RequestView::get("/pets?limit=500"));
    assert_eq!(resp.status.as_u16(), 422);
    let body = resp.body_json().unwrap();
    assert_eq!(body["code"], 422);
    assert_eq!(
        body["message"],
        "limit in query should be less than or equal to 100"
    );
    assert_eq!(body["name"], "limit");
    assert_eq!(body["in"], "query");
    assert_eq!(body["value"], "500");

    let resp = send(&api, RequestView::get("/pets?status=lost"));
    assert_eq!(
        resp.body_json().unwrap()["message"],
        "status in query should be one of [available pending sold]"
    );

    let resp = send(&api, RequestView::get("/pets?tags=a&tags=b&tags=c&tags=d"));
    assert_eq!(
        resp.body_json().unwrap()["message"],
        "tags in query should have at most 3 items"
    );
}

#[test]
fn test_yaml_is_negotiated_from_accept() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::get("/pets?limit=3").header("accept", "application/x-yaml, application/json;q=0.5"),
    );
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(resp.header("content-type"), Some("application/x-yaml"));
    let body: serde_json::Value = serde_yaml::from_slice(&resp.body).unwrap();
    assert_eq!(body["limit"], 3);
}

#[test]
fn test_not_acceptable() {
    let api = petstore_api();
    let resp = send(&api, RequestView::get("/pets").header("accept", "text/html"));
    assert_eq!(resp.status.as_u16(), 406);
    let body = resp.body_json().unwrap();
    assert_eq!(
        body["message"],
        "unsupported media type requested, only [application/json application/x-yaml] are available"
    );
    assert_eq!(body["values"], json!(["application/json", "application/x-yaml"]));
}

#[test]
fn test_method_not_allowed_lists_registered_methods() {
    let api = petstore_api();
    let resp = send(&api, RequestView::new(Method::PUT, "/pets/7"));
    assert_eq!(resp.status.as_u16(), 405);
    assert_eq!(resp.header("allow"), Some("GET,DELETE"));
    assert_eq!(
        resp.body_json().unwrap()["message"],
        "method PUT is not allowed, but [GET,DELETE] are"
    );
}

#[test]
fn test_unknown_path_is_not_found() {
    let api = petstore_api();
    let resp = send(&api, RequestView::get("/owners/1"));
    assert_eq!(resp.status.as_u16(), 404);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "code": 404, "message": "path /owners/1 was not found" })
    );
    assert_eq!(resp.header("content-type"), Some("application/json"));
}

#[test]
fn test_scenario_method_not_allowed_for_collection() {
    let api = ApiBuilder::new()
        .with_default_codecs()
        .operation(Operation::new("addPet", Method::POST, "/pets"))
        .operation(
            Operation::new("deletePet", Method::DELETE, "/pets/{id}")
                .param(ParameterSpec::path("id", ParamType::scalar(ScalarType::Int64))),
        )
        .handler("addPet", |_req| Ok(HandlerResponse::empty(201)))
        .handler("deletePet", |_req| Ok(HandlerResponse::empty(204)))
        .build()
        .unwrap();

    assert!(api.router().lookup(&Method::GET, "/pets").is_none());
    assert_eq!(api.router().other_methods(&Method::GET, "/pets"), vec![Method::POST]);

    let resp = send(&api, RequestView::get("/pets"));
    assert_eq!(resp.status.as_u16(), 405);
    assert_eq!(resp.header("allow"), Some("POST"));
}

#[test]
fn test_scenario_path_type_failure() {
    let api = petstore_api();
    let resp = send(&api, RequestView::get("/pets/abc"));
    assert_eq!(resp.status.as_u16(), 422);
    let body = resp.body_json().unwrap();
    assert_eq!(body["message"], "id in path must be of type int64");
    assert_eq!(body["name"], "id");
    assert_eq!(body["in"], "path");
    assert_eq!(body["value"], "abc");
}

#[test]
fn test_scenario_json_with_charset_is_consumed() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets")
            .header("content-type", "application/json; charset=utf-8")
            .header("x-api-key", API_KEY)
            .body(r#"{"name":"Rex"}"#),
    );
    assert_eq!(resp.status.as_u16(), 201);
    assert_eq!(resp.header("location"), Some("/pets/1"));
    assert_eq!(resp.body_json().unwrap(), json!({ "name": "Rex" }));
}

#[test]
fn test_scenario_malformed_content_type() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets")
            .header("content-type", "application(")
            .header("x-api-key", API_KEY)
            .body("{}"),
    );
    assert_eq!(resp.status.as_u16(), 400);
    let body = resp.body_json().unwrap();
    assert_eq!(body["name"], "Content-Type");
    assert_eq!(body["in"], "header");
    assert_eq!(body["value"], "application(");
}

#[test]
fn test_scenario_missing_api_key() {
    let api = petstore_api();
    let resp = send(&api, RequestView::post("/pets").json(&json!({ "name": "Rex" })));
    assert_eq!(resp.status.as_u16(), 401);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "code": 401, "message": "unauthenticated for api_key" })
    );
}

#[test]
fn test_unsupported_media_type_precedes_security() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets")
            .header("content-type", "application/saml")
            .body("<xml/>"),
    );
    assert_eq!(resp.status.as_u16(), 415);
    let body = resp.body_json().unwrap();
    assert_eq!(
        body["message"],
        "unsupported media type \"application/saml\", only [application/json application/x-yaml] are allowed"
    );
    assert_eq!(body["values"], json!(["application/json", "application/x-yaml"]));
}

#[test]
fn test_body_decode_failure_is_parse_failure() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets")
            .header("content-type", "application/json")
            .header("x-api-key", API_KEY)
            .body("{oops"),
    );
    assert_eq!(resp.status.as_u16(), 400);
    let body = resp.body_json().unwrap();
    assert_eq!(body["name"], "body");
    assert_eq!(body["in"], "body");
}

#[test]
fn test_required_body_missing() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets")
            .header("content-type", "application/json")
            .header("x-api-key", API_KEY),
    );
    assert_eq!(resp.status.as_u16(), 422);
    assert_eq!(resp.body_json().unwrap()["message"], "pet in body is required");
}

const EVENTS: &str = r#"
- id: addEvent
  method: POST
  path: /events
  consumes: [application/json]
  produces: [application/json]
  parameters:
    - name: event
      in: body
      required: true
      schema:
        type: object
        required: [title, starts]
        properties:
          title: { type: string, minLength: 1 }
          starts: { type: string, format: date-time }
    - { name: tz, in: query, type: string, format: hostname }
"#;

fn events_api() -> specroute::api::Api {
    ApiBuilder::new()
        .with_default_codecs()
        .operations(operations_from_yaml(EVENTS).unwrap())
        .handler("addEvent", |req| {
            let event: serde_json::Value = req.param("event").unwrap_or_default();
            Ok(HandlerResponse::new(201, event))
        })
        .build()
        .unwrap()
}

#[test]
fn test_body_is_checked_against_its_schema() {
    let api = events_api();
    let resp = send(
        &api,
        RequestView::post("/events").json(&json!({ "title": "launch", "starts": "2025-03-01T09:00:00Z" })),
    );
    assert_eq!(resp.status.as_u16(), 201);

    let resp = send(
        &api,
        RequestView::post("/events").json(&json!({ "title": "launch", "starts": "soon" })),
    );
    assert_eq!(resp.status.as_u16(), 422);
    let body = resp.body_json().unwrap();
    assert_eq!(body["name"], "event");
    assert_eq!(body["in"], "body");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("event in body does not match its schema: "),
        "{body}"
    );
}

#[test]
fn test_query_string_format() {
    let api = events_api();
    let event = json!({ "title": "launch", "starts": "2025-03-01T09:00:00Z" });
    let resp = send(&api, RequestView::post("/events?tz=eu.example.org").json(&event));
    assert_eq!(resp.status.as_u16(), 201);

    let resp = send(&api, RequestView::post("/events?tz=-bad-").json(&event));
    assert_eq!(resp.status.as_u16(), 422);
    assert_eq!(
        resp.body_json().unwrap()["message"],
        "tz in query must be of type hostname"
    );
}

#[test]
fn test_yaml_request_body() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets")
            .header("content-type", "application/x-yaml")
            .header("x-api-key", API_KEY)
            .body("name: Tom\nage: 3\n"),
    );
    assert_eq!(resp.status.as_u16(), 201);
    assert_eq!(resp.body_json().unwrap(), json!({ "name": "Tom", "age": 3 }));
}

#[test]
fn test_anonymous_alternative_and_preemption() {
    let api = petstore_api();

    let resp = send(&api, RequestView::get("/pets/7"));
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(resp.body_json().unwrap(), json!({ "id": 7, "principal": null }));

    let resp = send(&api, RequestView::get("/pets/7").header("x-api-key", API_KEY));
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "id": 7, "principal": "key-holder" })
    );

    let resp = send(&api, RequestView::get("/pets/7").header("x-api-key", "wrong"));
    assert_eq!(resp.status.as_u16(), 401);
}

#[test]
fn test_header_pattern_constraint() {
    let api = petstore_api();
    let resp = send(&api, RequestView::get("/pets/7").header("x-trace", "XYZ"));
    assert_eq!(resp.status.as_u16(), 422);
    assert_eq!(
        resp.body_json().unwrap()["message"],
        "X-Trace in header should match '^[a-f0-9]+$'"
    );
    let resp = send(&api, RequestView::get("/pets/7").header("x-trace", "beef"));
    assert_eq!(resp.status.as_u16(), 200);
}

#[test]
fn test_or_of_and_security() {
    let api = petstore_api();
    let delete = |req: RequestView| send(&api, req).status.as_u16();

    let bearer = format!("Bearer {BEARER_TOKEN}");
    assert_eq!(
        delete(RequestView::new(Method::DELETE, "/pets/1").header("authorization", &bearer)),
        204
    );
    assert_eq!(
        delete(
            RequestView::new(Method::DELETE, "/pets/1")
                .header("authorization", &basic("admin", "hunter2"))
                .header("x-api-key", API_KEY)
        ),
        204
    );
    assert_eq!(
        delete(
            RequestView::new(Method::DELETE, "/pets/1")
                .header("authorization", &basic("admin", "wrong"))
                .header("x-api-key", API_KEY)
        ),
        401
    );

    let resp = send(
        &api,
        RequestView::new(Method::DELETE, "/pets/1").header("authorization", &basic("admin", "hunter2")),
    );
    assert_eq!(resp.status.as_u16(), 401);
    assert_eq!(
        resp.body_json().unwrap()["message"],
        "unauthenticated for bearer, basic, api_key"
    );
}

#[test]
fn test_empty_response_has_no_content_type() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::new(Method::DELETE, "/pets/1").header("authorization", &format!("Bearer {BEARER_TOKEN}")),
    );
    assert_eq!(resp.status.as_u16(), 204);
    assert!(resp.body.is_empty());
    assert!(resp.header("content-type").is_none());
}

#[test]
fn test_no_content_statuses_drop_handler_body() {
    let api = petstore_builder()
        .handler("deletePet", |_req| {
            Ok(HandlerResponse::new(204, json!({ "deleted": true })))
        })
        .handler("getPet", |_req| {
            Ok(HandlerResponse::new(304, json!({ "id": 1 })).with_header("ETag", "\"v1\""))
        })
        .build()
        .unwrap();

    let resp = send(
        &api,
        RequestView::new(Method::DELETE, "/pets/1").header("authorization", &format!("Bearer {BEARER_TOKEN}")),
    );
    assert_eq!(resp.status.as_u16(), 204);
    assert!(resp.body.is_empty());
    assert!(resp.header("content-type").is_none());

    let resp = send(&api, RequestView::get("/pets/1"));
    assert_eq!(resp.status.as_u16(), 304);
    assert!(resp.body.is_empty());
    assert!(resp.header("content-type").is_none());
    assert_eq!(resp.header("etag"), Some("\"v1\""));
}

#[test]
fn test_handler_api_error_passes_through() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::new(Method::DELETE, "/pets/404").header("authorization", &format!("Bearer {BEARER_TOKEN}")),
    );
    assert_eq!(resp.status.as_u16(), 404);
    assert_eq!(resp.body_json().unwrap()["message"], "pet 404 does not exist");
}

#[test]
fn test_handler_error_becomes_internal() {
    let api = petstore_api();
    let resp = send(&api, RequestView::get("/explode"));
    assert_eq!(resp.status.as_u16(), 500);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "code": 500, "message": "database unavailable" })
    );
}

#[test]
fn test_form_parameters_from_urlencoded_body() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets/3/form")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("name=Fluffy+Jr&qty=2"),
    );
    assert_eq!(resp.status.as_u16(), 200);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "id": 3, "name": "Fluffy Jr", "qty": 2 })
    );

    let resp = send(
        &api,
        RequestView::post("/pets/3/form")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("name=F"),
    );
    assert_eq!(resp.status.as_u16(), 422);
    assert_eq!(
        resp.body_json().unwrap()["message"],
        "name in formData should be at least 2 chars long"
    );
}

#[test]
fn test_host_parsed_form_is_used() {
    let api = petstore_api();
    let resp = send(
        &api,
        RequestView::post("/pets/3/form")
            .header("content-type", "application/x-www-form-urlencoded")
            .form(Values::new().with("name", "Host").with("qty", "9")),
    );
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "id": 3, "name": "Host", "qty": 9 })
    );
}

#[test]
fn test_request_id_is_echoed_or_generated() {
    let api = petstore_api();
    let known = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    let resp = send(&api, RequestView::get("/pets").header("x-request-id", known));
    assert_eq!(resp.header("x-request-id"), Some(known));

    let resp = send(&api, RequestView::get("/nowhere"));
    assert_eq!(resp.status.as_u16(), 404);
    let generated = resp.header("x-request-id").unwrap();
    assert_eq!(generated.len(), 26);
}

#[test]
fn test_custom_request_id_header() {
    let api = petstore_api_with(DispatchConfig {
        request_id_header: "x-correlation-id".to_string(),
        ..DispatchConfig::default()
    });
    let resp = send(&api, RequestView::get("/pets"));
    assert!(resp.header("x-correlation-id").is_some());
    assert!(resp.header("x-request-id").is_none());
}

#[test]
fn test_base_path_is_stripped() {
    let api = petstore_api_with(DispatchConfig {
        base_path: "/api/v1".to_string(),
        ..DispatchConfig::default()
    });
    assert_eq!(send(&api, RequestView::get("/api/v1/pets/9")).status.as_u16(), 200);
    assert_eq!(send(&api, RequestView::get("/pets/9")).status.as_u16(), 404);
    assert_eq!(send(&api, RequestView::get("/api/v2/pets/9")).status.as_u16(), 404);
}

#[test]
fn test_authorizer_forbids() {
    let api = petstore_builder()
        .authorizer(|op, principal| match (op.id.as_str(), principal) {
            ("getPet", Some(p)) if p.subject == "key-holder" => {
                Err("key holders may not read pets".to_string())
            }
            _ => Ok(()),
        })
        .build()
        .unwrap();

    let resp = send(&api, RequestView::get("/pets/1").header("x-api-key", API_KEY));
    assert_eq!(resp.status.as_u16(), 403);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({ "code": 403, "message": "key holders may not read pets" })
    );
    assert_eq!(send(&api, RequestView::get("/pets/1")).status.as_u16(), 200);
}

#[test]
fn test_serve_http_round_trip() {
    let api = petstore_api();
    let req = http::Request::builder()
        .method("GET")
        .uri("/pets?limit=2")
        .body(Vec::new())
        .unwrap();
    let resp = api.serve_http(req);
    assert_eq!(resp.status(), http::StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["limit"], 2);
}

#[test]
fn test_operations_inherit_default_media_types() {
    let api = petstore_api();
    let get_pet = api
        .router()
        .operations()
        .find(|op| op.id == "getPet")
        .unwrap();
    assert_eq!(get_pet.consumes, vec!["application/json"]);
    assert_eq!(get_pet.produces, vec!["application/json"]);
}

#[test]
fn test_build_reports_every_missing_registration() {
    let err = ApiBuilder::new()
        .operation(
            Operation::new("a", Method::POST, "/a")
                .consumes(&["application/json", "application/xml"])
                .produces(&["application/json"])
                .security(specroute::spec::SecurityAlternative::scheme("oauth", vec!["read"])),
        )
        .operation(Operation::new("b", Method::GET, "/b"))
        .handler("a", |_req| Ok(HandlerResponse::empty(204)))
        .build()
        .unwrap_err()
        .to_string();

    assert!(
        err.contains("missing [application/json, application/xml] consumer registrations"),
        "{err}"
    );
    assert!(err.contains("missing [application/json] producer registrations"), "{err}");
    assert!(err.contains("missing [oauth] authenticator registrations"), "{err}");
    assert!(err.contains("missing [b] handler registrations"), "{err}");
}

#[test]
fn test_build_rejects_invalid_media_type() {
    let err = ApiBuilder::new()
        .with_default_codecs()
        .operation(Operation::new("a", Method::GET, "/a").produces(&["json"]))
        .handler("a", |_req| Ok(HandlerResponse::empty(204)))
        .build()
        .unwrap_err();
    assert!(format!("{err:#}").contains("operation a has an invalid produces entry"));
}

#[test]
fn test_handler_typed_error_from_question_mark() {
    let api = ApiBuilder::new()
        .with_default_codecs()
        .operation(Operation::new("conflict", Method::GET, "/conflict"))
        .handler("conflict", |_req| {
            let outcome: Result<(), ApiError> = Err(ApiError::forbidden("locked"));
            outcome?;
            Ok(HandlerResponse::empty(204))
        })
        .build()
        .unwrap();
    let resp = send(&api, RequestView::get("/conflict"));
    assert_eq!(resp.status.as_u16(), 403);
}
