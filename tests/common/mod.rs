#![allow(dead_code)]

use serde_json::json;
use specroute::api::{Api, ApiBuilder};
use specroute::config::DispatchConfig;
use specroute::context::{HandlerResponse, RecordedResponse, RequestView};
use specroute::errors::ApiError;
use specroute::security::{ApiKeyAuth, BasicAuth, BearerAuth, Principal};
use specroute::spec::{operations_from_yaml, Operation};

/// A small pet store covering every parameter location, media type and
/// security shape the pipeline supports.
pub const PETSTORE: &str = r#"
operations:
  - id: listPets
    method: GET
    path: /pets
    produces: [application/json, application/x-yaml]
    parameters:
      - { name: limit, in: query, type: integer, format: int32, minimum: 1, maximum: 100, default: 20 }
      - { name: tags, in: query, type: array, items: { type: string }, collectionFormat: multi, maxItems: 3 }
      - { name: status, in: query, type: string, enum: [available, pending, sold] }
  - id: addPet
    method: POST
    path: /pets
    consumes: [application/json, application/x-yaml]
    parameters:
      - { name: pet, in: body, required: true }
    security:
      - [{ scheme: api_key }]
  - id: getPet
    method: GET
    path: /pets/{id}
    parameters:
      - { name: id, in: path, type: integer, format: int64, minimum: 1 }
      - { name: X-Trace, in: header, type: string, pattern: "^[a-f0-9]+$" }
    security:
      - [{ scheme: api_key }]
      - []
  - id: deletePet
    method: DELETE
    path: /pets/{id}
    parameters:
      - { name: id, in: path, type: integer, format: int64 }
    security:
      - [{ scheme: bearer, scopes: [pets:write] }]
      - [{ scheme: basic }, { scheme: api_key }]
  - id: updatePetForm
    method: POST
    path: /pets/{id}/form
    consumes: [application/x-www-form-urlencoded]
    parameters:
      - { name: id, in: path, type: integer }
      - { name: name, in: formData, type: string, required: true, minLength: 2 }
      - { name: qty, in: formData, type: integer, format: int32, default: 1 }
  - id: explode
    method: GET
    path: /explode
    produces: [text/plain]
"#;

pub const API_KEY: &str = "secret-key";
pub const BEARER_TOKEN: &str = "writer-token";

pub fn petstore_operations() -> Vec<Operation> {
    operations_from_yaml(PETSTORE).unwrap()
}

pub fn petstore_builder() -> ApiBuilder {
    ApiBuilder::new()
        .with_default_codecs()
        .operations(petstore_operations())
        .authenticator(
            "api_key",
            ApiKeyAuth::header("X-API-Key", |key| {
                if key == API_KEY {
                    Ok(Principal::new("key-holder"))
                } else {
                    Err(ApiError::unauthenticated("api_key"))
                }
            }),
        )
        .authenticator(
            "bearer",
            BearerAuth::new(|token, scopes| {
                if token == BEARER_TOKEN && scopes.iter().all(|s| s == "pets:write") {
                    Ok(Principal::new("writer"))
                } else {
                    Err(ApiError::unauthenticated("bearer"))
                }
            }),
        )
        .authenticator(
            "basic",
            BasicAuth::new(|user, pass| {
                if user == "admin" && pass == "hunter2" {
                    Ok(Principal::new(user))
                } else {
                    Err(ApiError::unauthenticated("basic"))
                }
            }),
        )
        .handler("listPets", |req| {
            Ok(HandlerResponse::ok(json!({
                "limit": req.param::<i32>("limit"),
                "tags": req.param::<Vec<String>>("tags"),
                "status": req.param::<String>("status"),
            })))
        })
        .handler("addPet", |req| {
            let pet: serde_json::Value = req.param("pet").unwrap_or_default();
            Ok(HandlerResponse::new(201, pet).with_header("Location", "/pets/1"))
        })
        .handler("getPet", |req| {
            Ok(HandlerResponse::ok(json!({
                "id": req.param::<i64>("id"),
                "principal": req.principal.as_ref().map(|p| p.subject.clone()),
            })))
        })
        .handler("deletePet", |req| {
            let id: i64 = req.param("id").unwrap_or_default();
            if id == 404 {
                return Err(ApiError::not_found(format!("pet {id} does not exist")).into());
            }
            Ok(HandlerResponse::empty(204))
        })
        .handler("updatePetForm", |req| {
            Ok(HandlerResponse::ok(json!({
                "id": req.param::<i64>("id"),
                "name": req.param::<String>("name"),
                "qty": req.param::<i32>("qty"),
            })))
        })
        .handler("explode", |_req| Err(anyhow::anyhow!("database unavailable")))
}

pub fn petstore_api() -> Api {
    petstore_builder().build().unwrap()
}

pub fn petstore_api_with(config: DispatchConfig) -> Api {
    petstore_builder().config(config).build().unwrap()
}

pub fn send(api: &Api, request: RequestView) -> RecordedResponse {
    let mut sink = RecordedResponse::default();
    api.serve(&request, &mut sink);
    sink
}
