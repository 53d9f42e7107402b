//! # Integration Tests for zpipe-api
//!
//! Drives the assembled axum router end to end: path, query and body
//! validation, handler-return validation for sync and async handlers,
//! pass-through of unbound sources, and the served OpenAPI document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use zpipe_api::{
    body, demo, handler, query, returns, sync_handler, ApiConfig, ApiError, ApiRouter,
    RequestInput,
};
use zpipe_schema::Schema;

/// Helper: the demo app with default configuration.
fn test_app() -> axum::Router {
    demo::demo_api(ApiConfig::default())
        .unwrap()
        .into_router()
}

/// Helper: read response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn post(app: axum::Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

fn item_schema() -> Schema {
    Schema::object([("id", Schema::integer()), ("name", Schema::string())])
}

// -- Path parameters ----------------------------------------------------------

#[tokio::test]
async fn test_path_param_coerced_before_handler() {
    let (status, body) = get(test_app(), "/users/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 42);
    assert_eq!(body["name"], "user-42");
}

#[tokio::test]
async fn test_path_param_rejected_with_field() {
    let (status, body) = get(test_app(), "/users/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["statusCode"], 400);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("/id"), "{message}");
    assert!(message.starts_with("param validation failed"), "{message}");
}

#[tokio::test]
async fn test_handler_error_maps_to_status() {
    let (status, body) = get(test_app(), "/users/5000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["statusCode"], 404);
}

// -- Query --------------------------------------------------------------------

#[tokio::test]
async fn test_query_defaults_applied() {
    let (status, body) = get(test_app(), "/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_query_filters_and_coerces() {
    let (status, body) = get(test_app(), "/users?limit=3&role=admin").await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| u["role"] == "admin"));
}

#[tokio::test]
async fn test_repeated_query_keys_become_array() {
    let (status, body) = get(test_app(), "/users?limit=1&tag=a&tag=b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["tags"], json!(["a", "b"]));

    let (status, body) = get(test_app(), "/users?limit=1&tag=solo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["tags"], json!(["solo"]));
}

#[tokio::test]
async fn test_query_constraint_violation() {
    let (status, body) = get(test_app(), "/users?limit=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("/limit"));

    let (status, _) = get(test_app(), "/users?role=owner").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_query_keys_ignored() {
    let (status, body) = get(test_app(), "/users?limit=1&utm_source=mail").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

// -- Body ---------------------------------------------------------------------

#[tokio::test]
async fn test_create_user_applies_defaults() {
    let (status, body) = post(
        test_app(),
        "/users",
        r#"{"name":"Ada","email":"ada@example.com"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "member");
    assert!(body["id"].as_u64().unwrap() > demo::MAX_USER_ID);
}

#[tokio::test]
async fn test_body_violation_is_detailed() {
    let (status, body) = post(test_app(), "/users", r#"{"name":"","email":"x@y"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("body validation failed"), "{message}");
    assert!(message.contains("/name"), "{message}");
}

#[tokio::test]
async fn test_body_refinement_violation() {
    let (status, body) = post(test_app(), "/users", r#"{"name":"Ada","email":"nope"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("/email"), "{message}");
    assert!(message.contains("must contain '@'"), "{message}");
}

#[tokio::test]
async fn test_strict_body_rejects_unknown_keys() {
    let (status, _) = post(
        test_app(),
        "/users",
        r#"{"name":"Ada","email":"a@b","admin":true}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_and_missing_body() {
    let (status, body) = post(test_app(), "/users", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("invalid JSON body"));

    let (status, _) = post(test_app(), "/users", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unbound_sources_pass_through() {
    let app = ApiRouter::new(ApiConfig::default())
        .post(
            "/echo",
            sync_handler(|input: RequestInput| {
                Ok::<_, ApiError>(json!({ "query": input.query, "body": input.body }))
            }),
            [body(Schema::object([("n", Schema::number())])).unwrap()],
        )
        .into_router();
    let (status, out) = post(app, "/echo?n=abc", r#"{"n":1}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["query"], json!({ "n": "abc" }));
    assert_eq!(out["body"], json!({ "n": 1 }));
}

// -- Returns ------------------------------------------------------------------

#[tokio::test]
async fn test_sync_return_violation_is_generic() {
    let app = ApiRouter::new(ApiConfig::default())
        .get(
            "/item",
            sync_handler(|_| Ok::<_, ApiError>(json!({ "id": "seven", "name": "x" }))),
            [returns(item_schema()).unwrap()],
        )
        .into_router();
    let (status, body) = get(app, "/item").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["error"], "Bad Request");
}

#[tokio::test]
async fn test_async_return_violation_is_generic() {
    let app = ApiRouter::new(ApiConfig::default())
        .get(
            "/item",
            handler(|_| async {
                tokio::task::yield_now().await;
                Ok::<_, ApiError>(json!({ "id": 7 }))
            }),
            [returns(item_schema()).unwrap()],
        )
        .into_router();
    let (status, body) = get(app, "/item").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
}

#[tokio::test]
async fn test_async_return_resolves_parsed_value() {
    let app = ApiRouter::new(ApiConfig::default())
        .get(
            "/item",
            handler(|_| async {
                Ok::<_, ApiError>(json!({ "id": 7, "name": "x", "secret": "hidden" }))
            }),
            [returns(item_schema()).unwrap()],
        )
        .into_router();
    let (status, body) = get(app, "/item").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": 7, "name": "x" }));
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_served() {
    let (status, doc) = get(test_app(), "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);

    let get_user = &doc["paths"]["/users/{id}"]["get"];
    assert_eq!(get_user["operationId"], "get_users_id");
    assert_eq!(get_user["parameters"][0]["name"], "id");
    assert_eq!(get_user["parameters"][0]["in"], "path");
    assert_eq!(get_user["parameters"][0]["required"], true);
    assert!(get_user["responses"]["400"].is_object());

    let list = &doc["paths"]["/users"]["get"];
    let names: Vec<&str> = list["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["limit", "role", "tag"]);
    assert!(list["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["required"] == false && p["in"] == "query"));

    let listed = &list["responses"]["200"]["content"]["application/json"]["schema"];
    assert!(listed["items"]["required"]
        .as_array()
        .unwrap()
        .contains(&json!("email")));

    let create = &doc["paths"]["/users"]["post"];
    assert_eq!(create["requestBody"]["required"], true);
    let created = &create["responses"]["201"]["content"]["application/json"]["schema"];
    let required: Vec<&str> = created["required"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    // refined field restored by reconciliation
    assert!(required.contains(&"email"), "{required:?}");
    assert!(!required.contains(&"tags"), "{required:?}");

    assert!(doc["components"]["schemas"]["ValidationErrorBody"].is_object());
}

#[tokio::test]
async fn test_non_object_query_schema_documents_nothing() {
    let api = ApiRouter::new(ApiConfig::default()).get(
        "/raw",
        sync_handler(|input: RequestInput| Ok::<_, ApiError>(input.query)),
        [query(Schema::any()).unwrap()],
    );
    let doc = serde_json::to_value(api.openapi()).unwrap();
    assert!(doc["paths"]["/raw"]["get"].get("parameters").is_none());

    let (status, body) = get(api.into_router(), "/raw?a=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "a": "1" }));
}

#[tokio::test]
async fn test_docs_can_be_disabled() {
    let app = demo::demo_api(ApiConfig::default().with_docs_path(None))
        .unwrap()
        .into_router();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
