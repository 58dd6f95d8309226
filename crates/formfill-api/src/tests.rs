//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use formfill_core::service::WritePolicy;
use formfill_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  app_with(WritePolicy::default()).await
}

async fn app_with(policy: WritePolicy) -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  api_router(Arc::new(store), policy)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

async fn seed_profile(app: &Router) {
  let (status, _) = send(
    app,
    "POST",
    "/profile",
    Some(json!({
      "firstName": "John",
      "lastName": "Doe",
      "email": "john@example.com",
      "address": { "city": "Springfield" },
      "education": [{ "schoolName": "State U", "major": "CS" }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Mappings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn capture_then_fetch_mapping() {
  let app = app().await;
  seed_profile(&app).await;

  let (status, body) = send(
    &app,
    "POST",
    "/mapping",
    Some(json!({
      "pageId": "https://jobs.example.com/apply/1",
      "ownerId": "john@example.com",
      "fields": { "//input[@id='fn']": "John", "//input[@id='x']": "Jane" },
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "success");
  assert_eq!(body["version"], 1);
  assert_eq!(body["inverted"]["//input[@id='fn']"], "firstName");
  assert_eq!(body["inverted"]["//input[@id='x']"], "Jane");

  let (status, body) = send(
    &app,
    "GET",
    "/mapping?pageId=https%3A%2F%2Fjobs.example.com%2Fapply%2F1&ownerId=john%40example.com",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["ownerId"], "john@example.com");
  assert_eq!(body["fields"]["//input[@id='fn']"], "John");
  assert!(body.get("createdAt").is_some());
}

#[tokio::test]
async fn capture_validation_errors_are_400() {
  let app = app().await;

  let (status, body) = send(&app, "POST", "/mapping", Some(json!({ "fields": {} }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("pageId"));

  let (status, _) = send(&app, "POST", "/mapping", Some(json!({ "pageId": "p", "fields": {} }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, stats) = send(&app, "GET", "/stats", None).await;
  assert_eq!(stats["mappings"], 0);
}

#[tokio::test]
async fn unscoped_policy_accepts_legacy_body() {
  let app = app_with(WritePolicy { owner_scoped: false, max_attempts: 3 }).await;

  let (status, body) = send(
    &app,
    "POST",
    "/mapping",
    Some(json!({ "url": "https://a.example/form", "mapping": { "q": "1" } })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["inverted"].is_null());

  let (status, body) = send(&app, "GET", "/all", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "success");
  assert_eq!(body["data"][0]["pageId"], "https://a.example/form");
  assert!(body["data"][0].get("ownerId").is_none());
}

#[tokio::test]
async fn delete_missing_mapping_is_404() {
  let app = app().await;
  let (status, body) = send(&app, "DELETE", "/mapping?pageId=nope&ownerId=o%40x.io", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn delete_existing_mapping_is_204() {
  let app = app().await;
  send(
    &app,
    "POST",
    "/mapping",
    Some(json!({ "pageId": "p", "ownerId": "o@x.io", "fields": { "a": "1" } })),
  )
  .await;

  let (status, _) = send(&app, "DELETE", "/mapping?pageId=p&ownerId=o%40x.io", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&app, "GET", "/mapping?pageId=p&ownerId=o%40x.io", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recent_mappings_respects_limit() {
  let app = app().await;
  for page in ["p1", "p2", "p3"] {
    send(
      &app,
      "POST",
      "/mapping",
      Some(json!({ "pageId": page, "ownerId": "o@x.io", "fields": {} })),
    )
    .await;
  }
  let (status, body) = send(&app, "GET", "/mappings/recent?limit=2", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn zero_limit_is_rejected() {
  let app = app().await;
  for uri in ["/mappings/recent?limit=0", "/profiles/recent?limit=0", "/profiles/search?q=a&limit=0"] {
    let (status, body) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    assert_eq!(body["error"], "limit must be at least 1");
  }

  let (status, _) = send(&app, "GET", "/mappings/recent?limit=1000", None).await;
  assert_eq!(status, StatusCode::OK);
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn inverted_lookup_falls_back_to_same_host() {
  let app = app().await;
  seed_profile(&app).await;
  send(
    &app,
    "POST",
    "/mapping",
    Some(json!({
      "pageId": "https://jobs.example.com/apply/2",
      "ownerId": "john@example.com",
      "fields": { "city": "springfield", "school": "State U" },
    })),
  )
  .await;

  let (status, body) = send(
    &app,
    "GET",
    "/inverted?pageId=https%3A%2F%2Fjobs.example.com%2Fapply%2F1",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["found"], true);
  assert_eq!(body["pageId"], "https://jobs.example.com/apply/1");
  assert_eq!(body["matchedPageId"], "https://jobs.example.com/apply/2");
  assert_eq!(body["fields"]["city"], "address_city");
  assert_eq!(body["fields"]["school"], "education_0_schoolName");

  let (_, all) = send(&app, "GET", "/inverted/all", None).await;
  assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn inverted_miss_is_uniform_200() {
  let app = app().await;
  let (status, body) = send(&app, "GET", "/inverted?pageId=https%3A%2F%2Fnowhere.example%2F", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["found"], false);
  assert_eq!(body["fields"], json!({}));

  let (status, _) = send(&app, "GET", "/inverted", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn autofill_returns_nested_profile() {
  let app = app().await;
  seed_profile(&app).await;
  send(
    &app,
    "POST",
    "/mapping",
    Some(json!({
      "pageId": "https://jobs.example.com/apply/1",
      "ownerId": "john@example.com",
      "fields": { "fn": "John" },
    })),
  )
  .await;

  let (status, body) = send(
    &app,
    "GET",
    "/autofill?pageId=https%3A%2F%2Fjobs.example.com%2Fapply%2F1&email=john%40example.com",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["fields"]["fn"], "firstName");
  assert_eq!(body["profile"]["firstName"], "John");
  assert_eq!(body["profile"]["address"]["city"], "Springfield");
  assert_eq!(body["profile"]["education"][0]["major"], "CS");
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_crud() {
  let app = app().await;
  seed_profile(&app).await;

  let (status, body) = send(&app, "GET", "/profile?email=john%40example.com", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["lastName"], "Doe");
  assert_eq!(body["skills"], json!([]));

  let (status, body) = send(&app, "GET", "/profiles/search?q=doe", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["email"], "john@example.com");

  let (_, body) = send(&app, "GET", "/profiles/recent", None).await;
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (status, _) = send(&app, "DELETE", "/profile?email=john%40example.com", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&app, "GET", "/profile?email=john%40example.com", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&app, "DELETE", "/profile?email=john%40example.com", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_without_email_is_400() {
  let app = app().await;
  let (status, _) = send(&app, "POST", "/profile", Some(json!({ "firstName": "X" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, "GET", "/profile", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_counts_collections() {
  let app = app().await;
  seed_profile(&app).await;
  send(
    &app,
    "POST",
    "/mapping",
    Some(json!({ "pageId": "p", "ownerId": "john@example.com", "fields": { "a": "Doe" } })),
  )
  .await;

  let (status, body) = send(&app, "GET", "/stats", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "profiles": 1, "mappings": 1, "invertedMappings": 1 }));
}
