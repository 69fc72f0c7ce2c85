//! Router-level tests against in-memory stores.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use eventhub_server::routes::create_routes;
use eventhub_server::state::AppState;
use eventhub_server::utils::identity::USER_ID_HEADER;

fn app() -> Router {
    create_routes(AppState::in_memory())
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn event_body(title: &str, capacity: u32) -> Value {
    json!({
        "title": title,
        "description": "An evening of talks",
        "category": "CONFERENCE",
        "startDateTime": "2030-06-01T18:00:00Z",
        "endDateTime": "2030-06-01T21:00:00Z",
        "locationType": "PHYSICAL",
        "address": "1 Main St",
        "city": "Lisbon",
        "country": "PT",
        "capacity": capacity,
        "tags": ["rust"]
    })
}

async fn create_event(app: &Router, organizer: &str, capacity: u32) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/events",
        Some(organizer),
        Some(event_body("Meetup", capacity)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn register(app: &Router, user: &str, event_id: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/registrations",
        Some(user),
        Some(json!({ "eventId": event_id })),
    )
    .await
}

#[tokio::test]
async fn test_health_check_carries_security_headers() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_create_event_requires_caller_identity() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/events",
        None,
        Some(event_body("Anonymous", 10)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_waitlist_scenario_over_http() {
    let app = app();
    let event_id = create_event(&app, "org-1", 1).await;

    let (status, a) = register(&app, "user-a", &event_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(a["data"]["status"], "CONFIRMED");

    let (_, b) = register(&app, "user-b", &event_id).await;
    assert_eq!(b["data"]["status"], "WAITLISTED");

    let (status, body) = register(&app, "user-a", &event_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let a_id = a["data"]["id"].as_str().unwrap();
    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/registrations/{}", a_id),
        Some("user-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, regs) = call(
        &app,
        Method::GET,
        &format!("/api/registrations/event/{}", event_id),
        None,
        None,
    )
    .await;
    let statuses: Vec<&str> = regs["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"CANCELLED"));
    assert!(statuses.contains(&"WAITLISTED"));
    assert!(!statuses.contains(&"CONFIRMED"));

    let (_, event) = call(&app, Method::GET, &format!("/api/events/{}", event_id), None, None).await;
    assert_eq!(event["data"]["registeredCount"], 0);
}

#[tokio::test]
async fn test_status_update_rejects_unknown_value() {
    let app = app();
    let event_id = create_event(&app, "org-1", 5).await;

    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/api/events/{}/status", event_id),
        Some("org-1"),
        Some(json!({ "status": "BOGUS" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");

    let (_, event) = call(&app, Method::GET, &format!("/api/events/{}", event_id), None, None).await;
    assert_eq!(event["data"]["status"], "PUBLISHED");
}

#[tokio::test]
async fn test_delete_by_other_organizer_is_forbidden() {
    let app = app();
    let event_id = create_event(&app, "org-x", 5).await;

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/events/{}", event_id),
        Some("org-y"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, event) = call(&app, Method::GET, &format!("/api/events/{}", event_id), None, None).await;
    assert_eq!(event["data"]["status"], "PUBLISHED");
}

#[tokio::test]
async fn test_dashboard_lists_active_registrations_with_events() {
    let app = app();
    let first = create_event(&app, "org-1", 5).await;
    let second = create_event(&app, "org-1", 5).await;
    register(&app, "user-a", &first).await;
    let (_, reg) = register(&app, "user-a", &second).await;

    call(
        &app,
        Method::DELETE,
        &format!("/api/registrations/{}", reg["data"]["id"].as_str().unwrap()),
        Some("user-a"),
        None,
    )
    .await;

    let (status, body) = call(&app, Method::GET, "/dashboard/attendee", Some("user-a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["registrations"][0]["event"]["id"], first.as_str());
    assert_eq!(body["data"]["registrations"][0]["event"]["registeredCount"], 1);
}

#[tokio::test]
async fn test_list_and_search_events() {
    let app = app();
    create_event(&app, "org-1", 5).await;
    create_event(&app, "org-2", 5).await;

    let (status, page) = call(&app, Method::GET, "/api/events?page=0&size=1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"]["totalElements"], 2);
    assert_eq!(page["data"]["content"].as_array().unwrap().len(), 1);

    let (_, found) = call(&app, Method::GET, "/api/events/search?q=meet", None, None).await;
    assert_eq!(found["data"]["totalElements"], 2);

    let (_, mine) = call(&app, Method::GET, "/api/events/organizer/org-2", None, None).await;
    assert_eq!(mine["data"]["totalElements"], 1);

    let (status, _) = call(&app, Method::GET, "/api/events/category/nonsense", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_user_profile_is_not_found() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/users/me", Some("ghost"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_registration_writes_require_caller_identity() {
    let app = app();
    let event_id = create_event(&app, "org-1", 1).await;
    register(&app, "user-a", &event_id).await;
    let (_, waitlisted) = register(&app, "user-b", &event_id).await;
    let waitlisted_id = waitlisted["data"]["id"].as_str().unwrap();

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/registrations/{}", waitlisted_id),
        None,
        Some(json!({ "status": "CONFIRMED" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/api/registrations/{}/attendance", waitlisted_id),
        None,
        Some(json!({ "attended": true })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, event) = call(&app, Method::GET, &format!("/api/events/{}", event_id), None, None).await;
    assert_eq!(event["data"]["registeredCount"], 1);

    let (_, regs) = call(
        &app,
        Method::GET,
        &format!("/api/registrations/event/{}", event_id),
        None,
        None,
    )
    .await;
    let untouched = regs["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == waitlisted_id)
        .unwrap();
    assert_eq!(untouched["status"], "WAITLISTED");
    assert_eq!(untouched["attended"], false);
}

#[tokio::test]
async fn test_deactivate_user_requires_caller_identity() {
    let app = app();
    let (status, body) = call(&app, Method::DELETE, "/api/users/someone", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let app = app();
    let event_id = create_event(&app, "org-1", 5).await;
    let (_, reg) = register(&app, "user-a", &event_id).await;

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/registrations/{}", reg["data"]["id"].as_str().unwrap()),
        Some("org-1"),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/events",
        Some("org-1"),
        Some(json!({ "title": "No dates" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_oversized_capacity_is_rejected() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/events",
        Some("org-1"),
        Some(event_body("Stadium", u32::MAX)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
