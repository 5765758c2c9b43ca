//! The HTTP surface end to end, against the in-memory store.

#![allow(clippy::unwrap_used)] // Test code

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use helpdesk_auth::mocks::StaticIdentityProvider;
use helpdesk_auth::{Authenticator, DEFAULT_TOKEN_TTL, TokenIssuer};
use helpdesk_testing::helpers::{ADMIN_EXTERNAL_ID, SUPPORT_EXTERNAL_ID, TestHelpdesk};
use helpdesk_testing::test_clock;
use helpdesk_web::{AppState, CORRELATION_ID_HEADER, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "helpdesk-boundary";

fn app() -> Router {
    let helpdesk = TestHelpdesk::new();
    let auth = Authenticator::new(
        Arc::new(StaticIdentityProvider),
        TokenIssuer::new(b"http-test-secret", DEFAULT_TOKEN_TTL),
        Arc::clone(&helpdesk.roles),
        helpdesk.store.clone(),
        Arc::new(test_clock()),
    );
    router(AppState::new(helpdesk.registry, Arc::new(auth)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn multipart(uri: &str, token: &str, text: Option<&str>, file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(text) = text {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn login(app: &Router, credential: &str) -> String {
    let (status, body) = send(
        app,
        json_request("POST", "/auth/telegram", None, &json!({ "initData": credential })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn raise_ticket(app: &Router, token: &str) -> i64 {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/tickets",
            Some(token),
            &json!({ "title": "Printer on fire", "description": "Third floor" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn login_returns_a_usable_token() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("POST", "/auth/telegram", None, &json!({ "initData": "77:@anna" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["telegram_id"], 77);
    assert_eq!(body["user"]["role"], "author");

    let token = body["token"].as_str().unwrap();
    let (status, me) = send(&app, get("/auth/me", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["full_name"], "anna");
    assert_eq!(me["username"], "anna");
}

#[tokio::test]
async fn configured_staff_sign_in_with_their_roles() {
    let app = app();
    let admin = login(&app, &format!("{ADMIN_EXTERNAL_ID}:Admin")).await;
    let (_, me) = send(&app, get("/auth/me", &admin)).await;
    assert_eq!(me["role"], "admin");
}

#[tokio::test]
async fn requests_without_a_valid_token_are_unauthorized() {
    let app = app();
    let unauthenticated = Request::builder()
        .uri("/tickets")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, unauthenticated).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, get("/tickets", "forged.token.value")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_routes_look_like_access_denials() {
    let app = app();
    let author = login(&app, "77:Anna").await;

    let (denied_status, denied) = send(&app, get("/tickets?filter=all", &author)).await;
    let (unknown_status, unknown) = send(&app, get("/../../etc/passwd", &author)).await;
    let (anonymous_status, anonymous) = send(
        &app,
        Request::builder()
            .uri("/admin")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(denied_status, StatusCode::FORBIDDEN);
    assert_eq!(unknown_status, StatusCode::FORBIDDEN);
    assert_eq!(anonymous_status, StatusCode::FORBIDDEN);
    assert_eq!(unknown, denied);
    assert_eq!(anonymous, denied);
}

#[tokio::test]
async fn tickets_are_created_and_read_back() {
    let app = app();
    let author = login(&app, "77:@anna").await;
    let id = raise_ticket(&app, &author).await;

    let (status, ticket) = send(&app, get(&format!("/tickets/{id}"), &author)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["number"], "#2025-001");
    assert_eq!(ticket["status"], "new");
    assert_eq!(ticket["is_urgent"], false);
    assert_eq!(ticket["author"]["telegram_id"], 77);
    assert_eq!(ticket["assignee"], Value::Null);
    assert_eq!(ticket["files"], json!([]));

    let (status, mine) = send(&app, get("/tickets", &author)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blank_titles_are_unprocessable() {
    let app = app();
    let author = login(&app, "77:Anna").await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/tickets",
            Some(&author),
            &json!({ "title": "  ", "description": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn other_authors_cannot_read_a_ticket() {
    let app = app();
    let anna = login(&app, "77:Anna").await;
    let ivan = login(&app, "78:Ivan").await;
    let id = raise_ticket(&app, &anna).await;

    let (status, _) = send(&app, get(&format!("/tickets/{id}"), &ivan)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get("/tickets/999", &ivan)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn lifecycle_over_http() {
    let app = app();
    let author = login(&app, "77:Anna").await;
    let support = login(&app, &format!("{SUPPORT_EXTERNAL_ID}:Olga")).await;
    let id = raise_ticket(&app, &author).await;

    let (status, ticket) = send(
        &app,
        json_request("PUT", &format!("/tickets/{id}/assign"), Some(&support), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["status"], "in_progress");
    assert_eq!(ticket["assignee"]["full_name"], "Olga");

    let (status, body) = send(
        &app,
        json_request("PUT", &format!("/tickets/{id}/assign"), Some(&support), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let status_change = |token: &str, target: &str| {
        json_request(
            "PUT",
            &format!("/tickets/{id}/status"),
            Some(token),
            &json!({ "status": target }),
        )
    };

    let (status, _) = send(&app, status_change(&author, "closed")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, status_change(&support, "reopened")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, _) = send(&app, status_change(&support, "archived")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, status_change(&support, "biz_review")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, ticket) = send(&app, status_change(&author, "closed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["status"], "closed");

    let (status, messages) = send(&app, get(&format!("/tickets/{id}/messages"), &author)).await;
    assert_eq!(status, StatusCode::OK);
    let roles: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["sender_role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, ["system", "system", "system"]);

    let (status, _) = send(
        &app,
        multipart(&format!("/tickets/{id}/messages"), &author, Some("still broken"), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn urgency_is_toggled_by_the_author() {
    let app = app();
    let author = login(&app, "77:Anna").await;
    let id = raise_ticket(&app, &author).await;

    let (status, ticket) = send(
        &app,
        json_request(
            "PUT",
            &format!("/tickets/{id}/urgent"),
            Some(&author),
            &json!({ "is_urgent": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["is_urgent"], true);

    let (_, urgent) = send(&app, get("/tickets?urgent=true", &author)).await;
    assert_eq!(urgent.as_array().unwrap().len(), 1);
    let (_, calm) = send(&app, get("/tickets?urgent=false", &author)).await;
    assert_eq!(calm.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn messages_carry_files_that_can_be_downloaded() {
    let app = app();
    let author = login(&app, "77:Anna").await;
    let id = raise_ticket(&app, &author).await;

    let (status, message) = send(
        &app,
        multipart(
            &format!("/tickets/{id}/messages"),
            &author,
            Some("log attached"),
            Some(("log.txt", b"line 1\nline 2".as_slice())),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{message}");
    assert_eq!(message["sender_role"], "author");
    assert_eq!(message["text"], "log attached");
    assert_eq!(message["files"][0]["filename"], "log.txt");
    assert_eq!(message["files"][0]["filesize"], 13);

    let stored_path = message["files"][0]["stored_path"].as_str().unwrap();
    assert!(stored_path.starts_with(&format!("{id}/")));

    let response = app
        .clone()
        .oneshot(get(&format!("/files/{stored_path}"), &author))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("log.txt")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"line 1\nline 2");

    let stranger = login(&app, "78:Ivan").await;
    let (status, _) = send(&app, get(&format!("/files/{stored_path}"), &stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn uploads_respect_the_attachment_policy() {
    let app = app();
    let author = login(&app, "77:Anna").await;
    let id = raise_ticket(&app, &author).await;

    let (status, body) = send(
        &app,
        multipart(
            &format!("/tickets/{id}/files"),
            &author,
            None,
            Some(("setup.EXE", b"MZ".as_slice())),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], "DISALLOWED_FILE_TYPE");

    let (status, file) = send(
        &app,
        multipart(
            &format!("/tickets/{id}/files"),
            &author,
            None,
            Some(("screenshot.png", b"\x89PNG".as_slice())),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(file["filename"], "screenshot.png");

    let (_, ticket) = send(&app, get(&format!("/tickets/{id}"), &author)).await;
    assert_eq!(ticket["files"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        multipart(&format!("/tickets/{id}/files"), &author, None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn traversal_references_are_refused() {
    let app = app();
    let author = login(&app, "77:Anna").await;
    let (status, _) = send(&app, get("/files/..%2F..%2Fetc%2Fpasswd", &author)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_and_readiness() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));

    let (status, body) = send(
        &app,
        Request::builder().uri("/ready").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}
