//! Router tests that never reach the database

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use library_server::{
    api,
    config::AppConfig,
    models::{
        enums::Role,
        user::{TokenKind, User, UserClaims},
    },
    repository::Repository,
    services::Services,
    AppState,
};

fn app() -> Router {
    let config = AppConfig::default();
    // Nothing here opens a connection: every request below is rejected before the account lookup
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .unwrap();
    let services = Services::new(Repository::new(pool), &config);
    api::create_router(AppState {
        services: Arc::new(services),
    })
}

fn token(role: Role, kind: TokenKind) -> String {
    let user = User {
        id: 42,
        username: "tester".to_string(),
        password: String::new(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        middle_name: String::new(),
        email: String::new(),
        birth_date: None,
        passport: None,
        phone: None,
        address: None,
        role,
        is_active: true,
        date_joined: Utc::now(),
    };
    UserClaims::new(&user, kind, Duration::minutes(5))
        .create_token(&AppConfig::default().auth.jwt_secret)
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (status, body) = send(app(), get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (status, body) = send(app(), get("/api/books", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_malformed_header_is_unauthorized() {
    let request = Request::builder()
        .uri("/api/books")
        .header(AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let (status, _) = send(app(), get("/api/issues", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate_requests() {
    let refresh = token(Role::Librarian, TokenKind::Refresh);
    let (status, body) = send(app(), get("/api/reports/overdue", Some(&refresh))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("Access token"));
}

#[tokio::test]
async fn test_verify_token() {
    let access = token(Role::Reader, TokenKind::Access);
    let (status, body) = send(
        app(),
        post_json("/api/token/verify", None, json!({ "token": access })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, _) = send(
        app(),
        post_json("/api/token/verify", None, json!({ "token": "garbage" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let (status, body) = send(app(), get("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/books/{id}"));
    assert!(paths.contains_key("/reports/overdue"));
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_register_rejects_bad_formats() {
    let (status, body) = send(
        app(),
        post_json(
            "/api/register",
            None,
            json!({
                "username": "newreader",
                "password": "secret",
                "birth_date": "2000-01-01",
                "passport": "123",
                "phone": "+7123",
                "address": "Bishkek, Chui 1"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("passport"));
    assert!(message.contains("phone"));
}

#[tokio::test]
async fn test_register_rejects_underage_reader() {
    let birth_date = Utc::now().date_naive() - Duration::days(365 * 10);
    let (status, body) = send(
        app(),
        post_json(
            "/api/register",
            None,
            json!({
                "username": "youngreader",
                "password": "secret",
                "birth_date": birth_date,
                "passport": "AN123456",
                "phone": "+996555123456",
                "address": "Bishkek, Chui 1"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("age"));
}
