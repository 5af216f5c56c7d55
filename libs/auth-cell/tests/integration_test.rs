use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::auth_routes;
use auth_cell::services::password::PasswordService;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn create_test_app(config: &TestConfig) -> Router {
    auth_routes(config.to_arc())
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_token(http_method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(http_method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Account row whose stored hash matches `password`.
fn stored_account(user: &TestUser, password: &str, active: bool) -> Value {
    let mut row = MockSupabaseResponses::account_response(user);
    row["passwordHash"] = json!(PasswordService::hash_password(password).unwrap());
    row["isActive"] = json!(active);
    row
}

async fn mount_lookup(server: &MockServer, email: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("email", format!("eq.{}", email)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

// ==============================================================================
// REGISTRATION
// ==============================================================================

#[tokio::test]
async fn test_register_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::patient("jane@example.com");

    mount_lookup(&mock_server, "jane@example.com", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .and(body_partial_json(json!({
            "email": "jane@example.com",
            "role": "patient",
            "firstName": "Jane",
            "isActive": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::account_response(&user)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = json!({
        "email": "  Jane@Example.com ",
        "password": "a-long-password",
        "firstName": "Jane",
        "lastName": "Roe"
    });

    let response = create_test_app(&config).oneshot(post_json("/register", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert!(body["account"].get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap();
    let claims = validate_token(token, &config.jwt_secret).unwrap();
    assert_eq!(claims.id, user.id);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    mount_lookup(&mock_server, "taken@example.com", json!([{ "id": uuid::Uuid::new_v4() }])).await;

    let body = json!({
        "email": "taken@example.com",
        "password": "a-long-password",
        "firstName": "T",
        "lastName": "K"
    });

    let response = create_test_app(&config).oneshot(post_json("/register", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_admin_role() {
    let config = TestConfig::default();
    let body = json!({
        "email": "boss@example.com",
        "password": "a-long-password",
        "role": "admin",
        "firstName": "B",
        "lastName": "S"
    });

    let response = create_test_app(&config).oneshot(post_json("/register", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_doctor_requires_license() {
    let config = TestConfig::default();
    let body = json!({
        "email": "doc@example.com",
        "password": "a-long-password",
        "role": "doctor",
        "firstName": "D",
        "lastName": "R",
        "specialization": "Oncology"
    });

    let response = create_test_app(&config).oneshot(post_json("/register", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_doctor_negative_experience_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "23514",
            "message": "new row for relation \"accounts\" violates check constraint \"accounts_experienceYears_check\""
        })))
        .expect(0)
        .mount(&mock_server)
        .await;

    let body = json!({
        "email": "doc@example.com",
        "password": "a-long-password",
        "role": "doctor",
        "firstName": "D",
        "lastName": "R",
        "specialization": "Oncology",
        "licenseNumber": "MD-77",
        "experienceYears": -3
    });

    let response = create_test_app(&config).oneshot(post_json("/register", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("experienceYears"));
}

#[tokio::test]
async fn test_register_with_malformed_body_is_bad_request() {
    let config = TestConfig::default();

    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from("{\"email\": \"a@example.com\""))
        .unwrap();

    let response = create_test_app(&config).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_register_short_password() {
    let config = TestConfig::default();
    let body = json!({
        "email": "p@example.com",
        "password": "short",
        "firstName": "P",
        "lastName": "Q"
    });

    let response = create_test_app(&config).oneshot(post_json("/register", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==============================================================================
// LOGIN
// ==============================================================================

#[tokio::test]
async fn test_login_success() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::doctor("doctor@example.com");

    mount_lookup(
        &mock_server,
        "doctor@example.com",
        json!([stored_account(&user, "open-sesame-42", true)]),
    )
    .await;

    let body = json!({ "email": "Doctor@Example.com", "password": "open-sesame-42" });
    let response = create_test_app(&config).oneshot(post_json("/login", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["account"]["role"], "doctor");
    let claims = validate_token(body["token"].as_str().unwrap(), &config.jwt_secret).unwrap();
    assert_eq!(claims.id, user.id);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_look_alike() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::patient("patient@example.com");

    mount_lookup(
        &mock_server,
        "patient@example.com",
        json!([stored_account(&user, "right-password", true)]),
    )
    .await;
    mount_lookup(&mock_server, "ghost@example.com", json!([])).await;

    let app = create_test_app(&config);

    let wrong = app
        .clone()
        .oneshot(post_json("/login", json!({ "email": "patient@example.com", "password": "wrong-password" })))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body = read_json(wrong).await;

    let unknown = app
        .oneshot(post_json("/login", json!({ "email": "ghost@example.com", "password": "whatever-it-is" })))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = read_json(unknown).await;

    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_login_inactive_account_is_forbidden() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::patient("gone@example.com");

    mount_lookup(
        &mock_server,
        "gone@example.com",
        json!([stored_account(&user, "right-password", false)]),
    )
    .await;

    let response = create_test_app(&config)
        .oneshot(post_json("/login", json!({ "email": "gone@example.com", "password": "right-password" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ==============================================================================
// TOKENS
// ==============================================================================

#[tokio::test]
async fn test_validate_returns_claims() {
    let config = TestConfig::default();
    let user = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let response = create_test_app(&config)
        .oneshot(with_token("POST", "/validate", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["userId"], user.id.to_string());
    assert_eq!(body["role"], "patient");
}

#[tokio::test]
async fn test_validate_rejects_expired_and_missing_tokens() {
    let config = TestConfig::default();
    let user = TestUser::patient("patient@example.com");
    let expired = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);

    let app = create_test_app(&config);

    let response = app.clone().oneshot(with_token("POST", "/validate", &expired)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bare = Request::builder().method("POST").uri("/validate").body(Body::empty()).unwrap();
    let response = app.oneshot(bare).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_reports_validity() {
    let config = TestConfig::default();
    let user = TestUser::patient("patient@example.com");
    let app = create_test_app(&config);

    let good = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let response = app.clone().oneshot(with_token("POST", "/verify", &good)).await.unwrap();
    assert_eq!(read_json(response).await, json!({ "valid": true }));

    let forged = JwtTestUtils::create_invalid_signature_token(&user);
    let response = app.oneshot(with_token("POST", "/verify", &forged)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({ "valid": false }));
}

#[tokio::test]
async fn test_me_returns_current_account() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let user = TestUser::patient("patient@example.com");

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::account_response(&user)
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));
    let response = create_test_app(&config).oneshot(with_token("GET", "/me", &token)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["email"], "patient@example.com");
}
