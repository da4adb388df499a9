//! Integration tests for registration, login and bearer-token handling.

mod common;

use common::{signup, TestHarness};
use serde_json::{json, Value};

#[tokio::test]
async fn register_defaults_role_to_consumer() {
    let (_h, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/api/auth/register"))
        .json(&json!({"username": "alice", "email": "Alice@Example.com", "password": "pw123456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["role"], "consumer");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_rejects_missing_fields() {
    let (_h, addr) = TestHarness::with_server().await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/auth/register"))
        .json(&json!({"username": "bob", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Username, email and password are required");
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn duplicate_email_is_conflict() {
    let (_h, addr) = TestHarness::with_server().await;
    signup(addr, "carol", "consumer").await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/auth/register"))
        .json(&json!({"username": "carol2", "email": "carol@example.com", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn login_returns_token_and_profile_fields() {
    let (_h, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    client
        .post(format!("http://{addr}/api/auth/register"))
        .json(&json!({"username": "dave", "email": "dave@example.com", "password": "s3cret", "role": "creator"}))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({"email": "dave@example.com", "password": "s3cret"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["role"], "creator");
    assert_eq!(body["username"], "dave");
    assert_eq!(body["email"], "dave@example.com");
    assert!(body["userId"].is_string());
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_failures() {
    let (_h, addr) = TestHarness::with_server().await;
    signup(addr, "erin", "consumer").await;
    let client = reqwest::Client::new();

    let wrong = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({"email": "erin@example.com", "password": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let unknown = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({"email": "nobody@example.com", "password": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);

    let missing = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({"email": "erin@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);
}

#[tokio::test]
async fn protected_route_requires_valid_bearer() {
    let (_h, addr) = TestHarness::with_server().await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/users/creator/dashboard");

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No token provided");

    let resp = client.get(&url).bearer_auth("not.a.jwt").send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn token_from_other_secret_is_rejected() {
    let (_h, addr) = TestHarness::with_server().await;
    let mut other = common::test_config();
    other.auth.jwt_secret = "a-different-secret".into();
    let token = vs_server::middleware::auth::issue_token(
        &other.auth,
        vs_core::UserId::new(),
        "mallory@example.com",
        vs_core::UserRole::Creator,
    )
    .unwrap();

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/users/creator/dashboard"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
