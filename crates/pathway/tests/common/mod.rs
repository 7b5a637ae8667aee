//! Shared setup for the application tests.

#![allow(dead_code)]

use std::sync::Arc;

use http::StatusCode;
use pathway::{build_application, AppState};
use pathway_config::PathwayConfig;
use pathway_middleware::MemorySessionStore;
use pathway_store::MemoryStore;
use pathway_test::TestClient;
use serde_json::{json, Value};

/// Default configuration with the cheapest bcrypt cost.
pub fn config() -> PathwayConfig {
    let mut config = PathwayConfig::default();
    config.auth.bcrypt_cost = 4;
    config
}

/// A client over a freshly assembled application with an empty store.
pub fn client() -> TestClient {
    client_with(|state| state)
}

/// Like [`client`], letting the test adjust the state first.
pub fn client_with(adjust: impl FnOnce(AppState) -> AppState) -> TestClient {
    let config = config();
    let store = MemoryStore::open();
    let state = adjust(AppState::from_config(&config, &store).unwrap());
    let app = build_application(&config, state, Arc::new(MemorySessionStore::new())).unwrap();
    TestClient::new(app)
}

/// A second browser against the same application.
pub fn other_browser(client: &TestClient) -> TestClient {
    TestClient::from_arc(Arc::clone(client.app()))
}

/// Signs up `username` and returns the created user.
pub async fn signup(client: &TestClient, username: &str) -> Value {
    let response = client
        .post("/auth/signup")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret1",
        }))
        .send()
        .await;
    response.assert_envelope(StatusCode::CREATED, "User created successfully");
    response.data()
}

/// Logs `username` in with the password used by [`signup`].
pub async fn login(client: &TestClient, username: &str) {
    client
        .post("/auth/login")
        .json(&json!({ "username": username, "password": "secret1" }))
        .send()
        .await
        .assert_envelope(StatusCode::OK, "Login successful");
}

/// Signs up and logs in; returns the user's id.
pub async fn signed_in(client: &TestClient, username: &str) -> String {
    let user = signup(client, username).await;
    login(client, username).await;
    user["_id"].as_str().unwrap().to_string()
}

/// Creates a learning path as the logged-in user; returns its id.
pub async fn create_path(client: &TestClient, title: &str) -> String {
    let response = client
        .post("/api/path/create")
        .json(&json!({ "title": title, "shortDesc": "An introduction", "level": "beginner" }))
        .send()
        .await;
    response.assert_envelope(StatusCode::CREATED, "Path created successfully");
    response.data()["_id"].as_str().unwrap().to_string()
}

/// An id that has the right shape but names nothing.
pub const UNKNOWN_ID: &str = "65a1f0c2e4b0a1b2c3d4e5f6";
