#![allow(dead_code)]

use focusboard::config::Config;
use focusboard::db;
use focusboard::routes;
use focusboard::state::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse";

pub struct TestServer {
    pub base: String,
    _dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.bcrypt_cost = 4;
    config
}

/// Serve the app on an ephemeral port backed by a throwaway database.
pub async fn spawn_server(config: Config) -> TestServer {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("test.db")).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    let app = routes::app(AppState::build(pool, config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().cookie_store(true).build().unwrap()
}

/// A client holding a session for a freshly registered account.
pub async fn signed_in_client(server: &TestServer, email: &str) -> (reqwest::Client, Value) {
    let client = client();
    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201, "registration failed for {email}");
    let body: Value = res.json().await.unwrap();
    (client, body["user"].clone())
}

pub async fn create_post(server: &TestServer, client: &reqwest::Client, title: &str, body: &str) -> Value {
    let res = client
        .post(server.url("/api/posts"))
        .json(&json!({ "title": title, "body": body }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    res.json().await.unwrap()
}
