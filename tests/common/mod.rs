#![allow(dead_code)]

use reqwest::header::{HeaderMap, SET_COOKIE};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use vacq_api::auth::hash_password;
use vacq_api::{build_app, AppConfig, AppState, MemoryStore};

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(AppConfig::default()).await
    }

    pub async fn spawn_with(config: AppConfig) -> Self {
        let state = AppState::new(Arc::new(MemoryStore::new()), config);
        let app = build_app(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });
        Self {
            base_url: format!("http://{}", addr),
            state,
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Store a user directly and return `(id, bearer token)`.
    pub async fn seed_user(&self, email: &str, role: &str) -> (String, String) {
        let mut body = Map::new();
        body.insert("name".into(), json!("Seeded"));
        body.insert("email".into(), json!(email));
        body.insert("role".into(), json!(role));
        body.insert("password".into(), json!(hash_password("secret123").unwrap()));
        let doc = self.state.store.insert("users", body).await.unwrap();
        let token = self.state.tokens.issue(doc.id).unwrap();
        (doc.id.to_string(), token)
    }

    pub async fn admin(&self) -> String {
        self.seed_user("admin@example.com", "admin").await.1
    }

    pub async fn create_hospital(&self, token: &str, name: &str) -> Value {
        let res = self
            .client
            .post(self.url("/hospitals"))
            .bearer_auth(token)
            .json(&json!({"name": name, "address": "123 Main", "province": "Bangkok"}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["data"].clone()
    }

    pub async fn hospital_total(&self) -> u64 {
        let body: Value = self
            .client
            .get(self.url("/hospitals"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["meta"]["total"].as_u64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The `token=...` pair from a response's `Set-Cookie`, ready for a `Cookie` header.
pub fn token_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("token="))
        .and_then(|c| c.split(';').next())
        .map(str::to_string)
}
