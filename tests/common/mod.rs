#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use reelshelf::{AppState, app, config::Config, db::connect_and_migrate, retry::RetryPolicy};
use sea_orm::{ConnectOptions, DatabaseConnection};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const PUBLIC_URL: &str = "http://testserver";

/// Fresh in-memory database. One connection keeps every query on the same
/// SQLite instance.
pub async fn test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    connect_and_migrate(opts).await.expect("migrated test database")
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        backoff_factor: 0.0,
        retry_statuses: vec![500, 502, 504],
        attempt_timeout: Duration::from_secs(5),
    }
}

pub fn test_config(movies_api_url: &str) -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_ttl_minutes: 5,
        movies_api_url: movies_api_url.to_string(),
        movies_username: "catalogue-user".to_string(),
        movies_password: "catalogue-pass".to_string(),
        movies_rps: 1000,
        movies_retry: fast_retry(),
        public_url: Some(PUBLIC_URL.to_string()),
    }
}

/// Binds `router` on an ephemeral local port and serves it in the background.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: DatabaseConnection,
}

impl TestApp {
    pub async fn new() -> Self {
        // Nothing listens here; tests that reach the catalogue use `with_upstream`.
        Self::with_upstream("http://127.0.0.1:9/movies/").await
    }

    pub async fn with_upstream(movies_api_url: &str) -> Self {
        let db = test_db().await;
        let config = Arc::new(test_config(movies_api_url));
        let state = Arc::new(AppState::new(config, db.clone(), wreq::Client::new()));
        Self { router: app(state.clone()), state, db }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    /// Registers `username` and returns its access token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/register/",
                None,
                Some(json!({ "username": username, "password": "s3cret-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Creates a collection and returns its uuid.
    pub async fn create_collection(&self, token: &str, payload: Value) -> String {
        let (status, body) = self.call(Method::POST, "/collection/", Some(token), Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["collection_uuid"].as_str().unwrap().to_string()
    }
}

pub fn movie(uuid: &str, title: &str, genres: Option<&str>) -> Value {
    json!({
        "uuid": uuid,
        "title": title,
        "description": format!("About {title}"),
        "genres": genres,
    })
}
