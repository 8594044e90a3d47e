#![allow(dead_code)]

use std::net::SocketAddr;

use api::app::build_router;
use api::auth::password::PasswordService;
use api::auth::AuthConfig;
use api::config::{AppConfig, StoreConfig};
use api::AppState;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use infra::models::{UserRole, UserRow};
use infra::repos::CreateUser;
use infra::{MemoryStore, Store};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub fn test_config() -> AppConfig {
    AppConfig {
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_expiration_minutes: 60,
            verification_token_expiration_hours: 24,
            reset_token_expiration_minutes: 15,
            bcrypt_cost: 4,
            public_base_url: "http://api.test".to_string(),
            frontend_base_url: "http://app.test".to_string(),
        },
        store: StoreConfig::default(),
        email: None,
        payment: None,
    }
}

pub struct TestApp {
    pub state: AppState<MemoryStore>,
    pub router: Router,
}

pub fn test_app() -> TestApp {
    test_app_with(test_config())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    let state = AppState::new(MemoryStore::new(), config);
    let router = build_router(state.clone());
    TestApp { state, router }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let mut request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        // The rate limiter keys on the peer address that `serve` would attach.
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Inserts a user straight into the store and returns it with a bearer token.
    pub async fn create_user(&self, role: UserRole) -> (UserRow, String) {
        let email = format!("user_{}@example.com", Uuid::new_v4().simple());
        let user = self
            .state
            .store
            .create_user(CreateUser {
                name: "Test User".to_string(),
                email,
                password_hash: PasswordService::hash("password123".to_string(), 4)
                    .await
                    .unwrap(),
                role,
            })
            .await
            .unwrap();
        let token = self.state.jwt_service().token_for(&user).unwrap();
        (user, token)
    }

    /// Creates a turf owned by a fresh owner; returns the turf id and owner token.
    pub async fn create_turf(&self, slots: &[&str]) -> (Uuid, String) {
        let (_, owner_token) = self.create_user(UserRole::Owner).await;
        let (status, turf) = self
            .post(
                "/turfs",
                Some(&owner_token),
                serde_json::json!({
                    "name": "Green Field",
                    "price": 800,
                    "city": "Pune",
                    "slots": slots,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{turf}");
        let id = Uuid::parse_str(turf["id"].as_str().unwrap()).unwrap();
        (id, owner_token)
    }
}

pub fn reserve_body(turf_id: Uuid, date: &str, slot: &str) -> Value {
    serde_json::json!({
        "turfId": turf_id,
        "date": date,
        "slot": slot,
        "name": "Asha",
        "email": "asha@example.com",
        "phone": "9999999999",
    })
}
