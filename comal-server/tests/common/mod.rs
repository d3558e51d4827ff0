//! Shared test harness
//!
//! Spins up a full app (tempdir SQLite, real migrations, real audit
//! worker) and drives it through `tower::ServiceExt::oneshot`, no
//! socket involved. Tokens are minted directly through the JWT service
//! so only the login tests pay the fixed-delay path.

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use comal_server::core::{Config, ServerState, build_app};
use shared::models::{MesaCreate, ProductCreate, UserCreate, UserRole};

pub struct TestApp {
    pub state: ServerState,
    app: Router,
    _tmp: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let tmp = tempfile::tempdir().expect("create tempdir");
    let db_path = tmp.path().join("comal-test.db");
    let config = Config::with_overrides(db_path.to_string_lossy().into_owned(), 0);

    let state = ServerState::initialize(&config)
        .await
        .expect("initialize state");
    let app = build_app(&state).with_state(state.clone());

    TestApp {
        state,
        app,
        _tmp: tmp,
    }
}

impl TestApp {
    /// Insert a user directly and mint a token for it
    pub async fn seed_user(&self, name: &str, username: &str, role: UserRole) -> (i64, String) {
        let hash = comal_server::auth::hash_password("secret-password").expect("hash password");
        let user = comal_server::db::repository::user::create(
            self.state.pool(),
            &UserCreate {
                name: name.to_string(),
                username: username.to_string(),
                password: "secret-password".to_string(),
                role,
            },
            &hash,
        )
        .await
        .expect("seed user");

        let token = self
            .state
            .jwt_service()
            .generate_token(user.id, &user.username, user.role.as_str())
            .expect("mint token");
        (user.id, token)
    }

    pub async fn admin_token(&self) -> String {
        self.seed_user("Admin", "admin", UserRole::Admin).await.1
    }

    pub async fn mesero_token(&self) -> String {
        self.seed_user("Mesero", "mesero", UserRole::Mesero).await.1
    }

    pub async fn seed_product(&self, name: &str, price: f64, stock: i64) -> i64 {
        let product = comal_server::db::repository::product::create(
            self.state.pool(),
            &ProductCreate {
                code: None,
                name: name.to_string(),
                description: None,
                price,
                category: "tacos".to_string(),
                prep_minutes: None,
                image_url: None,
                is_available: true,
                stock,
                stock_min: 5,
            },
            None,
        )
        .await
        .expect("seed product");
        product.id
    }

    pub async fn seed_mesa(&self, number: i64) -> i64 {
        let mesa = comal_server::db::repository::mesa::create(
            self.state.pool(),
            &MesaCreate {
                number,
                capacity: Some(4),
                location: None,
            },
        )
        .await
        .expect("seed mesa");
        mesa.id
    }

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
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse response body")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), Some(body))
            .await
    }

    /// Wait until the async audit worker has flushed at least `min` entries
    pub async fn wait_for_audit(&self, min: i64) -> i64 {
        let query = comal_server::audit::AuditQuery::default();
        for _ in 0..100 {
            let (_, total) = self
                .state
                .audit()
                .query(&query)
                .await
                .expect("query audit log");
            if total >= min {
                return total;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("audit log never reached {min} entries");
    }
}
