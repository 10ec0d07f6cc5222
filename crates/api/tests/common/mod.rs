#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sleuth_api::auth::jwt::{issue_token, JwtConfig};
use sleuth_api::config::{PaymentConfig, ServerConfig};
use sleuth_api::router::build_app_router;
use sleuth_api::state::AppState;
use sleuth_core::account::Principal;
use sleuth_core::catalog::{Case, Question};
use sleuth_core::geometry::AnswerRegion;
use sleuth_core::payment::{GatewayError, PaymentGateway, PaymentRecord};
use sleuth_core::products::{find_product, ProductReference, PRODUCT_CURRENCY};
use sleuth_core::types::CaseId;
use sleuth_db::MemoryStore;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin and a 30-second request
/// timeout. The case cache stays in memory only.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        },
        payment: PaymentConfig {
            api_url: "http://payments.invalid".to_string(),
            api_secret: None,
        },
        case_cache_ttl_secs: 300,
        case_cache_dir: None,
        app_env: "test".to_string(),
    }
}

/// A case whose questions each have one answer region at `(0.2, 0.3)`
/// sized `0.1 x 0.1`. Storage ids are `id * 100 + ordinal`.
pub fn case(id: CaseId, question_count: i32) -> Case {
    Case {
        id,
        title: format!("Case {id}"),
        image: format!("https://cdn.example.com/cases/{id}.jpg"),
        thumbnail: None,
        questions: (1..=question_count)
            .map(|n| Question {
                id: n,
                db_id: id * 100 + i64::from(n),
                text: format!("Question {n}"),
                explanation: format!("Explanation {n}"),
                answer_regions: vec![AnswerRegion::new(0.2, 0.3, 0.1, 0.1)],
            })
            .collect(),
    }
}

/// Router plus handles into its state for seeding and assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn token(&self, principal: Principal) -> String {
        issue_token(principal, 3600, &self.state.config.jwt).unwrap()
    }
}

/// Cases 1..=3 with 2, 3 and 1 questions; payments unconfigured.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config(), None)
}

/// Build the full application router over an in-memory store, with the
/// account reconciler listening on the session bus as in `main.rs`.
pub fn build_test_app_with(
    config: ServerConfig,
    gateway: Option<Arc<dyn PaymentGateway>>,
) -> TestApp {
    let store = MemoryStore::with_cases(vec![case(1, 2), case(2, 3), case(3, 1)]);
    let state = AppState::new(Arc::new(store.clone()), config.clone(), gateway);

    tokio::spawn(Arc::clone(&state.reconciler).run(state.session_bus.subscribe()));

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        store,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status, then decode the body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Scripted [`PaymentGateway`] returning canned records by payment id.
#[derive(Default)]
pub struct FakeGateway {
    payments: Mutex<HashMap<String, Result<PaymentRecord, GatewayError>>>,
}

impl FakeGateway {
    pub fn with_payment(self, record: PaymentRecord) -> Self {
        self.payments
            .lock()
            .unwrap()
            .insert(record.id.clone(), Ok(record));
        self
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::Lookup(format!("no payment {payment_id}"))))
    }
}

/// A settled payment for `product_id` that passes verification.
pub fn paid_record(payment_id: &str, product_id: &str) -> PaymentRecord {
    let product = find_product(product_id).unwrap();
    PaymentRecord {
        id: payment_id.to_string(),
        status: "PAID".into(),
        channel_type: Some("TEST".into()),
        custom_data: Some(ProductReference::encode(product_id)),
        order_name: Some(product.name.to_string()),
        amount_total: Some(product.price),
        currency: Some(PRODUCT_CURRENCY.to_string()),
    }
}
