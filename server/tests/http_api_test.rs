//! End-to-end API tests over in-memory backends.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::{to_bytes, Body},
    Router,
};
use http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use shopfront_batch::InMemoryReportStore;
use shopfront_cache::InMemoryCacheBackend;
use shopfront_core::environment::{Clock, SystemClock};
use shopfront_core::providers::UserRepository;
use shopfront_core::user::Role;
use shopfront_server::{build_router, AppState, Config, Repositories};
use std::sync::Arc;
use tower::ServiceExt;

const PASSWORD: &str = "Secret123";

struct TestApp {
    router: Router,
    repositories: Repositories,
}

impl TestApp {
    fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "BCRYPT_COST" => Some("4".to_string()),
            "JWT_SECRET" => Some("http-test-secret".to_string()),
            _ => None,
        });
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let repositories = Repositories::in_memory();
        let reports = Arc::new(InMemoryReportStore::new(
            Arc::clone(&repositories.orders),
            Arc::clone(&repositories.users),
        ));
        let state = AppState::new(
            &repositories,
            Arc::new(InMemoryCacheBackend::new()),
            reports,
            &config,
            clock,
        );
        Self {
            router: build_router(state),
            repositories,
        }
    }

    async fn send(
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
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    async fn put(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, body).await
    }

    /// Register a user, optionally promote them, and return an access token.
    async fn login_as(&self, email: &str, role: Role) -> String {
        let (status, _) = self
            .post(
                "/api/v1/users",
                None,
                json!({"email": email, "password": PASSWORD, "name": "Test User"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        if role != Role::User {
            let mut user = self
                .repositories
                .users
                .find_by_email(email)
                .await
                .unwrap()
                .expect("registered user");
            user.role = role;
            self.repositories.users.save(&user).await.unwrap();
        }

        let (status, body) = self
            .post(
                "/api/v1/auth/login",
                None,
                json!({"email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    async fn seed_product(&self, manager: &str, sku: &str, stock: i32) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/products",
                Some(manager),
                json!({
                    "name": format!("Product {sku}"),
                    "description": "A test product",
                    "price": 2_500,
                    "stock_quantity": stock,
                    "sku": sku
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn health_endpoints() {
    let app = TestApp::new();

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");

    let (status, body) = app.get("/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");

    let (status, _) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn registration_login_and_profile() {
    let app = TestApp::new();
    let token = app.login_as("ana@example.com", Role::User).await;

    let (status, body) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ana@example.com");
    assert_eq!(body["data"]["role"], "USER");
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = app
        .put(
            "/api/v1/users/me",
            Some(&token),
            Some(json!({"name": "Ana Lima", "phone": "+351900000000"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ana Lima");

    // The profile cache was evicted by the update.
    let (_, body) = app.get("/api/v1/users/me", Some(&token)).await;
    assert_eq!(body["data"]["name"], "Ana Lima");

    let (status, body) = app
        .post(
            "/api/v1/users",
            None,
            json!({"email": "ana@example.com", "password": PASSWORD, "name": "Again"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "USER_002");
}

#[tokio::test]
async fn bad_credentials_and_missing_tokens_are_rejected() {
    let app = TestApp::new();
    app.login_as("bo@example.com", Role::User).await;

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({"email": "bo@example.com", "password": "Wrong1234"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "USER_005");

    let (status, _) = app.get("/api/v1/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v1/users/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_issues_a_new_pair() {
    let app = TestApp::new();
    app.login_as("cy@example.com", Role::User).await;
    let (_, login) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({"email": "cy@example.com", "password": PASSWORD}),
        )
        .await;
    let refresh_token = login["data"]["refresh_token"].as_str().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({"refresh_token": refresh_token}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");

    // An access token is not accepted as a refresh token.
    let access_token = login["data"]["access_token"].as_str().unwrap();
    let (status, _) = app
        .post(
            "/api/v1/auth/refresh",
            None,
            json!({"refresh_token": access_token}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn catalog_writes_require_a_product_manager() {
    let app = TestApp::new();
    let customer = app.login_as("dee@example.com", Role::User).await;
    let order_admin = app.login_as("ops@example.com", Role::OrderAdmin).await;
    let product_admin = app.login_as("cat@example.com", Role::ProductAdmin).await;

    let draft = json!({"name": "Desk", "price": 19_900, "stock_quantity": 3, "sku": "DESK-1"});
    for token in [&customer, &order_admin] {
        let (status, body) = app
            .post("/api/v1/products", Some(token), draft.clone())
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    }

    let (status, _) = app
        .post("/api/v1/products", Some(&product_admin), draft.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/api/v1/products", Some(&product_admin), draft)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PRODUCT_003");
}

#[tokio::test]
async fn product_reads_count_views_and_use_the_cache() {
    let app = TestApp::new();
    let manager = app.login_as("pm@example.com", Role::ProductAdmin).await;
    let id = app.seed_product(&manager, "LAMP-1", 5).await;

    for _ in 0..3 {
        let (status, _) = app.get(&format!("/api/v1/products/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = app.get("/api/v1/products/popular?limit=1", None).await;
    assert_eq!(body["data"][0]["id"], id);
    assert_eq!(body["data"][0]["view_count"], 3);

    let (status, body) = app.get("/api/v1/products/sku/LAMP-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    // A write evicts the cached copy.
    let (status, _) = app
        .put(
            &format!("/api/v1/products/{id}/stock"),
            Some(&manager),
            Some(json!({"delta": -4})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/v1/products/sku/LAMP-1", None).await;
    assert_eq!(body["data"]["stock_quantity"], 1);

    let (_, body) = app.get("/api/v1/products/low-stock?threshold=2", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/api/v1/products/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PRODUCT_001");
}

#[tokio::test]
async fn product_listing_filters() {
    let app = TestApp::new();
    let manager = app.login_as("pm@example.com", Role::Admin).await;
    app.seed_product(&manager, "MUG-1", 5).await;
    let chair = app.seed_product(&manager, "CHAIR-1", 5).await;
    app.put(&format!("/api/v1/products/{chair}/deactivate"), Some(&manager), None)
        .await;

    let (status, body) = app
        .get("/api/v1/products?status=ACTIVE&page=0&size=10", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_elements"], 1);
    assert_eq!(body["data"]["items"][0]["sku"], "MUG-1");

    let (_, body) = app.get("/api/v1/products?keyword=chair", None).await;
    assert_eq!(body["data"]["total_elements"], 1);

    let (status, _) = app
        .get("/api/v1/products?min_price=500&max_price=100", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/v1/products?status=SOMETIMES", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn category_tree() {
    let app = TestApp::new();
    let manager = app.login_as("cat@example.com", Role::ProductAdmin).await;

    let (status, body) = app
        .post(
            "/api/v1/categories",
            Some(&manager),
            json!({"name": "Furniture"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let root = body["data"]["id"].as_i64().unwrap();

    // Cached before the child exists, evicted by its creation.
    let (_, body) = app
        .get(&format!("/api/v1/categories/{root}/children"), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (_, body) = app
        .post(
            "/api/v1/categories",
            Some(&manager),
            json!({"name": "Chairs", "parent_id": root}),
        )
        .await;
    let child = body["data"]["id"].as_i64().unwrap();

    let (_, body) = app
        .get(&format!("/api/v1/categories/{root}/children"), None)
        .await;
    assert_eq!(body["data"][0]["id"], child);

    let (_, body) = app.get("/api/v1/categories/roots", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .get(&format!("/api/v1/categories/{root}/descendants"), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Re-parenting a category under its own child would form a cycle.
    let (status, _) = app
        .put(
            &format!("/api/v1/categories/{root}"),
            Some(&manager),
            Some(json!({"name": "Furniture", "parent_id": child})),
        )
        .await;
    assert!(status.is_client_error());

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/categories/{root}"),
            Some(&manager),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CATEGORY_003");
}

#[tokio::test]
async fn order_lifecycle_moves_stock() {
    let app = TestApp::new();
    let manager = app.login_as("pm@example.com", Role::ProductAdmin).await;
    let ops = app.login_as("ops@example.com", Role::OrderAdmin).await;
    let buyer = app.login_as("buyer@example.com", Role::User).await;
    let stranger = app.login_as("other@example.com", Role::User).await;
    let product = app.seed_product(&manager, "BOOK-1", 10).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            Some(&buyer),
            json!({
                "items": [{"product_id": product, "quantity": 3}],
                "shipping_address": "1 Main St"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["total_amount"], 7_500);
    let order = body["data"]["id"].as_i64().unwrap();

    let (_, body) = app.get(&format!("/api/v1/products/{product}"), None).await;
    assert_eq!(body["data"]["stock_quantity"], 7);

    let (status, _) = app
        .get(&format!("/api/v1/orders/{order}"), Some(&stranger))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/api/v1/orders/{order}"), Some(&ops)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/v1/orders?status=PENDING", Some(&buyer)).await;
    assert_eq!(body["data"]["total_elements"], 1);
    let (_, body) = app.get("/api/v1/orders", Some(&stranger)).await;
    assert_eq!(body["data"]["total_elements"], 0);

    let (status, _) = app
        .put(&format!("/api/v1/orders/{order}/pay"), Some(&buyer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&format!("/api/v1/orders/{order}/confirm"), Some(&buyer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CONFIRMED");

    let (status, body) = app
        .put(&format!("/api/v1/orders/{order}/ship"), Some(&ops), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ORDER_003");

    let (status, body) = app
        .put(&format!("/api/v1/orders/{order}/cancel"), Some(&buyer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELLED");

    let (_, body) = app.get(&format!("/api/v1/products/{product}"), None).await;
    assert_eq!(body["data"]["stock_quantity"], 10);

    let (_, body) = app
        .get("/api/v1/orders/admin/status/CANCELLED", Some(&ops))
        .await;
    assert_eq!(body["data"]["total_elements"], 1);
}

#[tokio::test]
async fn insufficient_stock_is_rejected() {
    let app = TestApp::new();
    let manager = app.login_as("pm@example.com", Role::Admin).await;
    let buyer = app.login_as("buyer@example.com", Role::User).await;
    let product = app.seed_product(&manager, "PEN-1", 2).await;

    let (status, body) = app
        .post(
            "/api/v1/orders",
            Some(&buyer),
            json!({"items": [{"product_id": product, "quantity": 5}]}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ORDER_002");
}

#[tokio::test]
async fn admin_user_management() {
    let app = TestApp::new();
    let admin = app.login_as("root@example.com", Role::Admin).await;
    let user_token = app.login_as("eve@example.com", Role::User).await;
    let (_, me) = app.get("/api/v1/users/me", Some(&user_token)).await;
    let user_id = me["data"]["id"].as_i64().unwrap();

    let (status, _) = app.get("/api/v1/admin/users", Some(&user_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .get("/api/v1/admin/users?role=USER&active=true", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_elements"], 1);

    let (status, body) = app
        .put(
            &format!("/api/v1/admin/users/{user_id}/deactivate"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "INACTIVE");

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({"email": "eve@example.com", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "USER_006");
}

#[tokio::test]
async fn batch_jobs_run_on_demand() {
    let app = TestApp::new();
    let admin = app.login_as("root@example.com", Role::Admin).await;
    let customer = app.login_as("fay@example.com", Role::User).await;

    let (status, _) = app.get("/api/v1/batch/jobs", Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/v1/batch/jobs", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_jobs"], 2);

    let (status, _) = app
        .get("/api/v1/batch/jobs/orderReportJob/status", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post("/api/v1/batch/jobs/order-report", Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["job_name"], "orderReportJob");
    assert_eq!(body["data"]["status"], "COMPLETED");

    let (status, body) = app
        .post("/api/v1/batch/jobs/user-statistics", Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "COMPLETED");

    let (status, body) = app
        .get("/api/v1/batch/jobs/orderReportJob/status", Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    let executions = body["data"]["recent_executions"].as_array().unwrap();
    assert_eq!(executions.len(), 1);
    assert!(executions[0]["duration"].as_str().unwrap().ends_with('s'));
}

#[tokio::test]
async fn correlation_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("X-Correlation-ID", "checkout-42")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-correlation-id"], "checkout-42");
}
