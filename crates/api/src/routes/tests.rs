//! Router-level tests against the in-memory store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use billtrack_billing::{BillingError, BillingResult, BillingStore, MemoryStore, ReportGenerator};
use billtrack_shared::{Invoice, UserId};
use serde_json::{json, Value};
use time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use super::create_router;
use crate::{config::Config, state::AppState};

const SECRET: &str = "router-test-secret-at-least-32-characters";

struct StubGenerator {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ReportGenerator for StubGenerator {
    async fn generate(&self, invoices: &[Invoice]) -> BillingResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BillingError::Provider("502 Bad Gateway".to_string()));
        }
        Ok(json!({
            "summary": format!("{} bills analysed", invoices.len()),
            "recommendations": ["Pay the rent on time"],
            "totalSpent": 0,
            "remainingDue": 0,
            "upcomingBills": []
        }))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    generator: Arc<StubGenerator>,
    user_id: Uuid,
    token: String,
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        cors_allowed_origins: vec!["http://localhost:5173".to_string()],
        max_request_body_bytes: 64 * 1024,
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        jwt_secret: SECRET.to_string(),
        openai_api_key: String::new(),
        openai_base_url: "http://localhost:0".to_string(),
        openai_model: "gpt-4o-mini".to_string(),
        ai_request_timeout_ms: 1000,
    }
}

fn setup_with(fail: bool) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(StubGenerator {
        calls: AtomicUsize::new(0),
        fail,
    });
    let state = AppState::new(test_config(), store.clone(), generator.clone());
    let user_id = Uuid::new_v4();
    let token = state
        .jwt
        .issue_token(user_id, Some("ana@example.com"), Duration::hours(1))
        .unwrap();

    TestApp {
        router: create_router(state),
        store,
        generator,
        user_id,
        token,
    }
}

fn setup() -> TestApp {
    setup_with(false)
}

impl TestApp {
    fn other_token(&self) -> String {
        crate::auth::JwtManager::new(SECRET)
            .issue_token(Uuid::new_v4(), None, Duration::hours(1))
            .unwrap()
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call_as(&self.token, method, uri, body).await
    }

    async fn call_as(
        &self,
        token: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
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
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_invoice(&self, body: Value) -> Value {
        let (status, invoice) = self.call(Method::POST, "/api/invoices", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", invoice);
        invoice
    }

    async fn wallet_balance(&self) -> String {
        let (_, user) = self.call(Method::GET, "/api/auth/user", None).await;
        user["balance"].as_str().unwrap().to_string()
    }
}

fn rent(recurrence: &str) -> Value {
    json!({
        "payee": "Landlord",
        "description": "Apartment 12",
        "amount": 1500,
        "dueDate": "2024-01-31",
        "recurrenceType": recurrence,
    })
}

// ===== Auth & health =====

#[tokio::test]
async fn test_requests_without_token_are_401() {
    let app = setup();

    for (method, uri) in [
        (Method::GET, "/api/invoices"),
        (Method::POST, "/api/invoices"),
        (Method::GET, "/api/credits"),
        (Method::POST, "/api/ai/report"),
        (Method::GET, "/api/auth/user"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = setup();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_first_request_creates_user_with_defaults() {
    let app = setup();
    let (status, user) = app.call(Method::GET, "/api/auth/user", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["id"], app.user_id.to_string());
    assert_eq!(user["email"], "ana@example.com");
    assert_eq!(user["language"], "en");
    assert_eq!(user["currency"], "USD");
    assert_eq!(user["notificationsEnabled"], true);
}

// ===== Invoices =====

#[tokio::test]
async fn test_create_then_fetch_invoice() {
    let app = setup();
    let created = app
        .create_invoice(json!({
            "payee": "Electric Co",
            "amount": "120.50",
            "dueDate": "2024-03-10",
        }))
        .await;

    let (status, fetched) = app
        .call(Method::GET, &format!("/api/invoices/{}", created["id"].as_str().unwrap()), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert_eq!(fetched["payee"], "Electric Co");
    assert_eq!(fetched["amount"], "120.50");
    assert_eq!(fetched["dueDate"], "2024-03-10T00:00:00Z");
    assert_eq!(fetched["status"], "unpaid");
    assert_eq!(fetched["recurrenceType"], "none");
}

#[tokio::test]
async fn test_create_invalid_invoice_reports_field() {
    let app = setup();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/invoices",
            Some(json!({ "payee": "Gym", "amount": -10, "dueDate": "2024-03-10" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "amount");
    assert_eq!(body["message"], "Amount must be positive");
}

#[tokio::test]
async fn test_non_object_body_is_400_without_field() {
    let app = setup();
    let (status, body) = app
        .call(Method::POST, "/api/invoices", Some(json!(["payee", "amount"])))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("field").is_none());
}

#[tokio::test]
async fn test_invoices_listed_by_due_date() {
    let app = setup();
    for due in ["2024-05-01", "2024-03-01", "2024-04-01"] {
        app.create_invoice(json!({ "payee": "Phone", "amount": 30, "dueDate": due }))
            .await;
    }

    let (_, list) = app.call(Method::GET, "/api/invoices", None).await;
    let dues: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["dueDate"].as_str().unwrap())
        .collect();
    assert_eq!(
        dues,
        vec!["2024-03-01T00:00:00Z", "2024-04-01T00:00:00Z", "2024-05-01T00:00:00Z"]
    );
}

#[tokio::test]
async fn test_mark_paid_twice_debits_wallet_once() {
    let app = setup();
    let created = app.create_invoice(rent("none")).await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());

    for _ in 0..2 {
        let (status, updated) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "paid" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "paid");
    }

    assert_eq!(app.wallet_balance().await, "-1500");
}

#[tokio::test]
async fn test_monthly_invoice_paid_creates_successor() {
    let app = setup();
    let created = app.create_invoice(rent("monthly")).await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());

    app.call(Method::PUT, &uri, Some(json!({ "status": "paid" })))
        .await;

    let (_, list) = app.call(Method::GET, "/api/invoices", None).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    let successor = &list[1];
    assert_ne!(successor["id"], created["id"]);
    assert_eq!(successor["dueDate"], "2024-02-29T00:00:00Z");
    assert_eq!(successor["status"], "unpaid");
    assert_eq!(successor["paidAmount"], "0");

    let (_, notifications) = app.call(Method::GET, "/api/notifications", None).await;
    assert_eq!(notifications.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_last_installment_paid_creates_nothing() {
    let app = setup();
    let created = app
        .create_invoice(json!({
            "payee": "Furniture Store",
            "amount": 200,
            "dueDate": "2024-06-15",
            "recurrenceType": "installment",
            "currentInstallment": 3,
            "totalInstallments": 3,
        }))
        .await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());

    app.call(Method::PUT, &uri, Some(json!({ "status": "paid" })))
        .await;

    assert_eq!(app.store.invoice_count().await, 1);
}

#[tokio::test]
async fn test_lone_installment_counter_cannot_pass_stored_total() {
    let app = setup();
    let created = app
        .create_invoice(json!({
            "payee": "Furniture Store",
            "amount": 200,
            "dueDate": "2024-06-15",
            "recurrenceType": "installment",
            "currentInstallment": 1,
            "totalInstallments": 3,
        }))
        .await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());

    let (status, body) = app
        .call(Method::PUT, &uri, Some(json!({ "currentInstallment": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "currentInstallment");

    let (status, body) = app
        .call(Method::PUT, &uri, Some(json!({ "totalInstallments": 0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "totalInstallments");

    let (_, stored) = app.call(Method::GET, &uri, None).await;
    assert_eq!(stored["currentInstallment"], 1);
    assert_eq!(stored["totalInstallments"], 3);

    let (status, updated) = app
        .call(Method::PUT, &uri, Some(json!({ "currentInstallment": "3" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["currentInstallment"], 3);
}

#[tokio::test]
async fn test_create_with_index_past_total_is_400() {
    let app = setup();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/invoices",
            Some(json!({
                "payee": "Furniture Store",
                "amount": 200,
                "dueDate": "2024-06-15",
                "recurrenceType": "installment",
                "currentInstallment": 4,
                "totalInstallments": 3,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "currentInstallment");
    assert_eq!(app.store.invoice_count().await, 0);
}

#[tokio::test]
async fn test_null_description_clears_it() {
    let app = setup();
    let created = app.create_invoice(rent("none")).await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());

    let (status, updated) = app
        .call(Method::PUT, &uri, Some(json!({ "description": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["description"].is_null());
    assert_eq!(updated["payee"], "Landlord");
}

#[tokio::test]
async fn test_settlement_past_wallet_limit_is_400() {
    let app = setup();
    let (status, _) = app
        .call(
            Method::PATCH,
            "/api/user/settings",
            Some(json!({ "balance": "-999999999999.99" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let created = app.create_invoice(rent("monthly")).await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());

    let (status, body) = app
        .call(Method::PUT, &uri, Some(json!({ "status": "paid" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "amount");

    let (_, stored) = app.call(Method::GET, &uri, None).await;
    assert_eq!(stored["status"], "unpaid");
    assert_eq!(app.store.invoice_count().await, 1);
    assert_eq!(app.wallet_balance().await, "-999999999999.99");
}

#[tokio::test]
async fn test_foreign_invoice_is_404_and_untouched() {
    let app = setup();
    let created = app.create_invoice(rent("none")).await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());
    let intruder = app.other_token();

    let (status, _) = app.call_as(&intruder, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.call_as(&intruder, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call_as(&intruder, Method::PUT, &uri, Some(json!({ "status": "paid" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, still_there) = app.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(still_there["status"], "unpaid");
}

#[tokio::test]
async fn test_delete_invoice() {
    let app = setup();
    let created = app.create_invoice(rent("none")).await;
    let uri = format!("/api/invoices/{}", created["id"].as_str().unwrap());

    let (status, _) = app.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.call(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_id_is_404() {
    let app = setup();
    let (status, body) = app.call(Method::GET, "/api/invoices/42", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Invoice not found");
}

// ===== Credits & reports =====

#[tokio::test]
async fn test_credit_top_up() {
    let app = setup();

    let (_, balance) = app.call(Method::GET, "/api/credits", None).await;
    assert_eq!(balance, json!({ "balance": 0 }));

    let (_, balance) = app.call(Method::POST, "/api/credits/add", None).await;
    assert_eq!(balance, json!({ "balance": 1 }));

    let (_, balance) = app
        .call(Method::POST, "/api/credits/add", Some(json!({ "amount": 4 })))
        .await;
    assert_eq!(balance, json!({ "balance": 5 }));

    let (status, body) = app
        .call(Method::POST, "/api/credits/add", Some(json!({ "amount": 0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "amount");
}

#[tokio::test]
async fn test_report_without_credits_is_402() {
    let app = setup();
    let (status, body) = app.call(Method::POST, "/api/ai/report", None).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["message"].as_str().unwrap().contains("Insufficient credits"));
    assert_eq!(app.generator.calls.load(Ordering::SeqCst), 0);

    let (_, balance) = app.call(Method::GET, "/api/credits", None).await;
    assert_eq!(balance["balance"], 0);
}

#[tokio::test]
async fn test_report_generation_spends_one_credit() {
    let app = setup();
    app.call(Method::POST, "/api/credits/add", Some(json!({ "amount": 2 })))
        .await;
    app.create_invoice(rent("monthly")).await;

    let (status, report) = app.call(Method::POST, "/api/ai/report", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["reportType"], "monthly_summary");
    assert_eq!(report["content"]["summary"], "1 bills analysed");

    let (_, balance) = app.call(Method::GET, "/api/credits", None).await;
    assert_eq!(balance["balance"], 1);

    let (_, reports) = app.call(Method::GET, "/api/ai/reports", None).await;
    assert_eq!(reports.as_array().unwrap().len(), 1);

    let uri = format!("/api/ai/reports/{}", report["id"].as_str().unwrap());
    let (status, fetched) = app.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, report);
}

#[tokio::test]
async fn test_report_provider_failure_keeps_credit() {
    let app = setup_with(true);
    app.call(Method::POST, "/api/credits/add", None).await;

    let (status, body) = app.call(Method::POST, "/api/ai/report", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to generate report");

    let (_, balance) = app.call(Method::GET, "/api/credits", None).await;
    assert_eq!(balance["balance"], 1);
    let (_, reports) = app.call(Method::GET, "/api/ai/reports", None).await;
    assert!(reports.as_array().unwrap().is_empty());
}

// ===== Notifications & settings =====

#[tokio::test]
async fn test_mark_notification_read() {
    let app = setup();
    app.call(Method::GET, "/api/auth/user", None).await;
    let created = app
        .store
        .create_notification(
            UserId(app.user_id),
            billtrack_shared::NewNotification {
                title: "Welcome".to_string(),
                message: "Add your first bill".to_string(),
            },
        )
        .await
        .unwrap();
    let uri = format!("/api/notifications/{}/read", created.id);

    let (status, _) = app.call_as(&app.other_token(), Method::PATCH, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.call(Method::PATCH, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app.call(Method::GET, "/api/notifications", None).await;
    assert_eq!(list[0]["read"], true);
}

#[tokio::test]
async fn test_update_settings() {
    let app = setup();
    let (status, user) = app
        .call(
            Method::PATCH,
            "/api/user/settings",
            Some(json!({
                "language": "pt-BR",
                "currency": "BRL",
                "notificationsEnabled": false,
                "balance": "2500.00",
                "nickname": "Ana",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["language"], "pt-BR");
    assert_eq!(user["currency"], "BRL");
    assert_eq!(user["notificationsEnabled"], false);
    assert_eq!(user["balance"], "2500.00");
    assert_eq!(user["nickname"], "Ana");

    let (status, body) = app
        .call(Method::PATCH, "/api/user/settings", Some(json!({ "currency": "EUR" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "currency");
}
