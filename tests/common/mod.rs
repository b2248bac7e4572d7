//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chama365_portal::config::ApiConfig;
use chama365_portal::services::session::{
    ACCESS_TOKEN_KEY, DRIVER_DATA_KEY, LEGACY_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY,
    USER_ROLE_KEY,
};
use chama365_portal::services::{ApiClient, MemorySessionStore, SessionStore};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const ACCESS_TOKEN: &str = "test-access-token";

pub struct TestApi {
    pub server: MockServer,
    pub store: Arc<MemorySessionStore>,
    pub api: ApiClient,
}

/// Mock API with a signed-in user session.
pub async fn signed_in() -> TestApi {
    let test = anonymous().await;
    let store = &test.store;
    store.set(ACCESS_TOKEN_KEY, ACCESS_TOKEN).unwrap();
    store.set(REFRESH_TOKEN_KEY, "test-refresh-token").unwrap();
    store.set(LEGACY_TOKEN_KEY, "test-legacy-token").unwrap();
    store.set(USER_DATA_KEY, &user_json().to_string()).unwrap();
    store.set(DRIVER_DATA_KEY, &driver_json().to_string()).unwrap();
    store.set(USER_ROLE_KEY, "user").unwrap();
    test
}

pub async fn anonymous() -> TestApi {
    let server = MockServer::start().await;
    let store = Arc::new(MemorySessionStore::new());
    let config = ApiConfig::new(&server.uri(), 5).unwrap();
    let api = ApiClient::new(&config, store.clone()).unwrap();
    TestApi { server, store, api }
}

pub fn session_is_empty(store: &MemorySessionStore) -> bool {
    [
        ACCESS_TOKEN_KEY,
        REFRESH_TOKEN_KEY,
        LEGACY_TOKEN_KEY,
        USER_DATA_KEY,
        DRIVER_DATA_KEY,
        USER_ROLE_KEY,
    ]
    .iter()
    .all(|key| store.get(key).unwrap().is_none())
}

pub fn user_json() -> Value {
    json!({
        "id": 42,
        "email": "maria@example.com",
        "email_verified": true,
        "display_name": "Maria Silva",
        "cpf_cnpj": "11144477735",
        "plan_status": "PENDING"
    })
}

pub fn driver_json() -> Value {
    json!({
        "id": 7,
        "name": "João Guincheiro",
        "email": "joao@example.com",
        "vehicle_plate": "ABC1D23",
        "vehicle_year": 2018
    })
}

pub fn gateway_subscription(status: &str, invoice_url: Option<&str>) -> Value {
    json!({
        "success": true,
        "subscription": {
            "id": "sub_abc123",
            "status": status,
            "billingType": "PIX",
            "value": 49.99,
            "nextDueDate": "2025-02-10",
            "invoiceUrl": invoice_url
        }
    })
}

pub fn local_subscription(status: &str) -> Value {
    json!({
        "local": {
            "id": 1,
            "user_id": 42,
            "plan_code": "BASICO",
            "asaas_subscription_id": "sub_abc123",
            "billing_type": "PIX",
            "value": "49.99",
            "cycle": "MONTHLY",
            "status": status,
            "next_due_date": "2025-02-10",
            "started_at": "2025-01-10T12:00:00.000Z",
            "cancelled_at": null,
            "created_at": "2025-01-10T12:00:00.000Z",
            "updated_at": "2025-01-10T12:00:00.000Z"
        },
        "remote": null
    })
}
