//! HTTP-level tests against a mock Chama 365 API.

mod common;

use chama365_portal::error::{ErrorCode, PortalError};
use chama365_portal::models::card::{CardPayload, CreditCardData, CreditCardHolderInfo};
use chama365_portal::models::common::{BillingType, PlanCode};
use chama365_portal::models::subscription::{CheckoutOutcome, SubscriptionStatus, UpdateSubscriptionRequest};
use chama365_portal::models::user::{
    DocumentKind, RegisterDriverRequest, ReviewStatus, Role, UpdateUserRequest,
};
use chama365_portal::services::{AuthService, FileUpload, SubscriptionService, SubscriptionSource};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{
    anonymous, driver_json, gateway_subscription, local_subscription, session_is_empty, signed_in,
    user_json, ACCESS_TOKEN,
};

const INVOICE_URL: &str = "https://www.asaas.com/i/abc123";

fn card() -> CardPayload {
    CardPayload {
        card: CreditCardData {
            holder_name: "MARIA SILVA".to_string(),
            number: "4111111111111111".to_string(),
            expiry_month: "05".to_string(),
            expiry_year: "2030".to_string(),
            ccv: "123".to_string(),
        },
        holder: CreditCardHolderInfo {
            name: "Maria Silva".to_string(),
            email: "maria@example.com".to_string(),
            cpf_cnpj: "11144477735".to_string(),
            postal_code: "01310100".to_string(),
            address_number: "1000".to_string(),
            address_complement: None,
            phone: None,
            mobile_phone: Some("11999998888".to_string()),
        },
    }
}

fn selfie() -> FileUpload {
    FileUpload::new("selfie.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
}

async fn last_body(server: &wiremock::MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    serde_json::from_slice(&requests.last().unwrap().body).unwrap()
}

// =============================================================================
// Session expiry
// =============================================================================

#[tokio::test]
async fn test_unauthorized_clears_session_on_every_helper() {
    for (http_method, route) in [
        ("GET", "/api/asaas/subscriptions/me"),
        ("POST", "/api/asaas/subscriptions"),
        ("PUT", "/api/asaas/subscriptions/sub_abc123"),
        ("PATCH", "/api/users/me"),
        ("DELETE", "/api/asaas/subscriptions/sub_abc123"),
        ("POST", "/api/drivers/me/documents/selfie"),
    ] {
        let test = signed_in().await;
        Mock::given(method(http_method))
            .and(path(route))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&test.server)
            .await;

        let subscriptions = SubscriptionService::new(test.api.clone());
        let auth = AuthService::new(test.api.clone());
        let err = match (http_method, route) {
            ("GET", _) => subscriptions.my_subscription().await.unwrap_err(),
            ("POST", "/api/asaas/subscriptions") => subscriptions
                .create(PlanCode::Basico, BillingType::Pix, None)
                .await
                .unwrap_err(),
            ("PUT", _) => subscriptions
                .update("sub_abc123", &UpdateSubscriptionRequest::default())
                .await
                .unwrap_err(),
            ("PATCH", _) => auth
                .update_user_profile(&UpdateUserRequest::default())
                .await
                .unwrap_err(),
            ("DELETE", _) => subscriptions.cancel("sub_abc123").await.unwrap_err(),
            _ => auth
                .upload_driver_document(DocumentKind::Selfie, selfie())
                .await
                .unwrap_err(),
        };

        assert!(err.is_auth_error(), "{} {} -> {:?}", http_method, route, err);
        assert!(session_is_empty(&test.store), "{} {} kept the session", http_method, route);
        assert!(!test.api.tokens().is_authenticated());
    }
}

#[tokio::test]
async fn test_auth_error_code_also_ends_session() {
    let test = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/asaas/subscriptions/me"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": "AUTH_TOKEN_EXPIRED", "message": "Token expirado" }
        })))
        .mount(&test.server)
        .await;

    let err = SubscriptionService::new(test.api.clone())
        .current_status()
        .await
        .unwrap_err();
    assert!(err.is_auth_error());
    assert_eq!(err.user_message(), "Token expirado");
    assert!(session_is_empty(&test.store));
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_pix_checkout_returns_invoice_url() {
    let test = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/asaas/subscriptions"))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .and(body_partial_json(json!({ "planCode": "BASICO", "billingType": "PIX" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(gateway_subscription("PENDING", Some(INVOICE_URL))),
        )
        .expect(1)
        .mount(&test.server)
        .await;

    let outcome = SubscriptionService::new(test.api.clone())
        .create(PlanCode::Basico, BillingType::Pix, Some(card()))
        .await
        .unwrap();

    match outcome {
        CheckoutOutcome::AwaitingPayment { subscription, invoice_url } => {
            assert_eq!(invoice_url, INVOICE_URL);
            assert_eq!(subscription.status, SubscriptionStatus::Pending);
        }
        other => panic!("expected AwaitingPayment, got {:?}", other),
    }

    let body = last_body(&test.server).await;
    assert!(body.get("creditCard").is_none());
    assert!(body.get("creditCardHolderInfo").is_none());
}

#[tokio::test]
async fn test_boleto_without_invoice_url_fails() {
    let test = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/asaas/subscriptions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(gateway_subscription("PENDING", None)))
        .mount(&test.server)
        .await;

    let err = SubscriptionService::new(test.api.clone())
        .create(PlanCode::Pro, BillingType::Boleto, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::SubscriptionCreateFailed);
    assert_eq!(err.user_message(), "Erro ao criar assinatura.");
}

#[tokio::test]
async fn test_card_checkout_sends_card_and_activates() {
    let test = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/asaas/subscriptions"))
        .and(body_partial_json(json!({
            "planCode": "PRO",
            "billingType": "CREDIT_CARD",
            "creditCard": { "number": "4111111111111111", "ccv": "123" },
            "creditCardHolderInfo": { "cpfCnpj": "11144477735", "postalCode": "01310100" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(gateway_subscription("ACTIVE", None)))
        .expect(1)
        .mount(&test.server)
        .await;

    let outcome = SubscriptionService::new(test.api.clone())
        .create(PlanCode::Pro, BillingType::CreditCard, Some(card()))
        .await
        .unwrap();
    assert!(matches!(outcome, CheckoutOutcome::Activated { .. }));
    assert!(outcome.invoice_url().is_none());
}

#[tokio::test]
async fn test_card_checkout_without_card_is_rejected_locally() {
    let test = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/asaas/subscriptions"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&test.server)
        .await;

    let err = SubscriptionService::new(test.api.clone())
        .create(PlanCode::Basico, BillingType::CreditCard, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CreditCardDataRequired);
    assert_eq!(err.user_message(), "Dados do cartão são obrigatórios.");
}

// =============================================================================
// Error mapping
// =============================================================================

#[tokio::test]
async fn test_error_bodies_are_typed() {
    let test = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/asaas/subscriptions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "SUBSCRIPTION_CREATE_FAILED",
                "message": "Falha",
                "details": "CPF do cliente inválido",
                "requestId": "req-42"
            }
        })))
        .mount(&test.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/asaas/subscriptions/sub_gw"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&test.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/asaas/subscriptions/sub_boom"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test.server)
        .await;

    let subscriptions = SubscriptionService::new(test.api.clone());

    match subscriptions.create(PlanCode::Basico, BillingType::Pix, None).await {
        Err(PortalError::Api { code, message, request_id, status, .. }) => {
            assert_eq!(code, ErrorCode::SubscriptionCreateFailed);
            assert_eq!(message, "CPF do cliente inválido");
            assert_eq!(request_id.as_deref(), Some("req-42"));
            assert_eq!(status, 400);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let gateway = subscriptions.subscription("sub_gw").await.unwrap_err();
    assert!(matches!(gateway, PortalError::Gateway(_)));
    assert!(gateway.is_retryable());

    let unknown = subscriptions.subscription("sub_boom").await.unwrap_err();
    assert_eq!(unknown.code(), ErrorCode::Unknown);
    assert_eq!(unknown.user_message(), "Erro no servidor (500). Tente novamente.");

    // None of these are session errors.
    assert!(test.api.tokens().is_authenticated());
}

// =============================================================================
// Subscription management
// =============================================================================

#[tokio::test]
async fn test_my_subscription_status() {
    let test = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/asaas/subscriptions/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(local_subscription("PENDING")))
        .mount(&test.server)
        .await;

    let subscriptions = SubscriptionService::new(test.api.clone());
    let mine = subscriptions.my_subscription().await.unwrap();
    let local = mine.local.unwrap();
    assert_eq!(local.plan_code, PlanCode::Basico);
    assert!(local.is_awaiting_payment());
    assert_eq!(
        subscriptions.current_status().await.unwrap(),
        Some(SubscriptionStatus::Pending)
    );
}

#[tokio::test]
async fn test_no_subscription_yet() {
    let test = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/asaas/subscriptions/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "local": null, "remote": null })))
        .mount(&test.server)
        .await;

    let status = SubscriptionService::new(test.api.clone())
        .current_status()
        .await
        .unwrap();
    assert_eq!(status, None);
}

#[tokio::test]
async fn test_payments_update_and_cancel() {
    let test = signed_in().await;
    Mock::given(method("GET"))
        .and(path("/api/asaas/subscriptions/sub_abc123/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "object": "list",
            "hasMore": false,
            "totalCount": 1,
            "data": [{
                "id": "pay_1",
                "status": "OVERDUE",
                "billingType": "BOLETO",
                "value": 49.99,
                "dueDate": "2025-01-10",
                "bankSlipUrl": "https://www.asaas.com/b/pdf/1"
            }]
        })))
        .mount(&test.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/asaas/subscriptions/sub_abc123"))
        .and(body_partial_json(json!({ "billingType": "PIX" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gateway_subscription("ACTIVE", None)))
        .expect(1)
        .mount(&test.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/asaas/subscriptions/sub_abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&test.server)
        .await;

    let subscriptions = SubscriptionService::new(test.api.clone());

    let page = subscriptions.payments("sub_abc123").await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.outstanding().count(), 1);
    assert_eq!(page.data[0].document_url(), Some("https://www.asaas.com/b/pdf/1"));

    let update = UpdateSubscriptionRequest {
        billing_type: Some(BillingType::Pix),
        ..Default::default()
    };
    let updated = subscriptions.update("sub_abc123", &update).await.unwrap();
    assert_eq!(updated.status, SubscriptionStatus::Active);

    let boleto = UpdateSubscriptionRequest {
        billing_type: Some(BillingType::Boleto),
        ..Default::default()
    };
    let err = subscriptions.update("sub_abc123", &boleto).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BillingTypeInvalid);

    assert!(subscriptions.cancel("sub_abc123").await.unwrap());
}

// =============================================================================
// Auth and profile
// =============================================================================

#[tokio::test]
async fn test_login_stores_tokens_and_profile() {
    let test = anonymous().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .and(body_partial_json(json!({ "email": "maria@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json(),
            "accessToken": "fresh-access",
            "refreshToken": "fresh-refresh"
        })))
        .mount(&test.server)
        .await;

    let user = AuthService::new(test.api.clone())
        .login_user(" maria@example.com ", "segredo123")
        .await
        .unwrap();
    assert_eq!(user.id, 42);

    let tokens = test.api.tokens();
    assert_eq!(tokens.access_token().unwrap().as_deref(), Some("fresh-access"));
    assert_eq!(tokens.refresh_token().unwrap().as_deref(), Some("fresh-refresh"));
    assert_eq!(tokens.role().unwrap(), Some(Role::User));
    assert_eq!(tokens.cached_user().unwrap().unwrap().email, "maria@example.com");
}

#[tokio::test]
async fn test_driver_login_with_legacy_token() {
    let test = anonymous().await;
    Mock::given(method("POST"))
        .and(path("/api/drivers/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "driver": driver_json(),
            "token": "legacy-only"
        })))
        .mount(&test.server)
        .await;

    let driver = AuthService::new(test.api.clone())
        .login_driver("joao@example.com", "segredo123")
        .await
        .unwrap();
    assert_eq!(driver.vehicle_year, Some(2018));
    assert_eq!(test.api.tokens().access_token().unwrap().as_deref(), Some("legacy-only"));
    assert_eq!(test.api.tokens().role().unwrap(), Some(Role::Driver));
}

#[tokio::test]
async fn test_login_reads_data_envelope() {
    let test = anonymous().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "user": user_json(),
                "accessToken": "acc"
            }
        })))
        .mount(&test.server)
        .await;

    let user = AuthService::new(test.api.clone())
        .login_user("maria@example.com", "segredo123")
        .await
        .unwrap();
    assert_eq!(user.id, 42);
    assert_eq!(test.api.tokens().access_token().unwrap().as_deref(), Some("acc"));
    assert_eq!(test.api.tokens().role().unwrap(), Some(Role::User));
}

fn driver_registration() -> RegisterDriverRequest {
    RegisterDriverRequest {
        name: "João Guincheiro".to_string(),
        email: "joao@example.com".to_string(),
        password: "segredo123".to_string(),
        phone: "11987654321".to_string(),
        cpf: "11144477735".to_string(),
        cnh_number: "12345678900".to_string(),
        vehicle_plate: "ABC1D23".to_string(),
        vehicle_model: "Ford Cargo".to_string(),
        vehicle_year: 2018,
        vehicle_type: "plataforma".to_string(),
        vehicle_color: "branco".to_string(),
    }
}

#[tokio::test]
async fn test_driver_registration_under_review_has_no_profile() {
    let test = anonymous().await;
    Mock::given(method("POST"))
        .and(path("/api/drivers/register"))
        .and(body_partial_json(json!({ "email": "joao@example.com" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "message": "Cadastro em análise"
        })))
        .expect(1)
        .mount(&test.server)
        .await;

    let driver = AuthService::new(test.api.clone())
        .register_driver(&driver_registration())
        .await
        .unwrap();
    assert!(driver.is_none());
    assert!(session_is_empty(&test.store));
}

#[tokio::test]
async fn test_driver_registration_with_enveloped_profile() {
    let test = anonymous().await;
    Mock::given(method("POST"))
        .and(path("/api/drivers/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": { "driver": driver_json(), "accessToken": "drv-acc" }
        })))
        .mount(&test.server)
        .await;

    let driver = AuthService::new(test.api.clone())
        .register_driver(&driver_registration())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(driver.id, 7);
    assert_eq!(test.api.tokens().access_token().unwrap().as_deref(), Some("drv-acc"));
    assert_eq!(test.api.tokens().role().unwrap(), Some(Role::Driver));
}

#[tokio::test]
async fn test_bad_credentials_are_not_session_expiry() {
    let test = anonymous().await;
    Mock::given(method("POST"))
        .and(path("/api/users/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Credenciais inválidas" })))
        .mount(&test.server)
        .await;

    let err = AuthService::new(test.api.clone())
        .login_user("maria@example.com", "errada")
        .await
        .unwrap_err();
    assert!(!err.is_auth_error());
    assert_eq!(err.user_message(), "Credenciais inválidas");
}

#[tokio::test]
async fn test_profile_update_caches_user() {
    let test = signed_in().await;
    let mut updated = user_json();
    updated["display_name"] = json!("Maria S. Souza");
    Mock::given(method("PATCH"))
        .and(path("/api/users/me"))
        .and(body_partial_json(json!({ "display_name": "Maria S. Souza" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": updated })))
        .mount(&test.server)
        .await;

    let update = UpdateUserRequest {
        display_name: Some("Maria S. Souza".to_string()),
        ..Default::default()
    };
    let user = AuthService::new(test.api.clone())
        .update_user_profile(&update)
        .await
        .unwrap();
    assert_eq!(user.display_name.as_deref(), Some("Maria S. Souza"));
    assert_eq!(
        test.api.tokens().cached_user().unwrap().unwrap().display_name.as_deref(),
        Some("Maria S. Souza")
    );

    let body = last_body(&test.server).await;
    assert!(body.get("phone_number").is_none());
}

#[tokio::test]
async fn test_invalid_profile_update_is_not_sent() {
    let test = signed_in().await;
    Mock::given(method("PATCH"))
        .and(path("/api/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test.server)
        .await;

    let update = UpdateUserRequest {
        cpf_cnpj: Some("111.111.111-11".to_string()),
        ..Default::default()
    };
    let err = AuthService::new(test.api.clone())
        .update_user_profile(&update)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Validation(_)));
}

#[tokio::test]
async fn test_driver_document_upload() {
    let test = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/drivers/me/documents/cnh"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "document": {
                "document_url": "https://cdn.chama365.com.br/docs/cnh-7.jpg",
                "status": "PENDING"
            }
        })))
        .expect(1)
        .mount(&test.server)
        .await;

    let document = AuthService::new(test.api.clone())
        .upload_driver_document(
            DocumentKind::Cnh,
            FileUpload::new("cnh.jpg", vec![0xFF, 0xD8], "image/jpeg"),
        )
        .await
        .unwrap();
    assert_eq!(document.status, ReviewStatus::Pending);
    assert_eq!(document.url, "https://cdn.chama365.com.br/docs/cnh-7.jpg");

    let requests = test.server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"cnh_photo\""));
    assert!(body.contains("filename=\"cnh.jpg\""));
}

#[tokio::test]
async fn test_profile_photo_upload() {
    let test = signed_in().await;
    Mock::given(method("POST"))
        .and(path("/api/users/me/photo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "photo_url": "https://cdn.chama365.com.br/photos/42.jpg"
        })))
        .mount(&test.server)
        .await;

    let url = AuthService::new(test.api.clone())
        .upload_user_photo(selfie())
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.chama365.com.br/photos/42.jpg");
}
