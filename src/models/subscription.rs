use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::card::{CreditCardData, CreditCardHolderInfo};
use crate::models::common::{flexible_date, BillingType, PlanCode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Overdue,
    Cancelled,
    Expired,
    Inactive,
    Cooldown,
}

impl SubscriptionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "Ativo",
            SubscriptionStatus::Pending => "Pendente",
            SubscriptionStatus::Overdue => "Vencido",
            SubscriptionStatus::Cancelled => "Cancelado",
            SubscriptionStatus::Expired => "Expirado",
            SubscriptionStatus::Inactive => "Inativo",
            SubscriptionStatus::Cooldown => "Em carência",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let raw = match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Pending => "PENDING",
            SubscriptionStatus::Overdue => "OVERDUE",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
            SubscriptionStatus::Inactive => "INACTIVE",
            SubscriptionStatus::Cooldown => "COOLDOWN",
        };
        f.write_str(raw)
    }
}

/// The API's local mirror of the user's gateway subscription. Status
/// transitions are made by the API only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalSubscription {
    pub id: i64,
    pub user_id: i64,
    pub plan_code: PlanCode,
    pub asaas_subscription_id: String,
    pub billing_type: BillingType,
    pub value: Decimal,
    #[serde(default)]
    pub cycle: Option<String>,
    pub status: SubscriptionStatus,
    #[serde(default, deserialize_with = "flexible_date::option_date")]
    pub next_due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "flexible_date::option_datetime")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option_datetime")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date::option_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LocalSubscription {
    /// Cancelled subscriptions keep access until the already-paid period ends.
    pub fn has_access(&self, today: NaiveDate) -> bool {
        match self.status {
            SubscriptionStatus::Active => true,
            SubscriptionStatus::Cancelled => self.next_due_date.map_or(false, |due| due >= today),
            _ => false,
        }
    }

    pub fn is_awaiting_payment(&self) -> bool {
        self.status == SubscriptionStatus::Pending
    }
}

/// Response of `GET /api/asaas/subscriptions/me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MySubscription {
    #[serde(default)]
    pub local: Option<LocalSubscription>,
    #[serde(default)]
    pub remote: Option<serde_json::Value>,
}

impl MySubscription {
    pub fn status(&self) -> Option<SubscriptionStatus> {
        self.local.as_ref().map(|local| local.status)
    }
}

/// Gateway-side snapshot returned on create/get/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySubscription {
    pub id: String,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default, deserialize_with = "flexible_date::option_date")]
    pub next_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(default)]
    pub success: bool,
    pub subscription: GatewaySubscription,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub plan_code: PlanCode,
    pub billing_type: BillingType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<CreditCardData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card_holder_info: Option<CreditCardHolderInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
}

/// Partial update sent with `PUT /api/asaas/subscriptions/{id}`. Only PIX and
/// CREDIT_CARD are accepted as a new billing type.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_type: Option<BillingType>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_pending_payments: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<CreditCardData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card_holder_info: Option<CreditCardHolderInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub success: bool,
}

/// Normalized result of a checkout submission.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Card payments settle synchronously.
    Activated { subscription: GatewaySubscription },
    /// PIX/BOLETO: the user pays on the invoice page and the client polls.
    AwaitingPayment {
        subscription: GatewaySubscription,
        invoice_url: String,
    },
}

impl CheckoutOutcome {
    pub fn subscription(&self) -> &GatewaySubscription {
        match self {
            CheckoutOutcome::Activated { subscription }
            | CheckoutOutcome::AwaitingPayment { subscription, .. } => subscription,
        }
    }

    pub fn invoice_url(&self) -> Option<&str> {
        match self {
            CheckoutOutcome::Activated { .. } => None,
            CheckoutOutcome::AwaitingPayment { invoice_url, .. } => Some(invoice_url),
        }
    }
}
