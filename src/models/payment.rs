use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::common::flexible_date;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Received,
    Pending,
    Overdue,
    Refused,
    Confirmed,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Received | PaymentStatus::Confirmed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Received | PaymentStatus::Confirmed => "Pago",
            PaymentStatus::Pending => "Pendente",
            PaymentStatus::Overdue => "Vencido",
            PaymentStatus::Refused => "Recusado",
        }
    }
}

/// One invoice of a subscription, as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub status: PaymentStatus,
    pub billing_type: String,
    pub value: Decimal,
    #[serde(deserialize_with = "flexible_date::date")]
    pub due_date: NaiveDate,
    #[serde(default, deserialize_with = "flexible_date::option_date")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    #[serde(default)]
    pub bank_slip_url: Option<String>,
    #[serde(default)]
    pub transaction_receipt_url: Option<String>,
}

impl Payment {
    /// Best link to show next to the invoice: the receipt once paid,
    /// otherwise the invoice page or the bank slip.
    pub fn document_url(&self) -> Option<&str> {
        if self.status.is_paid() {
            if let Some(url) = self.transaction_receipt_url.as_deref() {
                return Some(url);
            }
        }
        self.invoice_url
            .as_deref()
            .or(self.bank_slip_url.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPage {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub data: Vec<Payment>,
}

impl PaymentPage {
    pub fn outstanding(&self) -> impl Iterator<Item = &Payment> {
        self.data.iter().filter(|payment| !payment.status.is_paid())
    }
}
