use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PortalError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanCode {
    Basico,
    Pro,
}

/// Static catalog entry for a monthly plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub code: PlanCode,
    pub name: &'static str,
    pub monthly_price: Decimal,
    pub features: &'static [&'static str],
}

const BASICO_FEATURES: &[&str] = &[
    "1 resgate grátis por mês",
    "Até 40 km de cobertura",
    "Veículo cadastrado",
    "Km excedente: R$ 4,00/km",
];

const PRO_FEATURES: &[&str] = &[
    "2 resgates grátis por mês",
    "Até 40 km cada resgate",
    "Veículo próprio ou de familiar",
    "Km excedente: R$ 4,00/km",
];

impl PlanCode {
    pub const ALL: [PlanCode; 2] = [PlanCode::Basico, PlanCode::Pro];

    pub fn price(&self) -> Decimal {
        match self {
            PlanCode::Basico => Decimal::new(49_99, 2), // R$ 49,99
            PlanCode::Pro => Decimal::new(79_99, 2),    // R$ 79,99
        }
    }

    pub fn plan(&self) -> Plan {
        match self {
            PlanCode::Basico => Plan {
                code: *self,
                name: "Plano Básico",
                monthly_price: self.price(),
                features: BASICO_FEATURES,
            },
            PlanCode::Pro => Plan {
                code: *self,
                name: "Plano Intermediário",
                monthly_price: self.price(),
                features: PRO_FEATURES,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanCode::Basico => "BASICO",
            PlanCode::Pro => "PRO",
        }
    }
}

impl Plan {
    pub fn catalog() -> Vec<Plan> {
        PlanCode::ALL.iter().map(PlanCode::plan).collect()
    }
}

impl std::fmt::Display for PlanCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanCode {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BASICO" => Ok(PlanCode::Basico),
            "PRO" => Ok(PlanCode::Pro),
            _ => Err(PortalError::Validation("Plano inválido.".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Pix,
    Boleto,
    CreditCard,
}

impl BillingType {
    /// PIX and BOLETO are settled out-of-band, so the client has to poll
    /// until the gateway reports the payment.
    pub fn requires_polling(&self) -> bool {
        matches!(self, BillingType::Pix | BillingType::Boleto)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillingType::Pix => "PIX",
            BillingType::Boleto => "BOLETO",
            BillingType::CreditCard => "CREDIT_CARD",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BillingType::Pix => "PIX",
            BillingType::Boleto => "Boleto Bancário",
            BillingType::CreditCard => "Cartão de Crédito",
        }
    }
}

impl std::fmt::Display for BillingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingType {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PIX" => Ok(BillingType::Pix),
            "BOLETO" => Ok(BillingType::Boleto),
            "CREDIT_CARD" => Ok(BillingType::CreditCard),
            _ => Err(PortalError::Validation(
                "Método de pagamento inválido.".to_string(),
            )),
        }
    }
}

/// Lenient date decoding: the API sends both `2025-02-10` and full RFC 3339
/// timestamps for the same fields depending on the endpoint.
pub(crate) mod flexible_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }

    pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
    }

    pub fn option_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_date(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw))),
        }
    }

    pub fn option_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_datetime(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw))),
        }
    }
}
