//! Card data for a single checkout submission.
//!
//! These types are `Serialize` only: they go out in the request body and are
//! never read back, cached or logged. `Debug` masks the sensitive fields.

use serde::Serialize;
use std::fmt;

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardData {
    pub holder_name: String,
    pub number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub ccv: String,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardHolderInfo {
    pub name: String,
    pub email: String,
    pub cpf_cnpj: String,
    pub postal_code: String,
    pub address_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_complement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
}

/// Card plus billing holder, required iff the billing type is CREDIT_CARD.
#[derive(Clone, Debug)]
pub struct CardPayload {
    pub card: CreditCardData,
    pub holder: CreditCardHolderInfo,
}

pub(crate) fn mask_tail(value: &str, visible: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= visible {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - visible;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{}", "*".repeat(hidden), tail)
}

impl fmt::Debug for CreditCardData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditCardData")
            .field("holder_name", &self.holder_name)
            .field("number", &mask_tail(&self.number, 4))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("ccv", &"***")
            .finish()
    }
}

impl fmt::Debug for CreditCardHolderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreditCardHolderInfo")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("cpf_cnpj", &mask_tail(&self.cpf_cnpj, 2))
            .field("postal_code", &self.postal_code)
            .field("address_number", &self.address_number)
            .finish_non_exhaustive()
    }
}
