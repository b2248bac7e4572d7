//! Local checks run before a credit-card checkout is submitted.
//!
//! Rules are evaluated in a fixed order and the first failure wins, so the
//! user always sees one message at a time.

use std::fmt;

use crate::error::{PortalError, Result};
use crate::models::card::{mask_tail, CardPayload, CreditCardData, CreditCardHolderInfo};
use crate::models::common::BillingType;

pub const CARD_NUMBER_INVALID: &str = "Número do cartão inválido.";
pub const HOLDER_NAME_INVALID: &str = "Nome do titular deve ter pelo menos 3 caracteres.";
pub const EXPIRY_MONTH_INVALID: &str = "Mês de validade inválido.";
pub const EXPIRY_YEAR_INVALID: &str = "Ano de validade inválido.";
pub const CVV_INVALID: &str = "CVV inválido.";
pub const CPF_CNPJ_INVALID: &str = "CPF/CNPJ inválido.";
pub const POSTAL_CODE_INVALID: &str = "CEP inválido.";
pub const ADDRESS_NUMBER_REQUIRED: &str = "Número do endereço é obrigatório.";
pub const FULL_NAME_REQUIRED: &str = "Nome completo é obrigatório.";
pub const EMAIL_REQUIRED: &str = "E-mail é obrigatório.";
pub const CARD_DATA_REQUIRED: &str = "Dados do cartão são obrigatórios.";

pub fn only_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Luhn checksum over the digits of `number`, 13 to 19 digits long.
pub fn is_valid_card_number(number: &str) -> bool {
    let digits = only_digits(number);
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(index, byte)| {
            let digit = u32::from(byte - b'0');
            if index % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    sum % 10 == 0
}

pub fn is_valid_cpf(value: &str) -> bool {
    let digits: Vec<u32> = only_digits(value)
        .bytes()
        .map(|byte| u32::from(byte - b'0'))
        .collect();
    if digits.len() != 11 {
        return false;
    }
    if digits.iter().all(|digit| *digit == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| {
        let weight_start = len as u32 + 1;
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(index, digit)| digit * (weight_start - index as u32))
            .sum();
        let remainder = (sum * 10) % 11;
        if remainder == 10 {
            0
        } else {
            remainder
        }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}

/// CPF (11 digits, checksummed) or CNPJ (14 digits). CNPJ check digits are
/// not verified.
pub fn is_valid_cpf_cnpj(value: &str) -> bool {
    match only_digits(value).len() {
        11 => is_valid_cpf(value),
        14 => true,
        _ => false,
    }
}

pub fn is_valid_expiry_month(month: &str) -> bool {
    month
        .trim()
        .parse::<u32>()
        .map_or(false, |month| (1..=12).contains(&month))
}

/// Only the year is compared, so a card that expired earlier this year
/// still passes.
pub fn is_valid_expiry_year(year: &str, current_year: i32) -> bool {
    year.trim()
        .parse::<i32>()
        .map_or(false, |year| year >= current_year)
}

pub fn is_valid_cvv(cvv: &str) -> bool {
    (3..=4).contains(&only_digits(cvv).len())
}

pub fn is_valid_postal_code(postal_code: &str) -> bool {
    only_digits(postal_code).len() == 8
}

/// Raw checkout form fields, as typed by the user.
#[derive(Clone, Default)]
pub struct CheckoutForm {
    pub card_number: String,
    pub holder_name: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvv: String,
    pub full_name: String,
    pub email: String,
    pub cpf_cnpj: String,
    pub postal_code: String,
    pub address_number: String,
    pub address_complement: Option<String>,
    pub phone: Option<String>,
}

impl CheckoutForm {
    /// Normalizes the form into the request payload: digits only for
    /// number, CVV, CPF/CNPJ, CEP and phone, zero-padded month.
    pub fn into_payload(self) -> CardPayload {
        let month = self.expiry_month.trim();
        let expiry_month = if month.len() == 1 {
            format!("0{}", month)
        } else {
            month.to_string()
        };

        let phone = self
            .phone
            .as_deref()
            .map(only_digits)
            .filter(|digits| !digits.is_empty());
        let address_complement = self
            .address_complement
            .map(|complement| complement.trim().to_string())
            .filter(|complement| !complement.is_empty());

        CardPayload {
            card: CreditCardData {
                holder_name: self.holder_name.trim().to_string(),
                number: only_digits(&self.card_number),
                expiry_month,
                expiry_year: self.expiry_year.trim().to_string(),
                ccv: only_digits(&self.cvv),
            },
            holder: CreditCardHolderInfo {
                name: self.full_name.trim().to_string(),
                email: self.email.trim().to_string(),
                cpf_cnpj: only_digits(&self.cpf_cnpj),
                postal_code: only_digits(&self.postal_code),
                address_number: self.address_number.trim().to_string(),
                address_complement,
                phone: phone.clone(),
                mobile_phone: phone,
            },
        }
    }
}

impl fmt::Debug for CheckoutForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutForm")
            .field("card_number", &mask_tail(&only_digits(&self.card_number), 4))
            .field("holder_name", &self.holder_name)
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("cpf_cnpj", &mask_tail(&only_digits(&self.cpf_cnpj), 2))
            .finish_non_exhaustive()
    }
}

fn check(ok: bool, message: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(PortalError::Validation(message.to_string()))
    }
}

/// Runs the checkout rules for `billing_type`. PIX and BOLETO need no card
/// data and always pass.
pub fn validate_checkout(
    billing_type: BillingType,
    form: Option<&CheckoutForm>,
    current_year: i32,
) -> Result<()> {
    if billing_type != BillingType::CreditCard {
        return Ok(());
    }
    let form = form.ok_or_else(|| PortalError::Validation(CARD_DATA_REQUIRED.to_string()))?;

    check(is_valid_card_number(&form.card_number), CARD_NUMBER_INVALID)?;
    check(form.holder_name.trim().chars().count() >= 3, HOLDER_NAME_INVALID)?;
    check(is_valid_expiry_month(&form.expiry_month), EXPIRY_MONTH_INVALID)?;
    check(is_valid_expiry_year(&form.expiry_year, current_year), EXPIRY_YEAR_INVALID)?;
    check(is_valid_cvv(&form.cvv), CVV_INVALID)?;
    check(is_valid_cpf_cnpj(&form.cpf_cnpj), CPF_CNPJ_INVALID)?;
    check(is_valid_postal_code(&form.postal_code), POSTAL_CODE_INVALID)?;
    check(!form.address_number.trim().is_empty(), ADDRESS_NUMBER_REQUIRED)?;
    check(!form.full_name.trim().is_empty(), FULL_NAME_REQUIRED)?;
    check(!form.email.trim().is_empty(), EMAIL_REQUIRED)?;

    Ok(())
}
