pub mod format;
pub mod validation;

pub use format::{format_card_number, format_cnpj, format_cpf, format_cpf_cnpj, format_phone, format_postal_code};
pub use validation::{validate_checkout, CheckoutForm};
