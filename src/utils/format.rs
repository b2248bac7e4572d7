use regex::Regex;
use std::sync::LazyLock;

use crate::utils::validation::only_digits;

static CPF_MASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})(\d{3})(\d{3})(\d{2})$").expect("cpf mask regex"));
static CNPJ_MASK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})(\d{3})(\d{3})(\d{4})(\d{2})$").expect("cnpj mask regex")
});
static POSTAL_CODE_MASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{5})(\d{3})$").expect("postal code mask regex"));
static CARD_GROUPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,4}").expect("card group regex"));
static MOBILE_MASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})(\d{5})(\d{4})$").expect("mobile mask regex"));
static LANDLINE_MASK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})(\d{4})(\d{4})$").expect("landline mask regex"));

fn apply(mask: &Regex, digits: &str, template: &str) -> Option<String> {
    mask.is_match(digits)
        .then(|| mask.replace(digits, template).into_owned())
}

/// `000.000.000-00`. Inputs that are not 11 digits come back as digits only.
pub fn format_cpf(value: &str) -> String {
    let digits = only_digits(value);
    apply(&CPF_MASK, &digits, "$1.$2.$3-$4").unwrap_or(digits)
}

/// `00.000.000/0000-00`
pub fn format_cnpj(value: &str) -> String {
    let digits = only_digits(value);
    apply(&CNPJ_MASK, &digits, "$1.$2.$3/$4-$5").unwrap_or(digits)
}

pub fn format_cpf_cnpj(value: &str) -> String {
    let digits = only_digits(value);
    if digits.len() > 11 {
        format_cnpj(&digits)
    } else {
        format_cpf(&digits)
    }
}

/// `00000-000`
pub fn format_postal_code(value: &str) -> String {
    let digits = only_digits(value);
    apply(&POSTAL_CODE_MASK, &digits, "$1-$2").unwrap_or(digits)
}

/// Groups of four, at most 19 digits.
pub fn format_card_number(value: &str) -> String {
    let digits: String = only_digits(value).chars().take(19).collect();
    CARD_GROUPS
        .find_iter(&digits)
        .map(|group| group.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `(00) 00000-0000` for mobiles, `(00) 0000-0000` for landlines.
pub fn format_phone(value: &str) -> String {
    let digits = only_digits(value);
    apply(&MOBILE_MASK, &digits, "($1) $2-$3")
        .or_else(|| apply(&LANDLINE_MASK, &digits, "($1) $2-$3"))
        .unwrap_or(digits)
}
