// Validation utilities module
// Field rules shared by the user and product payloads

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

lazy_static! {
    static ref PHONE_PATTERN: Regex = Regex::new(r"^\(\d{2}\) \d{5}-\d{4}$").expect("valid phone regex");
}

/// Highest price a NUMERIC(6, 2) column can hold
const MAX_PRICE_CENTS: i64 = 999_999;

/// Width of the `users.email` column
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Build a validation error carrying a client-facing message
pub fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Wrap a single field failure into a `ValidationErrors` collection
pub fn field_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, invalid(code, message));
    errors
}

fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Person names: at least 3 characters once trimmed, at most 80
pub fn validate_person_name(name: &str) -> Result<(), ValidationError> {
    match trimmed_len(name) {
        0..=2 => Err(invalid("name_too_short", "Nome deve ter no mínimo 3 caracteres")),
        3..=80 => Ok(()),
        _ => Err(invalid("name_too_long", "Nome deve ter no máximo 80 caracteres")),
    }
}

/// Product names: at least 3 characters once trimmed, at most 60
pub fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    match trimmed_len(name) {
        0..=2 => Err(invalid("name_too_short", "Nome deve ter no mínimo 3 caracteres")),
        3..=60 => Ok(()),
        _ => Err(invalid("name_too_long", "Nome deve ter no máximo 60 caracteres")),
    }
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if trimmed_len(description) < 10 {
        return Err(invalid(
            "description_too_short",
            "A descrição deve ter pelo menos 10 caracteres.",
        ));
    }
    Ok(())
}

pub fn validate_brand(brand: &str) -> Result<(), ValidationError> {
    match trimmed_len(brand) {
        0..=1 => Err(invalid("brand_too_short", "A marca não pode ter menos que 2 caracteres.")),
        2..=60 => Ok(()),
        _ => Err(invalid("brand_too_long", "A marca deve ter no máximo 60 caracteres.")),
    }
}

/// Validates that price is strictly positive, has at most two decimal
/// places and fits the storage column
pub fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(invalid(
            "price_must_be_positive",
            "O valor não pode ser menor ou igual a zero.",
        ));
    }
    if price.normalize().scale() > 2 {
        return Err(invalid(
            "price_precision",
            "O valor deve ter no máximo duas casas decimais.",
        ));
    }
    if *price > Decimal::new(MAX_PRICE_CENTS, 2) {
        return Err(invalid("price_too_high", "O valor deve ser no máximo 9999.99."));
    }
    Ok(())
}

/// Validates the `(DD) DDDDD-DDDD` phone format with an area code in 11..=99.
/// Blank values are accepted and treated as "no phone".
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Ok(());
    }
    if !PHONE_PATTERN.is_match(phone) {
        return Err(invalid(
            "phone_format",
            "Telefone deve estar no formato (XX) XXXXX-XXXX. Exemplo: (11) 98765-4321",
        ));
    }
    let area_code: u8 = phone[1..3].parse().map_err(|_| invalid("phone_format", "Telefone inválido"))?;
    if !(11..=99).contains(&area_code) {
        return Err(invalid("phone_area_code", "DDD inválido. Deve estar entre 11 e 99"));
    }
    Ok(())
}

/// Normalizes an optional phone input: trims it and maps blank to `None`
pub fn normalize_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

/// Rebuilds `(DD) DDDDD-DDDD` from the digits of a stored phone.
/// Values without exactly 11 digits are returned untouched.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 {
        format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..])
    } else {
        phone.to_string()
    }
}

/// Checks the address as it will be stored: surrounding whitespace is
/// ignored, then the format and the column width are enforced
pub fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if !validator::validate_email(email) {
        return Err(invalid("email", "Informe um endereço de email válido"));
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(invalid("email_too_long", "Email deve ter no máximo 254 caracteres"));
    }
    Ok(())
}

/// Lowercases and trims an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
