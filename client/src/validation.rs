//! Field validators.
//!
//! Pure predicates (`is_valid_*`) plus `validate_*` wrappers that return a
//! `validator::ValidationError` carrying the code and inline message shown
//! next to the field.

use std::borrow::Cow;

use validator::{ValidateEmail, ValidationError};

/// Total length of a member identifier, prefix included.
pub const MEMBER_ID_LEN: usize = 6;

/// Length of a French phone number.
pub const FRENCH_PHONE_LEN: usize = 10;

/// Member identifier: exactly six characters, the first one of `prefixes`.
#[must_use]
pub fn is_valid_member_identifier(value: &str, prefixes: &[char]) -> bool {
    value.chars().count() == MEMBER_ID_LEN
        && value.chars().next().is_some_and(|c| prefixes.contains(&c))
}

/// French phone number: ten digits, no separators, leading "0".
#[must_use]
pub fn is_valid_french_phone(value: &str) -> bool {
    value.len() == FRENCH_PHONE_LEN
        && value.starts_with('0')
        && value.bytes().all(|b| b.is_ascii_digit())
}

#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    value.validate_email()
}

/// At most `max` characters (not bytes).
#[must_use]
pub fn within_max_length(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

/// Custom subscription amount: digits only and at least `minimum`.
#[must_use]
pub fn is_valid_custom_amount(value: &str, minimum: u32) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && value.parse::<u64>().map_or(true, |n| n >= u64::from(minimum))
}

fn error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// # Errors
/// Returns `invalid_member_identifier` when the identifier is malformed.
pub fn validate_member_identifier(value: &str, prefixes: &[char]) -> Result<(), ValidationError> {
    if is_valid_member_identifier(value, prefixes) {
        return Ok(());
    }
    let example: String = prefixes.first().map_or_else(String::new, |p| format!("{p}12345"));
    Err(error(
        "invalid_member_identifier",
        format!("Not a member identifier (format {example})."),
    ))
}

/// # Errors
/// Returns `invalid_phone` when the number is not a French phone number.
pub fn validate_french_phone(value: &str) -> Result<(), ValidationError> {
    if is_valid_french_phone(value) {
        Ok(())
    } else {
        Err(error("invalid_phone", "Not a valid phone number."))
    }
}

/// # Errors
/// Returns `invalid_email` when the address is not syntactically valid.
pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(error("invalid_email", "Invalid email address."))
    }
}

/// # Errors
/// Returns `too_long` when the value exceeds `max` characters.
pub fn validate_max_length(value: &str, max: usize) -> Result<(), ValidationError> {
    if within_max_length(value, max) {
        Ok(())
    } else {
        let mut err = error("too_long", format!("At most {max} characters."));
        err.add_param(Cow::Borrowed("max"), &max);
        Err(err)
    }
}

/// # Errors
/// Returns `invalid_amount` when the custom amount is malformed or too small.
pub fn validate_custom_amount(value: &str, minimum: u32) -> Result<(), ValidationError> {
    if is_valid_custom_amount(value, minimum) {
        Ok(())
    } else {
        let mut err = error(
            "invalid_amount",
            format!("Incorrect custom amount: pick one from the list or an amount of at least {minimum}."),
        );
        err.add_param(Cow::Borrowed("minimum"), &minimum);
        Err(err)
    }
}
