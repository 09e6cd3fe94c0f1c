//! Field validation.
//!
//! Validators accumulate failures into the shared field → reason map so a
//! caller can render per-field messages. The first failure recorded for a
//! field wins; a missing required field short-circuits its format checks.

use chrono::{Datelike, NaiveDate, Utc};
use keygate_core::error::{Error, FieldErrors};

pub const ACTIVATION_CODE_LENGTH: usize = 6;

const REQUIRED: &str = "is required";

/// Accumulator over the field → reason map.
#[derive(Debug, Default)]
pub struct Violations {
    fields: FieldErrors,
}

impl Violations {
    pub fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert into a validation error, or `Ok(())` when clean.
    pub fn into_result(self) -> keygate_core::Result<()> {
        if self.fields.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.fields))
        }
    }
}

// ---------------------------------------------------------------------
// Field checks
// ---------------------------------------------------------------------

/// Minimal structural email check: one `@`, non-empty local part, dotted
/// domain.
pub fn check_email(v: &mut Violations, field: &str, email: &str) {
    if email.is_empty() {
        v.add(field, REQUIRED);
        return;
    }

    let Some((local, domain)) = email.split_once('@') else {
        v.add(field, "must be a valid email address");
        return;
    };

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if local.is_empty() || domain.is_empty() || email.contains(' ') || !domain_ok {
        v.add(field, "must be a valid email address");
    }
}

/// E.164: leading `+`, non-zero first digit, 8–15 digits total.
pub fn check_phone_number(v: &mut Violations, field: &str, phone: &str) {
    if phone.is_empty() {
        v.add(field, REQUIRED);
        return;
    }

    let Some(digits) = phone.strip_prefix('+') else {
        v.add(field, "must be a valid E.164 phone number");
        return;
    };

    let ok = (8..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');

    if !ok {
        v.add(field, "must be a valid E.164 phone number");
    }
}

/// 8–20 chars with upper, lower, digit, and special classes all present.
pub fn check_password(v: &mut Violations, field: &str, password: &str) {
    if password.is_empty() {
        v.add(field, REQUIRED);
        return;
    }
    if password.len() < 8 {
        v.add(field, "must be at least 8 characters");
        return;
    }
    if password.len() > 20 {
        v.add(field, "must be at most 20 characters");
        return;
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !c.is_whitespace());

    if !(has_upper && has_lower && has_digit && has_special) {
        v.add(
            field,
            "must contain uppercase, lowercase, numeric, and special characters",
        );
    }
}

/// 1–100 alphabetic (unicode) characters.
pub fn check_name(v: &mut Violations, field: &str, name: &str) {
    if name.is_empty() {
        v.add(field, REQUIRED);
        return;
    }
    if name.chars().count() > 100 {
        v.add(field, "must be at most 100 characters");
        return;
    }
    if !name.chars().all(char::is_alphabetic) {
        v.add(field, "must contain only letters");
    }
}

/// Subject must be at least `min_years` old today.
pub fn check_min_age(v: &mut Violations, field: &str, birth_date: NaiveDate, min_years: i32) {
    let today = Utc::now().date_naive();

    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }

    if age < min_years {
        v.add(field, format!("must be at least {min_years} years"));
    }
}

/// Exactly [`ACTIVATION_CODE_LENGTH`] characters from `0-9A-Z`.
pub fn check_activation_code(v: &mut Violations, field: &str, code: &str) {
    if code.is_empty() {
        v.add(field, REQUIRED);
        return;
    }

    let ok = code.len() == ACTIVATION_CODE_LENGTH
        && code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase());

    if !ok {
        v.add(
            field,
            format!("must be {ACTIVATION_CODE_LENGTH} characters from 0-9A-Z"),
        );
    }
}
