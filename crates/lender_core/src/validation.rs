//! Stateless request helpers: phone normalisation, email shape, hashing,
//! and a small field-error accumulator.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{FieldError, LenderError};

pub const DEFAULT_COUNTRY_CODE: u16 = 254;

/// Dialling-code rules for the deployment's market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhoneRules {
    pub country_code: u16,
}

impl Default for PhoneRules {
    fn default() -> Self {
        Self {
            country_code: DEFAULT_COUNTRY_CODE,
        }
    }
}

impl PhoneRules {
    pub fn new(country_code: u16) -> Self {
        if country_code == 0 {
            Self::default()
        } else {
            Self { country_code }
        }
    }

    /// Strip spaces and `+`, then prefix the country code unless the value
    /// is already a 12-digit international number.
    pub fn normalize(&self, raw: &str) -> String {
        let phone: String = raw
            .trim()
            .chars()
            .filter(|c| *c != ' ' && *c != '+')
            .collect();
        let cc = self.country_code.to_string();
        if phone.len() == 12 && phone.starts_with(&cc) {
            return phone;
        }
        format!("{cc}{}", phone.trim_start_matches('0'))
    }

    pub fn is_valid(&self, phone: &str) -> bool {
        phone.len() == 12
            && phone.starts_with(&self.country_code.to_string())
            && phone.bytes().all(|b| b.is_ascii_digit())
    }

    /// Normalise and validate in one step.
    pub fn require_valid(&self, raw: &str) -> Result<String, LenderError> {
        let phone = self.normalize(raw);
        if self.is_valid(&phone) {
            Ok(phone)
        } else {
            Err(LenderError::InvalidInput("Invalid phone number".into()))
        }
    }

    /// Markets outside the default one have no implied telecom provider.
    pub fn requires_explicit_provider(&self) -> bool {
        self.country_code != DEFAULT_COUNTRY_CODE
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Lowercase hex SHA-256, the stored form of phone numbers in `enc_phone`.
pub fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

pub fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Collects field errors and turns them into a single `Validation` error.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        self.check(
            (min..=max).contains(&len),
            field,
            format!("must be between {min} and {max} characters"),
        )
    }

    pub fn finish(&mut self) -> Result<(), LenderError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(LenderError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}
