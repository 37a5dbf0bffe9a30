//! Intake form validation
//!
//! Validates visitor contact fields before a session is requested. Pure
//! functions; once a session exists the form plays no further part.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::session::CustomerInfo;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email pattern")
});

/// Minimum digit count for a usable phone number
const MIN_PHONE_DIGITS: usize = 10;

/// Fields of the intake form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeField {
    /// Visitor name
    Name,
    /// Contact email
    Email,
    /// Contact phone
    Phone,
    /// Opening message
    Message,
}

impl std::fmt::Display for IntakeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Message => "message",
        };
        f.write_str(name)
    }
}

/// Field-level validation errors; an empty map signals a valid form
pub type IntakeErrors = BTreeMap<IntakeField, String>;

/// Visitor contact fields captured before a session is requested
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeForm {
    /// Visitor name
    pub name: String,
    /// Contact email address
    pub email: String,
    /// Contact phone number, any common formatting accepted
    pub phone: String,
    /// Opening message for the conversation
    pub message: String,
}

impl IntakeForm {
    /// Contact details for the session-creation request, phone normalized
    #[must_use]
    pub fn customer(&self) -> CustomerInfo {
        CustomerInfo {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: normalize_phone(&self.phone),
        }
    }
}

/// Validate visitor contact fields
///
/// Returns a field-to-error mapping; an empty mapping signals a valid form.
#[must_use]
pub fn validate_intake(form: &IntakeForm) -> IntakeErrors {
    let mut errors = IntakeErrors::new();

    if form.name.trim().is_empty() {
        errors.insert(IntakeField::Name, "Name is required".to_string());
    }

    if !EMAIL_RE.is_match(form.email.trim()) {
        errors.insert(
            IntakeField::Email,
            "Enter a valid email address".to_string(),
        );
    }

    if normalize_phone(&form.phone).len() < MIN_PHONE_DIGITS {
        errors.insert(
            IntakeField::Phone,
            format!("Enter a phone number with at least {MIN_PHONE_DIGITS} digits"),
        );
    }

    if form.message.trim().is_empty() {
        errors.insert(IntakeField::Message, "Message is required".to_string());
    }

    errors
}

/// Strip formatting from a phone number, keeping digits only
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
