//! Field rules for the customer form.
//!
//! Validation is pure: it maps raw input to a verdict and never touches view
//! state. Turning verdicts into visual markers is the form controller's job.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::customer::{Customer, CustomerField};
use crate::errors::DeskError;

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const NATIONAL_ID_MESSAGE: &str = "National ID must be exactly 10 digits";
pub const NAME_TOO_SHORT_MESSAGE: &str = "Must be at least 2 characters";
pub const NAME_CHARSET_MESSAGE: &str = "Only letters and spaces are allowed";
pub const CONTACT_TOO_SHORT_MESSAGE: &str = "Contact must be at least 5 characters";

const NAME_MIN_CHARS: usize = 2;
const CONTACT_MIN_CHARS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldVerdict {
    pub valid: bool,
    pub message: String,
}

impl FieldVerdict {
    fn ok() -> Self {
        Self { valid: true, message: String::new() }
    }

    fn fail(message: &str) -> Self {
        Self { valid: false, message: message.to_owned() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormVerdict {
    fields: BTreeMap<CustomerField, FieldVerdict>,
}

impl FormVerdict {
    pub fn is_valid(&self) -> bool {
        self.fields.values().all(|verdict| verdict.valid)
    }

    pub fn get(&self, field: CustomerField) -> Option<&FieldVerdict> {
        self.fields.get(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CustomerField, &FieldVerdict)> {
        self.fields.iter().map(|(field, verdict)| (*field, verdict))
    }

    pub fn errors(&self) -> Vec<DeskError> {
        self.iter()
            .filter(|(_, verdict)| !verdict.valid)
            .map(|(field, verdict)| DeskError::ValidationFailed {
                field,
                reason: verdict.message.clone(),
            })
            .collect()
    }
}

fn national_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("national id pattern compiles"))
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-ZÀ-ÿ\s]+$").expect("name pattern compiles"))
}

pub fn validate_field(field: CustomerField, raw: &str) -> FieldVerdict {
    let value = raw.trim();
    if value.is_empty() {
        return FieldVerdict::fail(REQUIRED_MESSAGE);
    }

    match field {
        CustomerField::NationalId => {
            if !national_id_pattern().is_match(value) {
                return FieldVerdict::fail(NATIONAL_ID_MESSAGE);
            }
        }
        CustomerField::FirstName | CustomerField::LastName => {
            if value.chars().count() < NAME_MIN_CHARS {
                return FieldVerdict::fail(NAME_TOO_SHORT_MESSAGE);
            }
            if !name_pattern().is_match(value) {
                return FieldVerdict::fail(NAME_CHARSET_MESSAGE);
            }
        }
        CustomerField::Contact => {
            if value.chars().count() < CONTACT_MIN_CHARS {
                return FieldVerdict::fail(CONTACT_TOO_SHORT_MESSAGE);
            }
        }
    }

    FieldVerdict::ok()
}

/// Resolves a form id (`nationalId`, `firstName`, ...) before validating.
/// Unknown ids only get the required-value check.
pub fn validate_field_by_id(field_id: &str, raw: &str) -> FieldVerdict {
    match CustomerField::from_id(field_id) {
        Some(field) => validate_field(field, raw),
        None if raw.trim().is_empty() => FieldVerdict::fail(REQUIRED_MESSAGE),
        None => FieldVerdict::ok(),
    }
}

pub fn validate_form(form: &Customer) -> FormVerdict {
    let fields = CustomerField::ALL
        .into_iter()
        .map(|field| (field, validate_field(field, form.value_of(field))))
        .collect();
    FormVerdict { fields }
}
