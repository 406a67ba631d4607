use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use super::domain::{Attachments, AttachmentKind, BasicDetails};

/// Field-level failures keyed by wire name; the first message per field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("static validation pattern compiles"))
}

fn alphabetic(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[a-zA-Z\s]+$").is_match(value)
}

fn digits(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[0-9]+$").is_match(value)
}

pub(crate) fn is_valid_email(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[^\s@]+@[^\s@]+\.[^\s@]{2,}$").is_match(value)
}

fn is_valid_pan(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[A-Z]{5}[0-9]{4}[A-Z]$").is_match(value)
}

fn is_valid_aadhaar(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[0-9]{12}$").is_match(value)
}

pub(crate) fn is_year(value: &str) -> bool {
    static CELL: OnceLock<Regex> = OnceLock::new();
    pattern(&CELL, r"^[0-9]{4}$").is_match(value)
}

pub(crate) fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn required_name(errors: &mut ValidationErrors, field: &str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if !alphabetic(value) {
        errors.add(field, "Only alphabets are allowed");
    }
}

/// Check step-1 input. `attachments` is the merged set (new uploads over the draft's).
pub fn validate_basic_details(
    details: &BasicDetails,
    attachments: &Attachments,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if details.regcategory_id.trim().is_empty() {
        errors.add("regcategory_id", "Registration category is required");
    }
    if details.nationality_id.trim().is_empty() {
        errors.add("nationality_id", "Nationality is required");
    }

    required_name(&mut errors, "f_name", "First name", &details.first_name);
    if let Some(middle) = details.middle_name.as_deref() {
        if !middle.is_empty() && !alphabetic(middle) {
            errors.add("m_name", "Only alphabets are allowed");
        }
    }
    required_name(&mut errors, "l_name", "Last name", &details.last_name);
    required_name(
        &mut errors,
        "father_name",
        "Father's Name",
        &details.father_name,
    );
    required_name(
        &mut errors,
        "mother_name",
        "Mother's Name",
        &details.mother_name,
    );

    if details.place.trim().is_empty() {
        errors.add("place", "Place is required");
    }
    if details.date_of_birth.trim().is_empty() {
        errors.add("dob", "Date of birth is required");
    } else if !is_iso_date(details.date_of_birth.trim()) {
        errors.add("dob", "Date of birth must be YYYY-MM-DD");
    }

    if !is_valid_email(details.email.trim()) {
        errors.add("email", "Invalid email format");
    }

    let mobile = details.mobile_number.trim();
    if mobile.len() != 10 {
        errors.add("mobile_number", "Mobile number must be 10 digits");
    } else if !digits(mobile) {
        errors.add("mobile_number", "Only numbers are allowed");
    }
    if let Some(telephone) = details.telephone_number.as_deref() {
        let telephone = telephone.trim();
        if !telephone.is_empty() && !digits(telephone) {
            errors.add("telephone_number", "Only numbers are allowed");
        }
    }

    if details.address.trim().chars().count() < 10 {
        errors.add("address", "Address is required");
    }
    if !is_valid_pan(details.pan_number.trim()) {
        errors.add("pan_number", "Invalid PAN number");
    }
    if !is_valid_aadhaar(details.aadhaar_number.trim()) {
        errors.add("aadhaar_number", "Aadhaar must be 12 digits");
    }

    for kind in AttachmentKind::REQUIRED {
        if !attachments.contains_key(&kind) {
            errors.add(kind.field_name(), kind.missing_message());
        }
    }

    errors.into_result()
}
