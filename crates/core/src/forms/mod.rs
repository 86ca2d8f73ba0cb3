//! Client-side input validation run before anything is sent to the backend.

mod crop;
mod registration;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use crop::{CropField, CropForm};
pub use registration::{RegistrationField, RegistrationForm, RegistrationStep, RegistrationWizard};

static MOBILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("invalid mobile regex"));
static OTP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("invalid otp regex"));
static PINCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]{5}$").expect("invalid pincode regex"));
static AADHAAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{12}$").expect("invalid aadhaar regex"));

/// A field rejected before submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the offending field.
    pub field: &'static str,
    /// Message shown to the user.
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Accept exactly ten ASCII digits, ignoring surrounding whitespace.
pub fn validate_mobile(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if MOBILE_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::new(
            "contact",
            "Please enter a valid 10-digit mobile number",
        ))
    }
}

/// Accept exactly six ASCII digits.
pub fn validate_otp(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if OTP_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::new("otp", "Please enter the 6-digit OTP"))
    }
}

pub(crate) fn validate_pincode(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if PINCODE_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::new("pincode", "Pincode must be 6 digits"))
    }
}

/// Aadhaar is optional; when present it must be 12 digits (spaces allowed).
pub(crate) fn validate_aadhaar(input: &str) -> Result<Option<String>, ValidationError> {
    let compact: String = input.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(None);
    }
    if AADHAAR_RE.is_match(&compact) {
        Ok(Some(compact))
    } else {
        Err(ValidationError::new("aadhaar", "Aadhaar number must be 12 digits"))
    }
}

pub(crate) fn required(
    field: &'static str,
    label: &str,
    input: &str,
) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err(ValidationError::new(field, format!("{label} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}
