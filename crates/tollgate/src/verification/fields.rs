//! Structural validation of request fields.
//!
//! Runs before any business check. Every malformed field contributes one
//! field-scoped error, in request-field order.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use tollgate_common::{FieldErrors, SmsCheckRequest, SmsCodeRequest, TollgateError};

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[3-9]\d{9}$").expect("static regex"));

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w{5,20}$").expect("static regex"));

const MOBILE_LENGTH: usize = 11;

/// An SMS code request that passed structural validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub mobile: String,
    /// Canonical hyphenated lowercase UUID
    pub challenge_id: String,
    pub text: String,
}

/// An SMS code check that passed structural validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCheck {
    pub mobile: String,
    pub sms_code: String,
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_mobile(value: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let Some(mobile) = trimmed(value) else {
        errors.push("mobile", "Mobile number is required");
        return None;
    };
    if mobile.chars().count() != MOBILE_LENGTH {
        errors.push("mobile", "Mobile number has the wrong length");
        return None;
    }
    if !MOBILE_RE.is_match(mobile) {
        errors.push("mobile", "Mobile number format is invalid");
        return None;
    }
    Some(mobile.to_string())
}

fn check_challenge_id(value: Option<&str>, errors: &mut FieldErrors) -> Option<String> {
    let Some(raw) = trimmed(value) else {
        errors.push("image_code_id", "Image code id is required");
        return None;
    };
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id.hyphenated().to_string()),
        Err(_) => {
            errors.push("image_code_id", "Image code id must be a UUID");
            None
        }
    }
}

fn check_fixed_length(
    field: &'static str,
    label: &str,
    value: Option<&str>,
    length: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    let Some(v) = trimmed(value) else {
        errors.push(field, format!("{label} is required"));
        return None;
    };
    if v.chars().count() != length {
        errors.push(field, format!("{label} has the wrong length"));
        return None;
    }
    Some(v.to_string())
}

/// Canonicalise a challenge id, or say why it is not one
pub fn parse_challenge_id(raw: &str) -> Result<String, FieldErrors> {
    let mut errors = FieldErrors::new();
    check_challenge_id(Some(raw), &mut errors).ok_or(errors)
}

pub fn validate_mobile(raw: &str) -> Result<String, TollgateError> {
    let mut errors = FieldErrors::new();
    check_mobile(Some(raw), &mut errors).ok_or(TollgateError::InvalidInput(errors))
}

pub fn validate_username(raw: &str) -> Result<String, TollgateError> {
    if USERNAME_RE.is_match(raw) {
        Ok(raw.to_string())
    } else {
        let mut errors = FieldErrors::new();
        errors.push("username", "Username must be 5-20 letters, digits or underscores");
        Err(TollgateError::InvalidInput(errors))
    }
}

pub fn validate_sms_request(
    req: &SmsCodeRequest,
    text_length: usize,
) -> Result<ValidatedRequest, TollgateError> {
    let mut errors = FieldErrors::new();

    let mobile = check_mobile(req.mobile.as_deref(), &mut errors);
    let challenge_id = check_challenge_id(req.image_code_id.as_deref(), &mut errors);
    let text = check_fixed_length("text", "Image code", req.text.as_deref(), text_length, &mut errors);

    match (mobile, challenge_id, text) {
        (Some(mobile), Some(challenge_id), Some(text)) => Ok(ValidatedRequest {
            mobile,
            challenge_id,
            text,
        }),
        _ => Err(TollgateError::InvalidInput(errors)),
    }
}

pub fn validate_check_request(
    req: &SmsCheckRequest,
    code_length: usize,
) -> Result<ValidatedCheck, TollgateError> {
    let mut errors = FieldErrors::new();

    let mobile = check_mobile(req.mobile.as_deref(), &mut errors);
    let sms_code = check_fixed_length(
        "sms_code",
        "SMS code",
        req.sms_code.as_deref(),
        code_length,
        &mut errors,
    );

    let sms_code = sms_code.filter(|code| {
        let digits = code.chars().all(|c| c.is_ascii_digit());
        if !digits {
            errors.push("sms_code", "SMS code must be digits only");
        }
        digits
    });

    match (mobile, sms_code) {
        (Some(mobile), Some(sms_code)) => Ok(ValidatedCheck { mobile, sms_code }),
        _ => Err(TollgateError::InvalidInput(errors)),
    }
}
