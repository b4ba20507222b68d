//! Core types shared across Tollgate components.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::errno;

/// Which registration state a mobile must be in for a flow to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilePolicy {
    /// Sign-up: the mobile must not belong to an account yet
    MustBeUnregistered,
    /// Password recovery: the mobile must already belong to an account
    MustBeRegistered,
}

/// Whether an issued SMS code is handed to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dispatch {
    /// Call the SMS gateway with the code
    Send,
    /// Store the code only; delivery is someone else's job
    Skip,
}

/// A structural validation failure scoped to one request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Field errors in request-field order.
///
/// Displays as the messages joined with `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Returns true if any error is scoped to `field`
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl From<Vec<FieldError>> for FieldErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&e.message)?;
        }
        Ok(())
    }
}

/// SMS code request body, as submitted by the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsCodeRequest {
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub image_code_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// SMS code check request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsCheckRequest {
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub sms_code: Option<String>,
}

/// Result of a successful SMS code issuance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCode {
    /// Destination mobile
    pub mobile: String,

    /// Whether the gateway accepted the message (false when dispatch was skipped)
    pub dispatched: bool,

    /// Unix timestamp after which the code stops being accepted
    pub expires_at: i64,

    /// Unix timestamp after which a new code may be requested
    pub resend_after: i64,
}

/// Existence lookup answer for the count endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    pub count: u64,
}

/// JSON envelope used by every API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub errno: String,
    pub errmsg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(errmsg: impl Into<String>, data: T) -> Self {
        Self {
            errno: errno::OK.to_string(),
            errmsg: errmsg.into(),
            data: Some(data),
        }
    }

    pub fn error(errno: &str, errmsg: impl Into<String>) -> Self {
        Self {
            errno: errno.to_string(),
            errmsg: errmsg.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_wire_names() {
        let json = serde_json::to_string(&MobilePolicy::MustBeUnregistered).unwrap();
        assert_eq!(json, "\"must_be_unregistered\"");

        let dispatch: Dispatch = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(dispatch, Dispatch::Skip);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let resp: ApiResponse<()> = ApiResponse::error(errno::RATE_LIMITED, "slow down");
        let value = serde_json::to_value(&resp).unwrap();

        assert_eq!(value["errno"], "4108");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_missing_request_fields_deserialize_as_none() {
        let req: SmsCodeRequest = serde_json::from_str(r#"{"mobile":"13800000000"}"#).unwrap();
        assert_eq!(req.mobile.as_deref(), Some("13800000000"));
        assert!(req.image_code_id.is_none());
        assert!(req.text.is_none());
    }
}
