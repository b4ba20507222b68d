//! Error kinds surfaced by the verification flows.

use thiserror::Error;

use crate::constants::errno;
use crate::types::FieldErrors;

/// Every failure a verification operation can report to its caller.
///
/// Business-rule failures carry stable, distinguishable kinds so a UI can
/// render a specific message. Nothing here is retried inside the service.
#[derive(Debug, Error)]
pub enum TollgateError {
    /// Structural validation failed on one or more request fields
    #[error("{0}")]
    InvalidInput(FieldErrors),

    /// Mobile already belongs to an account (registration flow)
    #[error("Mobile number is already registered")]
    AlreadyRegistered,

    /// Mobile does not belong to any account (recovery flow)
    #[error("Mobile number is not registered")]
    NotRegistered,

    /// CAPTCHA text missing, expired, or wrong
    #[error("Image code is wrong or has expired")]
    ChallengeExpiredOrWrong,

    /// SMS code missing, expired, or wrong
    #[error("SMS code is wrong or has expired")]
    SmsCodeExpiredOrWrong,

    /// A resend marker is still live for this mobile
    #[error("SMS codes requested too frequently")]
    RateLimited,

    /// Cache store unreachable or a write failed
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(String),

    /// User registry lookup failed
    #[error("User registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Gateway answered with a non-success result code
    #[error("SMS gateway rejected the message (result {0})")]
    GatewayRejected(i64),

    /// Gateway could not be reached or answered garbage
    #[error("SMS gateway unreachable: {0}")]
    GatewayUnreachable(String),
}

impl TollgateError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::AlreadyRegistered => 409,
            Self::NotRegistered => 404,
            Self::ChallengeExpiredOrWrong => 400,
            Self::SmsCodeExpiredOrWrong => 400,
            Self::RateLimited => 429,
            Self::StoreUnavailable(_) => 503,
            Self::RegistryUnavailable(_) => 503,
            Self::GatewayRejected(_) => 502,
            Self::GatewayUnreachable(_) => 504,
        }
    }

    /// Stable `errno` for the API envelope
    pub fn errno(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => errno::PARAM_ERR,
            Self::AlreadyRegistered => errno::ALREADY_REGISTERED,
            Self::NotRegistered => errno::NOT_REGISTERED,
            Self::ChallengeExpiredOrWrong => errno::IMAGE_CODE_ERR,
            Self::SmsCodeExpiredOrWrong => errno::SMS_CODE_ERR,
            Self::RateLimited => errno::RATE_LIMITED,
            Self::StoreUnavailable(_) => errno::STORE_ERR,
            Self::RegistryUnavailable(_) => errno::REGISTRY_ERR,
            Self::GatewayRejected(_) => errno::SMS_FAIL,
            Self::GatewayUnreachable(_) => errno::SMS_ERROR,
        }
    }

    /// Returns true if a required dependency is down.
    ///
    /// These are not recovered locally; the caller sees them as-is.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::RegistryUnavailable(_) | Self::GatewayUnreachable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldError;

    #[test]
    fn test_invalid_input_joins_field_messages() {
        let err = TollgateError::InvalidInput(FieldErrors::from(vec![
            FieldError::new("mobile", "Mobile number has the wrong length"),
            FieldError::new("text", "Image code has the wrong length"),
        ]));

        assert_eq!(
            err.to_string(),
            "Mobile number has the wrong length/Image code has the wrong length"
        );
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.errno(), errno::PARAM_ERR);
    }

    #[test]
    fn test_gateway_outcomes_stay_distinct() {
        let rejected = TollgateError::GatewayRejected(1);
        let unreachable = TollgateError::GatewayUnreachable("connection refused".into());

        assert_ne!(rejected.errno(), unreachable.errno());
        assert_ne!(rejected.status_code(), unreachable.status_code());
        assert!(!rejected.is_dependency_failure());
        assert!(unreachable.is_dependency_failure());
    }
}
