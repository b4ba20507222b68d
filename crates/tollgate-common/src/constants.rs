//! Shared constants for Tollgate components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Tollgate HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8890";

/// Image CAPTCHA text expiry in the cache (5 minutes)
pub const IMAGE_CODE_TTL_SECS: u64 = 300;

/// Number of characters in an image CAPTCHA
pub const IMAGE_CODE_LENGTH: usize = 4;

/// SMS code expiry in the cache (5 minutes)
pub const SMS_CODE_TTL_SECS: u64 = 300;

/// Minimum interval between two SMS sends to one mobile
pub const SEND_SMS_CODE_INTERVAL_SECS: u64 = 60;

/// Number of digits in an SMS code
pub const SMS_CODE_LENGTH: usize = 6;

/// Expiry in minutes quoted to the user inside the SMS template
pub const SMS_CODE_EXPIRY_MINUTES: u64 = 5;

/// Pre-approved gateway template for verification codes
pub const SMS_CODE_TEMPLATE_ID: &str = "1";

/// Gateway result code meaning "accepted for delivery"
pub const GATEWAY_ACCEPTED: i64 = 0;

/// Cache key prefixes.
///
/// Every key is `{prefix}{id}`. Mobiles are validated as digits only, so
/// `sms_{mobile}` can never equal `sms_flag_{mobile}`.
pub mod cache_keys {
    /// Challenge record: img_{challenge_id}
    pub const IMAGE_CODE_PREFIX: &str = "img_";

    /// SMS code record: sms_{mobile}
    pub const SMS_CODE_PREFIX: &str = "sms_";

    /// Resend marker: sms_flag_{mobile}
    pub const SMS_FLAG_PREFIX: &str = "sms_flag_";

    pub fn image_code(challenge_id: &str) -> String {
        format!("{IMAGE_CODE_PREFIX}{challenge_id}")
    }

    pub fn sms_code(mobile: &str) -> String {
        format!("{SMS_CODE_PREFIX}{mobile}")
    }

    pub fn sms_flag(mobile: &str) -> String {
        format!("{SMS_FLAG_PREFIX}{mobile}")
    }
}

/// Stable `errno` values returned in API envelopes
pub mod errno {
    pub const OK: &str = "0";
    pub const PARAM_ERR: &str = "4103";
    pub const ALREADY_REGISTERED: &str = "4104";
    pub const NOT_REGISTERED: &str = "4105";
    pub const IMAGE_CODE_ERR: &str = "4106";
    pub const SMS_CODE_ERR: &str = "4107";
    pub const RATE_LIMITED: &str = "4108";
    pub const STORE_ERR: &str = "4501";
    pub const REGISTRY_ERR: &str = "4502";
    pub const SMS_FAIL: &str = "4503";
    pub const SMS_ERROR: &str = "4504";
}
