//! SMS one-time code issuance and checking.
//!
//! A code is stored together with a resend marker in one atomic
//! set-if-absent write, then handed to the gateway. The writes are not
//! rolled back if dispatch fails: the code stays valid and the user can ask
//! for a fresh one once the marker lapses.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use tollgate_common::constants::{GATEWAY_ACCEPTED, cache_keys};
use tollgate_common::{Dispatch, IssuedCode, SmsCheckRequest, TollgateError};

use super::fields;
use crate::diagnostics::SecretSink;
use crate::gateway::SmsGateway;
use crate::store::{CacheStore, TtlEntry};

const MARKER_VALUE: &str = "1";

/// Timing and template parameters for SMS codes
#[derive(Debug, Clone)]
pub struct SmsSettings {
    pub code_length: usize,
    /// How long an issued code is accepted
    pub code_ttl: Duration,
    /// Minimum gap between two codes for one mobile
    pub resend_interval: Duration,
    pub template_id: String,
    /// Expiry quoted to the user in the message text
    pub expiry_minutes: u64,
}

/// Uniform draw over every `length`-digit value, zero-padded.
///
/// `length` must be between 1 and 18.
pub fn generate_code(length: usize) -> String {
    let upper = 10u64.pow(length as u32);
    let n = rand::rng().random_range(0..upper);
    format!("{n:0length$}")
}

pub struct SmsCodeIssuer {
    store: Arc<dyn CacheStore>,
    gateway: Arc<dyn SmsGateway>,
    settings: SmsSettings,
    secrets: SecretSink,
}

impl SmsCodeIssuer {
    pub fn new(
        store: Arc<dyn CacheStore>,
        gateway: Arc<dyn SmsGateway>,
        settings: SmsSettings,
        secrets: SecretSink,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
            secrets,
        }
    }

    /// Issue a code for an already-validated `mobile`.
    pub async fn issue(&self, mobile: &str, dispatch: Dispatch) -> Result<IssuedCode, TollgateError> {
        let flag_key = cache_keys::sms_flag(mobile);
        let code_key = cache_keys::sms_code(mobile);

        if self.store.exists(&flag_key).await? {
            tracing::info!(mobile = %mobile, "SMS code requested inside resend interval");
            return Err(TollgateError::RateLimited);
        }

        let code = generate_code(self.settings.code_length);

        // The marker write is set-if-absent, so a concurrent request that
        // passed the check above still cannot issue a second code.
        let applied = self
            .store
            .set_pair_if_absent(
                TtlEntry::new(&flag_key, MARKER_VALUE, self.settings.resend_interval),
                TtlEntry::new(&code_key, &code, self.settings.code_ttl),
            )
            .await
            .inspect_err(|e| tracing::error!(mobile = %mobile, error = %e, "SMS code write failed"))?;

        if !applied {
            tracing::info!(mobile = %mobile, "Lost resend race to a concurrent request");
            return Err(TollgateError::RateLimited);
        }

        self.secrets.record("sms_code", mobile, &code);

        let now = chrono::Utc::now().timestamp();
        let issued = IssuedCode {
            mobile: mobile.to_string(),
            dispatched: false,
            expires_at: now + self.settings.code_ttl.as_secs() as i64,
            resend_after: now + self.settings.resend_interval.as_secs() as i64,
        };

        match dispatch {
            Dispatch::Skip => {
                tracing::info!(mobile = %mobile, "SMS code stored without dispatch");
                Ok(issued)
            }
            Dispatch::Send => {
                self.dispatch(mobile, &code).await?;
                Ok(IssuedCode {
                    dispatched: true,
                    ..issued
                })
            }
        }
    }

    async fn dispatch(&self, mobile: &str, code: &str) -> Result<(), TollgateError> {
        let params = [code.to_string(), self.settings.expiry_minutes.to_string()];

        match self
            .gateway
            .send_template(mobile, &params, &self.settings.template_id)
            .await
        {
            Ok(GATEWAY_ACCEPTED) => {
                tracing::info!(mobile = %mobile, "SMS code sent");
                Ok(())
            }
            Ok(result) => {
                tracing::warn!(mobile = %mobile, result, "SMS gateway rejected code");
                Err(TollgateError::GatewayRejected(result))
            }
            Err(e) => {
                tracing::error!(mobile = %mobile, error = %e, "SMS gateway unreachable");
                Err(TollgateError::GatewayUnreachable(e.to_string()))
            }
        }
    }

    /// Compare a submitted code with the stored one for the mobile.
    ///
    /// The stored code is not consumed; it stays valid until its TTL lapses
    /// or a new code overwrites it.
    pub async fn check(&self, req: &SmsCheckRequest) -> Result<String, TollgateError> {
        let valid = fields::validate_check_request(req, self.settings.code_length)?;

        let stored = self.store.get(&cache_keys::sms_code(&valid.mobile)).await?;
        match stored {
            Some(code) if code == valid.sms_code => Ok(valid.mobile),
            _ => {
                tracing::debug!(mobile = %valid.mobile, "SMS code mismatch or expired");
                Err(TollgateError::SmsCodeExpiredOrWrong)
            }
        }
    }
}
