//! The single gate every SMS code request passes before a code is issued.

use std::sync::Arc;

use tollgate_common::{MobilePolicy, SmsCodeRequest, TollgateError};

use super::fields::{self, ValidatedRequest};
use crate::captcha::ChallengeVerifier;
use crate::registry::Lookup;

pub struct ValidationGate {
    lookup: Lookup,
    challenges: Arc<ChallengeVerifier>,
    text_length: usize,
}

impl ValidationGate {
    pub fn new(lookup: Lookup, challenges: Arc<ChallengeVerifier>, text_length: usize) -> Self {
        Self {
            lookup,
            challenges,
            text_length,
        }
    }

    /// Validate a request under `policy`.
    ///
    /// Structural checks run first and report every bad field. Business
    /// checks then run in order and stop at the first failure: registration
    /// state of the mobile, then the CAPTCHA answer.
    pub async fn validate(
        &self,
        req: &SmsCodeRequest,
        policy: MobilePolicy,
    ) -> Result<ValidatedRequest, TollgateError> {
        let valid = fields::validate_sms_request(req, self.text_length)?;

        let registered = self.lookup.exists_by_mobile(&valid.mobile).await?;
        match (policy, registered) {
            (MobilePolicy::MustBeUnregistered, true) => {
                tracing::debug!(mobile = %valid.mobile, "Mobile already registered");
                return Err(TollgateError::AlreadyRegistered);
            }
            (MobilePolicy::MustBeRegistered, false) => {
                tracing::debug!(mobile = %valid.mobile, "Mobile not registered");
                return Err(TollgateError::NotRegistered);
            }
            _ => {}
        }

        self.challenges
            .verify(&valid.challenge_id, &valid.text)
            .await?;

        Ok(valid)
    }
}
