//! Verification flows: the CAPTCHA gate followed by SMS code issuance.
//!
//! Registration and password recovery differ only in the required
//! registration state of the mobile and in whether the code is dispatched.
//! Both run through one parameterised path.

pub mod fields;
mod gate;
mod sms;

pub use gate::ValidationGate;
pub use sms::{SmsCodeIssuer, SmsSettings};

use tollgate_common::{Dispatch, IssuedCode, MobilePolicy, SmsCheckRequest, SmsCodeRequest, TollgateError};

/// Parameters that distinguish one issuance flow from another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    pub policy: MobilePolicy,
    pub dispatch: Dispatch,
}

impl FlowConfig {
    /// Sign-up: new mobiles only, code sent by SMS
    pub const REGISTRATION: FlowConfig = FlowConfig {
        policy: MobilePolicy::MustBeUnregistered,
        dispatch: Dispatch::Send,
    };

    /// Password recovery: known mobiles only, code stored but not sent
    pub const RECOVERY: FlowConfig = FlowConfig {
        policy: MobilePolicy::MustBeRegistered,
        dispatch: Dispatch::Skip,
    };
}

pub struct VerificationFlows {
    gate: ValidationGate,
    issuer: SmsCodeIssuer,
}

impl VerificationFlows {
    pub fn new(gate: ValidationGate, issuer: SmsCodeIssuer) -> Self {
        Self { gate, issuer }
    }

    /// Gate the request, then issue a code, as configured by `flow`
    pub async fn run(
        &self,
        req: &SmsCodeRequest,
        flow: FlowConfig,
    ) -> Result<IssuedCode, TollgateError> {
        let valid = self.gate.validate(req, flow.policy).await?;
        self.issuer.issue(&valid.mobile, flow.dispatch).await
    }

    pub async fn issue_registration_code(
        &self,
        req: &SmsCodeRequest,
    ) -> Result<IssuedCode, TollgateError> {
        self.run(req, FlowConfig::REGISTRATION).await
    }

    pub async fn issue_recovery_code(
        &self,
        req: &SmsCodeRequest,
    ) -> Result<IssuedCode, TollgateError> {
        self.run(req, FlowConfig::RECOVERY).await
    }

    pub async fn check_code(&self, req: &SmsCheckRequest) -> Result<String, TollgateError> {
        self.issuer.check(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::ChallengeVerifier;
    use crate::diagnostics::SecretSink;
    use crate::gateway::testing::{Outcome, ScriptedGateway};
    use crate::registry::{Lookup, MemoryUserRegistry};
    use crate::store::{CacheStore, MemoryStore};
    use std::sync::Arc;
    use std::time::Duration;
    use proptest::prelude::*;
    use tollgate_common::constants::cache_keys;

    const CHALLENGE_ID: &str = "9e2b4c1a-7d3f-4e8b-a6c5-1f0d2b3c4e5f";
    const MOBILE: &str = "13800000000";
    const MEMBER_MOBILE: &str = "13900000001";

    struct Fixture {
        store: Arc<MemoryStore>,
        gateway: Arc<ScriptedGateway>,
        flows: VerificationFlows,
    }

    async fn fixture(outcome: Outcome) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store
            .set_with_ttl(&cache_keys::image_code(CHALLENGE_ID), "X7K9", Duration::from_secs(300))
            .await
            .unwrap();

        let registry = MemoryUserRegistry::default();
        registry.add_user("member_01", MEMBER_MOBILE);

        let gateway = Arc::new(ScriptedGateway::with_outcome(outcome));

        let gate = ValidationGate::new(
            Lookup::new(Arc::new(registry)),
            Arc::new(ChallengeVerifier::new(store.clone())),
            4,
        );
        let issuer = SmsCodeIssuer::new(
            store.clone(),
            gateway.clone(),
            SmsSettings {
                code_length: 6,
                code_ttl: Duration::from_secs(300),
                resend_interval: Duration::from_secs(60),
                template_id: "1".to_string(),
                expiry_minutes: 5,
            },
            SecretSink::disabled(),
        );

        Fixture {
            store,
            gateway,
            flows: VerificationFlows::new(gate, issuer),
        }
    }

    fn request(mobile: &str, text: &str) -> SmsCodeRequest {
        SmsCodeRequest {
            mobile: Some(mobile.to_string()),
            image_code_id: Some(CHALLENGE_ID.to_string()),
            text: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_registration_scenario() {
        let f = fixture(Outcome::Result(0)).await;

        let issued = f
            .flows
            .issue_registration_code(&request(MOBILE, "x7k9"))
            .await
            .unwrap();
        assert!(issued.dispatched);

        let code_key = cache_keys::sms_code(MOBILE);
        let code = f.store.get(&code_key).await.unwrap().unwrap();
        assert_eq!(code.len(), 6);
        assert!(f.store.ttl_of(&code_key).unwrap() > Duration::from_secs(290));

        let err = f
            .flows
            .issue_registration_code(&request(MOBILE, "x7k9"))
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::RateLimited));

        let checked = f
            .flows
            .check_code(&SmsCheckRequest {
                mobile: Some(MOBILE.to_string()),
                sms_code: Some(code),
            })
            .await
            .unwrap();
        assert_eq!(checked, MOBILE);
    }

    #[tokio::test]
    async fn test_registration_rejected_by_gateway_keeps_code() {
        let f = fixture(Outcome::Result(1)).await;

        let err = f
            .flows
            .issue_registration_code(&request(MOBILE, "X7K9"))
            .await
            .unwrap_err();

        assert!(matches!(err, TollgateError::GatewayRejected(1)));
        assert!(f.store.exists(&cache_keys::sms_code(MOBILE)).await.unwrap());
    }

    #[tokio::test]
    async fn test_recovery_requires_member_and_skips_dispatch() {
        let f = fixture(Outcome::Result(0)).await;

        let err = f
            .flows
            .issue_recovery_code(&request(MOBILE, "X7K9"))
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::NotRegistered));

        let issued = f
            .flows
            .issue_recovery_code(&request(MEMBER_MOBILE, "X7K9"))
            .await
            .unwrap();
        assert!(!issued.dispatched);
        assert!(f.gateway.sent().is_empty());
        assert!(f.store.exists(&cache_keys::sms_code(MEMBER_MOBILE)).await.unwrap());
    }

    #[tokio::test]
    async fn test_registration_refuses_member_mobile() {
        let f = fixture(Outcome::Result(0)).await;

        let err = f
            .flows
            .issue_registration_code(&request(MEMBER_MOBILE, "X7K9"))
            .await
            .unwrap_err();

        assert!(matches!(err, TollgateError::AlreadyRegistered));
        assert!(!f.store.exists(&cache_keys::sms_flag(MEMBER_MOBILE)).await.unwrap());
    }

    #[tokio::test]
    async fn test_rate_limit_reported_after_gate_passes() {
        let f = fixture(Outcome::Result(0)).await;
        f.store
            .set_with_ttl(&cache_keys::sms_flag(MOBILE), "1", Duration::from_secs(60))
            .await
            .unwrap();

        // A wrong answer still fails on the gate before the marker is consulted.
        let err = f
            .flows
            .issue_registration_code(&request(MOBILE, "ZZZZ"))
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::ChallengeExpiredOrWrong));

        let err = f
            .flows
            .issue_registration_code(&request(MOBILE, "X7K9"))
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::RateLimited));
        assert!(f.gateway.sent().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn test_any_new_mobile_gets_one_code_per_window(mobile in "1[3-9][0-9]{9}") {
            prop_assume!(mobile != MEMBER_MOBILE);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let (first, second, sends, stored) = runtime.block_on(async {
                let f = fixture(Outcome::Result(0)).await;
                let first = f.flows.issue_registration_code(&request(&mobile, "X7K9")).await;
                let second = f.flows.issue_registration_code(&request(&mobile, "x7k9")).await;
                let stored = f.store.get(&cache_keys::sms_code(&mobile)).await.unwrap();
                (first, second, f.gateway.sent().len(), stored)
            });

            prop_assert!(first.is_ok());
            prop_assert!(matches!(second, Err(TollgateError::RateLimited)));
            prop_assert_eq!(sends, 1);
            prop_assert!(stored.is_some_and(|code| code.len() == 6));
        }
    }
}
