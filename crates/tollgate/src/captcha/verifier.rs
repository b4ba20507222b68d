//! CAPTCHA answer verification.

use std::sync::Arc;

use tollgate_common::TollgateError;
use tollgate_common::constants::cache_keys;

use crate::store::CacheStore;

/// CAPTCHA verifier service
pub struct ChallengeVerifier {
    store: Arc<dyn CacheStore>,
}

impl ChallengeVerifier {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Check `text` against the stored answer for `challenge_id`.
    ///
    /// `challenge_id` must already be in canonical form. The comparison is
    /// case-insensitive. The record is left in place and stays valid until
    /// its TTL lapses.
    pub async fn verify(&self, challenge_id: &str, text: &str) -> Result<(), TollgateError> {
        let key = cache_keys::image_code(challenge_id);

        let Some(answer) = self.store.get(&key).await? else {
            tracing::debug!(challenge_id = %challenge_id, "CAPTCHA missing or expired");
            return Err(TollgateError::ChallengeExpiredOrWrong);
        };

        if !answer.eq_ignore_ascii_case(text) {
            tracing::debug!(challenge_id = %challenge_id, "CAPTCHA answer mismatch");
            return Err(TollgateError::ChallengeExpiredOrWrong);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    const CHALLENGE_ID: &str = "0b8f4a52-8a0e-4c0f-bb5e-6f5c2d0e9a31";

    async fn seeded(answer: &str) -> (Arc<MemoryStore>, ChallengeVerifier) {
        let store = Arc::new(MemoryStore::new());
        store
            .set_with_ttl(&cache_keys::image_code(CHALLENGE_ID), answer, Duration::from_secs(300))
            .await
            .unwrap();
        let verifier = ChallengeVerifier::new(store.clone());
        (store, verifier)
    }

    #[tokio::test]
    async fn test_mixed_case_answer_matches() {
        let (_, verifier) = seeded("AB3F").await;
        verifier.verify(CHALLENGE_ID, "aB3f").await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_answer_rejected() {
        let (_, verifier) = seeded("AB3F").await;
        let err = verifier.verify(CHALLENGE_ID, "AB3E").await.unwrap_err();
        assert!(matches!(err, TollgateError::ChallengeExpiredOrWrong));
    }

    #[tokio::test]
    async fn test_unknown_challenge_rejected() {
        let store = Arc::new(MemoryStore::new());
        let err = ChallengeVerifier::new(store)
            .verify(CHALLENGE_ID, "AB3F")
            .await
            .unwrap_err();
        assert!(matches!(err, TollgateError::ChallengeExpiredOrWrong));
    }

    #[tokio::test]
    async fn test_record_survives_successful_verify() {
        let (store, verifier) = seeded("AB3F").await;
        verifier.verify(CHALLENGE_ID, "ab3f").await.unwrap();
        verifier.verify(CHALLENGE_ID, "AB3F").await.unwrap();
        assert!(store.exists(&cache_keys::image_code(CHALLENGE_ID)).await.unwrap());
    }
}
