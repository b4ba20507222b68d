//! Image challenge issuance.
//!
//! Draws random text, renders it, and records the answer in the cache under
//! the client-supplied challenge id.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use tollgate_common::TollgateError;
use tollgate_common::constants::cache_keys;

use super::render::{CaptchaRenderer, RenderedImage};
use crate::diagnostics::SecretSink;
use crate::store::CacheStore;
use crate::verification::fields;

/// CAPTCHA issuer service
pub struct ChallengeIssuer {
    store: Arc<dyn CacheStore>,
    renderer: CaptchaRenderer,
    text_length: usize,
    /// Challenge TTL
    pub challenge_ttl: Duration,
    secrets: SecretSink,
}

impl ChallengeIssuer {
    pub fn new(
        store: Arc<dyn CacheStore>,
        renderer: CaptchaRenderer,
        text_length: usize,
        challenge_ttl: Duration,
        secrets: SecretSink,
    ) -> Self {
        Self {
            store,
            renderer,
            text_length,
            challenge_ttl,
            secrets,
        }
    }

    /// Issue a challenge for `challenge_id` and return its image.
    ///
    /// Re-issuing for the same id overwrites the previous answer.
    pub async fn issue(&self, challenge_id: &str) -> Result<RenderedImage, TollgateError> {
        let challenge_id = fields::parse_challenge_id(challenge_id)
            .map_err(TollgateError::InvalidInput)?;

        let text = self.generate_text();
        let image = self.renderer.render(&text);

        self.store
            .set_with_ttl(&cache_keys::image_code(&challenge_id), &text, self.challenge_ttl)
            .await?;

        self.secrets.record("image_code", &challenge_id, &text);

        tracing::debug!(
            challenge_id = %challenge_id,
            content_type = image.content_type,
            "Generated CAPTCHA challenge"
        );

        Ok(image)
    }

    /// Random uppercase alphanumeric answer
    fn generate_text(&self) -> String {
        let mut rng = rand::rng();
        (0..self.text_length)
            .map(|_| {
                let idx = rng.random_range(0..36u8);
                if idx < 10 {
                    (b'0' + idx) as char
                } else {
                    (b'A' + idx - 10) as char
                }
            })
            .collect()
    }
}
