//! Image CAPTCHA generation and verification.
//!
//! The answer lives only in the cache (`img_{challenge_id}`); the issuer
//! writes it, the verifier reads it.

mod generator;
mod render;
mod verifier;

pub use generator::ChallengeIssuer;
pub use render::CaptchaRenderer;
pub use verifier::ChallengeVerifier;
