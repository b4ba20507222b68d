//! Opt-in sink for plaintext verification secrets.
//!
//! Off by default. When enabled, answers and codes are emitted at `debug` on
//! the `tollgate::secrets` target only, so they can be routed away from (or
//! filtered out of) the main log stream with `RUST_LOG`.

pub const SECRETS_TARGET: &str = "tollgate::secrets";

#[derive(Debug, Clone, Copy, Default)]
pub struct SecretSink {
    enabled: bool,
}

impl SecretSink {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a freshly issued secret
    pub fn record(&self, kind: &'static str, subject: &str, secret: &str) {
        if !self.enabled {
            return;
        }
        tracing::debug!(
            target: SECRETS_TARGET,
            kind,
            subject = %subject,
            secret = %secret,
            "Issued verification secret"
        );
    }
}
