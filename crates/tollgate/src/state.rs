//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::captcha::{CaptchaRenderer, ChallengeIssuer, ChallengeVerifier};
use crate::config::{AppConfig, GatewayKind, RegistryKind, StoreKind};
use crate::diagnostics::SecretSink;
use crate::gateway::{HttpGatewayOptions, HttpSmsGateway, LogSmsGateway, SmsGateway};
use crate::registry::{HttpUserRegistry, Lookup, MemoryUserRegistry, UserRegistry};
use crate::store::{CacheStore, MemoryStore, RedisStore};
use crate::verification::{SmsCodeIssuer, ValidationGate, VerificationFlows};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Shared cache (Redis in production)
    pub store: Arc<dyn CacheStore>,

    /// Username / mobile existence lookups
    pub lookup: Lookup,

    /// CAPTCHA issuer
    pub challenges: Arc<ChallengeIssuer>,

    /// Gate + SMS issuance flows
    pub flows: Arc<VerificationFlows>,
}

impl AppState {
    /// Create application state, connecting every external dependency
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn CacheStore> = match config.store {
            StoreKind::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
            StoreKind::Memory => {
                tracing::warn!("Using in-process memory store; state is not shared");
                Arc::new(MemoryStore::new())
            }
        };

        let gateway: Arc<dyn SmsGateway> = match config.gateway.kind {
            GatewayKind::Http => Arc::new(
                HttpSmsGateway::new(HttpGatewayOptions {
                    base_url: config.gateway.base_url.clone(),
                    account_sid: config.gateway.account_sid.clone(),
                    auth_token: config.gateway.auth_token.clone(),
                    app_id: config.gateway.app_id.clone(),
                    timeout: Duration::from_secs(config.gateway.timeout_secs),
                })
                .context("Failed to build SMS gateway client")?,
            ),
            GatewayKind::Log => {
                tracing::warn!("Using log SMS gateway; no messages will be delivered");
                Arc::new(LogSmsGateway)
            }
        };

        let registry: Arc<dyn UserRegistry> = match config.registry.kind {
            RegistryKind::Http => Arc::new(
                HttpUserRegistry::new(
                    &config.registry.base_url,
                    Duration::from_secs(config.registry.timeout_secs),
                )
                .context("Failed to build user registry client")?,
            ),
            RegistryKind::Memory => Arc::new(MemoryUserRegistry::new(
                config.registry.mobiles.iter().cloned(),
                config.registry.usernames.iter().cloned(),
            )),
        };

        let secrets = SecretSink::new(config.diagnostics.log_secrets);
        if secrets.is_enabled() {
            tracing::warn!("Secret logging enabled; disable in production");
        }

        Ok(Self::assemble(config, store, gateway, registry, secrets))
    }

    /// Wire services over already-built dependencies
    pub fn assemble(
        config: AppConfig,
        store: Arc<dyn CacheStore>,
        gateway: Arc<dyn SmsGateway>,
        registry: Arc<dyn UserRegistry>,
        secrets: SecretSink,
    ) -> Self {
        let lookup = Lookup::new(registry);
        let challenge_ttl = Duration::from_secs(config.captcha.ttl_secs);

        let challenges = Arc::new(ChallengeIssuer::new(
            store.clone(),
            CaptchaRenderer::from_font_path(config.captcha.font_path.as_deref()),
            config.captcha.text_length,
            challenge_ttl,
            secrets,
        ));

        let gate = ValidationGate::new(
            lookup.clone(),
            Arc::new(ChallengeVerifier::new(store.clone())),
            config.captcha.text_length,
        );
        let issuer = SmsCodeIssuer::new(store.clone(), gateway, config.sms.settings(), secrets);
        let flows = Arc::new(VerificationFlows::new(gate, issuer));

        Self {
            config,
            store,
            lookup,
            challenges,
            flows,
        }
    }
}
