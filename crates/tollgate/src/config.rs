//! Configuration management for Tollgate.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use tollgate_common::constants::{
    DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL, IMAGE_CODE_LENGTH, IMAGE_CODE_TTL_SECS,
    SEND_SMS_CODE_INTERVAL_SECS, SMS_CODE_EXPIRY_MINUTES, SMS_CODE_LENGTH, SMS_CODE_TEMPLATE_ID,
    SMS_CODE_TTL_SECS,
};

use crate::verification::SmsSettings;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Cache backend
    #[serde(default)]
    pub store: StoreKind,

    /// CAPTCHA configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// SMS code configuration
    #[serde(default)]
    pub sms: SmsConfig,

    /// SMS gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// User registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Diagnostic output
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Redis,
    Memory,
}

/// CAPTCHA-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Path to a TrueType font; SVG output is used without one
    #[serde(default)]
    pub font_path: Option<String>,

    /// Characters per challenge
    #[serde(default = "default_text_length")]
    pub text_length: usize,

    /// Challenge validity in seconds
    #[serde(default = "default_image_code_ttl")]
    pub ttl_secs: u64,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            text_length: default_text_length(),
            ttl_secs: default_image_code_ttl(),
        }
    }
}

/// SMS code configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    /// Code validity in seconds
    #[serde(default = "default_sms_code_ttl")]
    pub code_ttl_secs: u64,

    /// Minimum seconds between two codes for one mobile
    #[serde(default = "default_resend_interval")]
    pub resend_interval_secs: u64,

    /// Digits per code
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Gateway template id
    #[serde(default = "default_template_id")]
    pub template_id: String,

    /// Expiry quoted to the user in the SMS text
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_sms_code_ttl(),
            resend_interval_secs: default_resend_interval(),
            code_length: default_code_length(),
            template_id: default_template_id(),
            expiry_minutes: default_expiry_minutes(),
        }
    }
}

impl SmsConfig {
    pub fn settings(&self) -> SmsSettings {
        SmsSettings {
            code_length: self.code_length,
            code_ttl: Duration::from_secs(self.code_ttl_secs),
            resend_interval: Duration::from_secs(self.resend_interval_secs),
            template_id: self.template_id.clone(),
            expiry_minutes: self.expiry_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Http,
    #[default]
    Log,
}

/// SMS gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub kind: GatewayKind,

    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub auth_token: String,

    #[serde(default)]
    pub app_id: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::default(),
            base_url: String::new(),
            account_sid: String::new(),
            auth_token: String::new(),
            app_id: String::new(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Http,
    #[default]
    Memory,
}

/// User registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub kind: RegistryKind,

    /// Accounts service base URL (http kind)
    #[serde(default)]
    pub base_url: String,

    /// Seed mobiles (memory kind)
    #[serde(default)]
    pub mobiles: Vec<String>,

    /// Seed usernames (memory kind)
    #[serde(default)]
    pub usernames: Vec<String>,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::default(),
            base_url: String::new(),
            mobiles: Vec::new(),
            usernames: Vec::new(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsConfig {
    /// Emit issued answers and codes on the `tollgate::secrets` target.
    /// Never enable in production.
    #[serde(default)]
    pub log_secrets: bool,
}

// Default value functions
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_text_length() -> usize { IMAGE_CODE_LENGTH }
fn default_image_code_ttl() -> u64 { IMAGE_CODE_TTL_SECS }
fn default_sms_code_ttl() -> u64 { SMS_CODE_TTL_SECS }
fn default_resend_interval() -> u64 { SEND_SMS_CODE_INTERVAL_SECS }
fn default_code_length() -> usize { SMS_CODE_LENGTH }
fn default_template_id() -> String { SMS_CODE_TEMPLATE_ID.to_string() }
fn default_expiry_minutes() -> u64 { SMS_CODE_EXPIRY_MINUTES }
fn default_http_timeout() -> u64 { 10 }

fn environment() -> config::Environment {
    config::Environment::with_prefix("TOLLGATE")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = Self::from_sources(config_path, environment())?;

        // Apply CLI overrides
        if let Some(ref redis_url) = args.redis_url {
            config.redis_url = redis_url.clone();
        }
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if args.memory_store {
            config.store = StoreKind::Memory;
        }

        config.sanitize();
        config.check_required()?;

        Ok(config)
    }

    /// Merge the optional file with `TOLLGATE__SECTION__KEY` variables
    fn from_sources(config_path: &str, env: config::Environment) -> Result<Self> {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found, using defaults and environment");
        }

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(env)
            .build()
            .context("Failed to load config file")?;

        settings
            .try_deserialize()
            .context("Failed to parse config")
    }

    /// Replace out-of-range values with defaults, logging each replacement
    pub fn sanitize(&mut self) {
        if self.captcha.text_length == 0 {
            tracing::warn!("captcha.text_length must be positive, using default");
            self.captcha.text_length = default_text_length();
        }
        if self.captcha.ttl_secs == 0 {
            tracing::warn!("captcha.ttl_secs must be positive, using default");
            self.captcha.ttl_secs = default_image_code_ttl();
        }
        if !(1..=18).contains(&self.sms.code_length) {
            tracing::warn!(
                code_length = self.sms.code_length,
                "sms.code_length must be 1-18, using default"
            );
            self.sms.code_length = default_code_length();
        }
        if self.sms.code_ttl_secs == 0 {
            tracing::warn!("sms.code_ttl_secs must be positive, using default");
            self.sms.code_ttl_secs = default_sms_code_ttl();
        }
        if self.sms.resend_interval_secs == 0 {
            tracing::warn!("sms.resend_interval_secs must be positive, using default");
            self.sms.resend_interval_secs = default_resend_interval();
        }

        // A marker that outlives the code blocks a user whose code has
        // already expired; allowed, but almost never intended.
        if self.sms.resend_interval_secs > self.sms.code_ttl_secs {
            tracing::warn!(
                resend_interval_secs = self.sms.resend_interval_secs,
                code_ttl_secs = self.sms.code_ttl_secs,
                "Resend interval is longer than code validity"
            );
        }
    }

    /// Fail on settings that have no usable default
    fn check_required(&self) -> Result<()> {
        if self.gateway.kind == GatewayKind::Http {
            anyhow::ensure!(
                !self.gateway.base_url.is_empty() && !self.gateway.account_sid.is_empty(),
                "gateway.base_url and gateway.account_sid are required for the http gateway"
            );
        }
        if self.registry.kind == RegistryKind::Http {
            anyhow::ensure!(
                !self.registry.base_url.is_empty(),
                "registry.base_url is required for the http registry"
            );
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            listen_addr: default_listen_addr(),
            store: StoreKind::default(),
            captcha: CaptchaConfig::default(),
            sms: SmsConfig::default(),
            gateway: GatewayConfig::default(),
            registry: RegistryConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}
