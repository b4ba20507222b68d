//! SMS delivery gateways.
//!
//! A gateway answers `0` when it accepted a message for delivery and any
//! other code when it refused it. Failing to reach the gateway at all is an
//! `Err`, kept separate from a refusal.

mod http;

pub use http::{HttpGatewayOptions, HttpSmsGateway};

use async_trait::async_trait;
use thiserror::Error;

use tollgate_common::constants::GATEWAY_ACCEPTED;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Template-based SMS sender
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `params` substituted into the pre-approved `template_id`.
    async fn send_template(
        &self,
        mobile: &str,
        params: &[String],
        template_id: &str,
    ) -> Result<i64, GatewayError>;
}

/// Gateway for development: logs the send and reports it accepted.
///
/// Template parameters are not logged; they hold the code itself.
#[derive(Debug, Default)]
pub struct LogSmsGateway;

#[async_trait]
impl SmsGateway for LogSmsGateway {
    async fn send_template(
        &self,
        mobile: &str,
        params: &[String],
        template_id: &str,
    ) -> Result<i64, GatewayError> {
        tracing::info!(
            mobile = %mobile,
            template_id = %template_id,
            params = params.len(),
            "SMS send (log gateway)"
        );
        Ok(GATEWAY_ACCEPTED)
    }
}
