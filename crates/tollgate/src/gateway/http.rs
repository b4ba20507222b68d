//! HTTP template-SMS gateway.
//!
//! Talks to a cloud-communication REST API of the common "TemplateSMS" shape:
//!
//! ```text
//! POST {base_url}/2013-12-26/Accounts/{account_sid}/SMS/TemplateSMS?sig={SIG}
//! Authorization: base64("{account_sid}:{timestamp}")
//! { "to": "...", "appId": "...", "templateId": "...", "datas": [...] }
//! ```
//!
//! `SIG` is the uppercase hex SHA-256 of `account_sid + auth_token + timestamp`.
//! The provider answers `{"statusCode": "000000"}` on acceptance.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::time::Duration;

use tollgate_common::constants::GATEWAY_ACCEPTED;

use super::{GatewayError, SmsGateway};

const ACCEPTED_STATUS: &str = "000000";

/// Result code reported for a refusal whose status is not numeric
const UNPARSEABLE_STATUS: i64 = -1;

#[derive(Debug, Clone)]
pub struct HttpGatewayOptions {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub app_id: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSmsRequest<'a> {
    to: &'a str,
    app_id: &'a str,
    template_id: &'a str,
    datas: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSmsResponse {
    status_code: String,
    #[serde(default)]
    status_msg: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpSmsGateway {
    options: HttpGatewayOptions,
    client: Client,
}

impl HttpSmsGateway {
    pub fn new(options: HttpGatewayOptions) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self { options, client })
    }

    fn signature(&self, timestamp: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.options.account_sid.as_bytes());
        hasher.update(self.options.auth_token.as_bytes());
        hasher.update(timestamp.as_bytes());

        hasher
            .finalize()
            .iter()
            .fold(String::with_capacity(64), |mut out, b| {
                let _ = write!(out, "{b:02X}");
                out
            })
    }

    fn authorization(&self, timestamp: &str) -> String {
        STANDARD.encode(format!("{}:{}", self.options.account_sid, timestamp))
    }
}

/// Map the provider status string onto the gateway result code
fn result_code(status_code: &str) -> i64 {
    if status_code == ACCEPTED_STATUS {
        GATEWAY_ACCEPTED
    } else {
        match status_code.parse::<i64>() {
            Ok(GATEWAY_ACCEPTED) | Err(_) => UNPARSEABLE_STATUS,
            Ok(code) => code,
        }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send_template(
        &self,
        mobile: &str,
        params: &[String],
        template_id: &str,
    ) -> Result<i64, GatewayError> {
        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();

        let url = format!(
            "{base}/2013-12-26/Accounts/{sid}/SMS/TemplateSMS?sig={sig}",
            base = self.options.base_url.trim_end_matches('/'),
            sid = self.options.account_sid,
            sig = self.signature(&timestamp),
        );

        let body = TemplateSmsRequest {
            to: mobile,
            app_id: &self.options.app_id,
            template_id,
            datas: params,
        };

        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, self.authorization(&timestamp))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::InvalidResponse(format!("HTTP {status}: {text}")));
        }

        let parsed: TemplateSmsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let code = result_code(&parsed.status_code);
        if code != GATEWAY_ACCEPTED {
            tracing::debug!(
                status_code = %parsed.status_code,
                status_msg = ?parsed.status_msg,
                "Gateway refused template SMS"
            );
        }

        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> HttpSmsGateway {
        HttpSmsGateway::new(HttpGatewayOptions {
            base_url: "https://sms.example.com".to_string(),
            account_sid: "ACC".to_string(),
            auth_token: "TOKEN".to_string(),
            app_id: "APP".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_result_code_mapping() {
        assert_eq!(result_code("000000"), GATEWAY_ACCEPTED);
        assert_eq!(result_code("160038"), 160038);
        assert_eq!(result_code("bogus"), UNPARSEABLE_STATUS);
        // "0" is not the acceptance sentinel and must not read as success
        assert_eq!(result_code("0"), UNPARSEABLE_STATUS);
    }

    #[test]
    fn test_signature_is_uppercase_hex_sha256() {
        let sig = gateway().signature("20260101120000");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(sig, gateway().signature("20260101120000"));
        assert_ne!(sig, gateway().signature("20260101120001"));
    }

    #[test]
    fn test_authorization_header() {
        let auth = gateway().authorization("20260101120000");
        let decoded = STANDARD.decode(auth).unwrap();
        assert_eq!(decoded, b"ACC:20260101120000");
    }

    #[test]
    fn test_request_body_shape() {
        let params = vec!["004211".to_string(), "5".to_string()];
        let body = TemplateSmsRequest {
            to: "13800000000",
            app_id: "APP",
            template_id: "1",
            datas: &params,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["appId"], "APP");
        assert_eq!(value["templateId"], "1");
        assert_eq!(value["datas"][0], "004211");
    }
}
