//! Registry client for an accounts service exposing count endpoints.
//!
//! `GET {base_url}/mobiles/{mobile}/` and `GET {base_url}/usernames/{name}/`
//! answer `{"count": n}`, optionally wrapped in a `{"data": …}` envelope.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{RegistryError, UserRegistry};

#[derive(Deserialize)]
struct Count {
    count: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountBody {
    Bare(Count),
    Wrapped { data: Count },
}

impl CountBody {
    fn count(&self) -> u64 {
        match self {
            Self::Bare(c) | Self::Wrapped { data: c } => c.count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpUserRegistry {
    base_url: String,
    client: Client,
}

impl HttpUserRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn count(&self, kind: &str, value: &str) -> Result<u64, RegistryError> {
        let url = format!("{}/{}/{}/", self.base_url, kind, value);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::InvalidResponse(format!("HTTP {status} from {url}")));
        }

        let body: CountBody = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        Ok(body.count())
    }
}

#[async_trait]
impl UserRegistry for HttpUserRegistry {
    async fn exists_by_mobile(&self, mobile: &str) -> Result<bool, RegistryError> {
        Ok(self.count("mobiles", mobile).await? > 0)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RegistryError> {
        Ok(self.count("usernames", username).await? > 0)
    }
}
