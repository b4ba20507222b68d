//! User registry lookups.
//!
//! Accounts live elsewhere; this service only asks whether a mobile or
//! username is taken. The registry is injected, and `Lookup` wraps it with
//! input validation for the gate and the public count endpoints.

mod http;

pub use http::HttpUserRegistry;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use tollgate_common::{CountResponse, TollgateError};

use crate::verification::fields;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<RegistryError> for TollgateError {
    fn from(err: RegistryError) -> Self {
        TollgateError::RegistryUnavailable(err.to_string())
    }
}

/// Read-only existence checks against the account store
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn exists_by_mobile(&self, mobile: &str) -> Result<bool, RegistryError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, RegistryError>;
}

/// Registry held in memory, seeded from configuration or by tests
#[derive(Debug, Default)]
pub struct MemoryUserRegistry {
    mobiles: RwLock<HashSet<String>>,
    usernames: RwLock<HashSet<String>>,
}

impl MemoryUserRegistry {
    pub fn new<M, U>(mobiles: M, usernames: U) -> Self
    where
        M: IntoIterator<Item = String>,
        U: IntoIterator<Item = String>,
    {
        Self {
            mobiles: RwLock::new(mobiles.into_iter().collect()),
            usernames: RwLock::new(usernames.into_iter().collect()),
        }
    }

    #[cfg(test)]
    pub fn add_user(&self, username: &str, mobile: &str) {
        self.usernames
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(username.to_string());
        self.mobiles
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(mobile.to_string());
    }
}

#[async_trait]
impl UserRegistry for MemoryUserRegistry {
    async fn exists_by_mobile(&self, mobile: &str) -> Result<bool, RegistryError> {
        let mobiles = self.mobiles.read().unwrap_or_else(|p| p.into_inner());
        Ok(mobiles.contains(mobile))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, RegistryError> {
        let usernames = self.usernames.read().unwrap_or_else(|p| p.into_inner());
        Ok(usernames.contains(username))
    }
}

/// Validated existence lookups
#[derive(Clone)]
pub struct Lookup {
    registry: Arc<dyn UserRegistry>,
}

impl Lookup {
    pub fn new(registry: Arc<dyn UserRegistry>) -> Self {
        Self { registry }
    }

    /// `mobile` must already be structurally valid
    pub async fn exists_by_mobile(&self, mobile: &str) -> Result<bool, TollgateError> {
        Ok(self.registry.exists_by_mobile(mobile).await?)
    }

    /// `username` must already be structurally valid
    pub async fn exists_by_username(&self, username: &str) -> Result<bool, TollgateError> {
        Ok(self.registry.exists_by_username(username).await?)
    }

    pub async fn count_mobile(&self, raw: &str) -> Result<CountResponse, TollgateError> {
        let mobile = fields::validate_mobile(raw)?;
        let exists = self.exists_by_mobile(&mobile).await?;
        Ok(CountResponse {
            username: None,
            mobile: Some(mobile),
            count: u64::from(exists),
        })
    }

    pub async fn count_username(&self, raw: &str) -> Result<CountResponse, TollgateError> {
        let username = fields::validate_username(raw)?;
        let exists = self.exists_by_username(&username).await?;
        Ok(CountResponse {
            username: Some(username),
            mobile: None,
            count: u64::from(exists),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> Lookup {
        let registry = MemoryUserRegistry::default();
        registry.add_user("alice_01", "13900000001");
        Lookup::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_counts_existing_and_missing() {
        let lookup = lookup();

        assert_eq!(lookup.count_mobile("13900000001").await.unwrap().count, 1);
        assert_eq!(lookup.count_mobile("13900000002").await.unwrap().count, 0);
        assert_eq!(lookup.count_username("alice_01").await.unwrap().count, 1);
        assert_eq!(lookup.count_username("carol_02").await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_malformed_lookups_rejected() {
        let lookup = lookup();

        assert!(matches!(
            lookup.count_mobile("555").await,
            Err(TollgateError::InvalidInput(_))
        ));
        assert!(matches!(
            lookup.count_username("ab").await,
            Err(TollgateError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_seeded_registry() {
        let registry = MemoryUserRegistry::new(
            vec!["13800000000".to_string()],
            vec!["seeded_user".to_string()],
        );
        assert!(registry.exists_by_mobile("13800000000").await.unwrap());
        assert!(registry.exists_by_username("seeded_user").await.unwrap());
        assert!(!registry.exists_by_username("13800000000").await.unwrap());
    }
}
