//! Outage breaker for the upstream API.
//!
//! After the API answers with a 5xx status, a flag with a fixed expiry is written
//! to an [`OutageStore`]. While the flag exists every call site short-circuits
//! with [`ApiError::ApiUnavailable`] instead of waiting out a doomed request.
//! The flag is never cleared explicitly; its absence is the healthy state.

use crate::api::ApiError;
use async_trait::async_trait;
use log::{error, warn};
use mockall::automock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod database;
pub mod memory;

pub use database::DatabaseOutageStore;
pub use memory::InMemoryOutageStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store with per-key expiry.
#[automock]
#[async_trait]
pub trait OutageStore: Send + Sync {
    /// Sets `key`, replacing any previous expiry with `ttl` from now.
    async fn set_with_ttl(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;
    /// Whole seconds until `key` expires, or `None` when the key is absent.
    async fn remaining_ttl(&self, key: &str) -> Result<Option<u64>, StoreError>;
}

#[derive(Clone)]
pub struct OutageBreaker {
    store: Arc<dyn OutageStore>,
    key: String,
    window: Duration,
}

impl OutageBreaker {
    pub fn new(store: Arc<dyn OutageStore>, key: impl Into<String>, window: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn record_outage(&self) {
        if let Err(e) = self.store.set_with_ttl(&self.key, self.window).await {
            error!("Failed to record API outage under '{}': {}", self.key, e);
        }
    }

    /// Fails with [`ApiError::ApiUnavailable`] while the outage flag is set.
    ///
    /// Store failures are logged and treated as healthy.
    pub async fn check_healthy(&self) -> Result<(), ApiError> {
        match self.remaining().await {
            Some(remaining) => Err(ApiError::ApiUnavailable(remaining)),
            None => Ok(()),
        }
    }

    pub async fn remaining(&self) -> Option<u64> {
        match self.store.remaining_ttl(&self.key).await {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(
                    "Could not read outage flag '{}', assuming the API is up: {}",
                    self.key, e
                );
                None
            }
        }
    }
}
