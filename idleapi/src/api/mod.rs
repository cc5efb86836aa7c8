//! Outbound pipeline for the IdleRPG public API.
//!
//! Every command reaches the API through [`Gateway::fetch`], which checks the
//! outage breaker, performs the GET and classifies the status code.

use crate::breaker::OutageBreaker;
use async_trait::async_trait;
use log::{debug, warn};
use mockall::automock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub mod client;
pub mod query;

pub use client::ReqwestApiClient;

/// Endpoints accepted by the passthrough query command.
pub const ENDPOINTS: [&str; 12] = [
    "allitems",
    "children",
    "guild",
    "helpme",
    "inventory",
    "loot",
    "market",
    "pets",
    "profile",
    "server",
    "transactions",
    "user_settings",
];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("The API is down, retry in {0} seconds")]
    ApiUnavailable(u64),
    #[error("The API answered with server error {0}")]
    UpstreamServerError(u16),
    #[error("The API rate limit was hit")]
    RateLimited,
    #[error("The API answered with status {status}")]
    UpstreamClientError { status: u16, body: Option<Value> },
    #[error("Could not reach the API: {0}")]
    Transport(String),
    #[error("Could not decode the API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Could not set up the HTTP client: {0}")]
    Setup(String),
}

impl ApiError {
    /// The message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::ApiUnavailable(remaining) => format!(
                "The API returned a 5XX error code. This means it is currently not available. \
                 Please try again in {remaining} seconds."
            ),
            ApiError::UpstreamServerError(_) => {
                "The API returned a 5XX error code. This means it is currently not available. \
                 Please try again in one hour."
                    .to_string()
            }
            ApiError::RateLimited => {
                "429: Too many requests. The API only allows three requests per ten seconds."
                    .to_string()
            }
            ApiError::UpstreamClientError { status, .. } => {
                format!("The API rejected the request with status {status}.")
            }
            ApiError::Transport(_) => {
                "Could not reach the API right now. Please try again later.".to_string()
            }
            ApiError::Decode(_) => "The API sent a response I could not understand.".to_string(),
            ApiError::Setup(_) => "The bot is misconfigured, please report to the dev.".to_string(),
        }
    }
}

/// A completed HTTP exchange, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[automock]
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Issues an authorized GET against an absolute URL.
    async fn get(&self, url: &str) -> Result<ApiResponse, ApiError>;
}

/// Outcome of a single upstream call.
#[derive(Debug, PartialEq)]
pub enum Classification {
    Success(Value),
    ServerError(u16),
    RateLimited,
    ClientError { status: u16, body: Option<Value> },
}

pub fn classify(response: ApiResponse) -> Result<Classification, ApiError> {
    match response.status {
        200 => Ok(Classification::Success(serde_json::from_str(&response.body)?)),
        500..=599 => Ok(Classification::ServerError(response.status)),
        429 => Ok(Classification::RateLimited),
        status => Ok(Classification::ClientError {
            status,
            body: lenient_body(&response.body),
        }),
    }
}

fn lenient_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
}

pub struct Gateway {
    client: Arc<dyn ApiClient>,
    breaker: OutageBreaker,
    base_url: String,
}

impl Gateway {
    pub fn new(client: Arc<dyn ApiClient>, breaker: OutageBreaker, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client,
            breaker,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn breaker(&self) -> &OutageBreaker {
        &self.breaker
    }

    /// Joins a relative query such as `profile?user=eq.1` onto the base URL.
    pub fn url(&self, query: &str) -> String {
        if query.starts_with(&self.base_url) {
            query.to_string()
        } else {
            format!("{}{}", self.base_url, query.trim_start_matches('/'))
        }
    }

    /// Breaker check, GET, classification. A 5xx trips the breaker.
    pub async fn fetch(&self, query: &str) -> Result<Value, ApiError> {
        self.breaker.check_healthy().await?;
        let url = self.url(query);
        debug!("GET {}", url);
        let response = self.client.get(&url).await?;
        match classify(response)? {
            Classification::Success(value) => Ok(value),
            Classification::ServerError(status) => {
                warn!("API answered {} for {}, recording outage", status, url);
                self.breaker.record_outage().await;
                Err(ApiError::UpstreamServerError(status))
            }
            Classification::RateLimited => Err(ApiError::RateLimited),
            Classification::ClientError { status, body } => {
                warn!("API answered {} for {}", status, url);
                Err(ApiError::UpstreamClientError { status, body })
            }
        }
    }

    pub async fn fetch_as<T: DeserializeOwned>(&self, query: &str) -> Result<T, ApiError> {
        let value = self.fetch(query).await?;
        Ok(serde_json::from_value(value)?)
    }
}
