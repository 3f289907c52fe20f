#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the Mitwelten data API.
//!
//! Requests are described as [`ApiRequest`] values and executed through
//! the [`ExploreApi`] trait. [`DataApiClient`] is the HTTP implementation,
//! optionally backed by a per-domain [`ResponseCache`];
//! [`memory::MemoryApi`] answers from canned responses.
//!
//! The domain modules wrap the upstream endpoints. They never fail: an
//! unavailable upstream, a non-200 status or an unexpected body is logged
//! and turned into `None` or an empty result, so a page degrades to "no
//! data" instead of an error.

pub mod birds;
pub mod cache;
pub mod cache_registry;
pub mod communication;
pub mod deployments;
pub mod environment;
pub mod gbif;
pub mod memory;
pub mod meteo;
pub mod pollinators;
pub mod sensordata;
pub mod taxonomy;
pub mod third_party;
pub mod userdata;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use cache::{MokaResponseCache, ResponseCache};
pub use cache_registry::CacheDomain;
pub use communication::{
    ApiRequest, DataApiClient, Endpoint, Method, TimeRange, construct_url, decode_token_claims,
    user_from_token,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{method} {url} returned status {status}")]
    Status {
        method: Method,
        url: String,
        status: u16,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("invalid bearer token: {0}")]
    Token(String),
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Executes upstream requests.
#[async_trait]
pub trait ExploreApi: Send + Sync {
    /// Sends `request` and returns the JSON body of a `200` response
    /// (`null` for an empty body).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, any other status and bodies
    /// that are not JSON.
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// Sends `request` and deserializes the body.
async fn fetch<T: DeserializeOwned>(
    api: &dyn ExploreApi,
    request: ApiRequest,
) -> Result<T, ApiError> {
    let body = api.request(request).await?;
    Ok(serde_json::from_value(body)?)
}

/// Converts a failed call into `None`, logging what was attempted.
fn or_log<T>(result: Result<T, ApiError>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(ApiError::Status { status: 404, url, .. }) => {
            log::debug!("{what}: nothing at {url}");
            None
        }
        Err(e) => {
            log::warn!("{what} failed: {e}");
            None
        }
    }
}
