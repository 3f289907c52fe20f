//! An [`ExploreApi`] answering from canned responses.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{ApiError, ApiRequest, ExploreApi};

/// Serves fixed bodies by request path (query ignored) and records every
/// request it receives. Unknown paths answer `404`.
#[derive(Debug, Default)]
pub struct MemoryApi {
    responses: HashMap<String, Value>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MemoryApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests for `path` with `body`.
    #[must_use]
    pub fn with(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), body);
        self
    }

    /// Requests received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Relative URLs (path and query) of the requests received so far.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.url("")).collect()
    }
}

#[async_trait]
impl ExploreApi for MemoryApi {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let response = self.responses.get(request.endpoint.path()).cloned();
        let (method, url) = (request.method, request.url(""));
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        response.ok_or(ApiError::Status {
            method,
            url,
            status: 404,
        })
    }
}
