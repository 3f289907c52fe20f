//! Request description, URL construction and the HTTP transport.

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::NaiveDateTime;
use mitwelten_explore_api_models::AppUser;
use mitwelten_explore_config::AppConfig;
use mitwelten_explore_dataset_models::format_api_datetime;
use reqwest::StatusCode;
use serde_json::Value;
use strum_macros::{AsRefStr, Display};
use url::form_urlencoded;

use crate::{
    ApiError, ExploreApi,
    cache::{MokaResponseCache, ResponseCache, request_signature},
    cache_registry::CacheDomain,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Target of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Path relative to the data API base URL.
    Data(String),
    /// Absolute URL of a third-party service.
    External(String),
}

impl Endpoint {
    /// The path or URL without query string.
    #[must_use]
    pub fn path(&self) -> &str {
        let (Self::Data(target) | Self::External(target)) = self;
        target.split_once('?').map_or(target.as_str(), |(path, _)| path)
    }
}

/// Optional start and end of a queried period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRange {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

/// Everything needed to issue one upstream request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    /// Query arguments in order; keys may repeat.
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub token: Option<String>,
    /// Cache domain of a cacheable `GET`; `None` bypasses the cache.
    pub cache: Option<CacheDomain>,
}

impl ApiRequest {
    /// A cached `GET` of a data API path.
    #[must_use]
    pub fn data(domain: CacheDomain, path: impl Into<String>) -> Self {
        Self::new(Method::Get, Endpoint::Data(path.into()), Some(domain))
    }

    /// A cached `GET` of a third-party URL.
    #[must_use]
    pub fn external(domain: CacheDomain, url: impl Into<String>) -> Self {
        Self::new(Method::Get, Endpoint::External(url.into()), Some(domain))
    }

    /// An uncached, authorized request for user data.
    #[must_use]
    pub fn user(method: Method, path: impl Into<String>, token: &str) -> Self {
        Self::new(method, Endpoint::Data(path.into()), None).bearer(Some(token))
    }

    const fn new(method: Method, endpoint: Endpoint, cache: Option<CacheDomain>) -> Self {
        Self {
            method,
            endpoint,
            query: Vec::new(),
            body: None,
            token: None,
            cache,
        }
    }

    /// Adds a query argument unless `value` is `None`.
    #[must_use]
    pub fn arg(mut self, key: &str, value: Option<impl Display>) -> Self {
        if let Some(value) = value {
            self.query.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Adds one `key=value` pair per entry.
    #[must_use]
    pub fn repeated_arg(mut self, key: &str, values: &[impl Display]) -> Self {
        self.query
            .extend(values.iter().map(|v| (key.to_string(), v.to_string())));
        self
    }

    /// Adds `from` and `to` in API timestamp format.
    #[must_use]
    pub fn time_range(self, range: TimeRange) -> Self {
        self.arg("from", range.from.as_ref().map(format_api_datetime))
            .arg("to", range.to.as_ref().map(format_api_datetime))
    }

    #[must_use]
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.token = token.map(str::to_string);
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Full request URL for a data API at `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        let (base, target) = match &self.endpoint {
            Endpoint::Data(path) => (base_url, path.as_str()),
            Endpoint::External(url) => ("", url.as_str()),
        };
        construct_url(
            base,
            target,
            self.query.iter().map(|(k, v)| (k.as_str(), Some(v.as_str()))),
        )
    }
}

/// Joins `base` and `path` and appends the present arguments urlencoded.
///
/// Arguments whose value is `None` are dropped; without any remaining
/// argument the bare URL is returned. A path that already carries a query
/// string is extended with `&`.
#[must_use]
pub fn construct_url<K, V>(
    base: &str,
    path: &str,
    args: impl IntoIterator<Item = (K, Option<V>)>,
) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in args {
        if let Some(value) = value {
            serializer.append_pair(key.as_ref(), value.as_ref());
            any = true;
        }
    }

    let mut url = format!("{base}{path}");
    if any {
        url.push(if path.contains('?') { '&' } else { '?' });
        url.push_str(&serializer.finish());
    }
    url
}

/// Reads the claims of a JWT without verifying its signature.
///
/// The token is only forwarded upstream, which verifies it; locally the
/// claims just name the user.
///
/// # Errors
///
/// Returns [`ApiError::Token`] if the token has no payload segment or the
/// payload is not base64url-encoded JSON.
pub fn decode_token_claims(token: &str) -> Result<Value, ApiError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ApiError::Token("missing payload segment".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ApiError::Token(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// The user a bearer token was issued to, if the token is readable.
#[must_use]
pub fn user_from_token(token: &str) -> Option<AppUser> {
    match decode_token_claims(token) {
        Ok(claims) => Some(AppUser::from_claims(&claims)),
        Err(e) => {
            log::debug!("No user in token: {e}");
            None
        }
    }
}

/// HTTP transport to the data API with an optional response cache.
pub struct DataApiClient {
    http: reqwest::Client,
    base_url: String,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl DataApiClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, cache: Option<Arc<dyn ResponseCache>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            cache,
        }
    }

    /// Client for the configured data API, caching when a cache capacity
    /// is configured.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let cache = config.response_cache_capacity.map(|capacity| {
            log::info!("Response cache enabled with {capacity} entries per domain");
            Arc::new(MokaResponseCache::new(capacity)) as Arc<dyn ResponseCache>
        });
        Self::new(config.data_api_url.clone(), cache)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ExploreApi for DataApiClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = request.url(&self.base_url);
        let cache = match (request.method, request.cache, &self.cache) {
            (Method::Get, Some(domain), Some(cache)) => Some((domain, cache)),
            _ => None,
        };
        let key = request_signature(request.method.as_ref(), &url, request.token.as_deref());

        if let Some((domain, cache)) = cache
            && let Some(hit) = cache.get(domain, &key)
        {
            log::trace!("Cache hit for {url}");
            return Ok(hit);
        }

        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        };
        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        log::debug!("{} {url}", request.method);
        let response = builder.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                method: request.method,
                url,
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        if let Some((domain, cache)) = cache {
            cache.insert(domain, key, value.clone());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_urls() {
        assert_eq!(
            construct_url("https://x/api/", "birds/212/date", [("conf", Some("0.7")), ("from", None)]),
            "https://x/api/birds/212/date?conf=0.7"
        );
        assert_eq!(
            construct_url::<&str, &str>("https://x/api/", "deployments", []),
            "https://x/api/deployments"
        );
        assert_eq!(
            construct_url("", "https://w/api.php?format=json", [("titles", Some("Parus major"))]),
            "https://w/api.php?format=json&titles=Parus+major"
        );
    }

    #[test]
    fn builds_request_urls() {
        let request = ApiRequest::data(CacheDomain::Pollinators, "pollinators/date")
            .arg("pollinator_class", Some("hummel"))
            .arg("conf", Some(0.6))
            .arg("from", None::<&str>)
            .repeated_arg("deployment_ids", &[806, 807]);
        assert_eq!(
            request.url("https://x/"),
            "https://x/pollinators/date?pollinator_class=hummel&conf=0.6\
             &deployment_ids=806&deployment_ids=807"
        );
        assert_eq!(request.endpoint.path(), "pollinators/date");
        assert_eq!(request.method, Method::Get);
        assert!(request.token.is_none());
    }

    #[test]
    fn user_requests_are_uncached() {
        let request = ApiRequest::user(Method::Delete, "explore/annotations/3", "tok");
        assert!(request.cache.is_none());
        assert_eq!(request.token.as_deref(), Some("tok"));
        assert_eq!(request.method.to_string(), "DELETE");
    }

    /// Nothing listens on the discard port, so any request reaching the
    /// network fails.
    const OFFLINE_BASE: &str = "http://127.0.0.1:9/";

    #[tokio::test]
    async fn serves_cached_gets_without_network() {
        let request = ApiRequest::data(CacheDomain::Birds, "birds/212/count");
        let url = request.url(OFFLINE_BASE);
        let cache = MokaResponseCache::new(10);
        cache.insert(
            CacheDomain::Birds,
            request_signature("GET", &url, None),
            serde_json::json!(42),
        );
        let client = DataApiClient::new(OFFLINE_BASE, Some(Arc::new(cache)));

        assert_eq!(client.request(request.clone()).await.unwrap(), serde_json::json!(42));

        let other_token = request.clone().bearer(Some("other"));
        assert!(matches!(client.request(other_token).await, Err(ApiError::Http(_))));

        let post = ApiRequest {
            method: Method::Post,
            ..request.clone()
        };
        assert!(matches!(client.request(post).await, Err(ApiError::Http(_))));

        let uncached = ApiRequest {
            cache: None,
            ..request.clone()
        };
        assert!(matches!(client.request(uncached).await, Err(ApiError::Http(_))));

        let without_cache = DataApiClient::new(OFFLINE_BASE, None);
        assert!(matches!(without_cache.request(request).await, Err(ApiError::Http(_))));
    }

    #[test]
    fn decodes_token_claims() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"f3a1","preferred_username":"jdoe","name":"Jane Doe"}"#);
        let token = format!("eyJhbGciOiJSUzI1NiJ9.{payload}.signature");
        let user = user_from_token(&token).unwrap();
        assert_eq!(user.username.as_deref(), Some("jdoe"));
        assert_eq!(user.initials, "JD");

        assert!(user_from_token("not-a-token").is_none());
        assert!(matches!(decode_token_claims("a.!!!.c"), Err(ApiError::Token(_))));
    }
}
