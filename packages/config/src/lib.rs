#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Service configuration read from environment variables.

use std::num::ParseIntError;

use chrono::NaiveDate;
use mitwelten_explore_spatial::{RegionBounds, RegionBoundsError};
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Upstream data API used when `DATA_API_URL` is unset.
pub const DEFAULT_DATA_API_URL: &str = "https://data.mitwelten.org/api/v3/";

/// Prefix of the dashboard page links.
pub const DEFAULT_PATH_PREFIX: &str = "/app/";

/// Bucket width of time-of-day charts in minutes.
pub const DEFAULT_TOD_BUCKET_WIDTH: u32 = 20;

/// First day of the default time range; the deployments started in August
/// 2020.
#[must_use]
pub fn default_time_range_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 8, 1).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid number ('{value}'): {source}")]
    Number {
        name: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[error("{name} is not a valid URL ('{value}'): {source}")]
    Url {
        name: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("REGION_BOUNDS: {0}")]
    Region(#[from] RegionBoundsError),
}

/// Keycloak realm that issues the bearer tokens forwarded upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityProvider {
    pub server_url: String,
    pub client_id: String,
    pub realm_name: String,
}

impl IdentityProvider {
    /// Base URL of the realm, where clients discover the login endpoints.
    #[must_use]
    pub fn realm_url(&self) -> String {
        format!(
            "{}/realms/{}",
            self.server_url.trim_end_matches('/'),
            self.realm_name
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the data API, always ending in `/`.
    pub data_api_url: String,
    pub identity: Option<IdentityProvider>,
    /// Public origin of the dashboard, such as `https://explore.mitwelten.org`.
    pub domain_name: Option<String>,
    pub path_prefix: String,
    /// Entries of the response cache; `None` disables caching.
    pub response_cache_capacity: Option<u64>,
    pub region: RegionBounds,
    pub bind_addr: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_api_url: DEFAULT_DATA_API_URL.to_string(),
            identity: None,
            domain_name: None,
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            response_cache_capacity: None,
            region: RegionBounds::BASEL,
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`. Blank values count as
    /// unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be
    /// parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let data_api_url = match var("DATA_API_URL") {
            Some(value) => parse_base_url("DATA_API_URL", &value)?,
            None => defaults.data_api_url,
        };

        let identity = match (
            var("KC_SERVER_URL"),
            var("KC_CLIENT_ID"),
            var("KC_REALM_NAME"),
        ) {
            (Some(server_url), Some(client_id), Some(realm_name)) => Some(IdentityProvider {
                server_url,
                client_id,
                realm_name,
            }),
            (None, None, None) => None,
            _ => {
                log::warn!(
                    "Identity provider is only partially configured; \
                     set KC_SERVER_URL, KC_CLIENT_ID and KC_REALM_NAME together"
                );
                None
            }
        };

        let path_prefix = var("PATH_PREFIX").map_or(defaults.path_prefix, |p| {
            format!("/{}/", p.trim_matches('/')).replace("//", "/")
        });

        let response_cache_capacity = var("RESPONSE_CACHE_CAPACITY")
            .map(|value| parse_number::<u64>("RESPONSE_CACHE_CAPACITY", &value))
            .transpose()?
            .filter(|capacity| *capacity > 0);

        let region = var("REGION_BOUNDS")
            .map(|value| value.parse::<RegionBounds>())
            .transpose()?
            .unwrap_or(defaults.region);

        let port = var("PORT")
            .map(|value| parse_number::<u16>("PORT", &value))
            .transpose()?
            .unwrap_or(defaults.port);

        Ok(Self {
            data_api_url,
            identity,
            domain_name: var("DOMAIN_NAME").map(|d| d.trim_end_matches('/').to_string()),
            path_prefix,
            response_cache_capacity,
            region,
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
        })
    }

    /// Link to a dashboard page with the given query string, absolute when
    /// a domain is configured.
    #[must_use]
    pub fn page_link(&self, page: &str, query: &str) -> String {
        let mut link = format!(
            "{}{}{}",
            self.domain_name.as_deref().unwrap_or_default(),
            self.path_prefix,
            page.trim_start_matches('/')
        );
        if !query.is_empty() {
            link.push('?');
            link.push_str(query.trim_start_matches('?'));
        }
        link
    }
}

fn parse_number<T: std::str::FromStr<Err = ParseIntError>>(
    name: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|source| ConfigError::Number {
        name,
        value: value.to_string(),
        source,
    })
}

fn parse_base_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    let url = Url::parse(value).map_err(|source| ConfigError::Url {
        name,
        value: value.to_string(),
        source,
    })?;
    let mut base = url.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.data_api_url, DEFAULT_DATA_API_URL);
        assert_eq!(config.region, RegionBounds::BASEL);
        assert_eq!(config.port, 8080);
        assert!(config.response_cache_capacity.is_none());
    }

    #[test]
    fn reads_all_variables() {
        let config = config(&[
            ("DATA_API_URL", "http://localhost:8000/api/v3"),
            ("KC_SERVER_URL", "https://auth.mitwelten.org/auth/"),
            ("KC_CLIENT_ID", "explore"),
            ("KC_REALM_NAME", "mitwelten"),
            ("DOMAIN_NAME", "https://explore.mitwelten.org/"),
            ("PATH_PREFIX", "dash"),
            ("RESPONSE_CACHE_CAPACITY", "5000"),
            ("REGION_BOUNDS", "5.9,45.8,10.5,47.8"),
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "9000"),
        ])
        .unwrap();

        assert_eq!(config.data_api_url, "http://localhost:8000/api/v3/");
        assert_eq!(
            config.identity.as_ref().map(IdentityProvider::realm_url).as_deref(),
            Some("https://auth.mitwelten.org/auth/realms/mitwelten")
        );
        assert_eq!(config.path_prefix, "/dash/");
        assert_eq!(config.response_cache_capacity, Some(5000));
        assert!((config.region.east - 10.5).abs() < f64::EPSILON);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.page_link("viz/timeseries", "?bucket=1d"),
            "https://explore.mitwelten.org/dash/viz/timeseries?bucket=1d"
        );
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let config = config(&[("RESPONSE_CACHE_CAPACITY", "0")]).unwrap();
        assert!(config.response_cache_capacity.is_none());
    }

    #[test]
    fn partial_identity_is_ignored() {
        let config = config(&[("KC_SERVER_URL", "https://auth.example.org")]).unwrap();
        assert!(config.identity.is_none());
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            config(&[("PORT", "eighty")]),
            Err(ConfigError::Number { name: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("REGION_BOUNDS", "1,2")]),
            Err(ConfigError::Region(_))
        ));
        assert!(matches!(
            config(&[("DATA_API_URL", "not a url")]),
            Err(ConfigError::Url { .. })
        ));
    }

    #[test]
    fn relative_page_link() {
        let config = AppConfig::default();
        assert_eq!(config.page_link("/annotations", ""), "/app/annotations");
        assert_eq!(default_time_range_start().to_string(), "2020-08-01");
    }
}
