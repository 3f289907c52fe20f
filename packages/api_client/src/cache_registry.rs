//! Compile-time registry of response cache domains.
//!
//! Every upstream domain caches its responses for its own time to live.
//! The settings live in TOML files under `caches/`, embedded at compile
//! time and exposed through [`all_caches`] and [`CacheDomain::settings`].

use std::time::Duration;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Upstream domains with their own cache lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum CacheDomain {
    Birds,
    Gbif,
    Pollinators,
    Deployments,
    ThirdParty,
    Meteo,
    Environment,
    Taxonomy,
    Sensordata,
}

/// Cache settings of one domain.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Matches the snake case name of a [`CacheDomain`].
    pub id: String,
    pub name: String,
    pub ttl_seconds: u64,
}

impl CacheSettings {
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

const CACHE_TOMLS: &[(&str, &str)] = &[
    ("birds", include_str!("../caches/birds.toml")),
    ("gbif", include_str!("../caches/gbif.toml")),
    ("pollinators", include_str!("../caches/pollinators.toml")),
    ("deployments", include_str!("../caches/deployments.toml")),
    ("third_party", include_str!("../caches/third_party.toml")),
    ("meteo", include_str!("../caches/meteo.toml")),
    ("environment", include_str!("../caches/environment.toml")),
    ("taxonomy", include_str!("../caches/taxonomy.toml")),
    ("sensordata", include_str!("../caches/sensordata.toml")),
];

/// Lifetime used for a domain without registry entry.
const FALLBACK_TTL_SECONDS: u64 = 15 * 60;

/// Returns the settings of every cache domain.
///
/// # Panics
///
/// Panics if an embedded TOML file is malformed.
#[must_use]
pub fn all_caches() -> Vec<CacheSettings> {
    CACHE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse cache settings '{name}': {e}"))
        })
        .collect()
}

impl CacheDomain {
    /// Registry settings of this domain.
    #[must_use]
    pub fn settings(self) -> CacheSettings {
        all_caches()
            .into_iter()
            .find(|c| c.id == self.as_ref())
            .unwrap_or_else(|| CacheSettings {
                id: self.to_string(),
                name: self.to_string(),
                ttl_seconds: FALLBACK_TTL_SECONDS,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn loads_all_caches() {
        assert_eq!(all_caches().len(), CacheDomain::iter().count());
    }

    #[test]
    fn cache_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for cache in &all_caches() {
            assert!(seen.insert(cache.id.clone()), "Duplicate cache ID: {}", cache.id);
        }
    }

    #[test]
    fn every_domain_is_registered() {
        let ids: BTreeSet<String> = all_caches().into_iter().map(|c| c.id).collect();
        for domain in CacheDomain::iter() {
            assert!(ids.contains(domain.as_ref()), "{domain} has no cache settings");
        }
    }

    #[test]
    fn lifetimes() {
        assert_eq!(CacheDomain::Birds.settings().ttl(), Duration::from_secs(7200));
        assert_eq!(CacheDomain::Meteo.settings().ttl(), Duration::from_secs(3600));
        assert_eq!(CacheDomain::Sensordata.settings().ttl(), Duration::from_secs(1800));
        assert_eq!(CacheDomain::ThirdParty.settings().ttl(), Duration::from_secs(7200));
    }
}
