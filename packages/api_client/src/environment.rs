//! Environment characterisation entries.

use serde_json::Value;

use crate::{ApiRequest, CacheDomain, ExploreApi, fetch, or_log};

pub async fn legend(api: &dyn ExploreApi) -> Option<Value> {
    let request = ApiRequest::data(CacheDomain::Environment, "environment/legend");
    or_log(api.request(request).await, "Environment legend")
}

pub async fn entries(api: &dyn ExploreApi) -> Vec<Value> {
    let request = ApiRequest::data(CacheDomain::Environment, "environment/entries");
    or_log(fetch(api, request).await, "Environment entries").unwrap_or_default()
}

pub async fn attribute(api: &dyn ExploreApi, attribute_id: &str) -> Option<Value> {
    let request = ApiRequest::data(
        CacheDomain::Environment,
        format!("environment/attribute/{attribute_id}"),
    );
    or_log(api.request(request).await, "Environment attribute")
}

/// The `limit` entries closest to a position.
pub async fn nearest(api: &dyn ExploreApi, lat: f64, lon: f64, limit: u32) -> Vec<Value> {
    let request = ApiRequest::data(CacheDomain::Environment, "environment/nearest")
        .arg("lat", Some(lat))
        .arg("lon", Some(lon))
        .arg("limit", Some(limit));
    or_log(fetch(api, request).await, "Nearest environment entries").unwrap_or_default()
}
