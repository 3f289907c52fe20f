//! Sensor deployments.

use mitwelten_explore_api_models::{Deployment, LatLon};
use serde_json::Value;

use crate::{ApiRequest, CacheDomain, ExploreApi, fetch, or_log};

/// Deployments, optionally restricted to one id and to node types
/// containing `type_query`.
pub async fn deployments(
    api: &dyn ExploreApi,
    type_query: Option<&str>,
    deployment_id: Option<i64>,
) -> Vec<Deployment> {
    let request = ApiRequest::data(CacheDomain::Deployments, "deployments");
    let all: Vec<Deployment> = or_log(fetch(api, request).await, "Deployments").unwrap_or_default();
    all.into_iter()
        .filter(|d| deployment_id.is_none_or(|id| d.deployment_id == id))
        .filter(|d| type_query.is_none_or(|q| d.matches_type(q)))
        .collect()
}

pub async fn deployment_location(api: &dyn ExploreApi, deployment_id: i64) -> Option<LatLon> {
    deployments(api, None, Some(deployment_id))
        .await
        .into_iter()
        .next()
        .and_then(|d| d.location)
}

pub async fn deployment_info(api: &dyn ExploreApi, deployment_id: i64) -> Option<Value> {
    let request = ApiRequest::data(CacheDomain::Deployments, format!("deployment/{deployment_id}"));
    or_log(api.request(request).await, "Deployment info")
}
