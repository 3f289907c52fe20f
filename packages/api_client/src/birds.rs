//! Bird detections of the Mitwelten audio deployments.

use mitwelten_explore_api_models::{DetectionLocation, TimeOfDay, TimeSeries};
use serde_json::Value;

use crate::{ApiRequest, CacheDomain, ExploreApi, TimeRange, fetch, or_log};

/// Detections per time bucket.
pub async fn detection_dates(
    api: &dyn ExploreApi,
    taxon_id: i64,
    confidence: Option<f64>,
    bucket_width: &str,
    range: TimeRange,
) -> Option<TimeSeries> {
    let request = ApiRequest::data(CacheDomain::Birds, format!("birds/{taxon_id}/date"))
        .arg("bucket_width", Some(bucket_width))
        .arg("conf", confidence)
        .time_range(range);
    or_log(fetch(api, request).await, "Bird detection dates")
}

/// Detections per deployment location.
pub async fn detection_locations(
    api: &dyn ExploreApi,
    taxon_id: i64,
    confidence: Option<f64>,
    range: TimeRange,
    distinct_species: bool,
    deployment_ids: &[i64],
) -> Option<Vec<DetectionLocation>> {
    let request = ApiRequest::data(CacheDomain::Birds, format!("birds/{taxon_id}/location"))
        .arg("conf", confidence)
        .time_range(range)
        .arg("distinctspecies", Some(distinct_species))
        .repeated_arg("deployment_ids", deployment_ids);
    or_log(fetch(api, request).await, "Bird detection locations")
}

/// Detections per minute of the day.
pub async fn detection_time_of_day(
    api: &dyn ExploreApi,
    taxon_id: i64,
    confidence: Option<f64>,
    bucket_width_m: u32,
    range: TimeRange,
) -> Option<TimeOfDay> {
    let request = ApiRequest::data(CacheDomain::Birds, format!("birds/{taxon_id}/time_of_day"))
        .arg("conf", confidence)
        .arg("bucket_width_m", Some(bucket_width_m))
        .time_range(range);
    or_log(fetch(api, request).await, "Bird detection time of day")
}

/// Total number of detections.
pub async fn detection_count(
    api: &dyn ExploreApi,
    taxon_id: i64,
    confidence: Option<f64>,
    range: TimeRange,
) -> Option<f64> {
    let request = ApiRequest::data(CacheDomain::Birds, format!("birds/{taxon_id}/count"))
        .arg("conf", confidence)
        .time_range(range);
    or_log(fetch(api, request).await, "Bird detection count")
}

/// Detection counts of the species below a taxon.
pub async fn species_count_by_parent(
    api: &dyn ExploreApi,
    taxon_id: i64,
    confidence: Option<f64>,
    limit: u32,
) -> Option<Value> {
    let request = ApiRequest::data(
        CacheDomain::Birds,
        format!("species/parent_taxon/{taxon_id}/count"),
    )
    .arg("conf", confidence)
    .arg("limit", Some(limit));
    or_log(api.request(request).await, "Species counts by parent taxon")
}

/// Species detected at the given deployments.
pub async fn detection_list(
    api: &dyn ExploreApi,
    confidence: Option<f64>,
    deployment_ids: &[i64],
    range: TimeRange,
    limit: u32,
) -> Option<Value> {
    let request = ApiRequest::data(CacheDomain::Birds, "birds/detectionlist")
        .arg("conf", confidence)
        .arg("limit", Some(limit))
        .time_range(range)
        .repeated_arg("deployment_ids", deployment_ids);
    or_log(api.request(request).await, "Bird detection list")
}
