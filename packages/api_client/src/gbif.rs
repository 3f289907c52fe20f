//! Cached GBIF occurrences of a taxon.

use mitwelten_explore_api_models::{DetectionLocation, TimeOfDay, TimeSeries};
use serde_json::Value;

use crate::{ApiRequest, CacheDomain, ExploreApi, TimeRange, fetch, or_log};

pub async fn detection_dates(
    api: &dyn ExploreApi,
    taxon_id: i64,
    bucket_width: &str,
    range: TimeRange,
) -> Option<TimeSeries> {
    let request = ApiRequest::data(CacheDomain::Gbif, format!("gbif/{taxon_id}/date"))
        .arg("bucket_width", Some(bucket_width))
        .time_range(range);
    or_log(fetch(api, request).await, "GBIF occurrence dates")
}

pub async fn detection_locations(
    api: &dyn ExploreApi,
    taxon_id: i64,
    range: TimeRange,
) -> Option<Vec<DetectionLocation>> {
    let request = ApiRequest::data(CacheDomain::Gbif, format!("gbif/{taxon_id}/location"))
        .time_range(range);
    or_log(fetch(api, request).await, "GBIF occurrence locations")
}

pub async fn detection_time_of_day(
    api: &dyn ExploreApi,
    taxon_id: i64,
    bucket_width_m: u32,
    range: TimeRange,
) -> Option<TimeOfDay> {
    let request = ApiRequest::data(CacheDomain::Gbif, format!("gbif/{taxon_id}/time_of_day"))
        .arg("bucket_width_m", Some(bucket_width_m))
        .time_range(range);
    or_log(fetch(api, request).await, "GBIF occurrence time of day")
}

pub async fn detection_count(api: &dyn ExploreApi, taxon_id: i64, range: TimeRange) -> Option<f64> {
    let request = ApiRequest::data(CacheDomain::Gbif, format!("gbif/{taxon_id}/count"))
        .time_range(range);
    or_log(fetch(api, request).await, "GBIF occurrence count")
}

/// GBIF datasets contributing occurrences of the taxon.
pub async fn datasets(api: &dyn ExploreApi, taxon_id: i64, range: TimeRange) -> Option<Vec<Value>> {
    let request = ApiRequest::data(CacheDomain::Gbif, format!("gbif/{taxon_id}/datasets"))
        .time_range(range);
    or_log(fetch(api, request).await, "GBIF datasets")
}

/// One page of occurrence records.
pub async fn occurrences(
    api: &dyn ExploreApi,
    taxon_id: i64,
    range: TimeRange,
    limit: u32,
    offset: u32,
) -> Option<Value> {
    let request = ApiRequest::data(CacheDomain::Gbif, format!("gbif/{taxon_id}/occurences"))
        .time_range(range)
        .arg("limit", Some(limit))
        .arg("offset", Some(offset));
    or_log(api.request(request).await, "GBIF occurrences")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryApi;

    #[tokio::test]
    async fn passes_time_range() {
        let api = MemoryApi::new().with("gbif/5/count", json!(17));
        let range = TimeRange {
            from: NaiveDate::from_ymd_opt(2022, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            to: None,
        };
        assert_eq!(detection_count(&api, 5, range).await, Some(17.0));
        assert_eq!(api.urls(), vec!["gbif/5/count?from=2022-01-01T00%3A00%3A00"]);
    }

    #[tokio::test]
    async fn pages_occurrences() {
        let api = MemoryApi::new().with("gbif/5/occurences", json!([]));
        assert_eq!(
            occurrences(&api, 5, TimeRange::default(), 100, 200).await,
            Some(json!([]))
        );
        assert_eq!(api.urls(), vec!["gbif/5/occurences?limit=100&offset=200"]);
    }
}
