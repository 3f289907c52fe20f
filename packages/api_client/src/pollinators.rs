//! Pollinator detections of the camera deployments.

use mitwelten_explore_api_models::{DetectionLocation, TimeOfDay, TimeSeries};
use mitwelten_explore_dataset_models::PollinatorClass;

use crate::{ApiRequest, CacheDomain, ExploreApi, TimeRange, fetch, or_log};

/// Class, deployment and confidence filter shared by all pollinator
/// queries. An empty deployment list means every deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollinatorFilter<'a> {
    pub class: Option<PollinatorClass>,
    pub deployment_ids: &'a [i64],
    pub confidence: Option<f64>,
}

fn request(path: &str, filter: PollinatorFilter<'_>) -> ApiRequest {
    ApiRequest::data(CacheDomain::Pollinators, path)
        .arg("pollinator_class", filter.class)
        .arg("conf", filter.confidence)
}

pub async fn detection_dates(
    api: &dyn ExploreApi,
    filter: PollinatorFilter<'_>,
    bucket_width: &str,
    range: TimeRange,
) -> Option<TimeSeries> {
    let request = request("pollinators/date", filter)
        .arg("bucket_width", Some(bucket_width))
        .time_range(range)
        .repeated_arg("deployment_ids", filter.deployment_ids);
    or_log(fetch(api, request).await, "Pollinator detection dates")
}

pub async fn detection_locations(
    api: &dyn ExploreApi,
    filter: PollinatorFilter<'_>,
    range: TimeRange,
) -> Option<Vec<DetectionLocation>> {
    let request = request("pollinators/location", filter)
        .time_range(range)
        .repeated_arg("deployment_ids", filter.deployment_ids);
    or_log(fetch(api, request).await, "Pollinator detection locations")
}

pub async fn detection_time_of_day(
    api: &dyn ExploreApi,
    filter: PollinatorFilter<'_>,
    bucket_width_m: u32,
    range: TimeRange,
) -> Option<TimeOfDay> {
    let request = request("pollinators/time_of_day", filter)
        .arg("bucket_width_m", Some(bucket_width_m))
        .time_range(range)
        .repeated_arg("deployment_ids", filter.deployment_ids);
    or_log(fetch(api, request).await, "Pollinator time of day")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::memory::MemoryApi;

    #[tokio::test]
    async fn appends_deployment_filter() {
        let api = MemoryApi::new().with(
            "pollinators/date",
            json!({"bucket": ["2023-06-01T00:00:00"], "detections": [9]}),
        );
        let filter = PollinatorFilter {
            class: Some(PollinatorClass::Hummel),
            deployment_ids: &[806, 807],
            confidence: Some(0.6),
        };
        let series = detection_dates(&api, filter, "1d", TimeRange::default())
            .await
            .unwrap();
        assert_eq!(series.values, vec![9.0]);
        assert_eq!(
            api.urls(),
            vec![
                "pollinators/date?pollinator_class=hummel&conf=0.6&bucket_width=1d\
                 &deployment_ids=806&deployment_ids=807"
            ]
        );
    }

    #[tokio::test]
    async fn all_classes_without_filter() {
        let api = MemoryApi::new();
        let _ = detection_time_of_day(&api, PollinatorFilter::default(), 20, TimeRange::default()).await;
        assert_eq!(api.urls(), vec!["pollinators/time_of_day?bucket_width_m=20"]);
    }
}
