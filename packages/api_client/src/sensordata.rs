//! Pax counter and environment sensor series.

use mitwelten_explore_api_models::{TimeOfDay, TimeSeries};
use mitwelten_explore_dataset_models::{Aggregation, EnvironmentChannel};

use crate::{ApiRequest, CacheDomain, ExploreApi, TimeRange, fetch, or_log};

pub async fn pax_timeseries(
    api: &dyn ExploreApi,
    deployment_id: i64,
    bucket_width: &str,
    range: TimeRange,
) -> Option<TimeSeries> {
    let request =
        ApiRequest::data(CacheDomain::Sensordata, format!("sensordata/pax/{deployment_id}"))
            .arg("bucket_width", Some(bucket_width))
            .time_range(range);
    or_log(fetch(api, request).await, "Pax series")
}

pub async fn pax_time_of_day(
    api: &dyn ExploreApi,
    deployment_id: i64,
    bucket_width_m: u32,
    range: TimeRange,
) -> Option<TimeOfDay> {
    let request = ApiRequest::data(
        CacheDomain::Sensordata,
        format!("sensordata/pax/{deployment_id}/time_of_day"),
    )
    .arg("bucket_width_m", Some(bucket_width_m))
    .time_range(range);
    or_log(fetch(api, request).await, "Pax time of day")
}

pub async fn env_timeseries(
    api: &dyn ExploreApi,
    deployment_id: i64,
    channel: EnvironmentChannel,
    aggregation: Option<Aggregation>,
    bucket_width: &str,
    range: TimeRange,
) -> Option<TimeSeries> {
    let request = ApiRequest::data(
        CacheDomain::Sensordata,
        format!("sensordata/{channel}/{deployment_id}"),
    )
    .arg("aggregation", aggregation)
    .arg("bucket_width", Some(bucket_width))
    .time_range(range);
    or_log(fetch(api, request).await, "Environment sensor series")
}

pub async fn env_time_of_day(
    api: &dyn ExploreApi,
    deployment_id: i64,
    channel: EnvironmentChannel,
    aggregation: Option<Aggregation>,
    bucket_width_m: u32,
    range: TimeRange,
) -> Option<TimeOfDay> {
    let request = ApiRequest::data(
        CacheDomain::Sensordata,
        format!("sensordata/{channel}/{deployment_id}/time_of_day"),
    )
    .arg("aggregation", aggregation)
    .arg("bucket_width_m", Some(bucket_width_m))
    .time_range(range);
    or_log(fetch(api, request).await, "Environment sensor time of day")
}
