//! MeteoSwiss stations and measurements.
//!
//! Measurements, their time-of-day profile and summaries require a bearer
//! token; without one no request is made.

use mitwelten_explore_api_models::{MeteoStation, TimeOfDay, TimeSeries};
use mitwelten_explore_dataset_models::Aggregation;
use serde_json::Value;

use crate::{ApiRequest, CacheDomain, ExploreApi, TimeRange, fetch, or_log};

/// All stations, or the one with `station_id`.
pub async fn stations(api: &dyn ExploreApi, station_id: Option<&str>) -> Vec<MeteoStation> {
    let request =
        ApiRequest::data(CacheDomain::Meteo, "meteo/station").arg("station_id", station_id);
    or_log(fetch(api, request).await, "Meteo stations").unwrap_or_default()
}

pub async fn parameters(api: &dyn ExploreApi) -> Vec<Value> {
    let request = ApiRequest::data(CacheDomain::Meteo, "meteo/parameter");
    or_log(fetch(api, request).await, "Meteo parameters").unwrap_or_default()
}

/// Station/parameter combinations, optionally filtered.
pub async fn datasets(
    api: &dyn ExploreApi,
    station_id: Option<&str>,
    unit: Option<&str>,
) -> Vec<Value> {
    let request = ApiRequest::data(CacheDomain::Meteo, "meteo/dataset")
        .arg("station_id", station_id)
        .arg("unit", unit);
    or_log(fetch(api, request).await, "Meteo datasets").unwrap_or_default()
}

pub async fn measurements(
    api: &dyn ExploreApi,
    station_id: &str,
    param_id: &str,
    bucket_width: &str,
    aggregation: Option<Aggregation>,
    range: TimeRange,
    token: Option<&str>,
) -> Option<TimeSeries> {
    let Some(token) = token else {
        log::debug!("Meteo measurements of {station_id}/{param_id} need a token");
        return None;
    };
    let request = ApiRequest::data(
        CacheDomain::Meteo,
        format!("meteo/measurements/{station_id}/{param_id}"),
    )
    .arg("bucket_width", Some(bucket_width))
    .arg("aggregation", aggregation)
    .time_range(range)
    .bearer(Some(token));
    or_log(fetch(api, request).await, "Meteo measurements")
}

pub async fn time_of_day(
    api: &dyn ExploreApi,
    station_id: &str,
    param_id: &str,
    bucket_width_m: u32,
    aggregation: Option<Aggregation>,
    range: TimeRange,
    token: Option<&str>,
) -> Option<TimeOfDay> {
    let Some(token) = token else {
        log::debug!("Meteo time of day of {station_id}/{param_id} needs a token");
        return None;
    };
    let request = ApiRequest::data(
        CacheDomain::Meteo,
        format!("meteo/measurements_time_of_day/{station_id}/{param_id}"),
    )
    .arg("bucket_width_m", Some(bucket_width_m))
    .arg("aggregation", aggregation)
    .time_range(range)
    .bearer(Some(token));
    or_log(fetch(api, request).await, "Meteo time of day")
}

/// Summary statistics of a parameter over the period.
pub async fn summary(
    api: &dyn ExploreApi,
    station_id: &str,
    param_id: &str,
    range: TimeRange,
    token: Option<&str>,
) -> Option<Value> {
    let token = token?;
    let request = ApiRequest::data(
        CacheDomain::Meteo,
        format!("meteo/summary/{station_id}/{param_id}"),
    )
    .time_range(range)
    .bearer(Some(token));
    or_log(api.request(request).await, "Meteo summary")
}
