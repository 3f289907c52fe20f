#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response bodies of the Mitwelten data API.
//!
//! The data API answers time series as parallel column arrays whose key
//! names differ per domain (`bucket`/`detections` for detections,
//! `buckets`/`pax` for pax counters, `time`/`value` for measurements). The
//! types here accept every naming through serde aliases so the rest of the
//! workspace only deals with one shape per concept. Missing measurement
//! values (`null`) decode to `NaN`.

pub mod user;

use chrono::NaiveDateTime;
use mitwelten_explore_dataset_models::parse_iso_datetime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use user::{Annotation, AppUser, NewAnnotation};

/// A bucketed time series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Bucket start timestamps (ISO 8601 strings as returned upstream).
    #[serde(alias = "bucket", alias = "buckets", alias = "time")]
    pub dates: Vec<String>,
    #[serde(
        alias = "detections",
        alias = "pax",
        alias = "value",
        deserialize_with = "nullable_values"
    )]
    pub values: Vec<f64>,
}

impl TimeSeries {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Sum of all finite values.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().filter(|v| v.is_finite()).sum()
    }
}

/// Values bucketed by minute of the day, independent of the date.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeOfDay {
    #[serde(alias = "minuteOfDay")]
    pub minute_of_day: Vec<i64>,
    #[serde(
        alias = "detections",
        alias = "pax",
        alias = "value",
        deserialize_with = "nullable_values"
    )]
    pub values: Vec<f64>,
}

/// A WGS84 position as `{lat, lon}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Detections (or pax counts) aggregated at one deployment location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionLocation {
    pub location: LatLon,
    #[serde(default)]
    pub deployment_id: Option<i64>,
    #[serde(default, alias = "pax")]
    pub detections: Option<f64>,
}

/// Node attached to a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentNode {
    pub node_id: Option<i64>,
    pub node_label: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub description: Option<String>,
}

/// A sensor deployment of the Mitwelten project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub deployment_id: i64,
    #[serde(default)]
    pub node: DeploymentNode,
    #[serde(default)]
    pub location: Option<LatLon>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Deployment {
    /// Whether the node type contains `query` (case-insensitive).
    #[must_use]
    pub fn matches_type(&self, query: &str) -> bool {
        self.node
            .node_type
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&query.to_lowercase()))
    }
}

/// A MeteoSwiss station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeteoStation {
    pub station_id: String,
    #[serde(default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub location: Option<LatLon>,
    #[serde(default)]
    pub data_src: Option<String>,
}

/// Plot-ready columns of the positions belonging to one dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationData {
    pub name: Vec<String>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub id: Vec<Value>,
    /// Per-location value used when locations are aggregated into cells.
    #[serde(default)]
    pub values: Vec<f64>,
}

impl LocationData {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.latitude.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.latitude.is_empty()
    }

    /// Appends one location.
    pub fn push(&mut self, name: String, latitude: f64, longitude: f64, id: Value, value: f64) {
        self.name.push(name);
        self.latitude.push(latitude);
        self.longitude.push(longitude);
        self.id.push(id);
        self.values.push(value);
    }
}

/// Summary of a Wikipedia article.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WikiSummary {
    pub title: Option<String>,
    pub extract: Option<String>,
}

/// Parses a timestamp returned by the data API.
#[must_use]
pub fn parse_api_timestamp(value: &str) -> Option<NaiveDateTime> {
    parse_iso_datetime(value)
}

fn nullable_values<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_time_series_naming() {
        let birds: TimeSeries = serde_json::from_value(json!({
            "bucket": ["2023-05-01T00:00:00+00:00", "2023-05-02T00:00:00+00:00"],
            "detections": [3, 5]
        }))
        .unwrap();
        assert_eq!(birds.values, vec![3.0, 5.0]);
        assert!((birds.total() - 8.0).abs() < f64::EPSILON);

        let pax: TimeSeries = serde_json::from_value(json!({
            "buckets": ["2023-05-01T00:00:00"],
            "pax": [12]
        }))
        .unwrap();
        assert_eq!(pax.dates.len(), 1);

        let meteo: TimeSeries = serde_json::from_value(json!({
            "time": ["2023-05-01T00:00:00", "2023-05-01T01:00:00"],
            "value": [12.5, null]
        }))
        .unwrap();
        assert!(meteo.values[1].is_nan());
        assert!((meteo.total() - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_time_of_day_namings() {
        let tod: TimeOfDay =
            serde_json::from_value(json!({"minuteOfDay": [0, 20, 40], "pax": [1, 2, 3]})).unwrap();
        assert_eq!(tod.minute_of_day, vec![0, 20, 40]);

        let meteo: TimeOfDay =
            serde_json::from_value(json!({"minute_of_day": [0], "value": [4.2]})).unwrap();
        assert_eq!(meteo.values, vec![4.2]);
    }

    #[test]
    fn parses_deployment() {
        let deployment: Deployment = serde_json::from_value(json!({
            "deployment_id": 806,
            "node": {"node_id": 12, "node_label": "4164-6672", "type": "Pax Counter"},
            "location": {"lat": 47.53, "lon": 7.61},
            "period": {"start": "2021-05-01T00:00:00+00:00", "end": null}
        }))
        .unwrap();
        assert!(deployment.matches_type("pax"));
        assert!(!deployment.matches_type("env"));
        assert!((deployment.location.unwrap().lon - 7.61).abs() < 1e-9);
    }

    #[test]
    fn detection_location_accepts_pax_values() {
        let loc: DetectionLocation = serde_json::from_value(json!({
            "location": {"lat": 47.5, "lon": 7.6},
            "deployment_id": 3,
            "pax": 42
        }))
        .unwrap();
        assert_eq!(loc.detections, Some(42.0));
    }
}
