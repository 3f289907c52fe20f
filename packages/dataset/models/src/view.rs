//! View configuration applied to a dataset before rendering.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::DatasetType;

/// Confidence threshold for detection datasets when none is chosen.
pub const DEFAULT_CONFIDENCE: f64 = 0.6;

/// Aggregation for measurement datasets when none is chosen.
pub const DEFAULT_AGGREGATION: Aggregation = Aggregation::Mean;

/// Reduction applied to the values that fall into one time bucket.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
    Median,
    Min,
    Max,
}

impl Aggregation {
    /// Reduces `values` to one number.
    ///
    /// An empty slice reduces to `NaN`, except for [`Self::Sum`] which
    /// yields `0.0`. The median of an even count is the mean of the two
    /// middle values.
    #[must_use]
    pub fn reduce(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return if self == Self::Sum { 0.0 } else { f64::NAN };
        }
        match self {
            Self::Sum => values.iter().sum(),
            #[allow(clippy::cast_precision_loss)]
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    f64::midpoint(sorted[mid - 1], sorted[mid])
                } else {
                    sorted[mid]
                }
            }
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// User-adjustable query parameters of one dataset.
///
/// Deserializes from the `cfg` entries of a shareable link as well as from
/// the global link arguments, so every field is optional and lenient:
/// `confidence` may be a number or a numeric string, and the time range may
/// be given as `from`/`to` or `time_from`/`time_to`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfiguration {
    /// Time bucket width token such as `"1h"`, `"1d"` or `"1w"`.
    pub bucket: Option<String>,
    pub agg: Option<Aggregation>,
    #[serde(deserialize_with = "lenient_confidence")]
    pub confidence: Option<f64>,
    #[serde(
        rename = "from",
        alias = "time_from",
        deserialize_with = "lenient_datetime",
        serialize_with = "api_datetime"
    )]
    pub time_from: Option<NaiveDateTime>,
    #[serde(
        rename = "to",
        alias = "time_to",
        deserialize_with = "lenient_datetime",
        serialize_with = "api_datetime"
    )]
    pub time_to: Option<NaiveDateTime>,
    #[serde(deserialize_with = "lenient_bool")]
    pub normalize: bool,
}

impl ViewConfiguration {
    /// Builds a configuration from a dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if a field has an unusable shape, such as an unknown
    /// aggregation name or an unparseable timestamp.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone())
    }

    /// The dictionary form stored in a link's `cfg` list.
    ///
    /// Only `confidence` and `agg` (when set) and `normalize` are kept; the
    /// bucket and time range are global link arguments.
    #[must_use]
    pub fn to_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        if let Some(confidence) = self.confidence {
            dict.insert("confidence".to_string(), Value::from(confidence));
        }
        if let Some(agg) = self.agg {
            dict.insert("agg".to_string(), Value::from(agg.as_ref()));
        }
        dict.insert("normalize".to_string(), Value::Bool(self.normalize));
        dict
    }

    /// Typed defaults for a dataset type.
    #[must_use]
    pub const fn default_for(dataset_type: DatasetType) -> Self {
        Self {
            bucket: None,
            agg: if dataset_type.has_aggregation() {
                Some(DEFAULT_AGGREGATION)
            } else {
                None
            },
            confidence: if dataset_type.has_confidence() {
                Some(DEFAULT_CONFIDENCE)
            } else {
                None
            },
            time_from: None,
            time_to: None,
            normalize: false,
        }
    }
}

/// Default `cfg` entry for a dataset dictionary.
///
/// Detection types get a confidence, measurement types an aggregation and
/// pax counters only the normalize flag. Every other dictionary, including
/// ones with an unknown type, gets an empty entry.
#[must_use]
pub fn default_view_config(dataset: &Value) -> Map<String, Value> {
    let dataset_type = dataset
        .get("type")
        .and_then(Value::as_str)
        .and_then(|tag| tag.parse::<DatasetType>().ok());

    match dataset_type {
        Some(
            t @ (DatasetType::Birds
            | DatasetType::Pollinators
            | DatasetType::Meteodata
            | DatasetType::Pax
            | DatasetType::EnvTemp
            | DatasetType::EnvHumi
            | DatasetType::EnvMoist),
        ) => ViewConfiguration::default_for(t).to_dict(),
        _ => Map::new(),
    }
}

/// Parses the timestamp forms found in links and API responses.
///
/// Accepts a plain date, a naive date-time with `T` or space separator and
/// an RFC 3339 timestamp (converted to UTC).
#[must_use]
pub fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Formats a timestamp the way the data API expects query arguments.
#[must_use]
pub fn format_api_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[allow(clippy::ref_option)]
fn api_datetime<S: Serializer>(
    value: &Option<NaiveDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.serialize_str(&format_api_datetime(dt)),
        None => serializer.serialize_none(),
    }
}

fn lenient_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_iso_datetime(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'"))),
    }
}

fn lenient_confidence<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let confidence = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(
            s.trim()
                .parse::<f64>()
                .map_err(|e| serde::de::Error::custom(format!("invalid confidence '{s}': {e}")))?,
        ),
        Value::Null => None,
        other => {
            return Err(serde::de::Error::custom(format!(
                "invalid confidence {other}"
            )));
        }
    };
    // A zero threshold reads as "not set".
    Ok(confidence.filter(|c| c.abs() > 0.0))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => s.to_lowercase().contains("true"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v.abs() > 0.0),
        _ => false,
    })
}
