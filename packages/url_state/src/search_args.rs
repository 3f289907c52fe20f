//! Typed view of the arguments of a shareable link.

use chrono::NaiveDateTime;
use mitwelten_explore_dataset_models::{
    Aggregation, DatasetType, ViewConfiguration, format_api_datetime, parse_iso_datetime,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{UrlStateError, codec};

/// Confidence threshold of a link that does not set one.
pub const DEFAULT_LINK_CONFIDENCE: f64 = 0.7;

/// Bucket width of a link that does not set one.
pub const DEFAULT_BUCKET: &str = "1d";

/// The state carried by a shareable link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlSearchArgs {
    /// The single dataset of a detail view, read from `dataset` or `trace`.
    pub dataset: Option<Value>,
    /// The datasets of a comparison view, read from `datasets` or `traces`.
    pub datasets: Option<Vec<Value>>,
    /// One configuration per entry of `datasets`.
    pub cfg: Option<Vec<ViewConfiguration>>,
    pub agg: Aggregation,
    pub bucket: String,
    #[serde(rename = "from")]
    pub time_from: Option<NaiveDateTime>,
    #[serde(rename = "to")]
    pub time_to: Option<NaiveDateTime>,
    pub confidence: f64,
    pub mw_data: Option<bool>,
    pub gbif_data: Option<bool>,
    /// Arguments without a dedicated field, kept for re-encoding.
    pub extra: Map<String, Value>,
}

impl Default for UrlSearchArgs {
    fn default() -> Self {
        Self {
            dataset: None,
            datasets: None,
            cfg: None,
            agg: Aggregation::Mean,
            bucket: DEFAULT_BUCKET.to_string(),
            time_from: None,
            time_to: None,
            confidence: DEFAULT_LINK_CONFIDENCE,
            mw_data: None,
            gbif_data: None,
            extra: Map::new(),
        }
    }
}

impl UrlSearchArgs {
    /// Parses the query string of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested value is malformed or a typed argument
    /// cannot be read.
    pub fn from_query(query: &str) -> Result<Self, UrlStateError> {
        Self::from_map(codec::decode(query)?)
    }

    /// Builds the arguments from decoded link state.
    ///
    /// # Errors
    ///
    /// Returns [`UrlStateError::InvalidArgument`] for an unknown aggregation,
    /// a non-numeric confidence, an unparseable timestamp or a `datasets`
    /// value that is not a list, and [`UrlStateError::InvalidConfig`] for a
    /// `cfg` entry that is not a view configuration.
    pub fn from_map(mut state: Map<String, Value>) -> Result<Self, UrlStateError> {
        let dataset = take_either(&mut state, "dataset", "trace");
        let datasets = match take_either(&mut state, "datasets", "traces") {
            None => None,
            Some(Value::Array(items)) => Some(items),
            Some(other) => return Err(invalid("datasets", &other)),
        };
        let cfg = match state.remove("cfg") {
            None => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        ViewConfiguration::from_value(item)
                            .map_err(|source| UrlStateError::InvalidConfig { index, source })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => return Err(invalid("cfg", &other)),
        };

        let agg = match take_text(&mut state, "agg") {
            None => Aggregation::Mean,
            Some(text) => text
                .parse()
                .map_err(|_| invalid("agg", &Value::String(text)))?,
        };
        let bucket = take_text(&mut state, "bucket").unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let confidence = match take_text(&mut state, "confidence") {
            None => DEFAULT_LINK_CONFIDENCE,
            Some(text) => text
                .trim()
                .parse()
                .map_err(|_| invalid("confidence", &Value::String(text)))?,
        };
        let time_from = take_time(&mut state, "from", "time_from")?;
        let time_to = take_time(&mut state, "to", "time_to")?;
        let mw_data = take_text(&mut state, "mw_data").map(|v| flag(&v));
        let gbif_data = take_text(&mut state, "gbif_data").map(|v| flag(&v));

        Ok(Self {
            dataset,
            datasets,
            cfg,
            agg,
            bucket,
            time_from,
            time_to,
            confidence,
            mw_data,
            gbif_data,
            extra: state,
        })
    }

    /// The global view configuration derived from the link arguments.
    #[must_use]
    pub fn view_config(&self) -> ViewConfiguration {
        ViewConfiguration {
            bucket: Some(self.bucket.clone()),
            agg: Some(self.agg),
            confidence: Some(self.confidence),
            time_from: self.time_from,
            time_to: self.time_to,
            normalize: self
                .extra
                .get("normalize")
                .and_then(Value::as_str)
                .is_some_and(flag),
        }
    }

    /// Link state in canonical form: `dataset` instead of `trace`,
    /// timestamps in API format and configurations in dictionary form.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut state = self.extra.clone();
        if let Some(dataset) = &self.dataset {
            state.insert("dataset".to_string(), dataset.clone());
        }
        if let Some(datasets) = &self.datasets {
            state.insert("datasets".to_string(), Value::Array(datasets.clone()));
        }
        if let Some(cfg) = &self.cfg {
            state.insert(
                "cfg".to_string(),
                Value::Array(cfg.iter().map(|c| Value::Object(c.to_dict())).collect()),
            );
        }
        state.insert("agg".to_string(), Value::from(self.agg.as_ref()));
        state.insert("bucket".to_string(), Value::from(self.bucket.as_str()));
        state.insert("confidence".to_string(), Value::from(self.confidence));
        if let Some(from) = &self.time_from {
            state.insert("from".to_string(), Value::from(format_api_datetime(from)));
        }
        if let Some(to) = &self.time_to {
            state.insert("to".to_string(), Value::from(format_api_datetime(to)));
        }
        if let Some(mw_data) = self.mw_data {
            state.insert("mw_data".to_string(), Value::from(mw_data.to_string()));
        }
        if let Some(gbif_data) = self.gbif_data {
            state.insert("gbif_data".to_string(), Value::from(gbif_data.to_string()));
        }
        state
    }

    /// Encodes the arguments as a query string without the leading `?`.
    #[must_use]
    pub fn to_query(&self) -> String {
        codec::encode(&self.to_map())
    }

    /// Replaces the configuration of the dataset at `index`.
    ///
    /// A link without a `cfg` list first gets the type defaults of every
    /// dataset.
    ///
    /// # Errors
    ///
    /// Returns [`UrlStateError::ConfigIndex`] if `index` does not address a
    /// dataset.
    pub fn set_cfg(&mut self, index: usize, config: ViewConfiguration) -> Result<(), UrlStateError> {
        let len = self.datasets.as_ref().map_or(0, Vec::len);
        if index >= len {
            return Err(UrlStateError::ConfigIndex { index, len });
        }

        let datasets = self.datasets.as_deref().unwrap_or_default();
        let cfg = self
            .cfg
            .get_or_insert_with(|| datasets.iter().map(default_config).collect());
        if cfg.len() < len {
            cfg.extend(datasets[cfg.len()..].iter().map(default_config));
        }
        cfg[index] = config;
        Ok(())
    }
}

fn default_config(dataset: &Value) -> ViewConfiguration {
    dataset
        .get("type")
        .and_then(Value::as_str)
        .and_then(|tag| tag.parse::<DatasetType>().ok())
        .map(ViewConfiguration::default_for)
        .unwrap_or_default()
}

fn take_either(state: &mut Map<String, Value>, key: &str, alias: &str) -> Option<Value> {
    let primary = state.remove(key);
    let secondary = state.remove(alias);
    primary.or(secondary)
}

fn take_text(state: &mut Map<String, Value>, key: &str) -> Option<String> {
    match state.remove(key)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn take_time(
    state: &mut Map<String, Value>,
    key: &str,
    alias: &str,
) -> Result<Option<NaiveDateTime>, UrlStateError> {
    let primary = take_text(state, key);
    let secondary = take_text(state, alias);
    primary
        .or(secondary)
        .map(|text| parse_iso_datetime(&text).ok_or_else(|| invalid(key, &Value::String(text))))
        .transpose()
}

fn flag(value: &str) -> bool {
    value.to_lowercase().contains("true")
}

fn invalid(key: &str, value: &Value) -> UrlStateError {
    UrlStateError::InvalidArgument {
        key: key.to_string(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn applies_defaults() {
        let args = UrlSearchArgs::from_query("").unwrap();
        assert_eq!(args, UrlSearchArgs::default());
        assert_eq!(args.agg, Aggregation::Mean);
        assert_eq!(args.bucket, "1d");
        assert!((args.confidence - 0.7).abs() < f64::EPSILON);
        assert!(args.mw_data.is_none());
    }

    #[test]
    fn reads_legacy_trace_link() {
        let args = UrlSearchArgs::from_query(
            "trace=%7B%27type%27%3A+%27birds%27%2C+%27datum_id%27%3A+212%7D\
             &bucket=1h&agg=sum&confidence=0.9&from=2023-05-01T00%3A00%3A00\
             &mw_data=True&gbif_data=false&zoom=12",
        )
        .unwrap();

        assert_eq!(args.dataset, Some(json!({"type": "birds", "datum_id": 212})));
        assert_eq!(args.bucket, "1h");
        assert_eq!(args.agg, Aggregation::Sum);
        assert!((args.confidence - 0.9).abs() < f64::EPSILON);
        assert_eq!(
            args.time_from,
            NaiveDate::from_ymd_opt(2023, 5, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(args.mw_data, Some(true));
        assert_eq!(args.gbif_data, Some(false));
        assert_eq!(args.extra["zoom"], "12");
    }

    #[test]
    fn derives_global_view_config() {
        let args = UrlSearchArgs::from_query("agg=max&bucket=1w&normalize=true").unwrap();
        let config = args.view_config();
        assert_eq!(config.agg, Some(Aggregation::Max));
        assert_eq!(config.bucket.as_deref(), Some("1w"));
        assert_eq!(config.confidence, Some(0.7));
        assert!(config.normalize);
    }

    #[test]
    fn parses_cfg_entries() {
        let args = UrlSearchArgs::from_query(
            "datasets=%5B%7B%27type%27%3A+%27pax%27%7D%5D\
             &cfg=%5B%7B%27normalize%27%3A+True%2C+%27confidence%27%3A+None%7D%5D",
        )
        .unwrap();
        let cfg = args.cfg.unwrap();
        assert_eq!(cfg.len(), 1);
        assert!(cfg[0].normalize);
        assert_eq!(cfg[0].confidence, None);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            UrlSearchArgs::from_query("agg=average"),
            Err(UrlStateError::InvalidArgument { ref key, .. }) if key == "agg"
        ));
        assert!(UrlSearchArgs::from_query("confidence=high").is_err());
        assert!(UrlSearchArgs::from_query("from=yesterday").is_err());
        assert!(UrlSearchArgs::from_query("datasets=%7B%7D").is_err());
        assert!(matches!(
            UrlSearchArgs::from_query("cfg=%5B%7B%27agg%27%3A+%27average%27%7D%5D"),
            Err(UrlStateError::InvalidConfig { index: 0, .. })
        ));
    }

    #[test]
    fn query_round_trip() {
        let args = UrlSearchArgs::from_query(
            "datasets=%5B%7B%27type%27%3A+%27birds%27%2C+%27datum_id%27%3A+212%7D%5D\
             &cfg=%5B%7B%27confidence%27%3A+0.8%2C+%27normalize%27%3A+False%7D%5D\
             &from=2023-05-01&to=2023-06-01&bucket=1d&gbif_data=true",
        )
        .unwrap();
        let again = UrlSearchArgs::from_query(&args.to_query()).unwrap();
        assert_eq!(again, args);
    }

    #[test]
    fn sets_one_configuration() {
        let mut args = UrlSearchArgs {
            datasets: Some(vec![
                json!({"type": "birds", "datum_id": 212}),
                json!({"type": "meteodata", "station_id": "BAS"}),
            ]),
            ..UrlSearchArgs::default()
        };
        args.set_cfg(
            1,
            ViewConfiguration {
                agg: Some(Aggregation::Max),
                ..ViewConfiguration::default()
            },
        )
        .unwrap();

        let cfg = args.cfg.as_ref().unwrap();
        assert_eq!(cfg[0].confidence, Some(0.6));
        assert_eq!(cfg[1].agg, Some(Aggregation::Max));
        assert!(matches!(
            args.set_cfg(2, ViewConfiguration::default()),
            Err(UrlStateError::ConfigIndex { index: 2, len: 2 })
        ));
    }
}
