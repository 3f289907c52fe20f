#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Typed dataset descriptors for the explore dashboard.
//!
//! A dataset descriptor identifies one queryable data series (a taxon, a
//! meteo parameter at a station, a sensor channel of a deployment, ...)
//! together with enough metadata to render it without asking the data API
//! again. Descriptors travel through shareable links as plain dictionaries
//! discriminated by a `type` tag; [`to_typed_dataset`] and
//! [`TypedDataset::to_dataset`] convert between the two forms.

pub mod view;

use std::str::FromStr;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub use view::{
    Aggregation, DEFAULT_AGGREGATION, DEFAULT_CONFIDENCE, ViewConfiguration, default_view_config,
    format_api_datetime, parse_iso_datetime,
};

/// Discriminator of the `type` key in a dataset dictionary.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetType {
    /// Bird detections of a taxon from the Mitwelten deployments.
    Birds,
    /// GBIF occurrence records of a taxon.
    Gbif,
    /// A MeteoSwiss parameter measured at one station.
    Meteodata,
    /// Presence counts of a single pax counter.
    Pax,
    /// Presence counts summed over several pax counters.
    MultiPax,
    /// Pollinator detections, optionally restricted to one class.
    Pollinators,
    /// Air temperature channel of an environment sensor.
    EnvTemp,
    /// Relative air humidity channel of an environment sensor.
    EnvHumi,
    /// Soil moisture channel of an environment sensor.
    EnvMoist,
}

impl DatasetType {
    /// Whether detections of this type are filtered by a model confidence.
    #[must_use]
    pub const fn has_confidence(self) -> bool {
        matches!(self, Self::Birds | Self::Pollinators)
    }

    /// Whether measurements of this type are aggregated per time bucket.
    #[must_use]
    pub const fn has_aggregation(self) -> bool {
        matches!(
            self,
            Self::Meteodata | Self::EnvTemp | Self::EnvHumi | Self::EnvMoist
        )
    }
}

/// Taxonomic rank of a taxon.
///
/// Variants are declared from the coarsest to the finest rank. A coarser
/// rank compares greater than a finer one (`Kingdom > Species`).
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// Position in the hierarchy, `0` for the kingdom.
    #[must_use]
    pub const fn depth(self) -> u8 {
        self as u8
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.depth().cmp(&self.depth())
    }
}

/// Pollinator classes distinguished by the pollinator detection model.
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
pub enum PollinatorClass {
    Fliege,
    Wildbiene,
    Schwebfliege,
    Honigbiene,
    Hummel,
}

impl PollinatorClass {
    /// Display name with the first letter capitalized (`"Hummel"`).
    #[must_use]
    pub fn title(self) -> String {
        let name = self.as_ref();
        let mut chars = name.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

/// One deployment id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeploymentSelection {
    One(i64),
    Many(Vec<i64>),
}

impl DeploymentSelection {
    /// All selected deployment ids.
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        match self {
            Self::One(id) => vec![*id],
            Self::Many(ids) => ids.clone(),
        }
    }

    /// Location label for an optional selection.
    ///
    /// A single bare id is not treated as a list and reads as "all
    /// deployments", like an absent selection.
    #[must_use]
    pub fn location_label(selection: Option<&Self>) -> String {
        match selection {
            Some(Self::Many(ids)) if ids.len() == 1 => {
                format!("Mitwelten Deployment {}", ids[0])
            }
            Some(Self::Many(ids)) if ids.len() > 1 => {
                format!("{} Mitwelten Deployments", ids.len())
            }
            _ => "Mitwelten Deployments".to_string(),
        }
    }
}

/// Icon shown next to a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetIcon {
    Hierarchy,
    Gbif,
    Meteoswiss,
    PaxCounter,
    Bee,
    EnvSensors,
}

impl DatasetIcon {
    /// Iconify identifier, or `None` for icons served as image assets.
    #[must_use]
    pub const fn iconify(self) -> Option<&'static str> {
        match self {
            Self::Hierarchy => Some("system-uicons:hierarchy"),
            Self::Meteoswiss => Some("arcticons:meteoswiss"),
            Self::PaxCounter => Some("mdi:wireless"),
            Self::Bee => Some("icon-park-outline:bee"),
            Self::EnvSensors => Some("carbon:soil-temperature-field"),
            Self::Gbif => None,
        }
    }
}

/// A taxon observed by the Mitwelten bird detection pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxon {
    pub datum_id: Option<i64>,
    pub label_sci: Option<String>,
    pub label_de: Option<String>,
    pub label_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub rank: Option<Rank>,
    /// Deployments the detections are restricted to; empty means all.
    pub deployment_filter: Vec<i64>,
}

/// A taxon whose occurrences come from the GBIF cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GbifTaxon {
    pub datum_id: Option<i64>,
    pub label_sci: Option<String>,
    pub label_de: Option<String>,
    pub label_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub rank: Option<Rank>,
    pub lat_range: Option<Vec<f64>>,
    pub lon_range: Option<Vec<f64>>,
}

/// A MeteoSwiss parameter at one station.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteoDataset {
    pub param_id: Option<String>,
    pub station_id: Option<String>,
    pub param_desc: Option<String>,
    pub unit: Option<String>,
    pub station_name: Option<String>,
}

/// A single pax counter deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaxDataset {
    pub deployment_id: Option<i64>,
    pub node_label: Option<String>,
}

/// Several pax counter deployments shown as one series.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiPaxDataset {
    pub deployment_id: Option<DeploymentSelection>,
}

/// Pollinator detections, optionally of one class only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PollinatorDataset {
    pub deployment_id: Option<DeploymentSelection>,
    pub pollinator_class: Option<PollinatorClass>,
}

/// One channel of an environment sensor deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentDataset {
    pub deployment_id: Option<i64>,
    pub node_label: Option<String>,
    pub period_from: Option<String>,
    pub period_to: Option<String>,
}

/// The channels an environment sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum EnvironmentChannel {
    Temperature,
    Humidity,
    Moisture,
}

impl EnvironmentChannel {
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Humidity => "%",
            Self::Moisture => "AnalogValue",
        }
    }

    #[must_use]
    pub const fn param_desc(self) -> &'static str {
        match self {
            Self::Temperature => "Air Temperature",
            Self::Humidity => "Relative Air Humidity",
            Self::Moisture => "Soil Moisture",
        }
    }

    #[must_use]
    pub const fn dataset_type(self) -> DatasetType {
        match self {
            Self::Temperature => DatasetType::EnvTemp,
            Self::Humidity => DatasetType::EnvHumi,
            Self::Moisture => DatasetType::EnvMoist,
        }
    }
}

/// A decoded dataset descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedDataset {
    Birds(Taxon),
    Gbif(GbifTaxon),
    Meteo(MeteoDataset),
    Pax(PaxDataset),
    MultiPax(MultiPaxDataset),
    Pollinators(PollinatorDataset),
    Environment(EnvironmentChannel, EnvironmentDataset),
}

/// Decodes a dataset dictionary.
///
/// Returns `None` when the `type` tag is missing or unknown, and when a
/// known tag carries a field of the wrong shape. Missing fields take their
/// defaults and unknown keys are ignored.
#[must_use]
pub fn to_typed_dataset(dataset: &Value) -> Option<TypedDataset> {
    let tag = dataset.get("type").and_then(Value::as_str)?;
    let Ok(dataset_type) = DatasetType::from_str(tag) else {
        log::debug!("Unknown dataset type '{tag}'");
        return None;
    };

    match dataset_type {
        DatasetType::Birds => decode(dataset_type, dataset).map(TypedDataset::Birds),
        DatasetType::Gbif => decode(dataset_type, dataset).map(TypedDataset::Gbif),
        DatasetType::Meteodata => decode(dataset_type, dataset).map(TypedDataset::Meteo),
        DatasetType::Pax => decode(dataset_type, dataset).map(TypedDataset::Pax),
        DatasetType::MultiPax => decode(dataset_type, dataset).map(TypedDataset::MultiPax),
        DatasetType::Pollinators => decode(dataset_type, dataset).map(TypedDataset::Pollinators),
        DatasetType::EnvTemp => decode(dataset_type, dataset)
            .map(|d| TypedDataset::Environment(EnvironmentChannel::Temperature, d)),
        DatasetType::EnvHumi => decode(dataset_type, dataset)
            .map(|d| TypedDataset::Environment(EnvironmentChannel::Humidity, d)),
        DatasetType::EnvMoist => decode(dataset_type, dataset)
            .map(|d| TypedDataset::Environment(EnvironmentChannel::Moisture, d)),
    }
}

fn decode<T: DeserializeOwned>(dataset_type: DatasetType, dataset: &Value) -> Option<T> {
    match serde_json::from_value(dataset.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            log::warn!("Invalid '{dataset_type}' dataset: {e}");
            None
        }
    }
}

fn encode<T: Serialize>(dataset_type: DatasetType, fields: &T) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(
        "type".to_string(),
        Value::String(dataset_type.as_ref().to_string()),
    );
    if let Ok(Value::Object(encoded)) = serde_json::to_value(fields) {
        map.extend(encoded);
    }
    map
}

fn text(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

fn id_text(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl TypedDataset {
    #[must_use]
    pub const fn dataset_type(&self) -> DatasetType {
        match self {
            Self::Birds(_) => DatasetType::Birds,
            Self::Gbif(_) => DatasetType::Gbif,
            Self::Meteo(_) => DatasetType::Meteodata,
            Self::Pax(_) => DatasetType::Pax,
            Self::MultiPax(_) => DatasetType::MultiPax,
            Self::Pollinators(_) => DatasetType::Pollinators,
            Self::Environment(channel, _) => channel.dataset_type(),
        }
    }

    /// Encodes the descriptor as the dictionary form carried in links.
    ///
    /// Decoding the result with [`to_typed_dataset`] yields `self` again.
    #[must_use]
    pub fn to_dataset(&self) -> Value {
        let dataset_type = self.dataset_type();
        let map = match self {
            Self::Birds(taxon) => encode(dataset_type, taxon),
            Self::Gbif(taxon) => encode(dataset_type, taxon),
            Self::Meteo(meteo) => encode(dataset_type, meteo),
            Self::Pax(pax) => encode(dataset_type, pax),
            Self::MultiPax(pax) => encode(dataset_type, pax),
            Self::Pollinators(polli) => encode(dataset_type, polli),
            Self::Environment(channel, env) => {
                let mut map = encode(dataset_type, env);
                map.insert("unit".to_string(), Value::from(channel.unit()));
                map.insert("param_desc".to_string(), Value::from(channel.param_desc()));
                map
            }
        };
        Value::Object(map)
    }

    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::Birds(taxon) => text(taxon.label_sci.as_ref()),
            Self::Gbif(taxon) => format!("{} (GBIF)", text(taxon.label_sci.as_ref())),
            Self::Meteo(meteo) => text(meteo.param_desc.as_ref()),
            Self::Pax(pax) => format!("PAX Counter {}", text(pax.node_label.as_ref())),
            Self::MultiPax(_) => "PAX Counter (s)".to_string(),
            Self::Pollinators(polli) => polli
                .pollinator_class
                .map_or_else(|| "All Pollinators".to_string(), PollinatorClass::title),
            Self::Environment(channel, _) => channel.param_desc().to_string(),
        }
    }

    #[must_use]
    pub fn unit(&self) -> String {
        match self {
            Self::Birds(Taxon { rank, .. }) | Self::Gbif(GbifTaxon { rank, .. }) => {
                rank.map(|r| r.to_string()).unwrap_or_default()
            }
            Self::Meteo(meteo) => text(meteo.unit.as_ref()),
            Self::Pax(_) | Self::MultiPax(_) => "PAX".to_string(),
            Self::Pollinators(_) => "Pollinators".to_string(),
            Self::Environment(channel, _) => channel.unit().to_string(),
        }
    }

    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::Birds(_) => "Mitwelten Deployments".to_string(),
            Self::Gbif(_) => "GBIF: Basel Area".to_string(),
            Self::Meteo(meteo) => text(meteo.station_name.as_ref()),
            Self::Pax(PaxDataset { deployment_id, .. })
            | Self::Environment(_, EnvironmentDataset { deployment_id, .. }) => {
                format!("Mitwelten Deployment {}", id_text(*deployment_id))
            }
            Self::MultiPax(MultiPaxDataset { deployment_id })
            | Self::Pollinators(PollinatorDataset { deployment_id, .. }) => {
                DeploymentSelection::location_label(deployment_id.as_ref())
            }
        }
    }

    #[must_use]
    pub const fn icon(&self) -> DatasetIcon {
        match self {
            Self::Birds(_) => DatasetIcon::Hierarchy,
            Self::Gbif(_) => DatasetIcon::Gbif,
            Self::Meteo(_) => DatasetIcon::Meteoswiss,
            Self::Pax(_) | Self::MultiPax(_) => DatasetIcon::PaxCounter,
            Self::Pollinators(_) => DatasetIcon::Bee,
            Self::Environment(..) => DatasetIcon::EnvSensors,
        }
    }

    /// Short identifier shown in legends.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Birds(Taxon { datum_id, .. }) | Self::Gbif(GbifTaxon { datum_id, .. }) => {
                id_text(*datum_id)
            }
            Self::Meteo(meteo) => text(meteo.param_id.as_ref()),
            Self::Pax(PaxDataset { node_label, .. })
            | Self::Environment(_, EnvironmentDataset { node_label, .. }) => {
                text(node_label.as_ref())
            }
            Self::MultiPax(_) => "pax".to_string(),
            Self::Pollinators(_) => "polli".to_string(),
        }
    }
}

impl Serialize for TypedDataset {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_dataset().serialize(serializer)
    }
}
