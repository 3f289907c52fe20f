#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Plot-ready data for typed datasets.
//!
//! A [`DataHandler`] dispatches a [`TypedDataset`] together with its own
//! view configuration (`cfg`: confidence, aggregation, normalization) and
//! the global one (`vc`: bucket width, time range) to the matching API
//! client calls. Upstream failures surface as empty results; only broken
//! links and inconsistent arguments are errors.

pub mod compare;
pub mod load;
pub mod sources;

use mitwelten_explore_api_client::{ExploreApi, TimeRange};
use mitwelten_explore_config::{AppConfig, DEFAULT_TOD_BUCKET_WIDTH};
use mitwelten_explore_dataset_models::{TypedDataset, ViewConfiguration, to_typed_dataset};
use mitwelten_explore_spatial::RegionBounds;
use mitwelten_explore_url_state::{DEFAULT_BUCKET, UrlSearchArgs, UrlStateError};
use serde_json::Value;
use thiserror::Error;

pub use compare::{
    CompareData, CompareTrace, DatasetLabel, HexbinLayer, SpectrumData, apply_dataset_config,
};
pub use sources::DataSourceGroup;

#[derive(Debug, Error)]
pub enum DataHandlerError {
    #[error(transparent)]
    UrlState(#[from] UrlStateError),
    #[error("no dataset given")]
    MissingDataset,
    #[error("unsupported dataset: {0}")]
    UnknownDataset(Value),
    #[error("{datasets} datasets but {configs} configurations")]
    ConfigLength { datasets: usize, configs: usize },
}

/// Loads data on behalf of one request.
#[derive(Clone, Copy)]
pub struct DataHandler<'a> {
    api: &'a dyn ExploreApi,
    token: Option<&'a str>,
    region: RegionBounds,
    tod_bucket_width: u32,
}

impl<'a> DataHandler<'a> {
    #[must_use]
    pub const fn new(api: &'a dyn ExploreApi, region: RegionBounds) -> Self {
        Self {
            api,
            token: None,
            region,
            tod_bucket_width: DEFAULT_TOD_BUCKET_WIDTH,
        }
    }

    #[must_use]
    pub const fn from_config(api: &'a dyn ExploreApi, config: &AppConfig) -> Self {
        Self::new(api, config.region)
    }

    /// Bearer token forwarded to endpoints that require one.
    #[must_use]
    pub const fn with_token(mut self, token: Option<&'a str>) -> Self {
        self.token = token;
        self
    }

    /// Width of the time-of-day buckets in minutes.
    #[must_use]
    pub const fn with_tod_bucket_width(mut self, minutes: u32) -> Self {
        self.tod_bucket_width = minutes;
        self
    }

    #[must_use]
    pub const fn region(&self) -> RegionBounds {
        self.region
    }
}

impl std::fmt::Debug for DataHandler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataHandler")
            .field("token", &self.token.map(|_| "<redacted>"))
            .field("region", &self.region)
            .field("tod_bucket_width", &self.tod_bucket_width)
            .finish_non_exhaustive()
    }
}

fn time_range(vc: &ViewConfiguration) -> TimeRange {
    TimeRange {
        from: vc.time_from,
        to: vc.time_to,
    }
}

fn bucket(vc: &ViewConfiguration) -> &str {
    vc.bucket.as_deref().unwrap_or(DEFAULT_BUCKET)
}

/// Decodes a dataset dictionary.
///
/// # Errors
///
/// Returns [`DataHandlerError::UnknownDataset`] if the dictionary is not a
/// supported dataset.
pub fn typed_dataset(dataset: &Value) -> Result<TypedDataset, DataHandlerError> {
    to_typed_dataset(dataset).ok_or_else(|| DataHandlerError::UnknownDataset(dataset.clone()))
}

/// The single dataset of a link and the link's global view configuration.
///
/// # Errors
///
/// Returns an error if the link has no `dataset` or it is not supported.
pub fn single_dataset(
    args: &UrlSearchArgs,
) -> Result<(TypedDataset, ViewConfiguration), DataHandlerError> {
    let dataset = args
        .dataset
        .as_ref()
        .ok_or(DataHandlerError::MissingDataset)?;
    Ok((typed_dataset(dataset)?, args.view_config()))
}

/// The datasets of a multi-dataset link paired with their configurations.
///
/// A link without `cfg` uses the type defaults of every dataset.
///
/// # Errors
///
/// Returns [`DataHandlerError::ConfigLength`] if `cfg` and `datasets`
/// differ in length, and [`DataHandlerError::UnknownDataset`] for an
/// unsupported dataset.
pub fn configured_datasets(
    args: &UrlSearchArgs,
) -> Result<Vec<(TypedDataset, ViewConfiguration)>, DataHandlerError> {
    let datasets = args.datasets.as_deref().unwrap_or_default();
    let datasets = datasets
        .iter()
        .map(typed_dataset)
        .collect::<Result<Vec<_>, _>>()?;

    match &args.cfg {
        Some(cfg) if cfg.len() != datasets.len() => Err(DataHandlerError::ConfigLength {
            datasets: datasets.len(),
            configs: cfg.len(),
        }),
        Some(cfg) => Ok(datasets.into_iter().zip(cfg.iter().cloned()).collect()),
        None => Ok(datasets
            .into_iter()
            .map(|ds| {
                let cfg = ViewConfiguration::default_for(ds.dataset_type());
                (ds, cfg)
            })
            .collect()),
    }
}
