//! Per-dataset loaders: time series, time of day, locations and summary
//! statistics.

use futures::future::join_all;
use mitwelten_explore_api_client::{
    birds, deployments, gbif, meteo,
    pollinators::{self, PollinatorFilter},
    sensordata,
};
use mitwelten_explore_api_models::{DetectionLocation, LocationData, TimeOfDay, TimeSeries};
use mitwelten_explore_dataset_models::{
    DeploymentSelection, PollinatorDataset, TypedDataset, ViewConfiguration,
};
use mitwelten_explore_timeseries::{merge_detections, normalize_min_max};
use mitwelten_explore_url_state::UrlSearchArgs;
use serde_json::{Map, Value, json};

use crate::{DataHandler, DataHandlerError, bucket, single_dataset, time_range};

/// Deployment ids a pollinator dataset is restricted to. Only an explicit
/// list restricts; a bare id reads as "all deployments".
fn pollinator_deployments(dataset: &PollinatorDataset) -> &[i64] {
    match &dataset.deployment_id {
        Some(DeploymentSelection::Many(ids)) => ids,
        _ => &[],
    }
}

fn pollinator_filter<'d>(
    dataset: &'d PollinatorDataset,
    cfg: &ViewConfiguration,
) -> PollinatorFilter<'d> {
    PollinatorFilter {
        class: dataset.pollinator_class,
        deployment_ids: pollinator_deployments(dataset),
        confidence: cfg.confidence,
    }
}

fn selected_ids(selection: Option<&DeploymentSelection>) -> Vec<i64> {
    selection.map(DeploymentSelection::ids).unwrap_or_default()
}

fn normalized_series(series: Option<TimeSeries>, normalize: bool) -> Option<TimeSeries> {
    series.map(|mut series| {
        if normalize {
            series.values = normalize_min_max(&series.values);
        }
        series
    })
}

fn normalized_tod(tod: Option<TimeOfDay>, normalize: bool) -> Option<TimeOfDay> {
    tod.map(|mut tod| {
        if normalize {
            tod.values = normalize_min_max(&tod.values);
        }
        tod
    })
}

fn merge_series(parts: Vec<Option<TimeSeries>>) -> Option<TimeSeries> {
    parts
        .into_iter()
        .fold(None, |acc, part| {
            merge_detections(acc, part.map(|s| (s.dates, s.values)))
        })
        .map(|(dates, values)| TimeSeries { dates, values })
}

fn merge_tod(parts: Vec<Option<TimeOfDay>>) -> Option<TimeOfDay> {
    parts
        .into_iter()
        .fold(None, |acc, part| {
            merge_detections(acc, part.map(|t| (t.minute_of_day, t.values)))
        })
        .map(|(minute_of_day, values)| TimeOfDay {
            minute_of_day,
            values,
        })
}

impl DataHandler<'_> {
    /// Bucketed values of `dataset` over the global time range.
    ///
    /// Confidence, aggregation and normalization come from `cfg`; bucket
    /// width and time range from `vc`. `None` when the dataset has no data
    /// or lacks the ids to ask for it.
    pub async fn load_ts_data(
        &self,
        dataset: &TypedDataset,
        cfg: &ViewConfiguration,
        vc: &ViewConfiguration,
    ) -> Option<TimeSeries> {
        let (bucket, range) = (bucket(vc), time_range(vc));
        let series = match dataset {
            TypedDataset::Birds(taxon) => {
                birds::detection_dates(self.api, taxon.datum_id?, cfg.confidence, bucket, range)
                    .await
            }
            TypedDataset::Gbif(taxon) => {
                gbif::detection_dates(self.api, taxon.datum_id?, bucket, range).await
            }
            TypedDataset::Meteo(meteo) => {
                meteo::measurements(
                    self.api,
                    meteo.station_id.as_deref()?,
                    meteo.param_id.as_deref()?,
                    bucket,
                    cfg.agg,
                    range,
                    self.token,
                )
                .await
            }
            TypedDataset::Pax(pax) => {
                sensordata::pax_timeseries(self.api, pax.deployment_id?, bucket, range).await
            }
            TypedDataset::MultiPax(pax) => {
                let ids = selected_ids(pax.deployment_id.as_ref());
                let parts = join_all(
                    ids.iter()
                        .map(|id| sensordata::pax_timeseries(self.api, *id, bucket, range)),
                )
                .await;
                merge_series(parts)
            }
            TypedDataset::Pollinators(polli) => {
                pollinators::detection_dates(self.api, pollinator_filter(polli, cfg), bucket, range)
                    .await
            }
            TypedDataset::Environment(channel, env) => {
                sensordata::env_timeseries(
                    self.api,
                    env.deployment_id?,
                    *channel,
                    cfg.agg,
                    bucket,
                    range,
                )
                .await
            }
        };
        normalized_series(series, cfg.normalize)
    }

    /// Values of `dataset` per minute of the day, in buckets of the
    /// handler's time-of-day width.
    pub async fn load_tod_data(
        &self,
        dataset: &TypedDataset,
        cfg: &ViewConfiguration,
        vc: &ViewConfiguration,
    ) -> Option<TimeOfDay> {
        let (width, range) = (self.tod_bucket_width, time_range(vc));
        let tod = match dataset {
            TypedDataset::Birds(taxon) => {
                birds::detection_time_of_day(
                    self.api,
                    taxon.datum_id?,
                    cfg.confidence,
                    width,
                    range,
                )
                .await
            }
            TypedDataset::Gbif(taxon) => {
                gbif::detection_time_of_day(self.api, taxon.datum_id?, width, range).await
            }
            TypedDataset::Meteo(meteo) => {
                meteo::time_of_day(
                    self.api,
                    meteo.station_id.as_deref()?,
                    meteo.param_id.as_deref()?,
                    width,
                    cfg.agg,
                    range,
                    self.token,
                )
                .await
            }
            TypedDataset::Pax(pax) => {
                sensordata::pax_time_of_day(self.api, pax.deployment_id?, width, range).await
            }
            TypedDataset::MultiPax(pax) => {
                let ids = selected_ids(pax.deployment_id.as_ref());
                let parts = join_all(
                    ids.iter()
                        .map(|id| sensordata::pax_time_of_day(self.api, *id, width, range)),
                )
                .await;
                merge_tod(parts)
            }
            TypedDataset::Pollinators(polli) => {
                pollinators::detection_time_of_day(
                    self.api,
                    pollinator_filter(polli, cfg),
                    width,
                    range,
                )
                .await
            }
            TypedDataset::Environment(channel, env) => {
                sensordata::env_time_of_day(
                    self.api,
                    env.deployment_id?,
                    *channel,
                    cfg.agg,
                    width,
                    range,
                )
                .await
            }
        };
        normalized_tod(tod, cfg.normalize)
    }

    /// Positions of `dataset` inside the handler's region.
    ///
    /// Detection datasets carry their detection counts as values, fixed
    /// sensors and stations carry `1`.
    pub async fn load_map_data(
        &self,
        dataset: &TypedDataset,
        cfg: &ViewConfiguration,
        vc: &ViewConfiguration,
    ) -> LocationData {
        let range = time_range(vc);
        let mut data = LocationData::default();

        match dataset {
            TypedDataset::Birds(taxon) => {
                if let Some(id) = taxon.datum_id {
                    let locations =
                        birds::detection_locations(self.api, id, cfg.confidence, range, false, &[])
                            .await;
                    self.push_deployments(&mut data, locations.unwrap_or_default());
                }
            }
            TypedDataset::Pollinators(polli) => {
                let locations =
                    pollinators::detection_locations(self.api, pollinator_filter(polli, cfg), range)
                        .await;
                self.push_deployments(&mut data, locations.unwrap_or_default());
            }
            TypedDataset::Gbif(taxon) => {
                if let Some(id) = taxon.datum_id {
                    let locations = gbif::detection_locations(self.api, id, range).await;
                    for (index, location) in locations.unwrap_or_default().into_iter().enumerate() {
                        self.push(
                            &mut data,
                            "observation".to_string(),
                            location.location.lat,
                            location.location.lon,
                            json!(format!("g{index}")),
                            location.detections.unwrap_or(1.0),
                        );
                    }
                }
            }
            TypedDataset::Meteo(meteo) => {
                if let Some(station_id) = meteo.station_id.as_deref() {
                    let stations = meteo::stations(self.api, Some(station_id)).await;
                    if let Some(station) = stations.first()
                        && let Some(location) = station.location
                    {
                        self.push(
                            &mut data,
                            station.station_name.clone().unwrap_or_default(),
                            location.lat,
                            location.lon,
                            json!(station_id),
                            1.0,
                        );
                    }
                }
            }
            TypedDataset::Pax(pax) => {
                self.push_deployment(&mut data, pax.deployment_id).await;
            }
            TypedDataset::Environment(_, env) => {
                self.push_deployment(&mut data, env.deployment_id).await;
            }
            TypedDataset::MultiPax(pax) => {
                for id in selected_ids(pax.deployment_id.as_ref()) {
                    self.push_deployment(&mut data, Some(id)).await;
                }
            }
        }

        log::debug!("{} locations for {}", data.len(), dataset.title());
        data
    }

    fn push(
        &self,
        data: &mut LocationData,
        name: String,
        lat: f64,
        lon: f64,
        id: Value,
        value: f64,
    ) {
        if self.region.contains(lat, lon) {
            data.push(name, lat, lon, id, value);
        }
    }

    fn push_deployments(&self, data: &mut LocationData, locations: Vec<DetectionLocation>) {
        for location in locations {
            self.push(
                data,
                format!("deployment {}", id_label(location.deployment_id)),
                location.location.lat,
                location.location.lon,
                json!(location.deployment_id),
                location.detections.unwrap_or(1.0),
            );
        }
    }

    async fn push_deployment(&self, data: &mut LocationData, deployment_id: Option<i64>) {
        let Some(id) = deployment_id else {
            return;
        };
        if let Some(location) = deployments::deployment_location(self.api, id).await {
            self.push(
                data,
                format!("deployment {id}"),
                location.lat,
                location.lon,
                json!(id),
                1.0,
            );
        }
    }

    /// Summary statistics of `dataset` for the statistics card.
    pub async fn load_statsagg_data(
        &self,
        dataset: &TypedDataset,
        cfg: &ViewConfiguration,
        vc: &ViewConfiguration,
    ) -> Map<String, Value> {
        let range = time_range(vc);
        let total = |value: Value| {
            let mut stats = Map::new();
            stats.insert("total_detections".to_string(), value);
            stats
        };

        match dataset {
            TypedDataset::Meteo(meteo) => {
                let (Some(station_id), Some(param_id)) =
                    (meteo.station_id.as_deref(), meteo.param_id.as_deref())
                else {
                    return Map::new();
                };
                match meteo::summary(self.api, station_id, param_id, range, self.token).await {
                    Some(Value::Object(summary)) => summary,
                    _ => Map::new(),
                }
            }
            TypedDataset::Birds(taxon) => {
                let count = match taxon.datum_id {
                    Some(id) => birds::detection_count(self.api, id, cfg.confidence, range).await,
                    None => None,
                };
                total(json!(count.unwrap_or(0.0)))
            }
            TypedDataset::Gbif(taxon) => {
                let count = match taxon.datum_id {
                    Some(id) => gbif::detection_count(self.api, id, range).await,
                    None => None,
                };
                total(json!(count))
            }
            TypedDataset::Pax(_) | TypedDataset::MultiPax(_) | TypedDataset::Pollinators(_) => {
                let detections = self
                    .load_ts_data(
                        dataset,
                        &ViewConfiguration {
                            normalize: false,
                            ..cfg.clone()
                        },
                        vc,
                    )
                    .await;
                total(json!(detections.as_ref().map_or(0.0, TimeSeries::total)))
            }
            TypedDataset::Environment(..) => {
                let mut stats = Map::new();
                stats.insert("no data".to_string(), Value::Bool(true));
                stats
            }
        }
    }

    /// Time series of the single dataset of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has no usable `dataset`.
    pub async fn time_series_from_args(
        &self,
        args: &UrlSearchArgs,
    ) -> Result<Option<TimeSeries>, DataHandlerError> {
        let (dataset, vc) = single_dataset(args)?;
        Ok(self.load_ts_data(&dataset, &vc, &vc).await)
    }

    /// Time of day profile of the single dataset of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has no usable `dataset`.
    pub async fn time_of_day_from_args(
        &self,
        args: &UrlSearchArgs,
    ) -> Result<Option<TimeOfDay>, DataHandlerError> {
        let (dataset, vc) = single_dataset(args)?;
        Ok(self.load_tod_data(&dataset, &vc, &vc).await)
    }

    /// Locations of the single dataset of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has no usable `dataset`.
    pub async fn locations_from_args(
        &self,
        args: &UrlSearchArgs,
    ) -> Result<LocationData, DataHandlerError> {
        let (dataset, vc) = single_dataset(args)?;
        Ok(self.load_map_data(&dataset, &vc, &vc).await)
    }

    /// Statistics of the single dataset of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has no usable `dataset`.
    pub async fn statsagg_from_args(
        &self,
        args: &UrlSearchArgs,
    ) -> Result<Map<String, Value>, DataHandlerError> {
        let (dataset, vc) = single_dataset(args)?;
        Ok(self.load_statsagg_data(&dataset, &vc, &vc).await)
    }
}

fn id_label(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}
