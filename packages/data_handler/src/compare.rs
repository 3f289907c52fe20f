//! Multi-dataset views: comparison, spectrum and hexbin maps.

use futures::future::join_all;
use mitwelten_explore_api_models::{LocationData, TimeSeries};
use mitwelten_explore_dataset_models::{Aggregation, TypedDataset, ViewConfiguration};
use mitwelten_explore_spatial::{HexbinMap, MapView, SpatialPoint};
use mitwelten_explore_timeseries::{
    DEFAULT_FFT_BINS, FftBins, SeriesRef, Spectrum, compute_fft, correlation_matrix,
    create_fft_bins, interpolate_nan,
};
use mitwelten_explore_url_state::UrlSearchArgs;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{DataHandler, DataHandlerError, configured_datasets, single_dataset};

/// Series need more than this many samples for a spectrum.
const MIN_SPECTRUM_SAMPLES: usize = 24;

/// Display labels of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetLabel {
    pub title: String,
    pub unit: String,
    pub location: String,
    pub dataset: Value,
}

impl From<&TypedDataset> for DatasetLabel {
    fn from(dataset: &TypedDataset) -> Self {
        Self {
            title: dataset.title(),
            unit: dataset.unit(),
            location: dataset.location(),
            dataset: dataset.to_dataset(),
        }
    }
}

/// One dataset of the comparison view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareTrace {
    #[serde(flatten)]
    pub label: DatasetLabel,
    pub config: Map<String, Value>,
    pub series: Option<TimeSeries>,
    pub stats: Map<String, Value>,
    pub spectrum: Option<FftBins>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareData {
    pub traces: Vec<CompareTrace>,
    /// Upper triangular Pearson matrix in trace order.
    pub correlation: Option<Vec<Vec<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumData {
    #[serde(flatten)]
    pub label: DatasetLabel,
    pub spectrum: Option<Spectrum>,
    pub bins: FftBins,
}

/// Hexbin map of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HexbinLayer {
    #[serde(flatten)]
    pub label: DatasetLabel,
    pub locations: LocationData,
    pub map: HexbinMap,
}

/// Magnitude spectrum of a series, with gaps interpolated.
fn spectrum_of(series: &TimeSeries) -> Option<Spectrum> {
    if series.values.len() <= MIN_SPECTRUM_SAMPLES {
        return None;
    }
    compute_fft(&interpolate_nan(&series.values), &series.dates)
}

fn spatial_points(data: &LocationData) -> Vec<SpatialPoint> {
    data.latitude
        .iter()
        .zip(&data.longitude)
        .zip(&data.values)
        .zip(&data.id)
        .map(|(((lat, lon), value), id)| SpatialPoint {
            latitude: *lat,
            longitude: *lon,
            value: *value,
            id: id.clone(),
        })
        .collect()
}

impl DataHandler<'_> {
    /// Time series, statistics and spectra of every dataset of a link plus
    /// the correlation matrix between the series.
    ///
    /// # Errors
    ///
    /// Returns an error if `datasets` and `cfg` disagree in length or a
    /// dataset is not supported.
    pub async fn load_compare_data(
        &self,
        args: &UrlSearchArgs,
    ) -> Result<CompareData, DataHandlerError> {
        let configured = configured_datasets(args)?;
        let vc = args.view_config();

        let series = join_all(
            configured
                .iter()
                .map(|(dataset, cfg)| self.load_ts_data(dataset, cfg, &vc)),
        )
        .await;
        let stats = join_all(
            configured
                .iter()
                .map(|(dataset, cfg)| self.load_statsagg_data(dataset, cfg, &vc)),
        )
        .await;

        let refs: Vec<SeriesRef<'_>> = series
            .iter()
            .map(|s| SeriesRef {
                dates: s.as_ref().map_or(&[][..], |s| s.dates.as_slice()),
                values: s.as_ref().map_or(&[][..], |s| s.values.as_slice()),
            })
            .collect();
        let correlation = correlation_matrix(&refs);

        let traces = configured
            .iter()
            .zip(series)
            .zip(stats)
            .map(|(((dataset, cfg), series), stats)| {
                let spectrum = series.as_ref().and_then(spectrum_of).map(|spectrum| {
                    create_fft_bins(Some(&spectrum), DEFAULT_FFT_BINS, Aggregation::Max)
                });
                CompareTrace {
                    label: DatasetLabel::from(dataset),
                    config: cfg.to_dict(),
                    series,
                    stats,
                    spectrum,
                }
            })
            .collect();

        Ok(CompareData {
            traces,
            correlation,
        })
    }

    /// Binned magnitude spectrum of the single dataset of a link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has no usable `dataset`.
    pub async fn load_spectrum(
        &self,
        args: &UrlSearchArgs,
        n_bins: usize,
    ) -> Result<SpectrumData, DataHandlerError> {
        let (dataset, vc) = single_dataset(args)?;
        let series = self.load_ts_data(&dataset, &vc, &vc).await;
        let spectrum = series.as_ref().and_then(spectrum_of);
        let bins = create_fft_bins(spectrum.as_ref(), n_bins, Aggregation::Max);
        Ok(SpectrumData {
            label: DatasetLabel::from(&dataset),
            spectrum,
            bins,
        })
    }

    /// One hexbin map per dataset of a link, aggregating location values by
    /// sum. A link with a single `dataset` yields one layer.
    ///
    /// # Errors
    ///
    /// Returns an error if `datasets` and `cfg` disagree in length or a
    /// dataset is not supported.
    pub async fn load_hexbin_layers(
        &self,
        args: &UrlSearchArgs,
        view: MapView,
    ) -> Result<Vec<HexbinLayer>, DataHandlerError> {
        let configured = if args.datasets.is_some() {
            configured_datasets(args)?
        } else {
            vec![single_dataset(args)?]
        };
        let vc = args.view_config();

        let locations = join_all(
            configured
                .iter()
                .map(|(dataset, cfg)| self.load_map_data(dataset, cfg, &vc)),
        )
        .await;

        Ok(configured
            .iter()
            .zip(locations)
            .map(|((dataset, _), locations)| {
                let map = HexbinMap::build(&spatial_points(&locations), view, Aggregation::Sum);
                HexbinLayer {
                    label: DatasetLabel::from(dataset),
                    locations,
                    map,
                }
            })
            .collect())
    }
}

/// Replaces the configuration of one dataset of a link and returns the
/// re-encoded query string.
///
/// # Errors
///
/// Returns an error if `index` does not address a dataset.
pub fn apply_dataset_config(
    args: &mut UrlSearchArgs,
    index: usize,
    config: ViewConfiguration,
) -> Result<String, DataHandlerError> {
    args.set_cfg(index, config)?;
    Ok(args.to_query())
}

#[cfg(test)]
mod tests {
    use mitwelten_explore_api_client::memory::MemoryApi;
    use mitwelten_explore_spatial::RegionBounds;
    use serde_json::json;

    use super::*;

    fn daily(values: &[f64]) -> Value {
        let dates: Vec<String> = (0..values.len())
            .map(|day| format!("2023-05-{:02}T00:00:00", day + 1))
            .collect();
        json!({"bucket": dates, "detections": values})
    }

    #[tokio::test]
    async fn compares_two_datasets() {
        let api = MemoryApi::new()
            .with("birds/212/date", daily(&[1.0, 2.0, 3.0, 4.0]))
            .with("birds/330/date", daily(&[2.0, 4.0, 6.0, 8.0]))
            .with("birds/212/count", json!(10))
            .with("birds/330/count", json!(20));
        let handler = DataHandler::new(&api, RegionBounds::BASEL);
        let args = UrlSearchArgs::from_query(
            "datasets=[{'type':'birds','datum_id':212},{'type':'birds','datum_id':330}]\
             &cfg=[{'confidence':0.7,'normalize':False},{'confidence':0.9,'normalize':True}]",
        )
        .unwrap();

        let data = handler.load_compare_data(&args).await.unwrap();
        assert_eq!(data.traces.len(), 2);
        let matrix = data.correlation.unwrap();
        assert!((matrix[0][1] - 1.0).abs() < 1e-9);
        assert!(matrix[1][0].abs() < f64::EPSILON);
        assert_eq!(data.traces[1].stats["total_detections"], json!(20.0));
        assert!(data.traces[0].spectrum.is_none());
        assert_eq!(
            data.traces[1].series.as_ref().unwrap().values,
            vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]
        );
        assert!(
            api.urls()
                .contains(&"birds/330/date?bucket_width=1d&conf=0.9".to_string())
        );
    }

    #[tokio::test]
    async fn spectrum_of_a_daily_cycle() {
        let hourly: Vec<String> = (0..48)
            .map(|h| format!("2023-05-{:02}T{:02}:00:00", 1 + h / 24, h % 24))
            .collect();
        let values: Vec<f64> = (0..48)
            .map(|h| (f64::from(h) * std::f64::consts::TAU / 24.0).sin() + 2.0)
            .collect();
        let api = MemoryApi::new().with(
            "sensordata/pax/9",
            json!({"buckets": hourly, "pax": values}),
        );
        let handler = DataHandler::new(&api, RegionBounds::BASEL);
        let args = UrlSearchArgs::from_query("dataset={'type':'pax','deployment_id':9}&bucket=1h")
            .unwrap();

        let data = handler.load_spectrum(&args, 16).await.unwrap();
        let spectrum = data.spectrum.unwrap();
        let (peak, _) = spectrum
            .magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert!((spectrum.periods[peak] - 86_400.0).abs() < f64::EPSILON);
        assert!(!data.bins.values.is_empty());
        assert_eq!(data.label.title, "PAX Counter ");
    }

    #[test]
    fn spectrum_needs_more_than_one_window() {
        let series = |len: usize| TimeSeries {
            dates: (0..len)
                .map(|h| format!("2023-05-{:02}T{:02}:00:00", 1 + h / 24, h % 24))
                .collect(),
            values: (0..len).map(|h| if h % 2 == 0 { 1.0 } else { 3.0 }).collect(),
        };
        assert!(spectrum_of(&series(MIN_SPECTRUM_SAMPLES)).is_none());
        assert!(spectrum_of(&series(MIN_SPECTRUM_SAMPLES + 1)).is_some());
    }

    #[tokio::test]
    async fn hexbins_per_dataset() {
        let api = MemoryApi::new()
            .with(
                "birds/212/location",
                json!([
                    {"location": {"lat": 47.5596, "lon": 7.5886}, "deployment_id": 806, "detections": 4},
                    {"location": {"lat": 47.5597, "lon": 7.5887}, "deployment_id": 807, "detections": 6}
                ]),
            )
            .with(
                "deployments",
                json!([{"deployment_id": 3, "location": {"lat": 47.53, "lon": 7.6}}]),
            );
        let handler = DataHandler::new(&api, RegionBounds::BASEL);
        let args = UrlSearchArgs::from_query(
            "datasets=[{'type':'birds','datum_id':212},{'type':'pax','deployment_id':3}]",
        )
        .unwrap();

        let layers = handler
            .load_hexbin_layers(&args, MapView::default())
            .await
            .unwrap();
        assert_eq!(layers.len(), 2);
        let birds = &layers[0].map;
        let cells = birds.cells.as_ref().unwrap();
        let total: f64 = cells.values.iter().sum();
        assert!((total - 10.0).abs() < f64::EPSILON);
        assert_eq!(layers[1].locations.len(), 1);
    }

    #[test]
    fn applies_dataset_config() {
        let mut args = UrlSearchArgs::from_query(
            "datasets=[{'type':'birds','datum_id':212},{'type':'pax','deployment_id':3}]",
        )
        .unwrap();
        let query = apply_dataset_config(
            &mut args,
            1,
            ViewConfiguration {
                normalize: true,
                ..ViewConfiguration::default()
            },
        )
        .unwrap();
        let reread = UrlSearchArgs::from_query(&query).unwrap();
        let cfg = reread.cfg.unwrap();
        assert_eq!(cfg[0].confidence, Some(0.6));
        assert!(cfg[1].normalize);
        assert!(apply_dataset_config(&mut args, 5, ViewConfiguration::default()).is_err());
    }
}
