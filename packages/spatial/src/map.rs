//! Hexbin map view model.

use geojson::FeatureCollection;
use h3o::Resolution;
use mitwelten_explore_dataset_models::Aggregation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    DEFAULT_CENTER, DEFAULT_ZOOM, SpatialPoint, calculate_zoom_from_points, generate_clusters,
    generate_geojson, zoom_to_cell_resolution,
};

/// Map center in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Requested viewport; missing parts are derived from the data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapView {
    pub zoom: Option<f64>,
    pub center: Option<MapCenter>,
}

/// Where a marker comes from. GBIF occurrences carry ids prefixed with
/// `g` and are drawn separately from Mitwelten deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSource {
    Gbif,
    Mitwelten,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerLayer {
    pub source: MarkerSource,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    pub ids: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellLayer {
    /// H3 cell ids as lowercase hex strings.
    pub ids: Vec<String>,
    pub values: Vec<f64>,
    pub geojson: FeatureCollection,
}

/// Everything needed to draw one hexbin map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexbinMap {
    pub zoom: f64,
    pub center: MapCenter,
    pub resolution: u8,
    /// Present while cells are coarse enough to be useful (resolution 13
    /// and below).
    pub cells: Option<CellLayer>,
    /// Individual markers, shown once cells are finer than resolution 7.
    pub markers: Vec<MarkerLayer>,
}

impl HexbinMap {
    /// Builds the map for `points`.
    ///
    /// Without points the map shows the requested (or default) viewport and
    /// nothing else. Otherwise a missing zoom is estimated from the point
    /// extent and a missing center is the middle of that extent.
    #[must_use]
    pub fn build(points: &[SpatialPoint], view: MapView, reducer: Aggregation) -> Self {
        if points.is_empty() {
            let zoom = view.zoom.unwrap_or(DEFAULT_ZOOM);
            return Self {
                zoom,
                center: view.center.unwrap_or(DEFAULT_CENTER),
                resolution: u8::from(zoom_to_cell_resolution(zoom)),
                cells: None,
                markers: Vec::new(),
            };
        }

        let lat: Vec<f64> = points.iter().map(|p| p.latitude).collect();
        let lon: Vec<f64> = points.iter().map(|p| p.longitude).collect();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();

        let (lat_min, lat_max) = extent(&lat);
        let (lon_min, lon_max) = extent(&lon);

        let zoom = view
            .zoom
            .unwrap_or_else(|| calculate_zoom_from_points(lat_min, lat_max, lon_min, lon_max));
        let center = view.center.unwrap_or_else(|| {
            if points.len() > 1 {
                MapCenter {
                    lat: f64::midpoint(lat_max, lat_min),
                    lon: f64::midpoint(lon_max, lon_min),
                }
            } else {
                MapCenter {
                    lat: lat_max,
                    lon: lon_max,
                }
            }
        });

        let resolution = zoom_to_cell_resolution(zoom);

        let markers = if resolution > Resolution::Seven {
            marker_layers(points)
        } else {
            Vec::new()
        };

        let cells = (resolution <= Resolution::Thirteen).then(|| {
            let clusters = generate_clusters(resolution, &lat, &lon, &values, reducer);
            CellLayer {
                ids: clusters.iter().map(|(cell, _)| cell.to_string()).collect(),
                values: clusters.iter().map(|(_, value)| *value).collect(),
                geojson: generate_geojson(clusters.iter().map(|(cell, _)| *cell)),
            }
        });

        log::debug!(
            "Hexbin map for {} points at zoom {zoom:.2} (resolution {resolution})",
            points.len()
        );

        Self {
            zoom,
            center,
            resolution: u8::from(resolution),
            cells,
            markers,
        }
    }
}

fn extent(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

fn marker_source(id: &Value) -> MarkerSource {
    match id {
        Value::String(s) if s.starts_with('g') => MarkerSource::Gbif,
        _ => MarkerSource::Mitwelten,
    }
}

fn marker_layers(points: &[SpatialPoint]) -> Vec<MarkerLayer> {
    [MarkerSource::Gbif, MarkerSource::Mitwelten]
        .into_iter()
        .filter_map(|source| {
            let members: Vec<&SpatialPoint> = points
                .iter()
                .filter(|p| marker_source(&p.id) == source)
                .collect();
            (!members.is_empty()).then(|| MarkerLayer {
                source,
                latitude: members.iter().map(|p| p.latitude).collect(),
                longitude: members.iter().map(|p| p.longitude).collect(),
                ids: members.iter().map(|p| p.id.clone()).collect(),
            })
        })
        .collect()
}
