#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial aggregation for the explore maps.
//!
//! Point observations are bucketed into H3 hexagons whose resolution
//! follows the map zoom level, so zoomed-out maps show coarse cells and
//! zoomed-in maps show fine cells plus the individual markers. Points
//! outside the configured region box are dropped before aggregation.

pub mod clusters;
pub mod map;

use std::str::FromStr;

use h3o::Resolution;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use clusters::{generate_clusters, generate_geojson, points_in_cluster};
pub use map::{HexbinMap, MapCenter, MapView};

/// Map center used when there is nothing to show.
pub const DEFAULT_CENTER: MapCenter = MapCenter {
    lat: 47.535_228_912_245_35,
    lon: 7.606_299_048_260_731,
};

/// Zoom level used when there is nothing to show.
pub const DEFAULT_ZOOM: f64 = 11.5;

/// Zoom returned for a zero-sized point extent.
pub const MAX_ZOOM: f64 = 18.0;

/// One located observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
    /// Deployment id, occurrence index or any other marker identifier.
    pub id: Value,
}

/// Error returned when a region box specification cannot be parsed.
#[derive(Debug, Error)]
pub enum RegionBoundsError {
    #[error("expected 'west,south,east,north', got '{0}'")]
    Format(String),
    #[error("invalid coordinate '{value}': {source}")]
    Coordinate {
        value: String,
        source: std::num::ParseFloatError,
    },
    #[error("empty region: west {west} > east {east} or south {south} > north {north}")]
    Empty {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },
}

/// An inclusive longitude/latitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl RegionBounds {
    /// The Basel area covered by the Mitwelten deployments.
    pub const BASEL: Self = Self {
        west: 5.5,
        south: 46.5,
        east: 9.0,
        north: 49.0,
    };

    /// Whether the point lies inside the box, borders included.
    ///
    /// Non-finite coordinates are never inside.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.west..=self.east).contains(&lon) && (self.south..=self.north).contains(&lat)
    }

    /// Drops the points outside the box.
    #[must_use]
    pub fn filter_points(&self, points: Vec<SpatialPoint>) -> Vec<SpatialPoint> {
        let total = points.len();
        let kept: Vec<SpatialPoint> = points
            .into_iter()
            .filter(|p| self.contains(p.latitude, p.longitude))
            .collect();
        if kept.len() < total {
            log::debug!(
                "Dropped {} of {total} points outside the region box",
                total - kept.len()
            );
        }
        kept
    }
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::BASEL
    }
}

impl FromStr for RegionBounds {
    type Err = RegionBoundsError;

    /// Parses `west,south,east,north`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(RegionBoundsError::Format(s.to_string()));
        }
        let mut coords = [0.0_f64; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|source| RegionBoundsError::Coordinate {
                    value: (*part).to_string(),
                    source,
                })?;
        }
        let [west, south, east, north] = coords;
        if west > east || south > north {
            return Err(RegionBoundsError::Empty {
                west,
                south,
                east,
                north,
            });
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }
}

/// Whether a point lies in the Basel region box.
#[must_use]
pub fn validate_coordinates(lat: f64, lon: f64) -> bool {
    RegionBounds::BASEL.contains(lat, lon)
}

/// Maps a continuous zoom level to an H3 resolution between 7 and 14.
///
/// The thresholds are fixed; shared links encode zoom levels that must keep
/// producing the same cells.
#[must_use]
pub fn zoom_to_cell_resolution(zoom: f64) -> Resolution {
    if zoom > 18.5 {
        Resolution::Fourteen
    } else if zoom > 17.0 {
        Resolution::Thirteen
    } else if zoom > 16.2 {
        Resolution::Twelve
    } else if zoom > 15.2 {
        Resolution::Eleven
    } else if zoom > 14.0 {
        Resolution::Ten
    } else if zoom > 12.5 {
        Resolution::Nine
    } else if zoom > 10.5 {
        Resolution::Eight
    } else {
        Resolution::Seven
    }
}

/// Estimates a zoom level showing the whole extent.
///
/// Uses `13.7 - ln(max(|Δlat|, |Δlon|) * 111)`, with 111 km per degree. A
/// zero-sized (or non-finite) extent yields [`MAX_ZOOM`].
#[must_use]
pub fn calculate_zoom_from_points(latmin: f64, latmax: f64, lonmin: f64, lonmax: f64) -> f64 {
    let max_bound = (lonmax - lonmin).abs().max((latmax - latmin).abs()) * 111.0;
    if max_bound <= 0.0 || !max_bound.is_finite() {
        return MAX_ZOOM;
    }
    13.7 - max_bound.ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_basel_region() {
        assert!(validate_coordinates(47.55, 7.59));
        assert!(!validate_coordinates(10.0, 50.0));
        assert!(!validate_coordinates(50.0, 10.0));
        assert!(!validate_coordinates(47.55, 10.0));
        assert!(!validate_coordinates(46.4, 7.59));
        assert!(validate_coordinates(46.5, 5.5));
        assert!(validate_coordinates(49.0, 9.0));
        assert!(!validate_coordinates(f64::NAN, 7.59));
    }

    #[test]
    fn zoom_boundaries() {
        assert_eq!(zoom_to_cell_resolution(18.5), Resolution::Thirteen);
        assert_eq!(zoom_to_cell_resolution(18.51), Resolution::Fourteen);
        assert_eq!(zoom_to_cell_resolution(17.0), Resolution::Twelve);
        assert_eq!(zoom_to_cell_resolution(16.2), Resolution::Eleven);
        assert_eq!(zoom_to_cell_resolution(15.2), Resolution::Ten);
        assert_eq!(zoom_to_cell_resolution(14.0), Resolution::Nine);
        assert_eq!(zoom_to_cell_resolution(12.5), Resolution::Eight);
        assert_eq!(zoom_to_cell_resolution(10.5), Resolution::Seven);
        assert_eq!(zoom_to_cell_resolution(7.0), Resolution::Seven);
        assert_eq!(zoom_to_cell_resolution(f64::NAN), Resolution::Seven);
    }

    #[test]
    fn zoom_from_extent() {
        assert!((calculate_zoom_from_points(47.5, 47.5, 7.6, 7.6) - MAX_ZOOM).abs() < f64::EPSILON);
        let zoom = calculate_zoom_from_points(47.5, 47.6, 7.5, 7.7);
        assert!((zoom - (13.7 - (0.2_f64 * 111.0).ln())).abs() < 1e-9);
        let swapped = calculate_zoom_from_points(47.6, 47.5, 7.7, 7.5);
        assert!((zoom - swapped).abs() < 1e-12);
    }

    #[test]
    fn parses_region_bounds() {
        let bounds: RegionBounds = "5.9, 45.8, 10.5, 47.8".parse().unwrap();
        assert!(bounds.contains(46.0, 10.0));
        assert!(!bounds.contains(48.0, 7.0));
        assert!("1,2,3".parse::<RegionBounds>().is_err());
        assert!("a,2,3,4".parse::<RegionBounds>().is_err());
        assert!("9,46,5,47".parse::<RegionBounds>().is_err());
        assert_eq!(RegionBounds::default(), RegionBounds::BASEL);
    }

    #[test]
    fn filters_points_outside_region() {
        let point = |lat, lon| SpatialPoint {
            latitude: lat,
            longitude: lon,
            value: 1.0,
            id: Value::Null,
        };
        let kept = RegionBounds::BASEL.filter_points(vec![
            point(47.55, 7.59),
            point(50.0, 10.0),
            point(47.4, 7.7),
        ]);
        assert_eq!(kept.len(), 2);
    }
}
