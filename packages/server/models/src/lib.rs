#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types of the explore server.
//!
//! Data endpoints answer with the types of the data handler; the types here
//! cover the server's own parameters and the user data endpoints.

use mitwelten_explore_api_models::{Annotation, AppUser, WikiSummary};
use mitwelten_explore_dataset_models::Taxon;
use mitwelten_explore_spatial::{MapCenter, MapView};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Service status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    pub healthy: bool,
    pub version: String,
}

/// Settings clients need to build links and sign in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicConfig {
    pub data_api_url: String,
    pub path_prefix: String,
    pub domain_name: Option<String>,
    /// Realm URL of the identity provider.
    pub identity_realm_url: Option<String>,
    pub identity_client_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonDatasetParams {
    /// `gbif` for the GBIF occurrence dataset, Mitwelten detections
    /// otherwise.
    pub source: Option<String>,
}

/// Error body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Viewport arguments of the hexbin endpoint, read next to the link
/// arguments.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MapViewParams {
    pub zoom: Option<f64>,
    /// Center latitude.
    pub clat: Option<f64>,
    /// Center longitude.
    pub clon: Option<f64>,
}

impl MapViewParams {
    /// The requested view. A center needs both coordinates.
    #[must_use]
    pub fn view(self) -> MapView {
        MapView {
            zoom: self.zoom,
            center: self
                .clat
                .zip(self.clon)
                .map(|(lat, lon)| MapCenter { lat, lon }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SpectrumParams {
    /// Number of period buckets.
    pub bins: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryParams {
    /// Wikipedia language, `en` when absent.
    pub lang: Option<String>,
}

/// Body of `POST /api/link`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkRequest {
    /// Query string of the link, with or without the leading `?`.
    pub query: String,
    /// Page the link points to, such as `viz/compare`.
    #[serde(default)]
    pub page: Option<String>,
    /// Index of the dataset whose configuration `cfg` replaces.
    #[serde(default)]
    pub cfg_index: Option<usize>,
    #[serde(default)]
    pub cfg: Option<Value>,
}

/// A canonical link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResponse {
    pub query: String,
    /// Absolute or prefix-relative page URL when a page was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationFilter {
    /// Only annotations of the user with this subject id.
    pub user: Option<String>,
}

/// Body of `POST /api/annotations`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationBody {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of `PUT /api/annotations/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationContent {
    pub content: String,
}

/// An annotation with its author and display helpers.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationView {
    #[serde(flatten)]
    pub annotation: Annotation,
    pub author: AppUser,
    pub time_label: Option<String>,
    /// Relative age such as `3 days ago`.
    pub age: Option<String>,
    /// Content without markdown markup.
    pub preview: String,
}

/// Body of `POST /api/collection`.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionBody {
    pub datasets: Vec<Value>,
}

/// Background information on a taxon.
#[derive(Debug, Clone, Serialize)]
pub struct TaxonSummary {
    pub taxon: Taxon,
    pub dataset: Value,
    pub wiki: Option<WikiSummary>,
    pub wiki_link: Option<String>,
    /// Markdown credit line of the taxon image.
    pub image_attribution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_needs_both_coordinates() {
        let params = MapViewParams {
            zoom: Some(12.0),
            clat: Some(47.5),
            clon: None,
        };
        assert_eq!(params.view().center, None);

        let params = MapViewParams {
            clon: Some(7.6),
            ..params
        };
        assert_eq!(
            params.view().center,
            Some(MapCenter {
                lat: 47.5,
                lon: 7.6
            })
        );
    }
}
