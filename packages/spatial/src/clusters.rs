//! Grouping of points into H3 cells.

use std::collections::HashMap;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use h3o::{CellIndex, LatLng, Resolution};
use mitwelten_explore_dataset_models::Aggregation;
use serde_json::Value;

fn cell_of(lat: f64, lon: f64, resolution: Resolution) -> Option<CellIndex> {
    match LatLng::new(lat, lon) {
        Ok(coord) => Some(coord.to_cell(resolution)),
        Err(e) => {
            log::warn!("Skipping point ({lat}, {lon}): {e}");
            None
        }
    }
}

/// Aggregates point values per H3 cell.
///
/// Returns one `(cell, value)` pair per occupied cell, in the order the
/// cells are first encountered. Grouping does not depend on the input
/// order; the per-cell value does only if `reducer` does. Points with
/// invalid coordinates are skipped.
///
/// # Panics
///
/// Panics if `lat`, `lon` and `values` differ in length.
#[must_use]
pub fn generate_clusters(
    resolution: Resolution,
    lat: &[f64],
    lon: &[f64],
    values: &[f64],
    reducer: Aggregation,
) -> Vec<(CellIndex, f64)> {
    assert_eq!(lat.len(), lon.len(), "latitude/longitude length mismatch");
    assert_eq!(lat.len(), values.len(), "coordinate/value length mismatch");

    let mut slots: HashMap<CellIndex, usize> = HashMap::new();
    let mut groups: Vec<(CellIndex, Vec<f64>)> = Vec::new();

    for ((&lat, &lon), &value) in lat.iter().zip(lon).zip(values) {
        let Some(cell) = cell_of(lat, lon, resolution) else {
            continue;
        };
        let slot = *slots.entry(cell).or_insert_with(|| {
            groups.push((cell, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(value);
    }

    groups
        .into_iter()
        .map(|(cell, values)| (cell, reducer.reduce(&values)))
        .collect()
}

/// Ids of the points that fall into `cell` at the cell's own resolution.
///
/// # Panics
///
/// Panics if `lat`, `lon` and `ids` differ in length.
#[must_use]
pub fn points_in_cluster<T: Clone>(cell: CellIndex, lat: &[f64], lon: &[f64], ids: &[T]) -> Vec<T> {
    assert_eq!(lat.len(), lon.len(), "latitude/longitude length mismatch");
    assert_eq!(lat.len(), ids.len(), "coordinate/id length mismatch");

    let resolution = cell.resolution();
    lat.iter()
        .zip(lon)
        .zip(ids)
        .filter(|((lat, lon), _)| cell_of(**lat, **lon, resolution) == Some(cell))
        .map(|(_, id)| id.clone())
        .collect()
}

/// Outline polygons of `cells` as a `GeoJSON` feature collection.
///
/// Each feature carries its cell id in `properties.h3index`; rings are
/// closed and use `[lon, lat]` positions.
#[must_use]
pub fn generate_geojson(cells: impl IntoIterator<Item = CellIndex>) -> FeatureCollection {
    let features = cells
        .into_iter()
        .map(|cell| {
            let mut ring: Vec<Vec<f64>> = cell
                .boundary()
                .iter()
                .map(|vertex| vec![vertex.lng(), vertex.lat()])
                .collect();
            if let Some(first) = ring.first().cloned() {
                ring.push(first);
            }

            let mut properties = JsonObject::new();
            properties.insert("h3index".to_string(), Value::String(cell.to_string()));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Polygon(vec![ring]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAT: [f64; 5] = [47.559_600, 47.559_601, 47.535_200, 47.535_201, 47.400_000];
    const LON: [f64; 5] = [7.588_600, 7.588_601, 7.606_300, 7.606_301, 7.700_000];
    const VALUES: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

    fn sorted(mut clusters: Vec<(CellIndex, f64)>) -> Vec<(CellIndex, f64)> {
        clusters.sort_by_key(|(cell, _)| *cell);
        clusters
    }

    #[test]
    fn groups_nearby_points() {
        let clusters = generate_clusters(Resolution::Eight, &LAT, &LON, &VALUES, Aggregation::Sum);
        assert_eq!(clusters.len(), 3);
        let total: f64 = clusters.iter().map(|(_, v)| v).sum();
        assert!((total - 15.0).abs() < f64::EPSILON);
        assert!((clusters[0].1 - 3.0).abs() < f64::EPSILON);
        assert!(clusters.iter().all(|(cell, _)| cell.resolution() == Resolution::Eight));
    }

    #[test]
    fn grouping_is_order_independent() {
        let forward = generate_clusters(Resolution::Nine, &LAT, &LON, &VALUES, Aggregation::Max);

        let mut lat = LAT;
        let mut lon = LON;
        let mut values = VALUES;
        lat.reverse();
        lon.reverse();
        values.reverse();
        let reversed = generate_clusters(Resolution::Nine, &lat, &lon, &values, Aggregation::Max);

        assert_eq!(sorted(forward), sorted(reversed));
    }

    #[test]
    fn empty_input_yields_no_cells() {
        let clusters = generate_clusters(Resolution::Seven, &[], &[], &[], Aggregation::Mean);
        assert!(clusters.is_empty());
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn mismatched_lengths_panic() {
        let _ = generate_clusters(Resolution::Seven, &[47.5], &[7.6, 7.7], &[1.0], Aggregation::Sum);
    }

    #[test]
    fn skips_invalid_coordinates() {
        let clusters = generate_clusters(
            Resolution::Eight,
            &[47.55, f64::NAN],
            &[7.59, 7.6],
            &[1.0, 2.0],
            Aggregation::Sum,
        );
        assert_eq!(clusters.len(), 1);
    }

    #[test]
    fn finds_points_of_a_cell() {
        let clusters = generate_clusters(Resolution::Eight, &LAT, &LON, &VALUES, Aggregation::Sum);
        let ids = ["a", "b", "c", "d", "e"];
        let members = points_in_cluster(clusters[0].0, &LAT, &LON, &ids);
        assert_eq!(members, vec!["a", "b"]);
    }

    #[test]
    fn geojson_has_closed_rings() {
        let cell = LatLng::new(47.5596, 7.5886)
            .unwrap()
            .to_cell(Resolution::Nine);
        let collection = generate_geojson([cell]);
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        assert_eq!(
            feature.properties.as_ref().unwrap()["h3index"],
            Value::String(cell.to_string())
        );
        let Some(geojson::Value::Polygon(rings)) = feature.geometry.as_ref().map(|g| &g.value)
        else {
            panic!("expected a polygon");
        };
        assert!(rings[0].len() >= 7);
        assert_eq!(rings[0].first(), rings[0].last());
    }
}
