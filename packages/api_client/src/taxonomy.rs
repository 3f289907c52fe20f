//! Taxonomy lookups.

use mitwelten_explore_dataset_models::{GbifTaxon, Rank, Taxon, TypedDataset};
use serde_json::Value;

use crate::{ApiRequest, CacheDomain, ExploreApi, fetch, or_log};

pub async fn taxa_by_level(api: &dyn ExploreApi, rank: Rank) -> Vec<Taxon> {
    let request = ApiRequest::data(CacheDomain::Taxonomy, format!("taxonomy/level/{rank}"));
    or_log(fetch(api, request).await, "Taxa by level").unwrap_or_default()
}

/// The taxon and all its ancestors.
pub async fn parent_taxonomy(api: &dyn ExploreApi, taxon_key: i64) -> Vec<Taxon> {
    let request = ApiRequest::data(CacheDomain::Taxonomy, format!("taxonomy/id/{taxon_key}"));
    or_log(fetch(api, request).await, "Taxonomy").unwrap_or_default()
}

/// The most specific entry of a taxonomy tree; entries without a rank come
/// last.
#[must_use]
pub fn most_specific(tree: Vec<Taxon>) -> Option<Taxon> {
    tree.into_iter().min_by_key(|t| (t.rank.is_none(), t.rank))
}

pub async fn taxon(api: &dyn ExploreApi, taxon_key: i64) -> Option<Taxon> {
    most_specific(parent_taxonomy(api, taxon_key).await)
}

/// Bird dataset dictionary of a taxon.
pub async fn taxon_dataset(api: &dyn ExploreApi, taxon_key: i64) -> Option<Value> {
    taxon(api, taxon_key)
        .await
        .map(|t| TypedDataset::Birds(t).to_dataset())
}

/// GBIF dataset dictionary of a taxon.
pub async fn gbif_taxon_dataset(api: &dyn ExploreApi, taxon_key: i64) -> Option<Value> {
    taxon(api, taxon_key).await.map(|t| {
        TypedDataset::Gbif(GbifTaxon {
            datum_id: t.datum_id,
            label_sci: t.label_sci,
            label_de: t.label_de,
            label_en: t.label_en,
            image_url: t.image_url,
            rank: t.rank,
            lat_range: None,
            lon_range: None,
        })
        .to_dataset()
    })
}
