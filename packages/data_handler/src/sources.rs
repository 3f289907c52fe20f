//! Attribution of the data shown on a page.

use mitwelten_explore_api_client::gbif;
use mitwelten_explore_dataset_models::{TypedDataset, to_typed_dataset};
use mitwelten_explore_url_state::UrlSearchArgs;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{DataHandler, time_range};

/// Sources credited under one heading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSourceGroup {
    pub name: String,
    /// `{name, reference}` entries; GBIF entries are the dataset records
    /// returned upstream.
    pub sources: Vec<Value>,
}

impl DataHandler<'_> {
    /// Data sources behind the datasets of a link, grouped as Mitwelten,
    /// MeteoSwiss and GBIF datasets. Empty groups are left out and
    /// unsupported datasets are ignored.
    pub async fn get_data_sources(&self, args: &UrlSearchArgs) -> Vec<DataSourceGroup> {
        let datasets: Vec<TypedDataset> = args
            .datasets
            .iter()
            .flatten()
            .chain(&args.dataset)
            .filter_map(to_typed_dataset)
            .collect();
        let range = time_range(&args.view_config());

        let mut mitwelten = false;
        let mut meteoswiss = false;
        let mut gbif_datasets: Vec<Value> = Vec::new();

        for dataset in &datasets {
            match dataset {
                TypedDataset::Gbif(taxon) => {
                    let Some(id) = taxon.datum_id else { continue };
                    for source in gbif::datasets(self.api, id, range).await.unwrap_or_default() {
                        if !gbif_datasets.contains(&source) {
                            gbif_datasets.push(source);
                        }
                    }
                }
                TypedDataset::Meteo(_) => meteoswiss = true,
                _ => mitwelten = true,
            }
        }

        let mut groups = Vec::new();
        if mitwelten {
            groups.push(DataSourceGroup {
                name: "SNF Mitwelten".to_string(),
                sources: vec![json!({"name": "Mitwelten", "reference": "https://www.mitwelten.org"})],
            });
        }
        if meteoswiss {
            groups.push(DataSourceGroup {
                name: "MeteoSchweiz".to_string(),
                sources: vec![json!({
                    "name": "MeteoSchweiz",
                    "reference": "https://www.meteoschweiz.admin.ch/"
                })],
            });
        }
        if !gbif_datasets.is_empty() {
            groups.push(DataSourceGroup {
                name: "GBIF Datasets".to_string(),
                sources: gbif_datasets,
            });
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use mitwelten_explore_api_client::memory::MemoryApi;
    use mitwelten_explore_spatial::RegionBounds;

    use super::*;

    #[tokio::test]
    async fn groups_sources() {
        let api = MemoryApi::new().with(
            "gbif/5/datasets",
            json!([{"key": "a1", "title": "Observations CH"}, {"key": "a1", "title": "Observations CH"}]),
        );
        let handler = DataHandler::new(&api, RegionBounds::BASEL);
        let args = UrlSearchArgs::from_query(
            "datasets=[{'type':'gbif','datum_id':5},{'type':'meteodata','station_id':'BAS'},\
             {'type':'pax','deployment_id':1},{'type':'env_humi','deployment_id':2},{'type':'nope'}]",
        )
        .unwrap();

        let groups = handler.get_data_sources(&args).await;
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["SNF Mitwelten", "MeteoSchweiz", "GBIF Datasets"]);
        assert_eq!(groups[0].sources.len(), 1);
        assert_eq!(groups[2].sources.len(), 1);
    }

    #[tokio::test]
    async fn no_datasets_no_sources() {
        let api = MemoryApi::new();
        let handler = DataHandler::new(&api, RegionBounds::BASEL);
        assert!(handler.get_data_sources(&UrlSearchArgs::default()).await.is_empty());
    }
}
