#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web JSON service behind the mitwelten explore dashboard.
//!
//! Data endpoints take the dashboard's shareable link as their query
//! string and answer with chart-ready series, maps and statistics loaded
//! from the Mitwelten data API. User data endpoints forward the caller's
//! bearer token upstream.

pub mod auth;
mod handlers;
pub mod text;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use mitwelten_explore_api_client::{DataApiClient, ExploreApi};
use mitwelten_explore_config::{AppConfig, ConfigError};
use mitwelten_explore_data_handler::DataHandler;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Upstream data API.
    pub api: Arc<dyn ExploreApi>,
    pub config: AppConfig,
}

impl AppState {
    #[must_use]
    pub fn new(api: Arc<dyn ExploreApi>, config: AppConfig) -> Self {
        Self { api, config }
    }

    /// Data handler for one request, forwarding `token` upstream.
    #[must_use]
    pub fn handler<'a>(&'a self, token: Option<&'a str>) -> DataHandler<'a> {
        DataHandler::from_config(self.api.as_ref(), &self.config).with_token(token)
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/config", web::get().to(handlers::config))
            .route("/timeseries", web::get().to(handlers::timeseries))
            .route("/time-of-day", web::get().to(handlers::time_of_day))
            .route("/locations", web::get().to(handlers::locations))
            .route("/stats", web::get().to(handlers::stats))
            .route("/sources", web::get().to(handlers::sources))
            .route("/compare", web::get().to(handlers::compare))
            .route("/spectrum", web::get().to(handlers::spectrum))
            .route("/hexbins", web::get().to(handlers::hexbins))
            .route("/link", web::get().to(handlers::link))
            .route("/link", web::post().to(handlers::edit_link))
            .route(
                "/datasets/taxon/{key}",
                web::get().to(handlers::taxon_dataset),
            )
            .route("/taxon/{key}/summary", web::get().to(handlers::taxon_summary))
            .route("/annotations", web::get().to(handlers::list_annotations))
            .route("/annotations", web::post().to(handlers::create_annotation))
            .route("/annotations/{id}", web::get().to(handlers::get_annotation))
            .route("/annotations/{id}", web::put().to(handlers::update_annotation))
            .route(
                "/annotations/{id}",
                web::delete().to(handlers::delete_annotation),
            )
            .route("/collection", web::get().to(handlers::collection))
            .route("/collection", web::post().to(handlers::update_collection)),
    );
}

/// Reads the configuration from the environment and serves the API until
/// shut down.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the listener cannot
/// be bound.
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = AppConfig::from_env()?;
    log::info!("Using data API at {}", config.data_api_url);

    let api: Arc<dyn ExploreApi> = Arc::new(DataApiClient::from_config(&config));
    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    let state = web::Data::new(AppState::new(api, config));

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use mitwelten_explore_api_client::memory::MemoryApi;
    use serde_json::{Value, json};

    use super::*;

    const BIRDS_212: &str = "%7B%27type%27%3A%27birds%27%2C%27datum_id%27%3A212%7D";

    fn state(api: MemoryApi) -> web::Data<AppState> {
        web::Data::new(AppState::new(Arc::new(api), AppConfig::default()))
    }

    macro_rules! service {
        ($api:expr) => {
            test::init_service(App::new().app_data(state($api)).configure(configure)).await
        };
    }

    #[actix_web::test]
    async fn reports_health() {
        let app = service!(MemoryApi::new());
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], json!(true));
    }

    #[actix_web::test]
    async fn serves_bird_time_series() {
        let app = service!(MemoryApi::new().with(
            "birds/212/date",
            json!({"bucket": ["2023-05-01T00:00:00", "2023-05-02T00:00:00"], "detections": [3, 5]}),
        ));
        let req = test::TestRequest::get()
            .uri(&format!("/api/timeseries?dataset={BIRDS_212}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["values"], json!([3.0, 5.0]));
        assert_eq!(body["dates"][1], json!("2023-05-02T00:00:00"));
    }

    #[actix_web::test]
    async fn rejects_links_without_dataset() {
        let app = service!(MemoryApi::new());
        let req = test::TestRequest::get()
            .uri("/api/timeseries?bucket=1d")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn rejects_mismatched_configurations() {
        let app = service!(MemoryApi::new());
        let req = test::TestRequest::get()
            .uri(&format!(
                "/api/compare?datasets=%5B{BIRDS_212}%5D&cfg=%5B%7B%7D%2C%7B%7D%5D"
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn user_data_needs_a_token() {
        let app = service!(MemoryApi::new());
        let req = test::TestRequest::get().uri("/api/annotations").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get().uri("/api/collection").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn canonicalizes_links() {
        let app = service!(MemoryApi::new());
        let req = test::TestRequest::get()
            .uri(&format!("/api/link?trace={BIRDS_212}"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let query = body["query"].as_str().unwrap();
        assert!(query.contains("dataset="));
        assert!(!query.contains("trace="));
        assert!(body.get("url").is_none());
    }

    #[actix_web::test]
    async fn builds_page_links() {
        let app = service!(MemoryApi::new());
        let req = test::TestRequest::post()
            .uri("/api/link")
            .set_json(json!({"query": "?bucket=1w", "page": "viz/compare"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("/app/viz/compare?"));
        assert!(url.contains("bucket=1w"));
    }

    #[actix_web::test]
    async fn lists_annotations_with_previews() {
        let app = service!(MemoryApi::new().with(
            "explore/annotations",
            json!([{
                "id": 4,
                "title": "Swifts",
                "content": "**First** swifts",
                "created_at": "2023-05-01T08:00:00+00:00",
                "full_name": "Jane Doe"
            }]),
        ));
        let req = test::TestRequest::get()
            .uri("/api/annotations")
            .insert_header(("Authorization", "Bearer tok"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["preview"], json!("First swifts"));
        assert_eq!(body[0]["author"]["initials"], json!("JD"));
        assert_eq!(body[0]["time_label"], json!("01.05.2023 08:00 UTC"));
        assert!(body[0]["age"].as_str().unwrap().ends_with("ago"));
    }

    #[actix_web::test]
    async fn unknown_taxon_is_not_found() {
        let app = service!(MemoryApi::new());
        let req = test::TestRequest::get()
            .uri("/api/datasets/taxon/999")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
