//! HTTP handler functions for the explore API.
//!
//! Data endpoints read the shareable link from the raw query string, so a
//! dashboard URL's query can be forwarded unchanged.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{NaiveDateTime, SecondsFormat, Utc};
use mitwelten_explore_api_client::{taxonomy, third_party, user_from_token, userdata};
use mitwelten_explore_api_models::{Annotation, NewAnnotation, parse_api_timestamp};
use mitwelten_explore_data_handler::{DataHandlerError, apply_dataset_config};
use mitwelten_explore_dataset_models::{TypedDataset, ViewConfiguration};
use mitwelten_explore_server_models::{
    AnnotationBody, AnnotationContent, AnnotationFilter, AnnotationView, ApiError, ApiHealth,
    CollectionBody, LinkRequest, LinkResponse, MapViewParams, PublicConfig, SpectrumParams,
    SummaryParams, TaxonDatasetParams, TaxonSummary,
};
use mitwelten_explore_timeseries::DEFAULT_FFT_BINS;
use mitwelten_explore_url_state::UrlSearchArgs;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::bearer_token,
    text::{beautify_timedelta, markdown_to_plain_text},
};

/// Length of the Wikipedia extracts shown with a taxon.
const WIKI_CHAR_LIMIT: u32 = 800;

fn bad_request(e: &impl std::fmt::Display) -> HttpResponse {
    log::warn!("Rejected request: {e}");
    HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiError::new("Sign in required"))
}

fn upstream_failed(what: &str) -> HttpResponse {
    log::error!("{what} failed upstream");
    HttpResponse::BadGateway().json(ApiError::new(format!("{what} failed")))
}

fn respond<T: Serialize>(result: Result<T, DataHandlerError>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => bad_request(&e),
    }
}

fn link_args(req: &HttpRequest) -> Result<UrlSearchArgs, DataHandlerError> {
    Ok(UrlSearchArgs::from_query(req.query_string())?)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/config`
pub async fn config(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    HttpResponse::Ok().json(PublicConfig {
        data_api_url: config.data_api_url.clone(),
        path_prefix: config.path_prefix.clone(),
        domain_name: config.domain_name.clone(),
        identity_realm_url: config.identity.as_ref().map(|idp| idp.realm_url()),
        identity_client_id: config.identity.as_ref().map(|idp| idp.client_id.clone()),
    })
}

/// `GET /api/timeseries`
///
/// Bucketed values of the link's `dataset`.
pub async fn timeseries(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let token = bearer_token(&req);
    let handler = state.handler(token.as_deref());
    respond(handler.time_series_from_args(&args).await)
}

/// `GET /api/time-of-day`
pub async fn time_of_day(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let token = bearer_token(&req);
    let handler = state.handler(token.as_deref());
    respond(handler.time_of_day_from_args(&args).await)
}

/// `GET /api/locations`
pub async fn locations(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let token = bearer_token(&req);
    let handler = state.handler(token.as_deref());
    respond(handler.locations_from_args(&args).await)
}

/// `GET /api/stats`
pub async fn stats(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let token = bearer_token(&req);
    let handler = state.handler(token.as_deref());
    respond(handler.statsagg_from_args(&args).await)
}

/// `GET /api/sources`
///
/// Data sources to credit for the link's datasets.
pub async fn sources(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let handler = state.handler(None);
    HttpResponse::Ok().json(handler.get_data_sources(&args).await)
}

/// `GET /api/compare`
///
/// Series, statistics and spectra of the link's `datasets` with their
/// correlation matrix.
pub async fn compare(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let token = bearer_token(&req);
    let handler = state.handler(token.as_deref());
    respond(handler.load_compare_data(&args).await)
}

/// `GET /api/spectrum`
pub async fn spectrum(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<SpectrumParams>,
) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let token = bearer_token(&req);
    let handler = state.handler(token.as_deref());
    let bins = params.bins.unwrap_or(DEFAULT_FFT_BINS);
    respond(handler.load_spectrum(&args, bins).await)
}

/// `GET /api/hexbins`
///
/// One hexbin map per dataset; `zoom`, `clat` and `clon` fix the viewport.
pub async fn hexbins(
    state: web::Data<AppState>,
    req: HttpRequest,
    params: web::Query<MapViewParams>,
) -> HttpResponse {
    let args = match link_args(&req) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };
    let token = bearer_token(&req);
    let handler = state.handler(token.as_deref());
    respond(handler.load_hexbin_layers(&args, params.view()).await)
}

/// `GET /api/link`
///
/// The link in canonical form.
pub async fn link(req: HttpRequest) -> HttpResponse {
    match link_args(&req) {
        Ok(args) => HttpResponse::Ok().json(LinkResponse {
            query: args.to_query(),
            url: None,
        }),
        Err(e) => bad_request(&e),
    }
}

/// `POST /api/link`
///
/// Canonicalizes a link, optionally replacing the configuration of one
/// dataset first.
pub async fn edit_link(state: web::Data<AppState>, body: web::Json<LinkRequest>) -> HttpResponse {
    let request = body.into_inner();
    let mut args = match UrlSearchArgs::from_query(&request.query) {
        Ok(args) => args,
        Err(e) => return bad_request(&e),
    };

    let query = match (request.cfg_index, request.cfg) {
        (Some(index), Some(cfg)) => {
            let cfg = match ViewConfiguration::from_value(&cfg) {
                Ok(cfg) => cfg,
                Err(e) => return bad_request(&e),
            };
            match apply_dataset_config(&mut args, index, cfg) {
                Ok(query) => query,
                Err(e) => return bad_request(&e),
            }
        }
        _ => args.to_query(),
    };

    let url = request
        .page
        .map(|page| state.config.page_link(&page, &query));
    HttpResponse::Ok().json(LinkResponse { query, url })
}

/// `GET /api/datasets/taxon/{key}`
///
/// Dataset dictionary of a taxon, ready to be placed in a link.
pub async fn taxon_dataset(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    params: web::Query<TaxonDatasetParams>,
) -> HttpResponse {
    let key = path.into_inner();
    let api = state.api.as_ref();
    let dataset = if params.source.as_deref() == Some("gbif") {
        taxonomy::gbif_taxon_dataset(api, key).await
    } else {
        taxonomy::taxon_dataset(api, key).await
    };
    match dataset {
        Some(dataset) => HttpResponse::Ok().json(dataset),
        None => HttpResponse::NotFound().json(ApiError::new(format!("Unknown taxon {key}"))),
    }
}

/// `GET /api/taxon/{key}/summary`
///
/// The taxon with its Wikipedia extract and image credits.
pub async fn taxon_summary(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    params: web::Query<SummaryParams>,
) -> HttpResponse {
    let key = path.into_inner();
    let api = state.api.as_ref();
    let Some(taxon) = taxonomy::taxon(api, key).await else {
        return HttpResponse::NotFound().json(ApiError::new(format!("Unknown taxon {key}")));
    };
    let lang = params.lang.as_deref().unwrap_or("en");

    let wiki = match taxon.label_sci.as_deref() {
        Some(name) => third_party::wiki_summary(api, name, lang, Some(WIKI_CHAR_LIMIT)).await,
        None => None,
    };
    let image_attribution = match taxon.image_url.as_deref() {
        Some(url) => third_party::image_attribution(api, url).await,
        None => None,
    };

    HttpResponse::Ok().json(TaxonSummary {
        dataset: TypedDataset::Birds(taxon.clone()).to_dataset(),
        wiki_link: taxon
            .label_sci
            .as_deref()
            .map(|name| third_party::wiki_link(name, lang)),
        taxon,
        wiki,
        image_attribution,
    })
}

fn annotation_view(annotation: Annotation, now: NaiveDateTime) -> AnnotationView {
    let age = parse_api_timestamp(&annotation.created_at).map(|t| beautify_timedelta(now - t));
    AnnotationView {
        author: annotation.author(),
        time_label: annotation.time_label(),
        age,
        preview: markdown_to_plain_text(&annotation.content),
        annotation,
    }
}

/// `GET /api/annotations`
pub async fn list_annotations(
    state: web::Data<AppState>,
    req: HttpRequest,
    filter: web::Query<AnnotationFilter>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };
    let api = state.api.as_ref();
    let annotations = match filter.user.as_deref() {
        Some(sub) => userdata::annotations_by_user(api, sub, &token).await,
        None => userdata::annotations(api, &token).await,
    };
    let now = Utc::now().naive_utc();
    let views: Vec<AnnotationView> = annotations
        .into_iter()
        .map(|a| annotation_view(a, now))
        .collect();
    HttpResponse::Ok().json(views)
}

/// `GET /api/annotations/{id}`
pub async fn get_annotation(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };
    let id = path.into_inner();
    match userdata::annotation(state.api.as_ref(), id, &token).await {
        Some(annotation) => {
            HttpResponse::Ok().json(annotation_view(annotation, Utc::now().naive_utc()))
        }
        None => HttpResponse::NotFound().json(ApiError::new(format!("Unknown annotation {id}"))),
    }
}

/// `POST /api/annotations`
///
/// Stores an annotation authored by the token's user.
pub async fn create_annotation(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<AnnotationBody>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };
    let body = body.into_inner();
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false);
    let annotation = NewAnnotation {
        title: body.title,
        content: body.content,
        user_sub: user_from_token(&token).and_then(|user| user.sub),
        created_at: now.clone(),
        updated_at: now,
        url: body.url,
    };

    if userdata::post_annotation(state.api.as_ref(), &annotation, &token).await {
        HttpResponse::Created().json(annotation)
    } else {
        upstream_failed("Creating the annotation")
    }
}

/// `PUT /api/annotations/{id}`
pub async fn update_annotation(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<AnnotationContent>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };
    let id = path.into_inner();
    if userdata::update_annotation(state.api.as_ref(), id, &body.content, &token).await {
        HttpResponse::Ok().json(json!({ "id": id, "updated": true }))
    } else {
        upstream_failed("Updating the annotation")
    }
}

/// `DELETE /api/annotations/{id}`
pub async fn delete_annotation(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };
    if userdata::delete_annotation(state.api.as_ref(), path.into_inner(), &token).await {
        HttpResponse::NoContent().finish()
    } else {
        upstream_failed("Deleting the annotation")
    }
}

/// `GET /api/collection`
///
/// The caller's bookmarked datasets; empty when nothing is stored.
pub async fn collection(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };
    let datasets = userdata::collection(state.api.as_ref(), &token)
        .await
        .filter(|value| !value.is_null())
        .unwrap_or_else(|| Value::Array(Vec::new()));
    HttpResponse::Ok().json(datasets)
}

/// `POST /api/collection`
///
/// Replaces the caller's bookmarked datasets.
pub async fn update_collection(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CollectionBody>,
) -> HttpResponse {
    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };
    let datasets = Value::Array(body.into_inner().datasets);
    if userdata::update_collection(state.api.as_ref(), datasets.clone(), &token).await {
        HttpResponse::Ok().json(datasets)
    } else {
        upstream_failed("Updating the collection")
    }
}
