//! Annotations and dataset collections of signed-in users.
//!
//! Every call is authorized with the user's bearer token and bypasses the
//! response cache.

use mitwelten_explore_api_models::{Annotation, NewAnnotation, parse_api_timestamp};
use serde_json::{Value, json};

use crate::{ApiRequest, ExploreApi, Method, fetch, or_log};

/// All annotations, oldest first. Empty if the upstream refuses.
pub async fn annotations(api: &dyn ExploreApi, token: &str) -> Vec<Annotation> {
    let request = ApiRequest::user(Method::Get, "explore/annotations", token);
    let mut annotations: Vec<Annotation> =
        or_log(fetch(api, request).await, "Annotations").unwrap_or_default();
    annotations.sort_by_key(|a| parse_api_timestamp(&a.created_at));
    annotations
}

pub async fn annotation(api: &dyn ExploreApi, id: i64, token: &str) -> Option<Annotation> {
    let request = ApiRequest::user(Method::Get, format!("explore/annotations/{id}"), token);
    or_log(fetch(api, request).await, "Annotation")
}

pub async fn annotations_by_user(
    api: &dyn ExploreApi,
    user_sub: &str,
    token: &str,
) -> Vec<Annotation> {
    annotations(api, token)
        .await
        .into_iter()
        .filter(|a| a.user_sub.as_deref() == Some(user_sub))
        .collect()
}

/// Stores a new annotation. Returns whether the upstream accepted it.
pub async fn post_annotation(api: &dyn ExploreApi, annotation: &NewAnnotation, token: &str) -> bool {
    let body = match serde_json::to_value(annotation) {
        Ok(body) => body,
        Err(e) => {
            log::error!("Cannot encode annotation: {e}");
            return false;
        }
    };
    let request = ApiRequest::user(Method::Post, "explore/annotations", token).json(body);
    or_log(api.request(request).await, "Posting annotation").is_some()
}

/// Replaces the markdown content of an annotation.
pub async fn update_annotation(api: &dyn ExploreApi, id: i64, content: &str, token: &str) -> bool {
    let request = ApiRequest::user(Method::Put, format!("explore/annotations/{id}"), token)
        .json(json!({ "content": content }));
    or_log(api.request(request).await, "Updating annotation").is_some()
}

pub async fn delete_annotation(api: &dyn ExploreApi, id: i64, token: &str) -> bool {
    let request = ApiRequest::user(Method::Delete, format!("explore/annotations/{id}"), token);
    or_log(api.request(request).await, "Deleting annotation").is_some()
}

/// The dataset dictionaries the user bookmarked.
pub async fn collection(api: &dyn ExploreApi, token: &str) -> Option<Value> {
    let request = ApiRequest::user(Method::Get, "explore/collection", token);
    or_log(api.request(request).await, "Collection")
}

/// Replaces the user's collection with `datasets`.
pub async fn update_collection(api: &dyn ExploreApi, datasets: Value, token: &str) -> bool {
    let request = ApiRequest::user(Method::Post, "explore/collection", token).json(datasets);
    or_log(api.request(request).await, "Updating collection").is_some()
}
