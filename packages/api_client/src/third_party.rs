//! Wikipedia summaries and Wikimedia Commons image credits.

use std::sync::LazyLock;

use mitwelten_explore_api_models::WikiSummary;
use regex::Regex;
use serde_json::Value;

use crate::{ApiRequest, CacheDomain, ExploreApi, or_log};

const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#)
        .expect("valid regex")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Introductory extract of the Wikipedia article `name`.
pub async fn wiki_summary(
    api: &dyn ExploreApi,
    name: &str,
    lang: &str,
    char_limit: Option<u32>,
) -> Option<WikiSummary> {
    let request = ApiRequest::external(
        CacheDomain::ThirdParty,
        format!(
            "https://{lang}.wikipedia.org/w/api.php?format=json&action=query\
             &prop=extracts&exintro&explaintext&redirects=1"
        ),
    )
    .arg("titles", Some(name))
    .arg("exchars", char_limit);

    let body = or_log(api.request(request).await, "Wikipedia summary")?;
    let page = first_page(&body)?;
    Some(WikiSummary {
        title: page.get("title").and_then(Value::as_str).map(str::to_string),
        extract: page.get("extract").and_then(Value::as_str).map(str::to_string),
    })
}

/// Link to the Wikipedia article `name`.
#[must_use]
pub fn wiki_link(name: &str, lang: &str) -> String {
    format!("https://{lang}.wikipedia.org/wiki/{}", name.replace(' ', "_"))
}

/// Extended metadata (artist, license) of a Commons file.
pub async fn image_extmetadata(api: &dyn ExploreApi, image_name: &str) -> Option<Value> {
    let request = ApiRequest::external(CacheDomain::ThirdParty, COMMONS_API)
        .arg("action", Some("query"))
        .arg("titles", Some(format!("File:{image_name}")))
        .arg("prop", Some("imageinfo"))
        .arg("iiprop", Some("user|userid|canonicaltitle|url|extmetadata"))
        .arg("format", Some("json"));

    let body = or_log(api.request(request).await, "Commons image metadata")?;
    let page = first_page(&body)?;
    page.get("imageinfo")?.get(0)?.get("extmetadata").cloned()
}

/// Markdown credit line for a Commons image, such as
/// `© [Jane](https://...), [CC BY-SA 4.0](https://...)`.
pub async fn image_attribution(api: &dyn ExploreApi, image_url: &str) -> Option<String> {
    let image_name = image_url.rsplit('/').next().filter(|n| !n.is_empty())?;
    let metadata = image_extmetadata(api, image_name).await?;
    attribution_from_metadata(&metadata)
}

fn first_page(body: &Value) -> Option<&Value> {
    let (id, page) = body.get("query")?.get("pages")?.as_object()?.iter().next()?;
    (id != "-1").then_some(page)
}

fn metadata_value<'a>(metadata: &'a Value, key: &str) -> Option<&'a str> {
    metadata.get(key)?.get("value")?.as_str()
}

fn attribution_from_metadata(metadata: &Value) -> Option<String> {
    let artist = metadata_value(metadata, "Artist")?;
    let mut credit = format!("© {}", html_to_markdown(artist));
    match (
        metadata_value(metadata, "License"),
        metadata_value(metadata, "LicenseUrl"),
    ) {
        (Some(license), Some(url)) => credit.push_str(&format!(", [{license}]({url})")),
        (Some(license), None) => credit.push_str(&format!(", {license} ")),
        _ => {}
    }
    Some(credit)
}

/// Converts the links of an HTML fragment to markdown and drops all other
/// markup.
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    let linked = LINK.replace_all(html, |caps: &regex::Captures<'_>| {
        let text = TAG.replace_all(&caps[2], "");
        format!("[{}]({})", text.trim(), &caps[1])
    });
    let plain = TAG.replace_all(&linked, "");
    SPACE.replace_all(plain.trim(), " ").into_owned()
}
