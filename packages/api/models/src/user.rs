//! Signed-in users and their annotations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parse_api_timestamp;

/// The user of the current session, read from identity token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppUser {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub initials: String,
    pub sub: Option<String>,
}

impl AppUser {
    /// Builds a user from token claims (`preferred_username`, `name`,
    /// `sub`).
    #[must_use]
    pub fn from_claims(claims: &Value) -> Self {
        let claim = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_string);
        Self::new(claim("preferred_username"), claim("name"), claim("sub"))
    }

    #[must_use]
    pub fn new(username: Option<String>, full_name: Option<String>, sub: Option<String>) -> Self {
        let initials = full_name.as_deref().map(initials).unwrap_or_default();
        Self {
            username,
            full_name,
            initials,
            sub,
        }
    }
}

/// First letters of the first two name parts, or of the only one.
fn initials(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .take(2)
        .filter_map(|part| part.chars().next())
        .collect()
}

/// An annotation as stored by the data API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    /// Markdown body.
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Shareable link the annotation refers to.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Annotation {
    #[must_use]
    pub fn author(&self) -> AppUser {
        AppUser::new(
            self.username.clone(),
            self.full_name.clone(),
            self.user_sub.clone(),
        )
    }

    /// Creation time formatted as `dd.mm.YYYY HH:MM UTC`.
    #[must_use]
    pub fn time_label(&self) -> Option<String> {
        parse_api_timestamp(&self.created_at)
            .map(|t| format!("{} UTC", t.format("%d.%m.%Y %H:%M")))
    }
}

/// Body of a request creating an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub title: String,
    pub content: String,
    pub user_sub: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_from_claims() {
        let user = AppUser::from_claims(&json!({
            "preferred_username": "jdoe",
            "name": "Jane Maria Doe",
            "sub": "f3a1"
        }));
        assert_eq!(user.username.as_deref(), Some("jdoe"));
        assert_eq!(user.initials, "JM");
        assert_eq!(user.sub.as_deref(), Some("f3a1"));
    }

    #[test]
    fn single_name_initial() {
        let user = AppUser::new(None, Some("Cher".to_string()), None);
        assert_eq!(user.initials, "C");
        assert_eq!(AppUser::from_claims(&json!({})).initials, "");
    }

    #[test]
    fn annotation_author_and_time() {
        let annotation: Annotation = serde_json::from_value(json!({
            "id": 7,
            "title": "Swift arrival",
            "content": "First **swifts** of the year",
            "created_at": "2023-04-21T17:05:00+00:00",
            "url": "/app/viz/timeseries?bucket=1d",
            "user_sub": "f3a1",
            "username": "jdoe",
            "full_name": "Jane Doe"
        }))
        .unwrap();
        assert_eq!(annotation.author().initials, "JD");
        assert_eq!(annotation.time_label().as_deref(), Some("21.04.2023 17:05 UTC"));
    }
}
