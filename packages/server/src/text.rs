//! Display helpers for annotation listings.

use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::{Captures, Regex};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+\s+(.*?)\s*$").expect("valid regex"));
static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(.*?)\*\*|__(.*?)__|\*(.*?)\*|_(.*?)_").expect("valid regex")
});
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*-\s+(.*?)\s*$").expect("valid regex"));
static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.\s+(.*?)\s*$").expect("valid regex"));
static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*_]{3,}[ \t]*$").expect("valid regex"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`{1,2}(.*?)`{1,2}").expect("valid regex"));
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]+)\]\([^)]+\)").expect("valid regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"));

/// Age of a timestamp in words, such as `3 days ago` or `2 weeks ago`.
#[must_use]
pub fn beautify_timedelta(delta: TimeDelta) -> String {
    let days = delta.num_days();
    if days > 14 {
        format!("{} weeks ago", days / 7)
    } else if days > 7 {
        format!("{} week ago", days / 7)
    } else if days > 1 {
        format!("{days} days ago")
    } else if days == 1 {
        "1 day ago".to_string()
    } else {
        match delta.num_hours() {
            hours if hours > 1 => format!("{hours} hours ago"),
            1 => "1 hour ago".to_string(),
            _ => format!("{} minutes ago", delta.num_minutes()),
        }
    }
}

/// Strips markdown markup, keeping the text of headings, list items,
/// emphasis, code, links and images.
#[must_use]
pub fn markdown_to_plain_text(markdown: &str) -> String {
    // Rules go first; `***` would otherwise read as emphasis.
    let text = RULE_RE.replace_all(markdown, "");
    let text = HEADING_RE.replace_all(&text, "$1\n");
    let text = BULLET_RE.replace_all(&text, "$1\n");
    let text = NUMBERED_RE.replace_all(&text, "$1\n");
    let text = EMPHASIS_RE.replace_all(&text, |caps: &Captures<'_>| {
        (1..=4)
            .find_map(|i| caps.get(i))
            .map_or_else(String::new, |m| m.as_str().to_string())
    });
    let text = CODE_RE.replace_all(&text, "$1");
    let text = IMAGE_RE.replace_all(&text, "$1");
    let text = LINK_RE.replace_all(&text, "$1");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_ages() {
        assert_eq!(beautify_timedelta(TimeDelta::days(21)), "3 weeks ago");
        assert_eq!(beautify_timedelta(TimeDelta::days(10)), "1 week ago");
        assert_eq!(beautify_timedelta(TimeDelta::days(3)), "3 days ago");
        assert_eq!(beautify_timedelta(TimeDelta::days(1)), "1 day ago");
        assert_eq!(beautify_timedelta(TimeDelta::hours(5)), "5 hours ago");
        assert_eq!(beautify_timedelta(TimeDelta::minutes(61)), "1 hour ago");
        assert_eq!(beautify_timedelta(TimeDelta::minutes(12)), "12 minutes ago");
    }

    #[test]
    fn strips_markdown() {
        let markdown = "# Swifts\n\nFirst **swifts** of the _year_ at `806`.\n\n\
                        - see [the map](/app/viz/map?bucket=1d)\n1. ![photo](https://x/y.jpg)\n\n---\n";
        assert_eq!(
            markdown_to_plain_text(markdown),
            "Swifts\n\nFirst swifts of the year at 806.\n\nsee the map\n\nphoto"
        );
    }
}
