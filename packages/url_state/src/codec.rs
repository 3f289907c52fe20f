//! Query string encoding of link state.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::{
    UrlStateError,
    literal::{self, to_python_literal},
};

/// Keys whose values are nested structures written as Python literals.
pub const NESTED_KEYS: [&str; 5] = ["trace", "dataset", "traces", "datasets", "cfg"];

/// Encodes link state as a form-urlencoded query string without the
/// leading `?`.
///
/// Strings are written as they are, `null` values are left out and
/// everything else uses Python literal notation.
#[must_use]
pub fn encode(state: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in state {
        match value {
            Value::Null => {}
            Value::String(s) => {
                serializer.append_pair(key, s);
            }
            other => {
                serializer.append_pair(key, &to_python_literal(other));
            }
        }
    }
    serializer.finish()
}

/// Decodes a query string, with or without the leading `?`.
///
/// Pairs with a blank value are dropped and a repeated key keeps its last
/// value. Values of [`NESTED_KEYS`] are parsed as literals; all others stay
/// strings.
///
/// # Errors
///
/// Returns [`UrlStateError::MalformedNested`] if a nested value is not a
/// valid literal.
pub fn decode(query: &str) -> Result<Map<String, Value>, UrlStateError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut state = Map::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        let value = if NESTED_KEYS.contains(&key.as_ref()) {
            literal::parse(&value).map_err(|source| UrlStateError::MalformedNested {
                key: key.to_string(),
                source,
            })?
        } else {
            Value::String(value.into_owned())
        };
        state.insert(key.into_owned(), value);
    }

    log::trace!("Decoded {} link arguments", state.len());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn encodes_nested_values_as_python_literals() {
        let state = object(json!({
            "bucket": "1d",
            "dataset": {"type": "birds", "datum_id": 212, "label_de": null}
        }));
        assert_eq!(
            encode(&state),
            "bucket=1d&dataset=%7B%27datum_id%27%3A+212%2C+%27label_de%27%3A+None%2C+%27type%27%3A+%27birds%27%7D"
        );
    }

    #[test]
    fn decodes_legacy_links() {
        let state = decode(
            "?dataset=%7B%27type%27%3A+%27birds%27%2C+%27datum_id%27%3A+212%7D&bucket=1d&from=",
        )
        .unwrap();
        assert_eq!(state["dataset"], json!({"type": "birds", "datum_id": 212}));
        assert_eq!(state["bucket"], "1d");
        assert!(!state.contains_key("from"));
    }

    #[test]
    fn last_duplicate_wins() {
        let state = decode("agg=sum&agg=max").unwrap();
        assert_eq!(state["agg"], "max");
    }

    #[test]
    fn reports_malformed_nested_key() {
        let err = decode("cfg=%5B%7B%27agg%27%3A").unwrap_err();
        assert!(matches!(err, UrlStateError::MalformedNested { ref key, .. } if key == "cfg"));
    }

    #[test]
    fn round_trips_nested_constants_and_quotes() {
        let state = object(json!({
            "datasets": [
                {"type": "birds", "datum_id": 5, "label_en": "Eurasian Wren", "image_url": null},
                {"type": "pax", "deployment_id": 806, "node_label": "it's \"here\""}
            ],
            "cfg": [
                {"confidence": 0.7, "normalize": true},
                {"normalize": false}
            ],
            "bucket": "1w",
            "from": "2023-01-01T00:00:00"
        }));
        assert_eq!(decode(&encode(&state)).unwrap(), state);
    }

    #[test]
    fn skips_nulls_and_writes_scalars() {
        let state = object(json!({"a": null, "b": true, "c": 0.7}));
        assert_eq!(encode(&state), "b=True&c=0.7");
    }
}
