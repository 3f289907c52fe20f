//! Python literal notation for nested link values.
//!
//! Links produced by earlier versions of the dashboard carry nested values
//! as Python `repr` output: single-quoted strings, `None`, `True` and
//! `False`. [`parse`] reads that notation (and plain JSON, which is almost a
//! subset of it) and [`to_python_literal`] writes it.

use std::{fmt::Write as _, iter::Peekable, str::CharIndices};

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Error returned for input that is not a supported literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parses a Python literal into a JSON value.
///
/// Supported are dicts, lists, tuples (read as arrays), single- and
/// double-quoted strings with the usual escapes, integers, floats and the
/// constants `None`, `True`, `False` as well as `null`, `true`, `false`.
/// Dict keys that are not strings are converted to their literal text.
///
/// # Errors
///
/// Returns a [`LiteralError`] pointing at the first offending character.
pub fn parse(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        input,
        chars: input.char_indices().peekable(),
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    match parser.chars.peek() {
        None => Ok(value),
        Some(&(offset, c)) => Err(LiteralError {
            offset,
            message: format!("unexpected trailing '{c}'"),
        }),
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |(i, _)| *i)
    }

    fn error<T>(&mut self, message: impl Into<String>) -> Result<T, LiteralError> {
        Err(LiteralError {
            offset: self.offset(),
            message: message.into(),
        })
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        match self.chars.peek().map(|(_, c)| *c) {
            None => self.error("unexpected end of input"),
            Some('{') => self.dict(),
            Some('[') => self.sequence('[', ']'),
            Some('(') => self.sequence('(', ')'),
            Some(quote @ ('\'' | '"')) => self.string(quote).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.constant(),
            Some(c) => self.error(format!("unexpected '{c}'")),
        }
    }

    /// Consumes `,` separated items up to `close`, allowing a trailing comma.
    fn items(
        &mut self,
        close: char,
        mut item: impl FnMut(&mut Self) -> Result<(), LiteralError>,
    ) -> Result<(), LiteralError> {
        loop {
            self.skip_whitespace();
            if self.chars.next_if(|(_, c)| *c == close).is_some() {
                return Ok(());
            }
            item(self)?;
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => {}
                Some((_, c)) if c == close => return Ok(()),
                Some((offset, c)) => {
                    return Err(LiteralError {
                        offset,
                        message: format!("expected ',' or '{close}', found '{c}'"),
                    });
                }
                None => return self.error(format!("missing '{close}'")),
            }
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Result<Value, LiteralError> {
        self.expect(open)?;
        let mut values = Vec::new();
        self.items(close, |p| {
            values.push(p.value()?);
            Ok(())
        })?;
        Ok(Value::Array(values))
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        self.items('}', |p| {
            let key = match p.value()? {
                Value::String(s) => s,
                other => to_python_literal(&other),
            };
            p.skip_whitespace();
            p.expect(':')?;
            let value = p.value()?;
            map.insert(key, value);
            Ok(())
        })?;
        Ok(Value::Object(map))
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        if self.chars.next_if(|(_, c)| *c == expected).is_some() {
            Ok(())
        } else {
            self.error(format!("expected '{expected}'"))
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None => return self.error("unterminated string"),
                Some((_, c)) if c == quote => return Ok(out),
                Some((_, '\\')) => self.escape(&mut out)?,
                Some((_, c)) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let Some((_, c)) = self.chars.next() else {
            return self.error("unterminated escape");
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' | '\'' | '"' | '/' => out.push(c),
            '\n' => {}
            'x' => out.push(self.code_point(2)?),
            'u' => out.push(self.code_point(4)?),
            'U' => out.push(self.code_point(8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn code_point(&mut self, digits: usize) -> Result<char, LiteralError> {
        let start = self.offset();
        let mut hex = String::with_capacity(digits);
        for _ in 0..digits {
            match self.chars.next_if(|(_, c)| c.is_ascii_hexdigit()) {
                Some((_, c)) => hex.push(c),
                None => return self.error("truncated escape sequence"),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid code point '{hex}'"),
            })
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.offset();
        let mut text = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| {
            c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_')
        }) {
            if c != '_' {
                text.push(c);
            }
        }

        let is_integer = !text.contains(['.', 'e', 'E']);
        if is_integer {
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Value::Number(int.into()));
            }
            if let Ok(int) = text.trim_start_matches('+').parse::<u64>() {
                return Ok(Value::Number(int.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid number '{text}'"),
            })
    }

    fn constant(&mut self) -> Result<Value, LiteralError> {
        let start = self.offset();
        let mut word = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_alphanumeric() || *c == '_') {
            word.push(c);
        }
        match word.as_str() {
            "None" | "null" => Ok(Value::Null),
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            _ => Err(LiteralError {
                offset: start,
                message: format!("unknown name '{word}'"),
            }),
        }
    }
}

/// Writes a JSON value the way Python's `repr` prints the equivalent
/// object.
#[must_use]
pub fn to_python_literal(value: &Value) -> String {
    let mut out = String::new();
    write_literal(&mut out, value);
    out
}

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(out, key);
                out.push_str(": ");
                write_literal(out, item);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &Number) {
    if n.is_f64()
        && let Some(f) = n.as_f64()
    {
        let text = f.to_string();
        out.push_str(&text);
        if !text.contains(['.', 'e', 'E']) {
            out.push_str(".0");
        }
        return;
    }
    out.push_str(&n.to_string());
}

/// Python quoting: single quotes unless the text contains a single quote
/// and no double quote.
fn write_string(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_python_repr() {
        let value = parse(
            "{'type': 'birds', 'datum_id': 212, 'label_de': None, 'image_url': None, \
             'deployment_filter': [], 'active': True, 'score': -0.5}",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "type": "birds",
                "datum_id": 212,
                "label_de": null,
                "image_url": null,
                "deployment_filter": [],
                "active": true,
                "score": -0.5
            })
        );
    }

    #[test]
    fn parses_json_and_tuples() {
        assert_eq!(
            parse(r#"[{"a": null, "b": false}, (1, 2,), 1e3]"#).unwrap(),
            json!([{"a": null, "b": false}, [1, 2], 1000.0])
        );
    }

    #[test]
    fn keeps_words_inside_strings() {
        let value = parse(r#"{'label_en': "Dunnock's None True", 'x': 'a\'b'}"#).unwrap();
        assert_eq!(value["label_en"], "Dunnock's None True");
        assert_eq!(value["x"], "a'b");
    }

    #[test]
    fn decodes_escapes() {
        assert_eq!(parse(r"'tab\there\x41é'").unwrap(), json!("tab\thereAé"));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("{'type': 'birds'").is_err());
        assert!(parse("{'type' 'birds'}").is_err());
        assert!(parse("[1, 2] 3").is_err());
        assert!(parse("'open").is_err());
        assert!(parse("Nothing").is_err());
        assert!(parse("").is_err());
        let err = parse("[1, @]").unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn writes_python_repr() {
        let value = json!({"a": null, "b": [true, false], "c": 1.0, "d": 3, "e": "it's"});
        assert_eq!(
            to_python_literal(&value),
            r#"{'a': None, 'b': [True, False], 'c': 1.0, 'd': 3, 'e': "it's"}"#
        );
        assert_eq!(to_python_literal(&json!("say \"hi\" it's")), r#"'say "hi" it\'s'"#);
    }

    #[test]
    fn literal_round_trip() {
        let value = json!({
            "type": "pollinators",
            "deployment_id": [806, 807],
            "pollinator_class": null,
            "label": "Rock 'n' \"roll\"\n",
            "ratio": 0.125,
            "nested": {"flag": true}
        });
        assert_eq!(parse(&to_python_literal(&value)).unwrap(), value);
    }

    #[test]
    fn keeps_integers_beyond_i64() {
        let value = parse("[18446744073709551615, 9223372036854775808]").unwrap();
        assert_eq!(value, json!([u64::MAX, 9_223_372_036_854_775_808_u64]));
        assert_eq!(value[0].as_u64(), Some(u64::MAX));
        assert_eq!(parse(&to_python_literal(&value)).unwrap(), value);
        assert!(parse("18446744073709551616").unwrap().is_f64());
    }
}
