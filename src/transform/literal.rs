//! Parser for structured fields serialized as literal text
//!
//! Address and company fields arrive as dict literals, either in the single
//! quoted form `{'street': 'Kulas Light', 'geo': {'lat': '-37.3159'}}` or as
//! JSON. Both are parsed into a [`serde_json::Value`].
//!
//! Supported: dicts with string keys, lists, tuples (as lists), single or
//! double quoted strings with backslash escapes, integers, floats,
//! `True`/`False`/`None` and their JSON spellings.

use serde_json::{Map, Number, Value as JsonValue};
use thiserror::Error;

/// Parse failure with the byte offset where it occurred
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

/// Parse a complete literal; trailing input is an error
pub fn parse_literal(input: &str) -> Result<JsonValue, LiteralError> {
    let mut parser = Parser {
        input,
        bytes: input.as_bytes(),
        pos: 0,
    };
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self) -> Result<JsonValue, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => self.parse_dict(),
            Some(b'[') => self.parse_sequence(b'[', b']'),
            Some(b'(') => self.parse_sequence(b'(', b')'),
            Some(b'\'' | b'"') => self.parse_string().map(JsonValue::String),
            Some(b'-' | b'+' | b'0'..=b'9' | b'.') => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c as char))),
        }
    }

    fn parse_dict(&mut self) -> Result<JsonValue, LiteralError> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(JsonValue::Object(map));
            }
            let key = match self.parse_value()? {
                JsonValue::String(s) => s,
                JsonValue::Number(n) => n.to_string(),
                _ => return Err(self.error("dict keys must be strings or numbers")),
            };
            self.expect(b':')?;
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_sequence(&mut self, open: u8, close: u8) -> Result<JsonValue, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(JsonValue::Array(items));
            }
            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(self.error(format!("expected ',' or '{}'", close as char))),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let quote = self.bytes[self.pos];
        self.pos += 1;
        let mut out = String::new();
        loop {
            let rest = &self.input[self.pos..];
            let mut chars = rest.chars();
            let c = chars
                .next()
                .ok_or_else(|| self.error("unterminated string"))?;
            self.pos += c.len_utf8();
            match c {
                '\\' => {
                    let escaped = chars
                        .next()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    self.pos += escaped.len_utf8();
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'u' => out.push(self.parse_unicode_escape()?),
                        other => out.push(other),
                    }
                }
                c if c as u32 == quote as u32 => return Ok(out),
                c => out.push(c),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char, LiteralError> {
        let hex = self
            .input
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error("truncated unicode escape"))?;
        let code =
            u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid unicode escape"))?;
        self.pos += 4;
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode code point"))
    }

    fn parse_number(&mut self) -> Result<JsonValue, LiteralError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'_' | b'0'..=b'9')
        ) {
            self.pos += 1;
        }
        let text: String = self.input[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();

        if let Ok(n) = text.parse::<i64>() {
            return Ok(JsonValue::Number(n.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .ok_or_else(|| LiteralError {
                offset: start,
                message: format!("invalid number '{text}'"),
            })
    }

    fn parse_keyword(&mut self) -> Result<JsonValue, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        match &self.input[start..self.pos] {
            "True" | "true" => Ok(JsonValue::Bool(true)),
            "False" | "false" => Ok(JsonValue::Bool(false)),
            "None" | "null" => Ok(JsonValue::Null),
            other => Err(LiteralError {
                offset: start,
                message: format!("unknown name '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_quoted_address() {
        let input = "{'street': 'Kulas Light', 'suite': 'Apt. 556', 'city': 'Gwenborough', \
                     'zipcode': '92998-3874', 'geo': {'lat': '-37.3159', 'lng': '81.1496'}}";
        let value = parse_literal(input).unwrap();
        assert_eq!(
            value,
            json!({
                "street": "Kulas Light",
                "suite": "Apt. 556",
                "city": "Gwenborough",
                "zipcode": "92998-3874",
                "geo": {"lat": "-37.3159", "lng": "81.1496"}
            })
        );
    }

    #[test]
    fn test_parse_json_object() {
        let value = parse_literal(r#"{"name": "Romaguera-Crona", "n": 3, "ok": true}"#).unwrap();
        assert_eq!(value, json!({"name": "Romaguera-Crona", "n": 3, "ok": true}));
    }

    #[test]
    fn test_parse_escapes_and_keywords() {
        let text = r#"{'q': 'it\'s', 'd': "say \"hi\"", 'x': None, 'l': [1, 2.5, False]}"#;
        let value = parse_literal(text).unwrap();
        assert_eq!(
            value,
            json!({"q": "it's", "d": "say \"hi\"", "x": null, "l": [1, 2.5, false]})
        );
    }

    #[test]
    fn test_trailing_commas_and_tuples() {
        assert_eq!(parse_literal("{'a': (1, 2),}").unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_non_ascii_strings() {
        assert_eq!(parse_literal("'Gdańsk'").unwrap(), json!("Gdańsk"));
    }

    #[test]
    fn test_errors() {
        assert!(parse_literal("{'street': 'Kulas Light'").is_err());
        assert!(parse_literal("{'street' 'Kulas Light'}").is_err());
        assert!(parse_literal("not a dict").is_err());
        assert!(parse_literal("{'a': 1} extra").is_err());
        assert!(parse_literal("").is_err());
        assert!(parse_literal("{'a': 1.2.3}").is_err());

        let err = parse_literal("{'a': 'open").unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_error_display_names_offset() {
        let err = parse_literal("{'a': 1} extra").unwrap_err();
        assert_eq!(err.offset, 9);
        assert_eq!(err.to_string(), "unexpected trailing characters at offset 9");
        let source: &dyn std::error::Error = &err;
        assert!(source.source().is_none());
    }
}
