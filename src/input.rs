//! Parsing user-supplied JSON text
//!
//! Documents go through SIMD-accelerated parsing first. When that fails the
//! text is re-parsed with `serde_json`, which reports where the error is.

use crate::error::InputError;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;

/// Parse one JSON document
pub fn parse_document(text: &str) -> Result<Value, InputError> {
    let mut bytes = text.as_bytes().to_vec();
    match simd_json::serde::from_slice::<Value>(&mut bytes) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_str(text).map_err(InputError::from),
    }
}

/// Parse newline-delimited JSON; every non-blank line becomes one array item
pub fn parse_ndjson(text: &str) -> Result<Value, InputError> {
    let mut items = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|err| {
            let mut input = InputError::from(err);
            input.line = idx + 1;
            input
        })?;
        items.push(item);
    }
    Ok(Value::Array(items))
}

/// Read a whole source (file or stdin) into a single document
pub fn read_source<R: Read>(mut reader: R, ndjson: bool) -> Result<Value> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("Failed to read input")?;

    let value = if ndjson {
        parse_ndjson(&text)
    } else {
        parse_document(&text)
    };
    value.context("Failed to parse JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_document_keeps_key_order() {
        let value = parse_document(r#"{"z": 1, "a": [true, null], "m": "x"}"#).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(value["a"], json!([true, null]));
    }

    #[test]
    fn test_parse_document_reports_location() {
        let err = parse_document("[1, 2,\n 3,,]").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let value = parse_ndjson("{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();
        assert_eq!(value, json!([{"a": 1}, {"a": 2}]));
    }

    #[test]
    fn test_parse_ndjson_error_names_the_line() {
        let err = parse_ndjson("{\"a\": 1}\n{\"a\": }\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_read_source_wraps_errors() {
        let err = read_source("not json".as_bytes(), false).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse JSON"));
    }
}
