use crate::flatten::Cell;
use crate::schema::types::TypeTag;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// ISO-8601-like timestamp: date, `T`, time, optional fraction, optional zone
static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]+)?(Z|[+-][0-9]{2}:?[0-9]{2})?$")
        .unwrap()
});

/// Type tag for a flattened cell
pub fn detect_type(cell: &Cell) -> TypeTag {
    match cell {
        Cell::Null => TypeTag::Null,
        Cell::Bool(_) => TypeTag::Boolean,
        Cell::Number(_) => TypeTag::Number,
        Cell::String(s) => detect_string(s),
        Cell::EmptyArray => TypeTag::Array,
        Cell::EmptyObject => TypeTag::Object,
    }
}

/// Type tag for an arbitrary JSON value
pub fn detect_value_type(value: &Value) -> TypeTag {
    match value {
        Value::Null => TypeTag::Null,
        Value::Bool(_) => TypeTag::Boolean,
        Value::Number(_) => TypeTag::Number,
        Value::String(s) => detect_string(s),
        Value::Array(_) => TypeTag::Array,
        Value::Object(_) => TypeTag::Object,
    }
}

fn detect_string(s: &str) -> TypeTag {
    // Cheap length and separator check before the regex
    if s.len() >= 19 && s.as_bytes()[10] == b'T' && is_iso_datetime(s) {
        TypeTag::Date
    } else {
        TypeTag::String
    }
}

pub fn is_iso_datetime(s: &str) -> bool {
    ISO_DATETIME_REGEX.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_datetime_variants() {
        for s in [
            "2024-01-15T10:30:00",
            "2024-01-15T10:30:00Z",
            "2024-01-15T10:30:00.123Z",
            "2024-01-15T10:30:00+02:00",
            "2024-01-15T10:30:00-0500",
        ] {
            assert_eq!(detect_type(&Cell::from(s)), TypeTag::Date, "{}", s);
        }
    }

    #[test]
    fn test_plain_dates_and_text_are_strings() {
        for s in ["2024-01-15", "10:30:00", "2024-01-15 10:30:00", "hello", "", "2024-01-15T10:30"] {
            assert_eq!(detect_type(&Cell::from(s)), TypeTag::String, "{}", s);
        }
    }

    #[test]
    fn test_non_ascii_digits_are_not_dates() {
        assert_eq!(
            detect_type(&Cell::from("٢٠٢٤-01-15T10:30:00")),
            TypeTag::String
        );
    }

    #[test]
    fn test_detect_cells() {
        assert_eq!(detect_type(&Cell::Null), TypeTag::Null);
        assert_eq!(detect_type(&Cell::Bool(false)), TypeTag::Boolean);
        assert_eq!(detect_type(&Cell::from(7u64)), TypeTag::Number);
        assert_eq!(detect_type(&Cell::EmptyArray), TypeTag::Array);
        assert_eq!(detect_type(&Cell::EmptyObject), TypeTag::Object);
    }

    #[test]
    fn test_detect_values() {
        assert_eq!(detect_value_type(&json!([1])), TypeTag::Array);
        assert_eq!(detect_value_type(&json!({"a": 1})), TypeTag::Object);
        assert_eq!(detect_value_type(&json!(1.5)), TypeTag::Number);
        assert_eq!(detect_value_type(&json!("2020-02-02T00:00:00Z")), TypeTag::Date);
    }
}
