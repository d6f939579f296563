//! Lenient deserializers for a loosely-typed backend.
//!
//! The API is inconsistent about scalar types: counters arrive as numbers,
//! numeric strings or `null`, ids as either strings or integers, and flags
//! as booleans, `0`/`1` or `"true"`/`"false"`. Text fields such as phone
//! numbers sometimes arrive as bare numbers. These helpers coerce the
//! common variants instead of failing the whole payload.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// Deserialize a counter that may be a number, a numeric string, or null.
/// Negative and unparseable values become 0.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountVisitor;

    impl<'de> Visitor<'de> for CountVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a non-negative number or numeric string")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.max(0) as u64)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(clamp_count(v))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(parse_number(v).map(clamp_count).unwrap_or(0))
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
            Ok(u64::from(v))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(0)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

/// Deserialize an amount that may be a number, a numeric string, or null.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(if v.is_finite() { v } else { 0.0 })
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(parse_number(v).unwrap_or(0.0))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

/// Deserialize `true`/`false`, `0`/`1`, or `"true"`/`"false"` strings.
/// Anything else is treated as false.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct BoolVisitor;

    impl<'de> Visitor<'de> for BoolVisitor {
        type Value = bool;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a boolean, 0/1, or string 'true'/'false'")
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v != 0)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v != 0)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(false)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}

/// Deserialize an identifier that may arrive as a string or a number.
/// Empty strings and null become `None`.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumberVisitor;

    impl<'de> Visitor<'de> for StringOrNumberVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            if v.is_empty() {
                Ok(None)
            } else {
                Ok(Some(v.to_string()))
            }
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            if !v.is_finite() {
                Ok(None)
            } else if v.fract() == 0.0 && v.abs() < 9.0e15 {
                Ok(Some((v as i64).to_string()))
            } else {
                Ok(Some(v.to_string()))
            }
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

/// Deserialize free text that the backend may send as a number.
/// Numbers become their decimal text; booleans, arrays, objects and null
/// become `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn clamp_count(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        v.round() as u64
    } else {
        0
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_count")]
        count: u64,
        #[serde(default, deserialize_with = "lenient_amount")]
        amount: f64,
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: bool,
        #[serde(default, deserialize_with = "string_or_number")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient_string")]
        text: Option<String>,
    }

    fn parse(json: &str) -> Sample {
        serde_json::from_str(json).expect("sample should parse")
    }

    #[test]
    fn test_counts_accept_strings_and_nulls() {
        assert_eq!(parse(r#"{"count": 12}"#).count, 12);
        assert_eq!(parse(r#"{"count": "12"}"#).count, 12);
        assert_eq!(parse(r#"{"count": "1,204"}"#).count, 1204);
        assert_eq!(parse(r#"{"count": null}"#).count, 0);
        assert_eq!(parse(r#"{"count": -3}"#).count, 0);
        assert_eq!(parse(r#"{"count": "abc"}"#).count, 0);
        assert_eq!(parse(r#"{}"#).count, 0);
    }

    #[test]
    fn test_amounts_accept_strings() {
        assert_eq!(parse(r#"{"amount": "10.5"}"#).amount, 10.5);
        assert_eq!(parse(r#"{"amount": 535}"#).amount, 535.0);
        assert_eq!(parse(r#"{"amount": null}"#).amount, 0.0);
    }

    #[test]
    fn test_bools_accept_numbers_and_strings() {
        assert!(parse(r#"{"flag": true}"#).flag);
        assert!(parse(r#"{"flag": 1}"#).flag);
        assert!(parse(r#"{"flag": "True"}"#).flag);
        assert!(!parse(r#"{"flag": "false"}"#).flag);
        assert!(!parse(r#"{"flag": 0}"#).flag);
        assert!(!parse(r#"{"flag": null}"#).flag);
    }

    #[test]
    fn test_ids_accept_strings_and_numbers() {
        assert_eq!(parse(r#"{"id": 42}"#).id.as_deref(), Some("42"));
        assert_eq!(parse(r#"{"id": "abc"}"#).id.as_deref(), Some("abc"));
        assert_eq!(parse(r#"{"id": ""}"#).id, None);
    }

    #[test]
    fn test_float_ids_keep_integer_form() {
        assert_eq!(parse(r#"{"id": 42.0}"#).id.as_deref(), Some("42"));
        assert_eq!(parse(r#"{"id": 4.5}"#).id.as_deref(), Some("4.5"));
    }

    #[test]
    fn test_text_accepts_numbers_and_drops_other_shapes() {
        assert_eq!(parse(r#"{"text": "Ama"}"#).text.as_deref(), Some("Ama"));
        assert_eq!(parse(r#"{"text": 244123456}"#).text.as_deref(), Some("244123456"));
        assert_eq!(parse(r#"{"text": true}"#).text, None);
        assert_eq!(parse(r#"{"text": {"first": "Ama"}}"#).text, None);
        assert_eq!(parse(r#"{"text": ["a"]}"#).text, None);
        assert_eq!(parse(r#"{"text": null}"#).text, None);
    }
}
