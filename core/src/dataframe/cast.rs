//! Value casting between engine-native types.
//!
//! Casting is lenient: a value that cannot be represented in the target
//! type becomes null instead of failing the whole column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::functions::{as_f64, as_string, float_value};
use crate::types::{EngineType, ScalarType};

const TRUE_VALUES: [&str; 4] = ["true", "1", "yes", "y"];
const FALSE_VALUES: [&str; 4] = ["false", "0", "no", "n"];

/// Cast a single value to `to`.
pub fn cast_value(value: &Value, to: EngineType) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match to {
        EngineType::Int => to_integer(value)
            .filter(|n| i32::try_from(*n).is_ok())
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        EngineType::Long => to_integer(value)
            .map(|n| Value::Number(n.into()))
            .unwrap_or(Value::Null),
        EngineType::Float => as_f64(value)
            .map(|n| float_value(n as f32 as f64))
            .unwrap_or(Value::Null),
        EngineType::Double | EngineType::Decimal => {
            as_f64(value).map(float_value).unwrap_or(Value::Null)
        }
        EngineType::Utf8 => to_utf8(value),
        EngineType::Boolean => to_boolean(value),
        EngineType::Date => to_date(value),
        EngineType::Timestamp => to_timestamp(value),
        EngineType::Binary => to_binary(value),
        EngineType::List(element) => to_list(value, element),
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(truncate))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn truncate(n: f64) -> Option<i64> {
    if n.is_finite() && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Some(n.trunc() as i64)
    } else {
        None
    }
}

fn to_utf8(value: &Value) -> Value {
    match as_string(value) {
        Some(s) => Value::String(s),
        None => Value::String(value.to_string()),
    }
}

fn to_boolean(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(*b),
        Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)).unwrap_or(Value::Null),
        Value::String(s) => {
            let lower = s.trim().to_lowercase();
            if TRUE_VALUES.contains(&lower.as_str()) {
                Value::Bool(true)
            } else if FALSE_VALUES.contains(&lower.as_str()) {
                Value::Bool(false)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

fn to_date(value: &Value) -> Value {
    let Some(s) = as_string(value) else {
        return Value::Null;
    };
    let trimmed = s.trim();
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

fn to_timestamp(value: &Value) -> Value {
    parse_timestamp(value)
        .map(|ts| Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .unwrap_or(Value::Null)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

fn to_binary(value: &Value) -> Value {
    as_string(value)
        .map(|s| Value::Array(s.bytes().map(|b| Value::Number(b.into())).collect()))
        .unwrap_or(Value::Null)
}

fn to_list(value: &Value, element: ScalarType) -> Value {
    let element_type = EngineType::from(element);
    match value {
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| cast_value(v, element_type)).collect())
        }
        Value::Object(_) => Value::Null,
        scalar => Value::Array(vec![cast_value(scalar, element_type)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cast_to_int() {
        assert_eq!(cast_value(&json!("10"), EngineType::Int), json!(10));
        assert_eq!(cast_value(&json!(" 1.9 "), EngineType::Int), json!(1));
        assert_eq!(cast_value(&json!(true), EngineType::Int), json!(1));
        assert_eq!(cast_value(&json!("abc"), EngineType::Int), Value::Null);
        assert_eq!(cast_value(&json!(3_000_000_000i64), EngineType::Int), Value::Null);
        assert_eq!(cast_value(&json!(3_000_000_000i64), EngineType::Long), json!(3_000_000_000i64));
    }

    #[test]
    fn test_cast_to_double_and_string() {
        assert_eq!(cast_value(&json!("2.5"), EngineType::Double), json!(2.5));
        assert_eq!(cast_value(&json!(42), EngineType::Utf8), json!("42"));
        assert_eq!(cast_value(&json!([1, 2]), EngineType::Utf8), json!("[1,2]"));
    }

    #[test]
    fn test_cast_to_boolean() {
        assert_eq!(cast_value(&json!("Yes"), EngineType::Boolean), json!(true));
        assert_eq!(cast_value(&json!(0), EngineType::Boolean), json!(false));
        assert_eq!(cast_value(&json!("maybe"), EngineType::Boolean), Value::Null);
    }

    #[test]
    fn test_cast_to_date_and_timestamp() {
        assert_eq!(cast_value(&json!("2024-03-15T10:00:00Z"), EngineType::Date), json!("2024-03-15"));
        assert_eq!(cast_value(&json!("15/03/2024"), EngineType::Date), Value::Null);
        assert_eq!(
            cast_value(&json!("2024-03-15 10:30:00"), EngineType::Timestamp),
            json!("2024-03-15T10:30:00Z")
        );
        assert_eq!(cast_value(&json!(0), EngineType::Timestamp), json!("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn test_cast_to_list() {
        let to = EngineType::List(ScalarType::Long);
        assert_eq!(cast_value(&json!(["1", "x"]), to), json!([1, null]));
        assert_eq!(cast_value(&json!("7"), to), json!([7]));
    }

    #[test]
    fn test_null_stays_null() {
        assert_eq!(cast_value(&Value::Null, EngineType::Utf8), Value::Null);
    }
}
