//! Engine-native scalar functions.
//!
//! Functions carry their own result type, which is what makes a
//! function-based transformation self-typing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{FeatureError, FeatureResult};
use crate::types::DataType;

/// First run of 4 consecutive digits
static YEAR_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d{4}").ok());

/// User patterns, compiled once per distinct pattern.
static COMPILED_PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Scalar functions the engine can evaluate on a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScalarFunction {
    /// Absolute value
    Abs,

    /// Round up to the nearest integer
    Ceil,

    /// Round down to the nearest integer
    Floor,

    /// Round half away from zero to `scale` decimal places
    Round {
        #[serde(default)]
        scale: i32,
    },

    /// Square root (null for negative input)
    Sqrt,

    /// Natural logarithm (null for non-positive input)
    Log,

    /// Exponential
    Exp,

    /// Convert to uppercase
    Upper,

    /// Convert to lowercase
    Lower,

    /// Remove leading and trailing whitespace
    Trim,

    /// Number of characters
    Length,

    /// Extract year (4 digits) from a date string
    ExtractYear,

    /// Remove all non-digit characters
    DigitsOnly,

    /// Replace using regex pattern
    RegexReplace {
        pattern: String,
        #[serde(default)]
        value: String,
    },
}

impl ScalarFunction {
    /// Name used when deriving output column names.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Abs => "abs",
            ScalarFunction::Ceil => "ceil",
            ScalarFunction::Floor => "floor",
            ScalarFunction::Round { .. } => "round",
            ScalarFunction::Sqrt => "sqrt",
            ScalarFunction::Log => "log",
            ScalarFunction::Exp => "exp",
            ScalarFunction::Upper => "upper",
            ScalarFunction::Lower => "lower",
            ScalarFunction::Trim => "trim",
            ScalarFunction::Length => "length",
            ScalarFunction::ExtractYear => "extract_year",
            ScalarFunction::DigitsOnly => "digits_only",
            ScalarFunction::RegexReplace { .. } => "regex_replace",
        }
    }

    /// Result type of the function signature.
    pub fn output_type(&self) -> DataType {
        match self {
            ScalarFunction::Abs
            | ScalarFunction::Round { .. }
            | ScalarFunction::Sqrt
            | ScalarFunction::Log
            | ScalarFunction::Exp => DataType::Double,
            ScalarFunction::Ceil | ScalarFunction::Floor => DataType::BigInt,
            ScalarFunction::Length | ScalarFunction::ExtractYear => DataType::Integer,
            ScalarFunction::Upper
            | ScalarFunction::Lower
            | ScalarFunction::Trim
            | ScalarFunction::DigitsOnly
            | ScalarFunction::RegexReplace { .. } => DataType::String,
        }
    }

    /// Check the function's arguments without touching any data.
    pub fn validate(&self) -> FeatureResult<()> {
        match self {
            ScalarFunction::RegexReplace { pattern, .. } => compile_pattern(pattern)
                .map(|_| ())
                .map_err(|e| FeatureError::invalid(format!("invalid regex pattern '{}': {}", pattern, e))),
            _ => Ok(()),
        }
    }

    /// Apply this function to a value. Null in, null out.
    pub fn apply(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self {
            ScalarFunction::Abs => numeric(value, f64::abs),
            ScalarFunction::Ceil => integral(value, f64::ceil),
            ScalarFunction::Floor => integral(value, f64::floor),
            ScalarFunction::Round { scale } => {
                let factor = 10f64.powi(*scale);
                numeric(value, |n| (n * factor).round() / factor)
            }
            ScalarFunction::Sqrt => numeric(value, f64::sqrt),
            ScalarFunction::Log => numeric(value, f64::ln),
            ScalarFunction::Exp => numeric(value, f64::exp),
            ScalarFunction::Upper => textual(value, |s| s.to_uppercase()),
            ScalarFunction::Lower => textual(value, |s| s.to_lowercase()),
            ScalarFunction::Trim => textual(value, |s| s.trim().to_string()),
            ScalarFunction::Length => as_string(value)
                .map(|s| Value::Number((s.chars().count() as i64).into()))
                .unwrap_or(Value::Null),
            ScalarFunction::ExtractYear => apply_extract_year(value),
            ScalarFunction::DigitsOnly => {
                textual(value, |s| s.chars().filter(|c| c.is_ascii_digit()).collect())
            }
            ScalarFunction::RegexReplace { pattern, value: replacement } => {
                apply_regex_replace(value, pattern, replacement)
            }
        }
    }
}

/// String view of scalar values; arrays and objects have none.
pub(crate) fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric view of scalar values. Strings are trimmed then parsed.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub(crate) fn float_value(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn numeric(value: &Value, f: impl Fn(f64) -> f64) -> Value {
    as_f64(value).map(|n| float_value(f(n))).unwrap_or(Value::Null)
}

fn integral(value: &Value, f: impl Fn(f64) -> f64) -> Value {
    as_f64(value)
        .map(f)
        .filter(|n| n.is_finite())
        .map(|n| Value::Number((n as i64).into()))
        .unwrap_or(Value::Null)
}

fn textual(value: &Value, f: impl Fn(&str) -> String) -> Value {
    as_string(value)
        .map(|s| Value::String(f(&s)))
        .unwrap_or(Value::Null)
}

/// Compile `pattern`, reusing an earlier compilation when there is one.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let mut cache = COMPILED_PATTERNS.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(re) = cache.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern)?;
    cache.insert(pattern.to_string(), re.clone());
    Ok(re)
}

fn apply_extract_year(value: &Value) -> Value {
    let Some(re) = &*YEAR_PATTERN else {
        return Value::Null;
    };
    as_string(value)
        .and_then(|s| re.find(&s).and_then(|m| m.as_str().parse::<i64>().ok()))
        .map(|n| Value::Number(n.into()))
        .unwrap_or(Value::Null)
}

fn apply_regex_replace(value: &Value, pattern: &str, replacement: &str) -> Value {
    as_string(value)
        .and_then(|s| {
            compile_pattern(pattern)
                .ok()
                .map(|re| Value::String(re.replace_all(&s, replacement).to_string()))
        })
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_functions() {
        assert_eq!(ScalarFunction::Abs.apply(&json!(-2.5)), json!(2.5));
        assert_eq!(ScalarFunction::Ceil.apply(&json!("1.2")), json!(2));
        assert_eq!(ScalarFunction::Floor.apply(&json!(1.8)), json!(1));
        assert_eq!(ScalarFunction::Round { scale: 1 }.apply(&json!(1.26)), json!(1.3));
        assert_eq!(ScalarFunction::Sqrt.apply(&json!(-1)), Value::Null);
    }

    #[test]
    fn test_text_functions() {
        assert_eq!(ScalarFunction::Upper.apply(&json!("abc")), json!("ABC"));
        assert_eq!(ScalarFunction::Trim.apply(&json!("  hi ")), json!("hi"));
        assert_eq!(ScalarFunction::Length.apply(&json!("héllo")), json!(5));
        assert_eq!(ScalarFunction::DigitsOnly.apply(&json!("T-123.456")), json!("123456"));
    }

    #[test]
    fn test_extract_year() {
        let f = ScalarFunction::ExtractYear;
        assert_eq!(f.apply(&json!("15/03/2024")), json!(2024));
        assert_eq!(f.apply(&json!("no year")), Value::Null);
    }

    #[test]
    fn test_regex_replace() {
        let f = ScalarFunction::RegexReplace { pattern: "[-. ]".into(), value: String::new() };
        assert_eq!(f.apply(&json!("T-123.456 789")), json!("T123456789"));
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let f = ScalarFunction::RegexReplace { pattern: "([".into(), value: String::new() };
        let err = f.validate().unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfiguration(ref m) if m.contains("([")));
    }

    #[test]
    fn test_compiled_pattern_reused() {
        let first = compile_pattern("[0-9]+x").unwrap();
        let second = compile_pattern("[0-9]+x").unwrap();
        assert_eq!(first.as_str(), second.as_str());
        assert!(COMPILED_PATTERNS.lock().unwrap().contains_key("[0-9]+x"));
    }

    #[test]
    fn test_null_passthrough() {
        assert_eq!(ScalarFunction::Lower.apply(&Value::Null), Value::Null);
        assert_eq!(ScalarFunction::Exp.apply(&Value::Null), Value::Null);
    }

    #[test]
    fn test_deserialize_tagged() {
        let f: ScalarFunction = serde_json::from_value(json!({"type": "round", "scale": 2})).unwrap();
        assert_eq!(f, ScalarFunction::Round { scale: 2 });
        assert_eq!(f.output_type(), DataType::Double);
    }
}
