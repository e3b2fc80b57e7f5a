//! Recognized feature data types and their engine-native representation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::FeatureError;

/// Engine-native column types understood by the dataset engine's cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    Binary,
    Boolean,
    Date,
    Decimal,
    Double,
    Float,
    Int,
    Long,
    Utf8,
    Timestamp,
    List(ScalarType),
}

/// Element types allowed inside [`EngineType::List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Long,
    Float,
    Utf8,
}

impl From<ScalarType> for EngineType {
    fn from(scalar: ScalarType) -> Self {
        match scalar {
            ScalarType::Long => EngineType::Long,
            ScalarType::Float => EngineType::Float,
            ScalarType::Utf8 => EngineType::Utf8,
        }
    }
}

/// Declared output type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Binary,
    Boolean,
    Date,
    Decimal,
    Double,
    Float,
    Integer,
    BigInt,
    String,
    Timestamp,
    ArrayBigInt,
    ArrayFloat,
    ArrayString,
}

impl DataType {
    /// Every recognized data type, in declaration order.
    pub const ALL: [DataType; 13] = [
        DataType::Binary,
        DataType::Boolean,
        DataType::Date,
        DataType::Decimal,
        DataType::Double,
        DataType::Float,
        DataType::Integer,
        DataType::BigInt,
        DataType::String,
        DataType::Timestamp,
        DataType::ArrayBigInt,
        DataType::ArrayFloat,
        DataType::ArrayString,
    ];

    /// The engine-native type a column of this data type is cast to.
    pub fn engine_type(self) -> EngineType {
        match self {
            DataType::Binary => EngineType::Binary,
            DataType::Boolean => EngineType::Boolean,
            DataType::Date => EngineType::Date,
            DataType::Decimal => EngineType::Decimal,
            DataType::Double => EngineType::Double,
            DataType::Float => EngineType::Float,
            DataType::Integer => EngineType::Int,
            DataType::BigInt => EngineType::Long,
            DataType::String => EngineType::Utf8,
            DataType::Timestamp => EngineType::Timestamp,
            DataType::ArrayBigInt => EngineType::List(ScalarType::Long),
            DataType::ArrayFloat => EngineType::List(ScalarType::Float),
            DataType::ArrayString => EngineType::List(ScalarType::Utf8),
        }
    }

    /// Canonical lowercase name, as accepted by [`DataType::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            DataType::Binary => "binary",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Decimal => "decimal",
            DataType::Double => "double",
            DataType::Float => "float",
            DataType::Integer => "integer",
            DataType::BigInt => "bigint",
            DataType::String => "string",
            DataType::Timestamp => "timestamp",
            DataType::ArrayBigInt => "array<bigint>",
            DataType::ArrayFloat => "array<float>",
            DataType::ArrayString => "array<string>",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        let dtype = match normalized.as_str() {
            "binary" => DataType::Binary,
            "boolean" | "bool" => DataType::Boolean,
            "date" => DataType::Date,
            "decimal" => DataType::Decimal,
            "double" => DataType::Double,
            "float" => DataType::Float,
            "integer" | "int" => DataType::Integer,
            "bigint" | "long" => DataType::BigInt,
            "string" => DataType::String,
            "timestamp" => DataType::Timestamp,
            "array<bigint>" | "array_bigint" => DataType::ArrayBigInt,
            "array<float>" | "array_float" => DataType::ArrayFloat,
            "array<string>" | "array_string" => DataType::ArrayString,
            _ => {
                return Err(FeatureError::invalid(format!(
                    "dtype must be a DataType, got '{}'",
                    s
                )))
            }
        };
        Ok(dtype)
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("INTEGER".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!(" Array<String> ".parse::<DataType>().unwrap(), DataType::ArrayString);
        assert_eq!("array< bigint >".parse::<DataType>().unwrap(), DataType::ArrayBigInt);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = "varchar".parse::<DataType>().unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("varchar"));
    }

    #[test]
    fn test_names_parse_back() {
        for dtype in DataType::ALL {
            assert_eq!(dtype.name().parse::<DataType>().unwrap(), dtype);
        }
    }

    #[test]
    fn test_engine_mapping() {
        assert_eq!(DataType::Integer.engine_type(), EngineType::Int);
        assert_eq!(DataType::BigInt.engine_type(), EngineType::Long);
        assert_eq!(DataType::ArrayFloat.engine_type(), EngineType::List(ScalarType::Float));
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&DataType::Timestamp).unwrap();
        assert_eq!(json, "\"timestamp\"");
        let err = serde_json::from_str::<DataType>("\"money\"").unwrap_err();
        assert!(err.to_string().contains("money"));
    }
}
