//! In-memory dataset engine.
//!
//! This module provides:
//! - `DataFrame`: partitioned rows of JSON values with an ordered column list
//! - `expr`: column expressions (`col`, `lit`, `cast`, operators)
//! - `functions`: engine-native scalar functions
//! - `cast`: value casting between engine types
//!
//! Every operation returns a new frame; the receiver is never modified.
//!
//! ## Example
//!
//! ```rust
//! use featurekit::dataframe::{col, DataFrame};
//! use featurekit::types::EngineType;
//! use serde_json::json;
//!
//! let df = DataFrame::from_records(vec![json!({"id": 1, "raw": "10"})]).unwrap();
//! let out = df.with_column("raw_int", &col("raw").cast(EngineType::Int)).unwrap();
//!
//! assert_eq!(out.columns(), ["id", "raw", "raw_int"]);
//! assert_eq!(out.to_records()[0]["raw_int"], 10);
//! ```

pub mod cast;
pub mod expr;
pub mod functions;

pub use cast::cast_value;
pub use expr::{col, lit, BinaryOp, Expr};
pub use functions::ScalarFunction;

use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};

/// A single row, keyed by column name.
pub type Row = Map<String, Value>;

/// Partitioned, row-oriented table.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<String>,
    partitions: Vec<Vec<Row>>,
}

impl DataFrame {
    /// Empty frame with the given columns and a single partition.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, partitions: vec![Vec::new()] }
    }

    /// Build a frame from JSON objects.
    ///
    /// Columns are the union of all keys, in order of first appearance.
    pub fn from_records(records: Vec<Value>) -> EngineResult<Self> {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(records.len());

        for (i, record) in records.into_iter().enumerate() {
            let Value::Object(row) = record else {
                return Err(EngineError::Evaluation {
                    column: String::new(),
                    message: format!("record {} is not a JSON object", i),
                });
            };
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
            rows.push(row);
        }

        Ok(Self { columns, partitions: vec![rows] })
    }

    /// Build a frame with an explicit column order.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, partitions: vec![rows] }
    }

    pub(crate) fn from_partitions(columns: Vec<String>, partitions: Vec<Vec<Row>>) -> Self {
        Self { columns, partitions }
    }

    /// Current column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn partitions(&self) -> &[Vec<Row>] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// All rows, partition by partition.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.partitions.iter().flatten()
    }

    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    /// Column values in row order. Absent cells read as null.
    pub fn column_values(&self, name: &str) -> EngineResult<Vec<Value>> {
        self.require_column(name)?;
        Ok(self
            .rows()
            .map(|row| row.get(name).cloned().unwrap_or(Value::Null))
            .collect())
    }

    /// Return a new frame with column `name` added or replaced by `expr`.
    pub fn with_column(&self, name: &str, expr: &Expr) -> EngineResult<DataFrame> {
        for referenced in expr.referenced_columns() {
            self.require_column(referenced)?;
        }

        let partitions: Vec<Vec<Row>> = self
            .partitions
            .iter()
            .map(|partition| {
                partition
                    .iter()
                    .map(|row| {
                        let mut out = row.clone();
                        out.insert(name.to_string(), expr.evaluate(row));
                        out
                    })
                    .collect()
            })
            .collect();

        Ok(DataFrame { columns: self.columns_with(name), partitions })
    }

    /// Return a new frame with column `name` holding `values`, one per row.
    pub fn with_column_values(&self, name: &str, values: Vec<Value>) -> EngineResult<DataFrame> {
        if values.len() != self.num_rows() {
            return Err(EngineError::Evaluation {
                column: name.to_string(),
                message: format!("expected {} values, got {}", self.num_rows(), values.len()),
            });
        }

        let mut values = values.into_iter();
        let partitions: Vec<Vec<Row>> = self
            .partitions
            .iter()
            .map(|partition| {
                partition
                    .iter()
                    .zip(values.by_ref())
                    .map(|(row, value)| {
                        let mut out = row.clone();
                        out.insert(name.to_string(), value);
                        out
                    })
                    .collect()
            })
            .collect();

        Ok(DataFrame { columns: self.columns_with(name), partitions })
    }

    /// Project onto `names`, in that order.
    pub fn select(&self, names: &[&str]) -> EngineResult<DataFrame> {
        for name in names {
            self.require_column(name)?;
        }

        let partitions: Vec<Vec<Row>> = self
            .partitions
            .iter()
            .map(|partition| {
                partition
                    .iter()
                    .map(|row| {
                        names
                            .iter()
                            .map(|n| (n.to_string(), row.get(*n).cloned().unwrap_or(Value::Null)))
                            .collect()
                    })
                    .collect()
            })
            .collect();

        Ok(DataFrame {
            columns: names.iter().map(|n| n.to_string()).collect(),
            partitions,
        })
    }

    /// Rows as JSON objects with every column present.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    fn require_column(&self, name: &str) -> EngineResult<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(EngineError::MissingColumn(name.to_string()))
        }
    }

    fn columns_with(&self, name: &str) -> Vec<String> {
        let mut columns = self.columns.clone();
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EngineType;
    use serde_json::json;

    fn sample() -> DataFrame {
        DataFrame::from_records(vec![
            json!({"id": 1, "raw": "10"}),
            json!({"id": 2, "raw": "x"}),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_records_column_order() {
        let df = DataFrame::from_records(vec![json!({"a": 1}), json!({"b": 2, "a": 3})]).unwrap();
        assert_eq!(df.columns(), ["a", "b"]);
        assert_eq!(df.num_rows(), 2);
        assert_eq!(df.to_records()[0]["b"], Value::Null);
    }

    #[test]
    fn test_from_records_rejects_non_objects() {
        let err = DataFrame::from_records(vec![json!([1, 2])]).unwrap_err();
        assert!(matches!(err, EngineError::Evaluation { .. }));
    }

    #[test]
    fn test_with_column_adds_and_casts() {
        let df = sample();
        let out = df.with_column("raw_int", &col("raw").cast(EngineType::Int)).unwrap();

        assert_eq!(out.columns(), ["id", "raw", "raw_int"]);
        let records = out.to_records();
        assert_eq!(records[0]["raw_int"], 10);
        assert_eq!(records[1]["raw_int"], Value::Null);

        // Original untouched
        assert_eq!(df.columns(), ["id", "raw"]);
    }

    #[test]
    fn test_with_column_replaces_in_place() {
        let out = sample().with_column("raw", &lit("z")).unwrap();
        assert_eq!(out.columns(), ["id", "raw"]);
        assert_eq!(out.to_records()[1]["raw"], "z");
    }

    #[test]
    fn test_with_column_missing_source() {
        let err = sample().with_column("x", &col("nope")).unwrap_err();
        assert_eq!(err, EngineError::MissingColumn("nope".into()));
    }

    #[test]
    fn test_with_column_values_length_checked() {
        let df = sample();
        assert!(df.with_column_values("v", vec![json!(1)]).is_err());
        let out = df.with_column_values("v", vec![json!(1), json!(2)]).unwrap();
        assert_eq!(out.column_values("v").unwrap(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_select() {
        let out = sample().select(&["raw"]).unwrap();
        assert_eq!(out.columns(), ["raw"]);
        assert_eq!(out.to_records()[0], json!({"raw": "10"}));
    }
}
