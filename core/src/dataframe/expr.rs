//! Column expressions evaluated row by row.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::cast::cast_value;
use super::functions::{as_f64, as_string, float_value, ScalarFunction};
use super::Row;
use crate::error::FeatureResult;
use crate::types::EngineType;

/// A column expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    /// Reference to an existing column
    Column { name: String },

    /// Constant value
    Literal { value: Value },

    /// Cast to an engine-native type
    Cast { expr: Box<Expr>, to: EngineType },

    /// Binary operator
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Scalar function call
    Call {
        function: ScalarFunction,
        expr: Box<Expr>,
    },

    /// First non-null value
    Coalesce { exprs: Vec<Expr> },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
    Concat,
}

/// Reference to the column `name`.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column { name: name.into() }
}

/// Constant expression.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal { value: value.into() }
}

impl Expr {
    /// Cast this expression to `to`.
    pub fn cast(self, to: EngineType) -> Expr {
        Expr::Cast { expr: Box::new(self), to }
    }

    /// Apply a scalar function to this expression.
    pub fn call(self, function: ScalarFunction) -> Expr {
        Expr::Call { function, expr: Box::new(self) }
    }

    pub fn binary(self, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary { op, left: Box::new(self), right: Box::new(right) }
    }

    /// Columns this expression reads, in first-reference order.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column { name } => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Literal { .. } => {}
            Expr::Cast { expr, .. } | Expr::Call { expr, .. } => expr.collect_columns(out),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Coalesce { exprs } => exprs.iter().for_each(|e| e.collect_columns(out)),
        }
    }

    /// Check the arguments of every function call in the tree.
    pub fn validate(&self) -> FeatureResult<()> {
        match self {
            Expr::Column { .. } | Expr::Literal { .. } => Ok(()),
            Expr::Cast { expr, .. } => expr.validate(),
            Expr::Call { function, expr } => {
                function.validate()?;
                expr.validate()
            }
            Expr::Binary { left, right, .. } => {
                left.validate()?;
                right.validate()
            }
            Expr::Coalesce { exprs } => exprs.iter().try_for_each(Expr::validate),
        }
    }

    /// Evaluate against a single row. Absent cells read as null.
    pub fn evaluate(&self, row: &Row) -> Value {
        match self {
            Expr::Column { name } => row.get(name).cloned().unwrap_or(Value::Null),
            Expr::Literal { value } => value.clone(),
            Expr::Cast { expr, to } => cast_value(&expr.evaluate(row), *to),
            Expr::Call { function, expr } => function.apply(&expr.evaluate(row)),
            Expr::Binary { op, left, right } => {
                apply_binary(*op, &left.evaluate(row), &right.evaluate(row))
            }
            Expr::Coalesce { exprs } => exprs
                .iter()
                .map(|e| e.evaluate(row))
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null),
        }
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    if left.is_null() || right.is_null() {
        return Value::Null;
    }
    match op {
        BinaryOp::Add => arithmetic(left, right, i64::checked_add, |a, b| a + b),
        BinaryOp::Subtract => arithmetic(left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Multiply => arithmetic(left, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Divide => match (as_f64(left), as_f64(right)) {
            (Some(_), Some(b)) if b == 0.0 => Value::Null,
            (Some(a), Some(b)) => float_value(a / b),
            _ => Value::Null,
        },
        BinaryOp::Eq => Value::Bool(compare(left, right) == Some(std::cmp::Ordering::Equal)),
        BinaryOp::NotEq => Value::Bool(compare(left, right) != Some(std::cmp::Ordering::Equal)),
        BinaryOp::Gt => ordering(left, right, |o| o.is_gt()),
        BinaryOp::Gte => ordering(left, right, |o| o.is_ge()),
        BinaryOp::Lt => ordering(left, right, |o| o.is_lt()),
        BinaryOp::Lte => ordering(left, right, |o| o.is_le()),
        BinaryOp::And => match (left.as_bool(), right.as_bool()) {
            (Some(a), Some(b)) => Value::Bool(a && b),
            _ => Value::Null,
        },
        BinaryOp::Or => match (left.as_bool(), right.as_bool()) {
            (Some(a), Some(b)) => Value::Bool(a || b),
            _ => Value::Null,
        },
        BinaryOp::Concat => match (as_string(left), as_string(right)) {
            (Some(a), Some(b)) => Value::String(a + &b),
            _ => Value::Null,
        },
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        if let Some(n) = int_op(a, b) {
            return Value::Number(n.into());
        }
    }
    match (as_f64(left), as_f64(right)) {
        (Some(a), Some(b)) => float_value(float_op(a, b)),
        _ => Value::Null,
    }
}

fn ordering(left: &Value, right: &Value, f: fn(std::cmp::Ordering) -> bool) -> Value {
    compare(left, right).map(|o| Value::Bool(f(o))).unwrap_or(Value::Null)
}

/// Total-enough ordering for sorting and comparisons.
///
/// Numbers compare numerically, strings lexically, booleans false < true.
/// Mixed kinds are incomparable.
pub(crate) fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(std::cmp::Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (a, b) if a == b => Some(std::cmp::Ordering::Equal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_column_and_cast() {
        let r = row(json!({"raw": "10"}));
        assert_eq!(col("raw").cast(EngineType::Int).evaluate(&r), json!(10));
        assert_eq!(col("missing").evaluate(&r), Value::Null);
    }

    #[test]
    fn test_arithmetic_keeps_integers() {
        let r = row(json!({"a": 2, "b": 3, "c": 1.5}));
        assert_eq!(col("a").binary(BinaryOp::Add, col("b")).evaluate(&r), json!(5));
        assert_eq!(col("a").binary(BinaryOp::Multiply, col("c")).evaluate(&r), json!(3.0));
        assert_eq!(col("a").binary(BinaryOp::Divide, lit(0)).evaluate(&r), Value::Null);
    }

    #[test]
    fn test_comparisons_and_concat() {
        let r = row(json!({"a": "x", "n": 4}));
        assert_eq!(col("n").binary(BinaryOp::Gt, lit(3)).evaluate(&r), json!(true));
        assert_eq!(col("a").binary(BinaryOp::Concat, lit("y")).evaluate(&r), json!("xy"));
        assert_eq!(col("a").binary(BinaryOp::Lt, lit(1)).evaluate(&r), Value::Null);
    }

    #[test]
    fn test_coalesce() {
        let r = row(json!({"a": null, "b": "fallback"}));
        let expr = Expr::Coalesce { exprs: vec![col("a"), col("b")] };
        assert_eq!(expr.evaluate(&r), json!("fallback"));
    }

    #[test]
    fn test_referenced_columns_deduplicated() {
        let expr = col("a").binary(BinaryOp::Add, col("b").binary(BinaryOp::Add, col("a")));
        assert_eq!(expr.referenced_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_deserialize_expression() {
        let expr: Expr = serde_json::from_value(json!({
            "type": "cast",
            "expr": {"type": "column", "name": "raw"},
            "to": "long"
        }))
        .unwrap();
        assert_eq!(expr, col("raw").cast(EngineType::Long));
    }
}
