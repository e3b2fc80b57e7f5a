//! Single-column expression transform.

use serde::{Deserialize, Serialize};

use super::{FeatureParent, TransformComponent};
use crate::dataframe::{DataFrame, Expr};
use crate::error::{EngineResult, FeatureResult};

/// Writes `expr` into the feature's column, cast to the feature's dtype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionTransform {
    pub expr: Expr,
    #[serde(skip)]
    parent: Option<FeatureParent>,
}

impl ExpressionTransform {
    pub fn new(expr: Expr) -> Self {
        Self { expr, parent: None }
    }
}

impl TransformComponent for ExpressionTransform {
    fn kind(&self) -> &'static str {
        "expression"
    }

    fn is_self_typing(&self) -> bool {
        false
    }

    fn parent(&self) -> Option<&FeatureParent> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: FeatureParent) {
        self.parent = Some(parent);
    }

    fn output_columns(&self) -> Vec<String> {
        self.parent.iter().map(|p| p.name.clone()).collect()
    }

    fn transform(&self, df: &DataFrame) -> EngineResult<DataFrame> {
        let parent = self.attached_parent()?;
        let expr = match parent.dtype {
            Some(dtype) => self.expr.clone().cast(dtype.engine_type()),
            None => self.expr.clone(),
        };
        df.with_column(&parent.name, &expr)
    }

    fn validate(&self) -> FeatureResult<()> {
        self.expr.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::{col, BinaryOp, ScalarFunction};
    use crate::types::DataType;
    use serde_json::json;

    #[test]
    fn test_expression_cast_to_parent_dtype() {
        let mut t = ExpressionTransform::new(col("a").binary(BinaryOp::Divide, col("b")));
        t.set_parent(FeatureParent {
            name: "ratio".into(),
            dtype: Some(DataType::String),
            from_column: None,
        });

        let df = DataFrame::from_records(vec![json!({"a": 1, "b": 4})]).unwrap();
        let out = t.transform(&df).unwrap();

        assert_eq!(t.output_columns(), vec!["ratio"]);
        assert_eq!(out.to_records()[0]["ratio"], "0.25");
    }

    #[test]
    fn test_validate_checks_nested_calls() {
        let bad = ScalarFunction::RegexReplace { pattern: "(".into(), value: String::new() };
        let t = ExpressionTransform::new(col("a").call(ScalarFunction::Trim).call(bad));
        assert!(t.validate().is_err());
        assert!(ExpressionTransform::new(col("a").call(ScalarFunction::Trim)).validate().is_ok());
    }
}
