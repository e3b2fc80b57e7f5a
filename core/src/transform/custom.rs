//! Closure-backed transform for logic that has no declarative form.

use std::fmt;
use std::sync::Arc;

use super::{FeatureParent, TransformComponent};
use crate::dataframe::{DataFrame, Expr};
use crate::error::EngineResult;

type BuildExpr = dyn Fn(&DataFrame, &FeatureParent) -> EngineResult<Expr> + Send + Sync;

/// Builds the feature's column expression from the input frame and parent.
///
/// The result is cast to the feature's dtype, like [`super::ExpressionTransform`].
#[derive(Clone)]
pub struct CustomTransform {
    build: Arc<BuildExpr>,
    parent: Option<FeatureParent>,
}

impl CustomTransform {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&DataFrame, &FeatureParent) -> EngineResult<Expr> + Send + Sync + 'static,
    {
        Self { build: Arc::new(build), parent: None }
    }
}

impl fmt::Debug for CustomTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTransform")
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl TransformComponent for CustomTransform {
    fn kind(&self) -> &'static str {
        "custom"
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
        let mut expr = (self.build)(df, parent)?;
        if let Some(dtype) = parent.dtype {
            expr = expr.cast(dtype.engine_type());
        }
        df.with_column(&parent.name, &expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::{col, lit, BinaryOp};
    use crate::error::EngineError;
    use crate::types::DataType;
    use serde_json::json;

    fn parent() -> FeatureParent {
        FeatureParent {
            name: "label".into(),
            dtype: Some(DataType::String),
            from_column: Some("first".into()),
        }
    }

    #[test]
    fn test_closure_sees_parent() {
        let mut t = CustomTransform::new(|_, parent| {
            Ok(col(parent.source_column()).binary(BinaryOp::Concat, lit("!")))
        });
        t.set_parent(parent());

        let df = DataFrame::from_records(vec![json!({"first": "hi"})]).unwrap();
        assert_eq!(t.transform(&df).unwrap().to_records()[0]["label"], "hi!");
    }

    #[test]
    fn test_closure_error_propagates() {
        let mut t = CustomTransform::new(|_, _| Err(EngineError::MissingColumn("x".into())));
        t.set_parent(parent());

        let df = DataFrame::from_records(vec![json!({"first": "hi"})]).unwrap();
        assert_eq!(t.transform(&df).unwrap_err(), EngineError::MissingColumn("x".into()));
    }
}
