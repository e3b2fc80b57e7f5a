//! Engine-native function transform.

use serde::{Deserialize, Serialize};

use super::{ensure_unique, FeatureParent, TransformComponent};
use crate::dataframe::{col, DataFrame, ScalarFunction};
use crate::error::{EngineResult, FeatureError, FeatureResult};
use crate::types::DataType;

/// A scalar function and optional result type override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub function: ScalarFunction,
    /// Type name as written; resolved in `validate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
}

impl Function {
    pub fn new(function: ScalarFunction) -> Self {
        Self { function, dtype: None }
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype.name().to_string());
        self
    }

    pub fn declared_type(&self) -> FeatureResult<Option<DataType>> {
        self.dtype.as_deref().map(str::parse::<DataType>).transpose()
    }

    pub fn output_type(&self) -> DataType {
        self.declared_type()
            .ok()
            .flatten()
            .unwrap_or_else(|| self.function.output_type())
    }
}

/// Applies engine functions to the feature's source column.
///
/// Self-typing: each output is cast to its function's signature type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionTransform {
    pub functions: Vec<Function>,
    #[serde(skip)]
    parent: Option<FeatureParent>,
}

impl FunctionTransform {
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions, parent: None }
    }
}

impl TransformComponent for FunctionTransform {
    fn kind(&self) -> &'static str {
        "function"
    }

    fn is_self_typing(&self) -> bool {
        true
    }

    fn parent(&self) -> Option<&FeatureParent> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: FeatureParent) {
        self.parent = Some(parent);
    }

    fn output_columns(&self) -> Vec<String> {
        match &self.parent {
            Some(parent) => self
                .functions
                .iter()
                .map(|f| parent.suffixed(f.function.name()))
                .collect(),
            None => Vec::new(),
        }
    }

    fn transform(&self, df: &DataFrame) -> EngineResult<DataFrame> {
        let parent = self.attached_parent()?;

        let mut out = df.clone();
        for f in &self.functions {
            let expr = col(parent.source_column())
                .call(f.function.clone())
                .cast(f.output_type().engine_type());
            out = out.with_column(&parent.suffixed(f.function.name()), &expr)?;
        }
        Ok(out)
    }

    fn validate(&self) -> FeatureResult<()> {
        if self.functions.is_empty() {
            return Err(FeatureError::invalid("function transform needs at least one function"));
        }
        for f in &self.functions {
            f.function.validate()?;
            f.declared_type()?;
        }
        ensure_unique("function transform", self.functions.iter().map(|f| f.function.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use serde_json::{json, Value};

    fn attached(functions: Vec<Function>) -> FunctionTransform {
        let mut t = FunctionTransform::new(functions);
        t.set_parent(FeatureParent {
            name: "title".into(),
            dtype: None,
            from_column: Some("raw_title".into()),
        });
        t
    }

    #[test]
    fn test_applies_each_function() {
        let t = attached(vec![
            Function::new(ScalarFunction::Trim),
            Function::new(ScalarFunction::Length),
        ]);
        let df = DataFrame::from_records(vec![json!({"raw_title": "  Song "})]).unwrap();
        let out = t.transform(&df).unwrap();

        assert_eq!(out.columns(), ["raw_title", "title__trim", "title__length"]);
        let record = &out.to_records()[0];
        assert_eq!(record["title__trim"], "Song");
        assert_eq!(record["title__length"], 7);
    }

    #[test]
    fn test_dtype_override() {
        let t = attached(vec![Function::new(ScalarFunction::Length).with_dtype(DataType::String)]);
        let df = DataFrame::from_records(vec![json!({"raw_title": "abc"})]).unwrap();
        assert_eq!(t.transform(&df).unwrap().to_records()[0]["title__length"], "3");
    }

    #[test]
    fn test_null_input() {
        let t = attached(vec![Function::new(ScalarFunction::Upper)]);
        let df = DataFrame::from_records(vec![json!({"raw_title": null})]).unwrap();
        assert_eq!(t.transform(&df).unwrap().to_records()[0]["title__upper"], Value::Null);
    }

    #[test]
    fn test_validate() {
        assert!(FunctionTransform::new(vec![]).validate().is_err());
        let dup = FunctionTransform::new(vec![
            Function::new(ScalarFunction::Round { scale: 0 }),
            Function::new(ScalarFunction::Round { scale: 2 }),
        ]);
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_invalid_regex_fails_build() {
        let result = Feature::builder("code", "cleaned code")
            .from_column("raw")
            .transformation(FunctionTransform::new(vec![Function::new(
                ScalarFunction::RegexReplace { pattern: "([".into(), value: String::new() },
            )]))
            .build();

        let err = result.unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfiguration(ref m) if m.contains("regex")));
    }

    #[test]
    fn test_unknown_dtype_fails_build() {
        let t: FunctionTransform = serde_json::from_value(json!({
            "functions": [{"function": {"type": "trim"}, "dtype": "money"}]
        }))
        .unwrap();

        let err = Feature::builder("code", "d").transformation(t).build().unwrap_err();
        assert!(matches!(err, FeatureError::InvalidConfiguration(ref m) if m.contains("money")));
    }
}
