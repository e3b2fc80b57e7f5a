//! Transform components.
//!
//! A transform component knows which output columns it produces and how to
//! apply itself to a [`DataFrame`]. Components are attached to exactly one
//! [`Feature`](crate::feature::Feature); attaching hands the component a
//! [`FeatureParent`] snapshot of the owning feature's name, dtype and source
//! column.
//!
//! Available variants:
//!
//! | Variant | Self-typing | Output columns |
//! |---------|-------------|----------------|
//! | `aggregated` | yes | `{name}__{function}` per aggregation |
//! | `function` | yes | `{name}__{function}` per function |
//! | `expression` | no | `{name}` |
//! | `custom` | no | `{name}` |
//!
//! Self-typing variants compute their own output types, so the owning
//! feature may leave its `dtype` unset.

pub mod aggregated;
pub mod custom;
pub mod expression;
pub mod function;

pub use aggregated::{AggregateFunction, AggregatedTransform, Aggregation};
pub use custom::CustomTransform;
pub use expression::ExpressionTransform;
pub use function::{Function, FunctionTransform};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataframe::DataFrame;
use crate::error::{EngineError, EngineResult, FeatureResult};
use crate::types::DataType;

/// Read-only view of the feature a component is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureParent {
    pub name: String,
    pub dtype: Option<DataType>,
    pub from_column: Option<String>,
}

impl FeatureParent {
    /// Column the component reads: `from_column`, falling back to `name`.
    pub fn source_column(&self) -> &str {
        self.from_column.as_deref().unwrap_or(&self.name)
    }

    /// `{name}__{suffix}`
    pub fn suffixed(&self, suffix: &str) -> String {
        format!("{}__{}", self.name, suffix)
    }
}

/// Capability shared by every transformation variant.
pub trait TransformComponent: fmt::Debug + Send + Sync {
    /// Short variant name used in logs.
    fn kind(&self) -> &'static str;

    /// Whether the component determines its own output types.
    fn is_self_typing(&self) -> bool;

    fn parent(&self) -> Option<&FeatureParent>;

    fn set_parent(&mut self, parent: FeatureParent);

    /// Output column names, derived from configuration and the parent only.
    /// Empty while detached.
    fn output_columns(&self) -> Vec<String>;

    /// Apply to `df`, returning a new frame with every output column added.
    fn transform(&self, df: &DataFrame) -> EngineResult<DataFrame>;

    /// Configuration checks run when the owning feature is built.
    fn validate(&self) -> FeatureResult<()> {
        Ok(())
    }

    /// The parent, or [`EngineError::Detached`].
    fn attached_parent(&self) -> EngineResult<&FeatureParent> {
        self.parent().ok_or_else(|| EngineError::Detached(self.kind().to_string()))
    }
}

/// Tagged transformation variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transformation {
    Aggregated(AggregatedTransform),
    Function(FunctionTransform),
    Expression(ExpressionTransform),
    /// Closure-backed; not part of JSON definitions.
    #[serde(skip)]
    Custom(CustomTransform),
}

impl Transformation {
    fn component(&self) -> &dyn TransformComponent {
        match self {
            Transformation::Aggregated(t) => t,
            Transformation::Function(t) => t,
            Transformation::Expression(t) => t,
            Transformation::Custom(t) => t,
        }
    }

    fn component_mut(&mut self) -> &mut dyn TransformComponent {
        match self {
            Transformation::Aggregated(t) => t,
            Transformation::Function(t) => t,
            Transformation::Expression(t) => t,
            Transformation::Custom(t) => t,
        }
    }
}

impl TransformComponent for Transformation {
    fn kind(&self) -> &'static str {
        self.component().kind()
    }

    fn is_self_typing(&self) -> bool {
        self.component().is_self_typing()
    }

    fn parent(&self) -> Option<&FeatureParent> {
        self.component().parent()
    }

    fn set_parent(&mut self, parent: FeatureParent) {
        self.component_mut().set_parent(parent)
    }

    fn output_columns(&self) -> Vec<String> {
        self.component().output_columns()
    }

    fn transform(&self, df: &DataFrame) -> EngineResult<DataFrame> {
        self.component().transform(df)
    }

    fn validate(&self) -> FeatureResult<()> {
        self.component().validate()
    }
}

impl From<AggregatedTransform> for Transformation {
    fn from(t: AggregatedTransform) -> Self {
        Transformation::Aggregated(t)
    }
}

impl From<FunctionTransform> for Transformation {
    fn from(t: FunctionTransform) -> Self {
        Transformation::Function(t)
    }
}

impl From<ExpressionTransform> for Transformation {
    fn from(t: ExpressionTransform) -> Self {
        Transformation::Expression(t)
    }
}

impl From<CustomTransform> for Transformation {
    fn from(t: CustomTransform) -> Self {
        Transformation::Custom(t)
    }
}

/// Reject configurations whose output columns collide.
pub(crate) fn ensure_unique<'a>(
    kind: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> FeatureResult<()> {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        if seen.contains(&name) {
            return Err(crate::error::FeatureError::invalid(format!(
                "{} declares '{}' more than once",
                kind, name
            )));
        }
        seen.push(name);
    }
    Ok(())
}
