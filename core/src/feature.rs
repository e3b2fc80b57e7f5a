//! Feature entity.
//!
//! A feature is the result of a transformation over one or more columns of
//! an input [`DataFrame`]. Transformations can be as simple as renaming and
//! casting a column, or as involved as an aggregation.
//!
//! Features are built once through [`FeatureBuilder`], which validates every
//! field together:
//!
//! - `name` and `description` must be non-blank
//! - `dtype` may only be omitted when the transformation is self-typing
//! - the transformation's own configuration must be valid
//!
//! # Example
//!
//! ```rust
//! use featurekit::{DataFrame, DataType, Feature};
//! use serde_json::json;
//!
//! let feature = Feature::builder("raw_int", "raw value as an integer")
//!     .from_column("raw")
//!     .dtype(DataType::Integer)
//!     .build()
//!     .unwrap();
//!
//! let df = DataFrame::from_records(vec![json!({"id": 1, "raw": "10"})]).unwrap();
//! let out = feature.transform(&df).unwrap();
//!
//! assert_eq!(out.to_records()[0], json!({"id": 1, "raw": "10", "raw_int": 10}));
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConflictPolicy, TransformOptions};
use crate::dataframe::{col, DataFrame};
use crate::error::{FeatureError, FeatureResult};
use crate::logs::{log_diagnostic, Diagnostic};
use crate::transform::{FeatureParent, TransformComponent, Transformation};
use crate::types::DataType;

/// A named, typed derivation rule.
#[derive(Debug, Clone)]
pub struct Feature {
    name: String,
    description: String,
    dtype: Option<DataType>,
    from_column: Option<String>,
    transformation: Option<Transformation>,
}

impl Feature {
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> FeatureBuilder {
        FeatureBuilder {
            name: name.into(),
            description: description.into(),
            dtype: None,
            from_column: None,
            transformation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dtype(&self) -> Option<DataType> {
        self.dtype
    }

    pub fn from_column(&self) -> Option<&str> {
        self.from_column.as_deref()
    }

    pub fn transformation(&self) -> Option<&Transformation> {
        self.transformation.as_ref()
    }

    /// Replace the transformation, re-validating the whole feature.
    pub fn with_transformation(self, transformation: Transformation) -> FeatureResult<Feature> {
        self.into_builder().transformation(transformation).build()
    }

    /// Builder pre-filled with this feature's fields.
    pub fn into_builder(self) -> FeatureBuilder {
        FeatureBuilder {
            name: self.name,
            description: self.description,
            dtype: self.dtype,
            from_column: self.from_column,
            transformation: self.transformation,
        }
    }

    /// Output columns that will be generated by this feature.
    pub fn get_output_columns(&self) -> Vec<String> {
        match &self.transformation {
            Some(t) => t.output_columns(),
            None => vec![self.name.clone()],
        }
    }

    /// Apply the feature with default options.
    pub fn transform(&self, df: &DataFrame) -> FeatureResult<DataFrame> {
        self.transform_with(df, &TransformOptions::default())
    }

    /// Apply the feature.
    ///
    /// With a transformation attached, the transformation owns the result.
    /// Otherwise `from_column` is copied into `name` and `name` is cast to
    /// `dtype`.
    pub fn transform_with(
        &self,
        df: &DataFrame,
        options: &TransformOptions,
    ) -> FeatureResult<DataFrame> {
        if let Some(t) = &self.transformation {
            return Ok(t.transform(df)?);
        }
        apply_fallback(
            df,
            &self.name,
            self.from_column.as_deref(),
            self.dtype,
            options,
        )
    }

    fn parent(&self) -> FeatureParent {
        FeatureParent {
            name: self.name.clone(),
            dtype: self.dtype,
            from_column: self.from_column.clone(),
        }
    }
}

/// Rename-and-cast behavior for features without a transformation.
pub(crate) fn apply_fallback(
    df: &DataFrame,
    name: &str,
    from_column: Option<&str>,
    dtype: Option<DataType>,
    options: &TransformOptions,
) -> FeatureResult<DataFrame> {
    let mut out = match from_column {
        Some(source) => {
            if df.has_column(name) {
                if options.conflict_policy == ConflictPolicy::Deny {
                    return Err(FeatureError::SchemaConflict { column: name.to_string() });
                }
                log_diagnostic(
                    Diagnostic::SchemaConflict,
                    format!(
                        "The column name {} already exists in the dataframe and \
                         will be overwritten with another column.",
                        name
                    ),
                );
            }
            df.with_column(name, &col(source))?
        }
        None => df.clone(),
    };

    if let Some(dtype) = dtype {
        out = out.with_column(name, &col(name).cast(dtype.engine_type()))?;
    }
    Ok(out)
}

/// Collects feature fields and validates them together in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    name: String,
    description: String,
    dtype: Option<DataType>,
    from_column: Option<String>,
    transformation: Option<Transformation>,
}

impl FeatureBuilder {
    pub fn dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn maybe_dtype(mut self, dtype: Option<DataType>) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn from_column(mut self, column: impl Into<String>) -> Self {
        self.from_column = Some(column.into());
        self
    }

    pub fn transformation(mut self, transformation: impl Into<Transformation>) -> Self {
        self.transformation = Some(transformation.into());
        self
    }

    /// Validate all fields at once and attach the transformation.
    pub fn build(self) -> FeatureResult<Feature> {
        if self.name.trim().is_empty() {
            return Err(FeatureError::invalid("name can't be blank"));
        }
        if self.description.trim().is_empty() {
            return Err(FeatureError::invalid(format!(
                "description of feature '{}' can't be blank",
                self.name
            )));
        }
        if self.from_column.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(FeatureError::invalid(format!(
                "from_column of feature '{}' can't be blank",
                self.name
            )));
        }

        let self_typing = self
            .transformation
            .as_ref()
            .is_some_and(|t| t.is_self_typing());
        if self.dtype.is_none() && !self_typing {
            return Err(FeatureError::invalid(format!(
                "dtype of feature '{}' can't be None, except if the transformation is self-typing",
                self.name
            )));
        }

        if let Some(t) = &self.transformation {
            t.validate()?;
        }

        let mut feature = Feature {
            name: self.name,
            description: self.description,
            dtype: self.dtype,
            from_column: self.from_column,
            transformation: None,
        };
        if let Some(mut t) = self.transformation {
            t.set_parent(feature.parent());
            feature.transformation = Some(t);
        }
        Ok(feature)
    }
}

/// Serializable form of a feature, as found in pipeline definitions.
///
/// `dtype` is kept as a string so an unrecognized type surfaces as
/// [`FeatureError::InvalidConfiguration`] when the feature is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDefinition {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<Transformation>,
}

impl TryFrom<FeatureDefinition> for Feature {
    type Error = FeatureError;

    fn try_from(def: FeatureDefinition) -> Result<Self, Self::Error> {
        let dtype = def.dtype.as_deref().map(str::parse::<DataType>).transpose()?;

        let mut builder = Feature::builder(def.name, def.description).maybe_dtype(dtype);
        if let Some(column) = def.from_column {
            builder = builder.from_column(column);
        }
        if let Some(t) = def.transformation {
            builder = builder.transformation(t);
        }
        builder.build()
    }
}

impl From<&Feature> for FeatureDefinition {
    fn from(feature: &Feature) -> Self {
        Self {
            name: feature.name.clone(),
            description: feature.description.clone(),
            dtype: feature.dtype.map(|d| d.name().to_string()),
            from_column: feature.from_column.clone(),
            transformation: feature.transformation.clone(),
        }
    }
}
