//! Feature pipelines.
//!
//! A pipeline is an ordered list of features applied one after another to
//! the same frame, with optional repartitioning beforehand.
//!
//! # Example
//!
//! ```rust
//! use featurekit::pipeline::{FeaturePipeline, PipelineDefinition};
//! use featurekit::DataFrame;
//! use serde_json::json;
//!
//! let definition = PipelineDefinition::from_json(r#"{
//!     "features": [
//!         {"name": "raw_int", "description": "raw as int", "dtype": "integer", "from_column": "raw"}
//!     ]
//! }"#).unwrap();
//! let pipeline = FeaturePipeline::from_definition(definition).unwrap();
//!
//! let df = DataFrame::from_records(vec![json!({"raw": "10"})]).unwrap();
//! let run = pipeline.run(&df).unwrap();
//!
//! assert_eq!(pipeline.output_columns(), vec!["raw_int"]);
//! assert_eq!(run.frame.to_records()[0]["raw_int"], 10);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{ConflictPolicy, Settings, TransformOptions};
use crate::dataframe::{DataFrame, ScalarFunction};
use crate::error::{PipelineError, PipelineResult};
use crate::feature::{Feature, FeatureDefinition};
use crate::logs::{log_info, log_info_indent, log_success};
use crate::parser::parse_file_auto;
use crate::repartition::{reshape, RepartitionConfig};
use crate::transform::{
    AggregateFunction, AggregatedTransform, Aggregation, Function, FunctionTransform,
    TransformComponent,
};

/// Serializable pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Version of the definition format
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Applied before the first feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repartition: Option<RepartitionConfig>,

    #[serde(default)]
    pub options: TransformOptions,

    pub features: Vec<FeatureDefinition>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl PipelineDefinition {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Summary of one applied feature
#[derive(Debug, Clone, Serialize)]
pub struct AppliedFeature {
    pub name: String,
    /// Transformation kind, or `rename` for the built-in fallback
    pub kind: &'static str,
    pub output_columns: Vec<String>,
}

/// Result of running a pipeline
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub frame: DataFrame,
    pub applied: Vec<AppliedFeature>,
}

/// Validated, ready-to-run pipeline
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    description: String,
    features: Vec<Feature>,
    repartition: Option<RepartitionConfig>,
    options: TransformOptions,
}

impl FeaturePipeline {
    /// Build a pipeline, rejecting features whose outputs collide.
    pub fn new(features: Vec<Feature>) -> PipelineResult<Self> {
        let mut seen: Vec<String> = Vec::new();
        for column in features.iter().flat_map(Feature::get_output_columns) {
            if seen.contains(&column) {
                return Err(PipelineError::DuplicateOutput(column));
            }
            seen.push(column);
        }

        Ok(Self {
            description: String::new(),
            features,
            repartition: None,
            options: TransformOptions::default(),
        })
    }

    pub fn from_definition(definition: PipelineDefinition) -> PipelineResult<Self> {
        let features = definition
            .features
            .into_iter()
            .map(Feature::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut pipeline = Self::new(features)?.with_options(definition.options);
        pipeline.description = definition.description;
        pipeline.repartition = definition.repartition;
        Ok(pipeline)
    }

    /// Load a definition file.
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_definition(PipelineDefinition::from_json(&content)?)
    }

    pub fn with_repartition(mut self, config: RepartitionConfig) -> Self {
        self.repartition = Some(config);
        self
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply environment settings on top of the definition.
    ///
    /// A `deny` conflict policy overrides the definition's policy. Partition
    /// sizing fills whatever the repartition config leaves unset, adding a
    /// round-robin repartition when the definition has none.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        if settings.conflict_policy == ConflictPolicy::Deny {
            self.options.conflict_policy = ConflictPolicy::Deny;
        }
        if settings.num_partitions.is_some() || settings.num_processors.is_some() {
            let config = self.repartition.get_or_insert_with(RepartitionConfig::default);
            config.num_partitions = config.num_partitions.or(settings.num_partitions);
            config.num_processors = config.num_processors.or(settings.num_processors);
        }
        self
    }

    pub fn repartition(&self) -> Option<&RepartitionConfig> {
        self.repartition.as_ref()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn to_definition(&self) -> PipelineDefinition {
        PipelineDefinition {
            version: default_version(),
            description: self.description.clone(),
            repartition: self.repartition.clone(),
            options: self.options.clone(),
            features: self.features.iter().map(FeatureDefinition::from).collect(),
        }
    }

    /// Every output column, feature by feature.
    pub fn output_columns(&self) -> Vec<String> {
        self.features.iter().flat_map(Feature::get_output_columns).collect()
    }

    /// Apply every feature in order.
    pub fn run(&self, df: &DataFrame) -> PipelineResult<PipelineRun> {
        let mut frame = match &self.repartition {
            Some(config) => {
                let reshaped = reshape(df, config)?;
                log_info(format!("Repartitioned into {} partitions", reshaped.num_partitions()));
                reshaped
            }
            None => df.clone(),
        };

        log_info(format!("⚙️  Applying {} features to {} rows...", self.features.len(), frame.num_rows()));
        let mut applied = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let kind = feature.transformation().map(|t| t.kind()).unwrap_or("rename");
            let output_columns = feature.get_output_columns();
            log_info_indent(format!("{} ({}) → {}", feature.name(), kind, output_columns.join(", ")), 1);

            frame = feature.transform_with(&frame, &self.options)?;
            applied.push(AppliedFeature {
                name: feature.name().to_string(),
                kind,
                output_columns,
            });
        }
        log_success(format!("Produced {} columns", frame.columns().len()));

        Ok(PipelineRun { frame, applied })
    }

    /// Load a CSV file and run the pipeline on it.
    pub fn run_csv(&self, path: impl AsRef<Path>) -> PipelineResult<PipelineRun> {
        let parsed = parse_file_auto(path)?;
        log_success(format!("Detected encoding: {}", parsed.encoding));
        log_success(format!("Read {} rows", parsed.frame.num_rows()));
        self.run(&parsed.frame)
    }
}

/// A small definition exercising each declarative transformation.
pub fn example_definition() -> PipelineDefinition {
    let features = vec![
        FeatureDefinition {
            name: "id".into(),
            description: "Row identifier".into(),
            dtype: Some("bigint".into()),
            from_column: None,
            transformation: None,
        },
        FeatureDefinition {
            name: "amount".into(),
            description: "Transaction amount".into(),
            dtype: Some("double".into()),
            from_column: Some("raw_amount".into()),
            transformation: None,
        },
        FeatureDefinition {
            name: "amount_stats".into(),
            description: "Per-store amount statistics".into(),
            dtype: None,
            from_column: Some("amount".into()),
            transformation: Some(
                AggregatedTransform::new(vec![
                    Aggregation::new(AggregateFunction::Avg),
                    Aggregation::new(AggregateFunction::Max),
                    Aggregation::new(AggregateFunction::Count),
                ])
                .group_by(vec!["store".into()])
                .into(),
            ),
        },
        FeatureDefinition {
            name: "store_code".into(),
            description: "Normalized store code".into(),
            dtype: None,
            from_column: Some("store".into()),
            transformation: Some(
                FunctionTransform::new(vec![
                    Function::new(ScalarFunction::Trim),
                    Function::new(ScalarFunction::Upper),
                ])
                .into(),
            ),
        },
    ];

    PipelineDefinition {
        version: default_version(),
        description: "Example store transactions features".into(),
        repartition: None,
        options: TransformOptions::default(),
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;
    use crate::types::DataType;
    use serde_json::json;

    fn transactions() -> DataFrame {
        DataFrame::from_records(vec![
            json!({"id": "1", "store": " a ", "raw_amount": "10.5"}),
            json!({"id": "2", "store": "b", "raw_amount": "3"}),
            json!({"id": "3", "store": " a ", "raw_amount": "4.5"}),
        ])
        .unwrap()
    }

    #[test]
    fn test_example_definition_runs() {
        let pipeline = FeaturePipeline::from_definition(example_definition()).unwrap();
        let run = pipeline.run(&transactions()).unwrap();

        assert_eq!(
            pipeline.output_columns(),
            vec![
                "id",
                "amount",
                "amount_stats__avg",
                "amount_stats__max",
                "amount_stats__count",
                "store_code__trim",
                "store_code__upper",
            ]
        );
        let records = run.frame.to_records();
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[0]["amount_stats__avg"], json!(7.5));
        assert_eq!(records[1]["amount_stats__count"], 1);
        assert_eq!(records[2]["store_code__upper"], " A ");
        assert_eq!(records[2]["store_code__trim"], "a");
        assert_eq!(run.applied[0].kind, "rename");
        assert_eq!(run.applied[2].kind, "aggregated");
    }

    #[test]
    fn test_duplicate_outputs_rejected() {
        let a = Feature::builder("x", "first").dtype(DataType::String).build().unwrap();
        let b = Feature::builder("x", "second").dtype(DataType::Integer).build().unwrap();

        let err = FeaturePipeline::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateOutput(c) if c == "x"));
    }

    #[test]
    fn test_definition_round_trip() {
        let json = example_definition().to_json().unwrap();
        let pipeline = FeaturePipeline::from_definition(PipelineDefinition::from_json(&json).unwrap()).unwrap();
        let again = pipeline.to_definition().to_json().unwrap();
        assert_eq!(json, again);
    }

    #[test]
    fn test_invalid_definition_surfaces_configuration_error() {
        let definition = PipelineDefinition::from_json(
            r#"{"features": [{"name": "a", "description": "no dtype"}]}"#,
        )
        .unwrap();
        let err = FeaturePipeline::from_definition(definition).unwrap_err();
        assert!(matches!(err, PipelineError::Feature(FeatureError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_strict_options_from_definition() {
        let definition = PipelineDefinition::from_json(
            r#"{
                "options": {"conflict_policy": "deny"},
                "features": [{"name": "store", "description": "d", "dtype": "string", "from_column": "id"}]
            }"#,
        )
        .unwrap();
        let pipeline = FeaturePipeline::from_definition(definition).unwrap();

        let err = pipeline.run(&transactions()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Feature(FeatureError::SchemaConflict { ref column }) if column == "store"
        ));
    }

    #[test]
    fn test_repartition_before_features() {
        let pipeline = FeaturePipeline::from_definition(example_definition())
            .unwrap()
            .with_repartition(RepartitionConfig {
                partition_by: vec!["store".into()],
                num_partitions: Some(2),
                ..Default::default()
            });
        let run = pipeline.run(&transactions()).unwrap();

        assert_eq!(run.frame.num_partitions(), 2);
        assert_eq!(run.frame.num_rows(), 3);
    }

    #[test]
    fn test_settings_fill_repartition() {
        let settings = Settings {
            conflict_policy: ConflictPolicy::Warn,
            num_processors: Some(2),
            num_partitions: None,
        };
        let pipeline = FeaturePipeline::from_definition(example_definition())
            .unwrap()
            .with_settings(&settings);

        let config = pipeline.repartition().unwrap();
        assert_eq!(config.num_processors, Some(2));
        assert!(config.partition_by.is_empty());

        // Two processors, four partitions each
        let run = pipeline.run(&transactions()).unwrap();
        assert_eq!(run.frame.num_partitions(), 8);
        assert_eq!(run.frame.num_rows(), 3);
    }

    #[test]
    fn test_settings_keep_definition_values() {
        let settings = Settings {
            conflict_policy: ConflictPolicy::Deny,
            num_processors: Some(2),
            num_partitions: Some(16),
        };
        let pipeline = FeaturePipeline::from_definition(example_definition())
            .unwrap()
            .with_repartition(RepartitionConfig {
                partition_by: vec!["store".into()],
                num_partitions: Some(3),
                ..Default::default()
            })
            .with_settings(&settings);

        let config = pipeline.repartition().unwrap();
        assert_eq!(config.num_partitions, Some(3));
        assert_eq!(config.num_processors, Some(2));
        assert_eq!(config.partition_by, vec!["store"]);
        assert_eq!(pipeline.options().conflict_policy, ConflictPolicy::Deny);
    }

    #[test]
    fn test_default_settings_change_nothing() {
        let pipeline = FeaturePipeline::from_definition(example_definition())
            .unwrap()
            .with_settings(&Settings::default());
        assert!(pipeline.repartition().is_none());
        assert_eq!(pipeline.options().conflict_policy, ConflictPolicy::Warn);
    }

    #[test]
    fn test_unknown_nested_dtype_is_configuration_error() {
        let definition = PipelineDefinition::from_json(
            r#"{
                "features": [{
                    "name": "amount",
                    "description": "d",
                    "transformation": {
                        "type": "aggregated",
                        "functions": [{"function": "sum", "dtype": "money"}]
                    }
                }]
            }"#,
        )
        .unwrap();

        let err = FeaturePipeline::from_definition(definition).unwrap_err();
        assert!(matches!(err, PipelineError::Feature(FeatureError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_run_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.csv");
        std::fs::write(&path, "id;store;raw_amount\n1;a;2\n2;a;4\n").unwrap();

        let pipeline = FeaturePipeline::from_definition(example_definition()).unwrap();
        let run = pipeline.run_csv(&path).unwrap();
        assert_eq!(run.frame.to_records()[1]["amount_stats__max"], json!(4.0));
    }
}
