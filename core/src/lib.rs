//! # featurekit - Declarative features over tabular data
//!
//! A [`Feature`] is a named, typed rule deriving one or more output columns
//! from an input [`DataFrame`]. A feature either owns a transformation
//! (aggregation, engine function, expression, custom closure) or falls back
//! to copying a source column and casting it to the declared type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / JSON │────▶│  DataFrame  │────▶│  Features   │────▶│  DataFrame  │
//! │   records   │     │ (repartition)│    │ (transform) │     │  + columns  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use featurekit::{DataFrame, DataType, Feature};
//! use featurekit::transform::{AggregateFunction, AggregatedTransform, Aggregation};
//! use serde_json::json;
//!
//! let stats = Feature::builder("amount", "amount statistics")
//!     .transformation(AggregatedTransform::new(vec![
//!         Aggregation::new(AggregateFunction::Avg),
//!         Aggregation::new(AggregateFunction::Max),
//!     ]))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(stats.get_output_columns(), vec!["amount__avg", "amount__max"]);
//!
//! let df = DataFrame::from_records(vec![json!({"amount": 2}), json!({"amount": 4})]).unwrap();
//! let out = stats.transform(&df).unwrap();
//! assert_eq!(out.to_records()[0]["amount__avg"], 3.0);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`types`] - Recognized data types
//! - [`dataframe`] - In-memory dataset engine
//! - [`transform`] - Transform components
//! - [`feature`] - Feature entity
//! - [`repartition`] - Partitioning helpers
//! - [`pipeline`] - Ordered feature pipelines
//! - [`parser`] - CSV loading
//! - [`config`] - Options and environment settings
//! - [`logs`] - Leveled diagnostics

// Core modules
pub mod error;
pub mod types;

// Dataset engine
pub mod dataframe;
pub mod repartition;

// Features
pub mod feature;
pub mod transform;

// Orchestration
pub mod config;
pub mod logs;
pub mod parser;
pub mod pipeline;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    CsvError, EngineError, EngineResult, FeatureError, FeatureResult, PipelineError,
    PipelineResult,
};

// =============================================================================
// Re-exports - Model
// =============================================================================

pub use dataframe::{col, lit, DataFrame, Expr};
pub use feature::{Feature, FeatureBuilder, FeatureDefinition};
pub use transform::{FeatureParent, TransformComponent, Transformation};
pub use types::{DataType, EngineType};

// =============================================================================
// Re-exports - Orchestration
// =============================================================================

pub use config::{ConflictPolicy, Settings, TransformOptions};
pub use pipeline::{example_definition, FeaturePipeline, PipelineDefinition, PipelineRun};
pub use repartition::{repartition_df, repartition_sort_df, reshape, RepartitionConfig};
