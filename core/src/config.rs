//! Runtime options and environment settings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{FeatureError, FeatureResult};

/// What to do when a feature would overwrite an existing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Emit a warning diagnostic and overwrite.
    #[default]
    Warn,
    /// Fail with [`FeatureError::SchemaConflict`].
    Deny,
}

impl FromStr for ConflictPolicy {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" => Ok(ConflictPolicy::Warn),
            "deny" => Ok(ConflictPolicy::Deny),
            other => Err(FeatureError::invalid(format!(
                "conflict policy must be 'warn' or 'deny', got '{}'",
                other
            ))),
        }
    }
}

/// Options applied when a feature transforms a dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformOptions {
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

impl TransformOptions {
    pub fn strict() -> Self {
        Self { conflict_policy: ConflictPolicy::Deny }
    }
}

/// Settings read from the environment (`.env` is loaded by the CLI).
///
/// | Variable | Meaning |
/// |----------|---------|
/// | `FEATUREKIT_CONFLICT_POLICY` | `warn` or `deny` |
/// | `FEATUREKIT_NUM_PROCESSORS` | processors used to size partitions |
/// | `FEATUREKIT_NUM_PARTITIONS` | explicit partition count |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub conflict_policy: ConflictPolicy,
    pub num_processors: Option<usize>,
    pub num_partitions: Option<usize>,
}

impl Settings {
    pub fn from_env() -> FeatureResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FeatureResult<Self> {
        let conflict_policy = match lookup("FEATUREKIT_CONFLICT_POLICY") {
            Some(raw) => raw.parse()?,
            None => ConflictPolicy::default(),
        };

        Ok(Self {
            conflict_policy,
            num_processors: parse_count(&lookup, "FEATUREKIT_NUM_PROCESSORS")?,
            num_partitions: parse_count(&lookup, "FEATUREKIT_NUM_PARTITIONS")?,
        })
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions { conflict_policy: self.conflict_policy }
    }
}

fn parse_count(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> FeatureResult<Option<usize>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(FeatureError::invalid(format!(
                "{} must be a positive integer, got '{}'",
                key, raw
            ))),
        },
    }
}
