//! Aggregations over the feature's source column.
//!
//! Every row receives the aggregate of its group (the whole frame when no
//! `group_by` keys are given), so input columns pass through untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::{ensure_unique, FeatureParent, TransformComponent};
use crate::dataframe::expr::compare;
use crate::dataframe::functions::{as_f64, float_value};
use crate::dataframe::{cast_value, DataFrame};
use crate::error::{EngineResult, FeatureError, FeatureResult};
use crate::types::DataType;

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Avg,
    Count,
    CountDistinct,
    Max,
    Min,
    Sum,
    StddevPop,
    StddevSamp,
    First,
    Last,
}

impl AggregateFunction {
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::CountDistinct => "count_distinct",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Sum => "sum",
            AggregateFunction::StddevPop => "stddev_pop",
            AggregateFunction::StddevSamp => "stddev_samp",
            AggregateFunction::First => "first",
            AggregateFunction::Last => "last",
        }
    }

    /// Result type of the operator. `None` keeps the input value's type.
    pub fn output_type(self) -> Option<DataType> {
        match self {
            AggregateFunction::Avg
            | AggregateFunction::Sum
            | AggregateFunction::StddevPop
            | AggregateFunction::StddevSamp => Some(DataType::Double),
            AggregateFunction::Count | AggregateFunction::CountDistinct => Some(DataType::BigInt),
            AggregateFunction::Max
            | AggregateFunction::Min
            | AggregateFunction::First
            | AggregateFunction::Last => None,
        }
    }

    /// Aggregate the non-null values of one group.
    fn aggregate(self, values: &[&Value]) -> Value {
        match self {
            AggregateFunction::Count => Value::Number((values.len() as i64).into()),
            AggregateFunction::CountDistinct => {
                let mut seen: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                seen.sort();
                seen.dedup();
                Value::Number((seen.len() as i64).into())
            }
            AggregateFunction::Sum => {
                let nums = numbers(values);
                if nums.is_empty() {
                    Value::Null
                } else {
                    float_value(nums.iter().sum())
                }
            }
            AggregateFunction::Avg => mean(&numbers(values)).map(float_value).unwrap_or(Value::Null),
            AggregateFunction::StddevPop => stddev(&numbers(values), 0),
            AggregateFunction::StddevSamp => stddev(&numbers(values), 1),
            AggregateFunction::Min => extreme(values, std::cmp::Ordering::Less),
            AggregateFunction::Max => extreme(values, std::cmp::Ordering::Greater),
            AggregateFunction::First => values.first().map(|v| (*v).clone()).unwrap_or(Value::Null),
            AggregateFunction::Last => values.last().map(|v| (*v).clone()).unwrap_or(Value::Null),
        }
    }
}

fn numbers(values: &[&Value]) -> Vec<f64> {
    values.iter().filter_map(|v| as_f64(v)).collect()
}

fn mean(nums: &[f64]) -> Option<f64> {
    if nums.is_empty() {
        None
    } else {
        Some(nums.iter().sum::<f64>() / nums.len() as f64)
    }
}

fn stddev(nums: &[f64], ddof: usize) -> Value {
    if nums.len() <= ddof {
        return Value::Null;
    }
    let Some(m) = mean(nums) else {
        return Value::Null;
    };
    let squares: f64 = nums.iter().map(|x| (x - m).powi(2)).sum();
    float_value((squares / (nums.len() - ddof) as f64).sqrt())
}

fn extreme(values: &[&Value], wanted: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for &value in values {
        best = match best {
            None => Some(value),
            Some(current) => match compare(value, current) {
                Some(o) if o == wanted => Some(value),
                _ => Some(current),
            },
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

/// One aggregate output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: AggregateFunction,
    /// Overrides the operator's natural result type. Kept as written and
    /// resolved in `validate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
}

impl Aggregation {
    pub fn new(function: AggregateFunction) -> Self {
        Self { function, dtype: None }
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype.name().to_string());
        self
    }

    /// The declared override, parsed.
    pub fn declared_type(&self) -> FeatureResult<Option<DataType>> {
        self.dtype.as_deref().map(str::parse::<DataType>).transpose()
    }

    /// Effective output type, if any.
    pub fn output_type(&self) -> Option<DataType> {
        self.declared_type().ok().flatten().or_else(|| self.function.output_type())
    }
}

/// Self-typing aggregation transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedTransform {
    pub functions: Vec<Aggregation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(skip)]
    parent: Option<FeatureParent>,
}

impl AggregatedTransform {
    pub fn new(functions: Vec<Aggregation>) -> Self {
        Self { functions, group_by: Vec::new(), parent: None }
    }

    pub fn group_by(mut self, keys: Vec<String>) -> Self {
        self.group_by = keys;
        self
    }

    /// Row indices per group, preserving first-seen order of groups.
    fn groups(&self, df: &DataFrame) -> EngineResult<Vec<Vec<usize>>> {
        let key_columns = self
            .group_by
            .iter()
            .map(|k| df.column_values(k))
            .collect::<EngineResult<Vec<_>>>()?;

        if key_columns.is_empty() {
            return Ok(vec![(0..df.num_rows()).collect()]);
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for row in 0..df.num_rows() {
            let key: Vec<&Value> = key_columns.iter().map(|c| &c[row]).collect();
            let key = serde_json::to_string(&key).unwrap_or_default();
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }
        Ok(groups)
    }
}

impl TransformComponent for AggregatedTransform {
    fn kind(&self) -> &'static str {
        "aggregated"
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
                .map(|a| parent.suffixed(a.function.name()))
                .collect(),
            None => Vec::new(),
        }
    }

    fn transform(&self, df: &DataFrame) -> EngineResult<DataFrame> {
        let parent = self.attached_parent()?;
        let source = df.column_values(parent.source_column())?;
        let groups = self.groups(df)?;

        let mut out = df.clone();
        for aggregation in &self.functions {
            let mut values = vec![Value::Null; df.num_rows()];
            for rows in &groups {
                let present: Vec<&Value> = rows
                    .iter()
                    .map(|&i| &source[i])
                    .filter(|v| !v.is_null())
                    .collect();
                let mut result = aggregation.function.aggregate(&present);
                if let Ok(Some(dtype)) = aggregation.declared_type() {
                    result = cast_value(&result, dtype.engine_type());
                }
                for &i in rows {
                    values[i] = result.clone();
                }
            }
            out = out.with_column_values(&parent.suffixed(aggregation.function.name()), values)?;
        }
        Ok(out)
    }

    fn validate(&self) -> FeatureResult<()> {
        if self.functions.is_empty() {
            return Err(FeatureError::invalid("aggregated transform needs at least one function"));
        }
        if self.group_by.iter().any(|k| k.trim().is_empty()) {
            return Err(FeatureError::invalid("group_by keys can't be blank"));
        }
        for aggregation in &self.functions {
            aggregation.declared_type()?;
        }
        ensure_unique("aggregated transform", self.functions.iter().map(|a| a.function.name()))
    }
}
