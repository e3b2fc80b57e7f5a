//! Physical repartitioning helpers.
//!
//! These adjust how rows are spread across partitions before or after
//! features run. They never change column semantics or row content.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::dataframe::expr::compare;
use crate::dataframe::{DataFrame, Row};
use crate::error::{EngineError, EngineResult};

/// Partitions created per processor when no count is given.
const PARTITIONS_PER_PROCESSOR: usize = 4;

/// Repartition settings, as found in pipeline definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepartitionConfig {
    /// Columns hashed to pick a row's partition (round-robin when empty)
    #[serde(default)]
    pub partition_by: Vec<String>,

    /// Columns to sort by within each partition
    #[serde(default)]
    pub order_by: Vec<String>,

    #[serde(default)]
    pub num_partitions: Option<usize>,

    #[serde(default)]
    pub num_processors: Option<usize>,
}

/// Reshape `df` according to `config`.
pub fn reshape(df: &DataFrame, config: &RepartitionConfig) -> EngineResult<DataFrame> {
    if config.order_by.is_empty() {
        repartition_df(df, &config.partition_by, config.num_partitions, config.num_processors)
    } else {
        repartition_sort_df(
            df,
            &config.partition_by,
            &config.order_by,
            config.num_processors,
            config.num_partitions,
        )
    }
}

/// Partition `df` by `partition_by`.
///
/// The partition count defaults to four per processor; processors default to
/// the machine's available parallelism.
pub fn repartition_df(
    df: &DataFrame,
    partition_by: &[String],
    num_partitions: Option<usize>,
    num_processors: Option<usize>,
) -> EngineResult<DataFrame> {
    let n = partition_count(num_partitions, num_processors)?;
    let key_columns = partition_by
        .iter()
        .map(|c| df.column_values(c))
        .collect::<EngineResult<Vec<_>>>()?;

    let mut partitions: Vec<Vec<Row>> = vec![Vec::new(); n];
    for (i, row) in df.rows().enumerate() {
        let slot = if key_columns.is_empty() {
            i % n
        } else {
            let key: Vec<&Value> = key_columns.iter().map(|c| &c[i]).collect();
            (hash_key(&key) % n as u64) as usize
        };
        partitions[slot].push(row.clone());
    }

    Ok(DataFrame::from_partitions(df.columns().to_vec(), partitions))
}

/// Partition `df` by `partition_by`, then sort each partition by `order_by`.
pub fn repartition_sort_df(
    df: &DataFrame,
    partition_by: &[String],
    order_by: &[String],
    num_processors: Option<usize>,
    num_partitions: Option<usize>,
) -> EngineResult<DataFrame> {
    for column in order_by {
        if !df.has_column(column) {
            return Err(EngineError::MissingColumn(column.clone()));
        }
    }

    let repartitioned = repartition_df(df, partition_by, num_partitions, num_processors)?;
    let partitions = repartitioned
        .partitions()
        .iter()
        .map(|partition| {
            let mut rows = partition.clone();
            rows.sort_by(|a, b| compare_rows(a, b, order_by));
            rows
        })
        .collect();

    Ok(DataFrame::from_partitions(df.columns().to_vec(), partitions))
}

fn partition_count(num_partitions: Option<usize>, num_processors: Option<usize>) -> EngineResult<usize> {
    if let Some(n) = num_partitions {
        return if n == 0 { Err(EngineError::InvalidPartitions(n)) } else { Ok(n) };
    }
    let processors = match num_processors {
        Some(0) => return Err(EngineError::InvalidPartitions(0)),
        Some(p) => p,
        None => std::thread::available_parallelism().map(|p| p.get()).unwrap_or(1),
    };
    Ok(processors * PARTITIONS_PER_PROCESSOR)
}

fn hash_key(key: &[&Value]) -> u64 {
    let mut hasher = DefaultHasher::new();
    serde_json::to_string(key).unwrap_or_default().hash(&mut hasher);
    hasher.finish()
}

/// Ascending, nulls first. Incomparable values keep their order.
fn compare_rows(a: &Row, b: &Row, order_by: &[String]) -> Ordering {
    for column in order_by {
        let left = a.get(column).unwrap_or(&Value::Null);
        let right = b.get(column).unwrap_or(&Value::Null);
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => compare(left, right).unwrap_or(Ordering::Equal),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
