//! Metric derivation from raw Puma statistics.
//!
//! Each raw document is flattened into a [`MetricMap`]; the runtime and
//! allocator maps are then combined with [`merge`].

pub mod allocator;
pub mod runtime;

use std::collections::HashMap;

pub use allocator::{AllocatorStats, map_allocator_metrics};
pub use runtime::{RuntimeStats, ThreadStats, WorkerStatus, map_runtime_metrics};

/// Flat metric key to value mapping produced by one poll.
pub type MetricMap = HashMap<String, f64>;

/// Error type for metric mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// A known field carried something other than a number.
    NotNumeric { field: String, value: String },
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::NotNumeric { field, value } => {
                write!(f, "field {} is not numeric: {}", field, value)
            }
        }
    }
}

impl std::error::Error for MapError {}

/// Combines two metric maps into a new one.
///
/// Every key of `a` is copied, then every key of `b`; on collision the value
/// from `b` wins. Neither input is modified.
pub fn merge(a: &MetricMap, b: &MetricMap) -> MetricMap {
    let mut merged = MetricMap::with_capacity(a.len() + b.len());
    merged.extend(a.iter().map(|(k, v)| (k.clone(), *v)));
    merged.extend(b.iter().map(|(k, v)| (k.clone(), *v)));
    merged
}
