//! `/gc-stats` document and its mapping to metrics.
//!
//! The document is Ruby's `GC.stat` hash serialized as a flat JSON object.
//! Its key set varies between Ruby versions, so it is kept untyped and only
//! the fields declared in the allocator graph family are picked out.

use serde_json::{Map, Value};

use super::{MapError, MetricMap};
use crate::graphs::catalog::ALLOCATOR_GRAPHS;

/// Raw `/gc-stats` response.
pub type AllocatorStats = Map<String, Value>;

/// Flattens a `/gc-stats` document into metrics.
///
/// Fields without a graph are skipped, as are declared fields the running
/// Ruby does not report. A declared field holding a non-number fails the
/// whole mapping.
pub fn map_allocator_metrics(stats: &AllocatorStats) -> Result<MetricMap, MapError> {
    let mut ret = MetricMap::new();

    let declared = ALLOCATOR_GRAPHS.iter().flat_map(|g| g.metrics.iter());
    for spec in declared {
        let Some(value) = stats.get(spec.name) else {
            continue;
        };
        let number = value.as_f64().ok_or_else(|| MapError::NotNumeric {
            field: spec.name.to_string(),
            value: value.to_string(),
        })?;
        ret.insert(spec.name.to_string(), number);
    }

    Ok(ret)
}
