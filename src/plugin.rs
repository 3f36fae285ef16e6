//! Metrics host plugin contract and the Puma implementation.

use tracing::{debug, warn};

use crate::config::{Configuration, DEFAULT_PREFIX};
use crate::graphs::{GraphCatalog, select_graphs};
use crate::metrics::{MetricMap, map_allocator_metrics, map_runtime_metrics, merge};
use crate::source::{FetchError, StatsSource};

/// What a metrics host needs from a plugin.
pub trait MetricsPlugin {
    /// Polls once and returns the current metric values.
    fn fetch_metrics(&self) -> Result<MetricMap, FetchError>;

    /// Graphs the metrics render under. Never performs I/O.
    fn graph_definitions(&self) -> GraphCatalog;

    /// Namespace prepended to every emitted key.
    fn metric_key_prefix(&self) -> &str;
}

/// Puma plugin: polls the control server through a [`StatsSource`].
///
/// Holds no state between polls; every `fetch_metrics` call is independent.
pub struct PumaPlugin<S: StatsSource> {
    config: Configuration,
    source: S,
}

impl<S: StatsSource> PumaPlugin<S> {
    pub fn new(config: Configuration, source: S) -> Self {
        Self { config, source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: StatsSource> MetricsPlugin for PumaPlugin<S> {
    /// Fetches and maps `/stats`, then `/gc-stats` when enabled.
    ///
    /// A failed request from either endpoint fails the poll. An allocator
    /// document that cannot be mapped only drops the allocator metrics.
    fn fetch_metrics(&self) -> Result<MetricMap, FetchError> {
        let stats = self.source.fetch_runtime_stats()?;
        let runtime = map_runtime_metrics(&stats, self.config.mode);
        debug!(mode = ?self.config.mode, metrics = runtime.len(), "mapped runtime stats");

        if !self.config.with_gc {
            return Ok(runtime);
        }

        let gc_stats = self.source.fetch_allocator_stats()?;
        let allocator = map_allocator_metrics(&gc_stats).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring gc stats");
            MetricMap::new()
        });
        debug!(metrics = allocator.len(), "mapped gc stats");

        Ok(merge(&runtime, &allocator))
    }

    fn graph_definitions(&self) -> GraphCatalog {
        select_graphs(self.config.mode, self.config.with_gc)
    }

    fn metric_key_prefix(&self) -> &str {
        if self.config.prefix.is_empty() {
            DEFAULT_PREFIX
        } else {
            &self.config.prefix
        }
    }
}
