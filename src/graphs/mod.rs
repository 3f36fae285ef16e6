//! Graph definitions and their selection.
//!
//! A graph groups metrics sharing a unit. Graph names ending in `.#` are
//! wildcard graphs: the `#` segment stands for a worker index, so the metric
//! key `worker_threads.3.running` belongs to graph `worker_threads.#` with
//! metric `running`. Plain keys such as `running` belong to the non-wildcard
//! graph listing them (`threads`).

pub mod catalog;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Mode;
use catalog::{ALLOCATOR_GRAPHS, CLUSTERED_GRAPHS, SINGLE_GRAPHS};

const WILDCARD_SUFFIX: &str = ".#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Integer,
    Bytes,
}

/// One metric within a graph. It shares the graph's unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub stacked: bool,
    /// Counter; the host graphs the per-minute delta instead of the raw
    /// value. Written to the graph metadata as `diff`.
    pub diff: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphDefinition {
    pub name: &'static str,
    pub label: &'static str,
    pub unit: Unit,
    pub metrics: &'static [MetricSpec],
}

impl GraphDefinition {
    pub fn is_wildcard(&self) -> bool {
        self.name.ends_with(WILDCARD_SUFFIX)
    }

    pub fn metric(&self, name: &str) -> Option<&'static MetricSpec> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Returns the spec `key` maps to in this graph, if any.
    fn match_key(&self, key: &str) -> Option<&'static MetricSpec> {
        match self.name.strip_suffix(WILDCARD_SUFFIX) {
            None => self.metric(key),
            Some(stem) => {
                let rest = key.strip_prefix(stem)?.strip_prefix('.')?;
                let (segment, metric) = rest.split_once('.')?;
                if segment.is_empty() {
                    return None;
                }
                self.metric(metric)
            }
        }
    }
}

/// The graphs selected for one configuration.
#[derive(Debug, Clone)]
pub struct GraphCatalog {
    graphs: BTreeMap<&'static str, &'static GraphDefinition>,
}

impl GraphCatalog {
    /// Selects the graph tables for a mode.
    ///
    /// The mode table is either the cluster or the single one, never both.
    /// The allocator table is added on top when `with_gc` is set.
    pub fn select(mode: Mode, with_gc: bool) -> Self {
        let base = match mode {
            Mode::Clustered => CLUSTERED_GRAPHS,
            Mode::Single => SINGLE_GRAPHS,
        };

        let mut graphs: BTreeMap<_, _> = base.iter().map(|g| (g.name, g)).collect();
        if with_gc {
            graphs.extend(ALLOCATOR_GRAPHS.iter().map(|g| (g.name, g)));
        }
        Self { graphs }
    }

    pub fn get(&self, name: &str) -> Option<&'static GraphDefinition> {
        self.graphs.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.graphs.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static GraphDefinition> + '_ {
        self.graphs.values().copied()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Finds the graph and spec a metric key renders under.
    pub fn lookup(&self, key: &str) -> Option<(&'static GraphDefinition, &'static MetricSpec)> {
        self.iter()
            .find_map(|g| g.match_key(key).map(|spec| (g, spec)))
    }

    /// True if some selected graph renders `key`.
    pub fn covers(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Full graph path of a key, without the key prefix.
    ///
    /// Plain keys are qualified with their graph name (`running` becomes
    /// `threads.running`); wildcard keys already carry their graph path.
    pub fn qualify(&self, key: &str) -> Option<String> {
        let (graph, _) = self.lookup(key)?;
        if graph.is_wildcard() {
            Some(key.to_string())
        } else {
            Some(format!("{}.{}", graph.name, key))
        }
    }
}

/// Graph selection for a mode and allocator flag.
pub fn select_graphs(mode: Mode, with_gc: bool) -> GraphCatalog {
    GraphCatalog::select(mode, with_gc)
}
