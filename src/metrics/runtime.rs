//! `/stats` document and its mapping to metrics.
//!
//! In cluster mode Puma reports pool counters at the top level and the
//! thread-pool counters of each worker under `worker_status[].last_status`.
//! In single mode the thread-pool counters sit at the top level.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::MetricMap;
use crate::config::Mode;

/// Raw `/stats` response.
///
/// Counters are optional: older Puma releases lack some of them
/// (`requests_count` appeared in 4.x) and absent counters are not emitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeStats {
    pub workers: Option<f64>,
    pub phase: Option<f64>,
    pub booted_workers: Option<f64>,
    pub old_workers: Option<f64>,
    pub worker_status: Vec<WorkerStatus>,
    /// Top-level thread-pool counters. Cluster mode falls back to these for
    /// any counter no worker reports.
    #[serde(flatten)]
    pub threads: ThreadStats,
}

/// One entry of `worker_status`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkerStatus {
    pub index: u32,
    pub pid: u32,
    pub booted: bool,
    /// Empty until the worker first checks in.
    pub last_status: ThreadStats,
}

/// Thread-pool counters of one Puma server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThreadStats {
    pub backlog: Option<f64>,
    pub running: Option<f64>,
    pub pool_capacity: Option<f64>,
    pub max_threads: Option<f64>,
    pub requests_count: Option<f64>,
}

impl ThreadStats {
    fn counters(&self) -> [(&'static str, Option<f64>); 5] {
        [
            ("backlog", self.backlog),
            ("running", self.running),
            ("pool_capacity", self.pool_capacity),
            ("max_threads", self.max_threads),
            ("requests_count", self.requests_count),
        ]
    }
}

/// Wildcard graph stem a per-worker counter is reported under.
fn worker_stem(counter: &str) -> &'static str {
    match counter {
        "backlog" => "worker_backlog",
        "requests_count" => "worker_requests",
        _ => "worker_threads",
    }
}

fn insert_present<'a>(
    ret: &mut MetricMap,
    counters: impl IntoIterator<Item = (&'a str, Option<f64>)>,
) {
    for (name, value) in counters {
        if let Some(value) = value {
            ret.insert(name.to_string(), value);
        }
    }
}

/// Flattens a `/stats` document into metrics.
///
/// Cluster mode emits the pool counters, each thread counter summed over the
/// workers reporting it, and per-worker keys `<stem>.<index>.<counter>` under
/// the `worker_threads`, `worker_backlog` and `worker_requests` stems. A
/// top-level thread counter is kept when no worker reports it. Single mode
/// emits the top-level thread counters only.
pub fn map_runtime_metrics(stats: &RuntimeStats, mode: Mode) -> MetricMap {
    let mut ret = MetricMap::new();

    if mode == Mode::Single {
        insert_present(&mut ret, stats.threads.counters());
        return ret;
    }

    insert_present(
        &mut ret,
        [
            ("workers", stats.workers),
            ("phase", stats.phase),
            ("booted_workers", stats.booted_workers),
            ("old_workers", stats.old_workers),
        ],
    );
    insert_present(&mut ret, stats.threads.counters());

    let mut totals: BTreeMap<&'static str, f64> = BTreeMap::new();
    for worker in &stats.worker_status {
        for (name, value) in worker.last_status.counters() {
            let Some(value) = value else {
                continue;
            };
            *totals.entry(name).or_insert(0.0) += value;
            ret.insert(format!("{}.{}.{}", worker_stem(name), worker.index, name), value);
        }
    }
    insert_present(&mut ret, totals.into_iter().map(|(name, total)| (name, Some(total))));

    ret
}
