//! Plugin output in the format mackerel-agent reads.
//!
//! Values are written one per line as `<key>\t<value>\t<epoch>`. When the
//! agent asks for metadata (`MACKEREL_AGENT_PLUGIN_META` set), a header line
//! and the graph definitions as JSON are written instead.

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::graphs::{GraphCatalog, Unit};
use crate::metrics::MetricMap;
use crate::plugin::MetricsPlugin;
use crate::source::FetchError;

/// Environment variable mackerel-agent sets when requesting graph metadata.
pub const META_ENV: &str = "MACKEREL_AGENT_PLUGIN_META";

const META_HEADER: &str = "# mackerel-agent-plugin";

#[derive(Debug)]
pub enum OutputError {
    Fetch(FetchError),
    Io(io::Error),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Fetch(e) => write!(f, "fetch metrics: {}", e),
            OutputError::Io(e) => write!(f, "write output: {}", e),
        }
    }
}

impl std::error::Error for OutputError {}

impl From<FetchError> for OutputError {
    fn from(e: FetchError) -> Self {
        OutputError::Fetch(e)
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

#[derive(Serialize)]
struct PluginMeta<'a> {
    graphs: BTreeMap<String, GraphMeta<'a>>,
}

#[derive(Serialize)]
struct GraphMeta<'a> {
    label: &'a str,
    unit: Unit,
    metrics: Vec<MetricMeta<'a>>,
}

#[derive(Serialize)]
struct MetricMeta<'a> {
    name: &'a str,
    label: &'a str,
    stacked: bool,
    diff: bool,
}

/// Writes metric values sorted by key.
///
/// Keys are qualified with their graph path; keys no selected graph renders
/// are still written, directly under the prefix.
pub fn write_values<W: Write>(
    out: &mut W,
    prefix: &str,
    graphs: &GraphCatalog,
    metrics: &MetricMap,
    timestamp: i64,
) -> io::Result<()> {
    let mut lines: Vec<(String, f64)> = metrics
        .iter()
        .map(|(key, value)| {
            let path = graphs.qualify(key).unwrap_or_else(|| key.clone());
            (format!("{}.{}", prefix, path), *value)
        })
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    for (key, value) in lines {
        writeln!(out, "{}\t{}\t{}", key, value, timestamp)?;
    }
    Ok(())
}

/// Writes the metadata header and graph definitions.
pub fn write_meta<W: Write>(out: &mut W, prefix: &str, graphs: &GraphCatalog) -> io::Result<()> {
    let meta = PluginMeta {
        graphs: graphs
            .iter()
            .map(|g| {
                let metrics = g
                    .metrics
                    .iter()
                    .map(|m| MetricMeta {
                        name: m.name,
                        label: m.label,
                        stacked: m.stacked,
                        diff: m.diff,
                    })
                    .collect();
                let graph = GraphMeta {
                    label: g.label,
                    unit: g.unit,
                    metrics,
                };
                (format!("{}.{}", prefix, g.name), graph)
            })
            .collect(),
    };

    writeln!(out, "{}", META_HEADER)?;
    serde_json::to_writer(&mut *out, &meta).map_err(io::Error::from)?;
    writeln!(out)
}

/// Runs one plugin invocation: metadata when `meta` is set, else one poll.
pub fn run<P: MetricsPlugin, W: Write>(
    plugin: &P,
    out: &mut W,
    meta: bool,
) -> Result<(), OutputError> {
    let prefix = plugin.metric_key_prefix();
    let graphs = plugin.graph_definitions();

    if meta {
        write_meta(out, prefix, &graphs)?;
        return Ok(());
    }

    let metrics = plugin.fetch_metrics()?;
    write_values(out, prefix, &graphs, &metrics, chrono::Utc::now().timestamp())?;
    Ok(())
}
