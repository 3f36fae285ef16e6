//! puma-metrics - Puma control server metrics plugin library.
//!
//! This library provides the pieces behind the `mackerel-plugin-puma` binary:
//! - `config` - configuration and state file resolution
//! - `source` - fetching raw stats from the control server
//! - `metrics` / `graphs` - metric derivation and graph definitions
//! - `plugin` / `output` - the host contract and its output format

pub mod config;
pub mod graphs;
pub mod metrics;
pub mod output;
pub mod plugin;
pub mod source;
