//! mackerel-plugin-puma - Puma metrics plugin for mackerel-agent.
//!
//! Polls the Puma control server once and prints metric values, or graph
//! definitions when the agent sets `MACKEREL_AGENT_PLUGIN_META`.
//!
//! Usage:
//!   mackerel-plugin-puma                          # tcp://127.0.0.1:9293, cluster mode
//!   mackerel-plugin-puma --sock /tmp/puma.sock    # control server on a unix socket
//!   mackerel-plugin-puma --state tmp/puma.state   # coordinates from the state file
//!   mackerel-plugin-puma --single --with-gc       # single mode plus GC stats

use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{Level, debug, error};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use puma_metrics::config::{
    Configuration, ConnectionDefaults, DEFAULT_PREFIX, Mode, resolve_connection,
};
use puma_metrics::output::{self, META_ENV};
use puma_metrics::plugin::PumaPlugin;
use puma_metrics::source::ControlClient;

/// Puma metrics plugin for mackerel-agent.
#[derive(Parser)]
#[command(name = "mackerel-plugin-puma", about = "Puma metrics plugin", version)]
struct Args {
    /// Metric key prefix.
    #[arg(long, default_value = DEFAULT_PREFIX)]
    metric_key_prefix: String,

    /// The bind url to use for the control server.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// The bind port to use for the control server.
    #[arg(long, default_value_t = 9293)]
    port: u16,

    /// The bind socket to use for the control server.
    #[arg(long, value_name = "PATH")]
    sock: Option<PathBuf>,

    /// Puma state file to read the control server url and token from.
    /// Overrides --host, --port, --sock and --token.
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,

    /// The token to use as authentication for the control server.
    #[arg(long, default_value = "")]
    token: String,

    /// Puma in single mode.
    #[arg(long)]
    single: bool,

    /// Include GC stats (Puma 3.10.0 or later).
    #[arg(long)]
    with_gc: bool,

    /// Temp file name. Managed by mackerel-agent.
    #[arg(long, value_name = "PATH")]
    tempfile: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber on stderr; stdout carries plugin output.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::from_level(level).into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let defaults = ConnectionDefaults {
        host: args.host,
        port: args.port,
        sock: args.sock,
        token: args.token,
    };
    let connection = match resolve_connection(defaults, args.state.as_deref()) {
        Ok(connection) => connection,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    if let Some(ref tempfile) = args.tempfile {
        debug!(tempfile = %tempfile, "tempfile is managed by the agent");
    }

    let mode = Mode::from_single_flag(args.single);
    debug!(control = %connection.target, ?mode, with_gc = args.with_gc, "configured");

    let config = Configuration::new(args.metric_key_prefix, connection.clone(), mode, args.with_gc);
    let client = match ControlClient::new(connection) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    let plugin = PumaPlugin::new(config, client);

    let meta = std::env::var_os(META_ENV).is_some();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = output::run(&plugin, &mut out, meta) {
        error!("{}", e);
        process::exit(1);
    }
}
