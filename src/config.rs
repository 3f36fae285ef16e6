//! Plugin configuration and connection resolution.
//!
//! The configuration is built once at startup from command-line defaults and,
//! optionally, a Puma state file. A state file carries the control server URL
//! and its auth token, and overrides whatever the command line said about the
//! connection target:
//!
//! ```text
//! ---
//! pid: 4242
//! control_url: unix:///tmp/puma-control.sock
//! control_auth_token: 6b2a3c
//! running_from: /srv/app
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

/// Default metric key prefix.
pub const DEFAULT_PREFIX: &str = "puma";

/// Error type for connection resolution.
///
/// All variants are fatal at startup; nothing is retried.
#[derive(Debug)]
pub enum ResolveError {
    /// State file could not be opened.
    StateFileOpen(PathBuf, std::io::Error),
    /// State file is not valid YAML or lacks `control_url`.
    StateFileParse(PathBuf, serde_yaml::Error),
    /// `control_url` is not a valid URL for its scheme.
    InvalidUrl(String),
    /// `control_url` uses a scheme other than `unix` or `tcp`.
    UnknownScheme(String),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::StateFileOpen(path, e) => {
                write!(f, "failed to open {}: {}", path.display(), e)
            }
            ResolveError::StateFileParse(path, e) => {
                write!(f, "failed to decode {} as yaml: {}", path.display(), e)
            }
            ResolveError::InvalidUrl(msg) => write!(f, "failed to parse control url: {}", msg),
            ResolveError::UnknownScheme(scheme) => write!(f, "unknown scheme: {}", scheme),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Puma operating mode.
///
/// Drives both the runtime metric mapping and the graph selection, so the two
/// always agree on which keys exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Cluster mode: a master process supervising a pool of workers.
    /// Stats carry pool counters plus a per-worker breakdown.
    #[default]
    Clustered,
    /// Single mode: one process, thread-pool counters at the top level.
    Single,
}

impl Mode {
    pub fn from_single_flag(single: bool) -> Self {
        if single { Mode::Single } else { Mode::Clustered }
    }
}

/// Where the control server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl std::fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectTarget::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            ConnectTarget::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Resolved control server coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub target: ConnectTarget,
    /// Control auth token. Empty means no token is sent.
    pub token: String,
}

/// Connection settings as given on the command line.
#[derive(Debug, Clone)]
pub struct ConnectionDefaults {
    pub host: String,
    pub port: u16,
    /// Socket path; wins over host/port when set.
    pub sock: Option<PathBuf>,
    pub token: String,
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9293,
            sock: None,
            token: String::new(),
        }
    }
}

impl ConnectionDefaults {
    fn into_connection(self) -> Connection {
        let target = match self.sock {
            Some(path) if !path.as_os_str().is_empty() => ConnectTarget::Unix(path),
            _ => ConnectTarget::Tcp {
                host: self.host,
                port: self.port,
            },
        };
        Connection {
            target,
            token: self.token,
        }
    }
}

/// The subset of a Puma state file the plugin reads.
#[derive(Debug, Deserialize)]
struct StateFile {
    control_url: String,
    #[serde(default)]
    control_auth_token: Option<String>,
}

/// Resolves the final connection from command-line defaults and an optional
/// state file.
///
/// Without a state file the defaults are used untouched. With one, the URL
/// scheme decides the target: `unix` takes the URL path as socket, `tcp`
/// takes host and port (falling back to the default port when the URL has
/// none). A token in the state file replaces the command-line token.
pub fn resolve_connection(
    defaults: ConnectionDefaults,
    state_file: Option<&Path>,
) -> Result<Connection, ResolveError> {
    let Some(path) = state_file else {
        return Ok(defaults.into_connection());
    };

    let file = File::open(path).map_err(|e| ResolveError::StateFileOpen(path.to_path_buf(), e))?;
    let state: StateFile = serde_yaml::from_reader(file)
        .map_err(|e| ResolveError::StateFileParse(path.to_path_buf(), e))?;
    debug!(state = %path.display(), url = %state.control_url, "read puma state file");

    let url = Url::parse(&state.control_url)
        .map_err(|e| ResolveError::InvalidUrl(format!("{}: {}", state.control_url, e)))?;

    let target = match url.scheme() {
        "unix" => {
            if url.path().is_empty() {
                return Err(ResolveError::InvalidUrl(format!(
                    "{}: missing socket path",
                    state.control_url
                )));
            }
            ConnectTarget::Unix(PathBuf::from(url.path()))
        }
        "tcp" => {
            let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
                ResolveError::InvalidUrl(format!("{}: missing host", state.control_url))
            })?;
            ConnectTarget::Tcp {
                host: host.to_string(),
                port: url.port().unwrap_or(defaults.port),
            }
        }
        other => return Err(ResolveError::UnknownScheme(other.to_string())),
    };

    Ok(Connection {
        target,
        token: state.control_auth_token.unwrap_or(defaults.token),
    })
}

/// Immutable plugin configuration, built once per process.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub prefix: String,
    pub connection: Connection,
    pub mode: Mode,
    /// Collect allocator (GC) stats from `/gc-stats` in addition to `/stats`.
    pub with_gc: bool,
}

impl Configuration {
    pub fn new(
        prefix: impl Into<String>,
        connection: Connection,
        mode: Mode,
        with_gc: bool,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            connection,
            mode,
            with_gc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn state_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_state_file() {
        let conn = resolve_connection(ConnectionDefaults::default(), None).unwrap();
        assert_eq!(
            conn.target,
            ConnectTarget::Tcp {
                host: "127.0.0.1".to_string(),
                port: 9293
            }
        );
        assert_eq!(conn.token, "");
    }

    #[test]
    fn test_sock_flag_wins_over_host() {
        let defaults = ConnectionDefaults {
            sock: Some(PathBuf::from("/run/puma.sock")),
            token: "t".to_string(),
            ..Default::default()
        };
        let conn = resolve_connection(defaults, None).unwrap();
        assert_eq!(conn.target, ConnectTarget::Unix(PathBuf::from("/run/puma.sock")));
        assert_eq!(conn.token, "t");
    }

    #[test]
    fn test_tcp_state_file() {
        let file = state_file(
            "---\npid: 100\ncontrol_url: tcp://127.0.0.1:9293\ncontrol_auth_token: abc\n",
        );
        let defaults = ConnectionDefaults {
            sock: Some(PathBuf::from("/ignored.sock")),
            host: "10.0.0.1".to_string(),
            port: 1,
            token: "cli".to_string(),
        };
        let conn = resolve_connection(defaults, Some(file.path())).unwrap();
        assert_eq!(
            conn.target,
            ConnectTarget::Tcp {
                host: "127.0.0.1".to_string(),
                port: 9293
            }
        );
        assert_eq!(conn.token, "abc");
    }

    #[test]
    fn test_unix_state_file() {
        let file = state_file("control_url: unix:///tmp/puma.sock\ncontrol_auth_token: xyz\n");
        let conn = resolve_connection(ConnectionDefaults::default(), Some(file.path())).unwrap();
        assert_eq!(conn.target, ConnectTarget::Unix(PathBuf::from("/tmp/puma.sock")));
        assert_eq!(conn.token, "xyz");
    }

    #[test]
    fn test_state_file_without_token_keeps_cli_token() {
        let file = state_file("control_url: tcp://localhost:9000\n");
        let defaults = ConnectionDefaults {
            token: "cli".to_string(),
            ..Default::default()
        };
        let conn = resolve_connection(defaults, Some(file.path())).unwrap();
        assert_eq!(conn.token, "cli");
        assert_eq!(
            conn.target,
            ConnectTarget::Tcp {
                host: "localhost".to_string(),
                port: 9000
            }
        );
    }

    #[test]
    fn test_tcp_without_port_uses_default_port() {
        let file = state_file("control_url: tcp://10.1.2.3\n");
        let conn = resolve_connection(ConnectionDefaults::default(), Some(file.path())).unwrap();
        assert_eq!(
            conn.target,
            ConnectTarget::Tcp {
                host: "10.1.2.3".to_string(),
                port: 9293
            }
        );
    }

    #[test]
    fn test_unknown_scheme() {
        let file = state_file("control_url: ftp://x\ncontrol_auth_token: abc\n");
        let err = resolve_connection(ConnectionDefaults::default(), Some(file.path())).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownScheme(ref s) if s == "ftp"));
        assert_eq!(err.to_string(), "unknown scheme: ftp");
    }

    #[test]
    fn test_missing_state_file() {
        let err = resolve_connection(
            ConnectionDefaults::default(),
            Some(Path::new("/nonexistent/puma.state")),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::StateFileOpen(..)));
    }

    #[test]
    fn test_unparseable_state_file() {
        let file = state_file("pid: [unterminated\n");
        let err = resolve_connection(ConnectionDefaults::default(), Some(file.path())).unwrap_err();
        assert!(matches!(err, ResolveError::StateFileParse(..)));
    }

    #[test]
    fn test_unparseable_url() {
        let file = state_file("control_url: not a url\n");
        let err = resolve_connection(ConnectionDefaults::default(), Some(file.path())).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidUrl(_)));
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(Mode::from_single_flag(true), Mode::Single);
        assert_eq!(Mode::from_single_flag(false), Mode::Clustered);
    }
}
