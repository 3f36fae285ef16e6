//! HTTP client for the Puma control server.
//!
//! TCP targets go through a blocking `reqwest` client. Unix socket targets get
//! a plain HTTP/1.0 request written directly to the socket; the control
//! server closes the connection after answering, so the response is read to
//! EOF and split at the header terminator.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{FetchError, StatsSource};
use crate::config::{ConnectTarget, Connection};
use crate::metrics::{AllocatorStats, RuntimeStats};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const STATS_PATH: &str = "stats";
const GC_STATS_PATH: &str = "gc-stats";

/// Puma control server client.
pub struct ControlClient {
    connection: Connection,
    http: reqwest::blocking::Client,
}

impl ControlClient {
    pub fn new(connection: Connection) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;
        Ok(Self { connection, http })
    }

    /// Builds the request URL for `path`, with the auth token as `token`
    /// query parameter when one is configured.
    fn request_url(&self, base: &str, path: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(base)
            .and_then(|b| b.join(path))
            .map_err(|e| FetchError::Connection(format!("invalid control url {}: {}", base, e)))?;
        if !self.connection.token.is_empty() {
            url.query_pairs_mut()
                .append_pair("token", &self.connection.token);
        }
        Ok(url)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        match &self.connection.target {
            ConnectTarget::Tcp { host, port } => {
                let url = self.request_url(&format!("http://{}:{}/", host, port), path)?;
                debug!(control = %self.connection.target, path, "requesting control server");

                let response = self
                    .http
                    .get(url)
                    .send()
                    .map_err(|e| FetchError::Connection(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status.as_u16()));
                }
                let body = response
                    .bytes()
                    .map_err(|e| FetchError::Connection(e.to_string()))?;
                Ok(body.to_vec())
            }
            ConnectTarget::Unix(socket) => {
                let url = self.request_url("http://localhost/", path)?;
                debug!(control = %self.connection.target, path, "requesting control server");
                get_unix(socket, &url)
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let body = self.get(path)?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl StatsSource for ControlClient {
    fn fetch_runtime_stats(&self) -> Result<RuntimeStats, FetchError> {
        self.get_json(STATS_PATH)
    }

    fn fetch_allocator_stats(&self) -> Result<AllocatorStats, FetchError> {
        self.get_json(GC_STATS_PATH)
    }
}

/// Sends one HTTP/1.0 GET over a unix socket.
///
/// An HTTP/1.0 request never gets a chunked response, so the body is whatever
/// follows the headers until the server closes. `Content-Length` is not
/// consulted.
#[cfg(unix)]
fn get_unix(socket: &Path, url: &Url) -> Result<Vec<u8>, FetchError> {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    let conn_err =
        |e: std::io::Error| FetchError::Connection(format!("{}: {}", socket.display(), e));

    let mut stream = UnixStream::connect(socket).map_err(conn_err)?;
    stream.set_read_timeout(Some(REQUEST_TIMEOUT)).map_err(conn_err)?;
    stream.set_write_timeout(Some(REQUEST_TIMEOUT)).map_err(conn_err)?;

    let target = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    write!(stream, "GET {} HTTP/1.0\r\nHost: localhost\r\n\r\n", target).map_err(conn_err)?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).map_err(conn_err)?;
    parse_http_response(&raw)
}

#[cfg(not(unix))]
fn get_unix(socket: &Path, _url: &Url) -> Result<Vec<u8>, FetchError> {
    Err(FetchError::Connection(format!(
        "{}: unix sockets are not supported on this platform",
        socket.display()
    )))
}

/// Splits a raw HTTP response into status and body, returning the body of a
/// 2xx response.
fn parse_http_response(raw: &[u8]) -> Result<Vec<u8>, FetchError> {
    let malformed = || FetchError::Connection("malformed HTTP response".to_string());

    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(malformed)?;
    let head = String::from_utf8_lossy(&raw[..header_end]);

    let status: u16 = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or_else(malformed)?;
    if !(200..300).contains(&status) {
        return Err(FetchError::Status(status));
    }

    Ok(raw[header_end + 4..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::thread;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Reads request headers and returns the request line.
    fn read_request<R: std::io::Read>(stream: R) -> String {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
        request_line.trim_end().to_string()
    }

    fn tcp_server(status: &'static str, body: &'static str) -> (u16, thread::JoinHandle<String>) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(stream.try_clone().unwrap());
            stream
                .write_all(http_response(status, body).as_bytes())
                .unwrap();
            request
        });
        (port, handle)
    }

    fn tcp_client(port: u16, token: &str) -> ControlClient {
        ControlClient::new(Connection {
            target: ConnectTarget::Tcp {
                host: "127.0.0.1".to_string(),
                port,
            },
            token: token.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_parse_http_response_ok() {
        let raw = http_response("200 OK", r#"{"backlog":0}"#);
        let body = parse_http_response(raw.as_bytes()).unwrap();
        assert_eq!(body, br#"{"backlog":0}"#);
    }

    #[test]
    fn test_parse_http_response_status() {
        let raw = http_response("403 Forbidden", "Invalid auth token");
        assert_eq!(
            parse_http_response(raw.as_bytes()).unwrap_err(),
            FetchError::Status(403)
        );
    }

    #[test]
    fn test_parse_http_response_without_content_length() {
        let raw = "HTTP/1.0 200 OK\r\nConnection: close\r\n\r\n{\"running\": 3}\n";
        let body = parse_http_response(raw.as_bytes()).unwrap();
        assert_eq!(body, b"{\"running\": 3}\n");
    }

    #[test]
    fn test_parse_http_response_malformed() {
        assert!(matches!(
            parse_http_response(b"garbage"),
            Err(FetchError::Connection(_))
        ));
    }

    #[test]
    fn test_request_url_with_token() {
        let client = tcp_client(9293, "a b&c");
        let url = client
            .request_url("http://127.0.0.1:9293/", STATS_PATH)
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9293/stats?token=a+b%26c");
    }

    #[test]
    fn test_request_url_without_token() {
        let client = tcp_client(9293, "");
        let url = client
            .request_url("http://127.0.0.1:9293/", GC_STATS_PATH)
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9293/gc-stats");
    }

    #[test]
    fn test_tcp_fetch_runtime_stats() {
        let (port, server) = tcp_server("200 OK", r#"{"backlog": 2, "running": 4}"#);
        let client = tcp_client(port, "abc");

        let stats = client.fetch_runtime_stats().unwrap();
        assert_eq!(stats.threads.backlog, Some(2.0));
        assert_eq!(stats.threads.running, Some(4.0));
        assert_eq!(server.join().unwrap(), "GET /stats?token=abc HTTP/1.1");
    }

    #[test]
    fn test_tcp_non_success_status() {
        let (port, server) = tcp_server("403 Forbidden", "Invalid auth token");
        let client = tcp_client(port, "wrong");

        assert_eq!(
            client.fetch_allocator_stats().unwrap_err(),
            FetchError::Status(403)
        );
        server.join().unwrap();
    }

    #[test]
    fn test_tcp_malformed_json() {
        let (port, server) = tcp_server("200 OK", "{not json");
        let client = tcp_client(port, "");

        assert!(matches!(
            client.fetch_runtime_stats(),
            Err(FetchError::Decode(_))
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_tcp_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = tcp_client(port, "");
        assert!(matches!(
            client.fetch_runtime_stats(),
            Err(FetchError::Connection(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_fetch_allocator_stats() {
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("puma.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(stream.try_clone().unwrap());
            stream
                .write_all(http_response("200 OK", r#"{"count": 12, "heap_live_slots": 900}"#).as_bytes())
                .unwrap();
            request
        });

        let client = ControlClient::new(Connection {
            target: ConnectTarget::Unix(socket),
            token: "xyz".to_string(),
        })
        .unwrap();

        let stats = client.fetch_allocator_stats().unwrap();
        assert_eq!(stats["count"], 12);
        assert_eq!(server.join().unwrap(), "GET /gc-stats?token=xyz HTTP/1.0");
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_body_read_until_close() {
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("puma.sock");
        let listener = UnixListener::bind(&socket).unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            read_request(stream.try_clone().unwrap());
            // Body in two writes, no length header; close ends it.
            stream
                .write_all(b"HTTP/1.0 200 OK\r\nConnection: close\r\n\r\n{\"backlog\": 2,")
                .unwrap();
            stream.flush().unwrap();
            stream.write_all(b" \"running\": 4}").unwrap();
        });

        let client = ControlClient::new(Connection {
            target: ConnectTarget::Unix(socket),
            token: String::new(),
        })
        .unwrap();

        let stats = client.fetch_runtime_stats().unwrap();
        assert_eq!(stats.threads.backlog, Some(2.0));
        assert_eq!(stats.threads.running, Some(4.0));
        server.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_missing_socket() {
        let client = ControlClient::new(Connection {
            target: ConnectTarget::Unix("/nonexistent/puma.sock".into()),
            token: String::new(),
        })
        .unwrap();
        assert!(matches!(
            client.fetch_runtime_stats(),
            Err(FetchError::Connection(_))
        ));
    }
}
