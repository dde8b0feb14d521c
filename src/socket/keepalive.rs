//! Keep-alive connection management.
//!
//! The client holds at most one connection. Before each request the manager
//! decides whether that connection can carry it or must be replaced:
//!
//! - it leads somewhere else (scheme, host, port or proxy changed),
//! - the previous response failed or left the connection unusable,
//! - the keep-alive budget is spent (request count or idle time).
//!
//! The budget comes from the client configuration unless the server
//! advertised its own through a `Keep-Alive` header.

use crate::base::neterror::NetError;
use crate::http::reader::LineReader;
use crate::socket::connectjob::Established;
use crate::socket::proxy::ProxyClient;
use crate::socket::stream::StreamSocket;
use std::time::{Duration, Instant};
use url::Url;

/// Where a connection leads. Two requests may share a connection only when
/// their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionKey {
    scheme: String,
    host: String,
    port: u16,
    /// Extended proxy string, so changed credentials also force a new tunnel.
    proxy: Option<String>,
}

impl ConnectionKey {
    pub fn new(url: &Url, proxy: Option<&ProxyClient>) -> Option<Self> {
        Some(Self {
            scheme: url.scheme().to_ascii_lowercase(),
            host: url.host_str()?.to_ascii_lowercase(),
            port: url.port_or_known_default()?,
            proxy: proxy.map(|p| format!("{} {}", p.proxy_type(), p.to_extended_string())),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }
}

/// Client-side keep-alive limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveConfig {
    /// Reuse connections at all (default: true)
    pub enabled: bool,
    /// Idle time after which a connection is replaced (default: 30s)
    pub timeout: Duration,
    /// Requests per connection (default: 100)
    pub max_requests: u32,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(30),
            max_requests: 100,
        }
    }
}

/// An open connection and its keep-alive accounting.
#[derive(Debug)]
pub struct Connection {
    key: ConnectionKey,
    reader: LineReader<StreamSocket>,
    forwarding: bool,
    requests: u32,
    idle_since: Instant,
    server_timeout: Option<Duration>,
    server_max_requests: Option<u32>,
}

impl Connection {
    pub fn new(key: ConnectionKey, established: Established) -> Self {
        Self {
            key,
            reader: LineReader::new(established.socket),
            forwarding: established.forwarding,
            requests: 0,
            idle_since: Instant::now(),
            server_timeout: None,
            server_max_requests: None,
        }
    }

    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    pub fn reader(&mut self) -> &mut LineReader<StreamSocket> {
        &mut self.reader
    }

    /// Requests on this connection go to a forwarding HTTP proxy in absolute form.
    pub fn is_forwarding(&self) -> bool {
        self.forwarding
    }

    /// Requests sent over this connection.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Whether the keep-alive budget is spent. Server-advertised limits win
    /// over the client's.
    fn limit_reached(&self, config: &KeepAliveConfig, now: Instant) -> bool {
        let max_requests = self.server_max_requests.unwrap_or(config.max_requests);
        if self.requests >= max_requests {
            return true;
        }
        let timeout = self.server_timeout.unwrap_or(config.timeout);
        now.duration_since(self.idle_since) > timeout
    }
}

/// Owns the client's connection.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    current: Option<Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&mut self) -> Option<&mut Connection> {
        self.current.as_mut()
    }

    /// The connection's reader, if one is open.
    pub fn reader(&mut self) -> Option<&mut LineReader<StreamSocket>> {
        self.current.as_mut().map(Connection::reader)
    }

    /// Can the open connection carry a request to `key`?
    ///
    /// `previous_ok` is false when the last response failed or asked for the
    /// connection to be closed.
    pub fn can_reuse(&self, key: &ConnectionKey, config: &KeepAliveConfig, previous_ok: bool) -> bool {
        match &self.current {
            Some(conn) => {
                config.enabled
                    && previous_ok
                    && conn.key == *key
                    && !conn.limit_reached(config, Instant::now())
            }
            None => false,
        }
    }

    /// Reuse the open connection or replace it with one from `connect`.
    ///
    /// Returns the connection and whether it was reused. The request counter
    /// is charged here.
    pub fn acquire<F>(
        &mut self,
        key: ConnectionKey,
        config: &KeepAliveConfig,
        previous_ok: bool,
        connect: F,
    ) -> Result<(&mut Connection, bool), NetError>
    where
        F: FnOnce(&ConnectionKey) -> Result<Established, NetError>,
    {
        let reused = self.can_reuse(&key, config, previous_ok);
        if reused {
            tracing::debug!(host = %key.host, port = key.port, "reusing keep-alive connection");
        } else {
            self.dispose();
            let established = connect(&key)?;
            tracing::debug!(
                host = %key.host,
                port = key.port,
                ssl = established.socket.is_ssl(),
                forwarding = established.forwarding,
                "new connection"
            );
            self.current = Some(Connection::new(key, established));
        }

        match self.current.as_mut() {
            Some(conn) => {
                conn.requests += 1;
                Ok((conn, reused))
            }
            None => Err(NetError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no connection after connect",
            ))),
        }
    }

    /// Record a completed response: restart the idle clock and adopt any
    /// limits the server advertised.
    pub fn response_received(&mut self, server_timeout: Option<Duration>, server_max_requests: Option<u32>) {
        if let Some(conn) = self.current.as_mut() {
            conn.idle_since = Instant::now();
            if server_timeout.is_some() {
                conn.server_timeout = server_timeout;
            }
            if server_max_requests.is_some() {
                conn.server_max_requests = server_max_requests;
            }
        }
    }

    /// Close the connection, if any.
    pub fn dispose(&mut self) {
        if let Some(conn) = self.current.take() {
            tracing::debug!(host = %conn.key.host, requests = conn.requests, "closing connection");
            conn.reader.into_inner().shutdown();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
