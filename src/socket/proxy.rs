//! Proxy clients.
//!
//! Every proxy protocol is one variant of [`ProxyClient`] and shares a single
//! capability: [`ProxyClient::create_connection`], which returns a TCP stream
//! tunneled to the destination. SOCKS4a reuses the SOCKS4 handshake with a
//! different request frame, and a [`ChainProxy`] folds several hops into one.
//!
//! Proxies are written as `host:port[:username[:password]]`.

pub mod chain;
pub mod error;
pub mod http;
pub mod socks4;
pub mod socks5;

#[cfg(test)]
mod testutil;

pub use chain::ChainProxy;
pub use error::{ProxyError, ProxyErrorKind};

use crate::socket::connectjob;
use rand::Rng;
use std::fmt;
use std::io;
use std::net::TcpStream;
use std::time::Duration;
use zeroize::Zeroizing;

/// Default port of an HTTP proxy.
pub const DEFAULT_HTTP_PORT: u16 = 8080;
/// Default port of a SOCKS proxy.
pub const DEFAULT_SOCKS_PORT: u16 = 1080;
/// Default connect and read/write timeout of a proxy hop.
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_CREDENTIAL_LEN: usize = 255;

/// Proxy protocol type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    /// HTTP proxy (CONNECT tunnel unless the destination port is 80)
    Http,
    /// SOCKS4, destination resolved locally
    Socks4,
    /// SOCKS4a, destination resolved by the proxy
    Socks4a,
    /// SOCKS5
    Socks5,
    /// Ordered list of proxies
    Chain,
}

impl ProxyType {
    pub fn default_port(self) -> u16 {
        match self {
            ProxyType::Http => DEFAULT_HTTP_PORT,
            _ => DEFAULT_SOCKS_PORT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks4a => "socks4a",
            ProxyType::Socks5 => "socks5",
            ProxyType::Chain => "chain",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address, credentials and timeouts of a single proxy hop.
#[derive(Clone)]
pub struct ProxyEndpoint {
    host: String,
    port: u16,
    username: Option<String>,
    /// Proxy password (zeroized on drop)
    password: Option<Zeroizing<String>>,
    connect_timeout: Duration,
    read_write_timeout: Duration,
}

impl fmt::Debug for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .field("read_write_timeout", &self.read_write_timeout)
            .finish()
    }
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            connect_timeout: DEFAULT_PROXY_TIMEOUT,
            read_write_timeout: DEFAULT_PROXY_TIMEOUT,
        }
    }

    /// Add authentication credentials. Empty strings count as unset.
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = (!username.is_empty()).then(|| username.to_string());
        self.password = (!password.is_empty()).then(|| Zeroizing::new(password.to_string()));
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_write_timeout(mut self, timeout: Duration) -> Self {
        self.read_write_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.as_str())
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_write_timeout(&self) -> Duration {
        self.read_write_timeout
    }

    /// Both username and password are set.
    pub fn requires_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Either username or password is set.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    fn check_state(&self, identity: &str) -> Result<(), ProxyError> {
        let invalid = |reason: &str| {
            Err(ProxyError::new(
                identity,
                ProxyErrorKind::InvalidConfig(reason.to_string()),
            ))
        };
        if self.host.is_empty() {
            return invalid("host is empty");
        }
        if self.port == 0 {
            return invalid("port must be between 1 and 65535");
        }
        if self.username().is_some_and(|u| u.len() > MAX_CREDENTIAL_LEN) {
            return invalid("username is longer than 255 bytes");
        }
        if self.password().is_some_and(|p| p.len() > MAX_CREDENTIAL_LEN) {
            return invalid("password is longer than 255 bytes");
        }
        Ok(())
    }

    /// Open the TCP connection to this hop, or adopt the stream of the previous
    /// hop. Either way the stream carries this hop's read/write timeout.
    fn open(&self, identity: &str, existing: Option<TcpStream>) -> Result<TcpStream, ProxyError> {
        if let Some(stream) = existing {
            connectjob::apply_timeouts(&stream, self.read_write_timeout)
                .map_err(|e| ProxyError::io(identity, e))?;
            return Ok(stream);
        }

        let addrs = connectjob::resolve(&self.host, self.port).map_err(|e| {
            ProxyError::with_source(
                identity,
                ProxyErrorKind::ResolveFailed(self.host.clone()),
                e,
            )
        })?;
        connectjob::connect_addrs(&addrs, self.connect_timeout, self.read_write_timeout).map_err(
            |e| {
                let kind = if e.kind() == io::ErrorKind::TimedOut {
                    ProxyErrorKind::ConnectTimeout
                } else {
                    ProxyErrorKind::ConnectFailed
                };
                ProxyError::with_source(identity, kind, e)
            },
        )
    }
}

/// A stream tunneled to the destination, and the hops it went through.
#[derive(Debug)]
pub struct Tunnel {
    pub stream: TcpStream,
    /// Identities of the hops in the order they were traversed. For a
    /// shuffled chain this is the shuffled order.
    pub route: Vec<String>,
    /// Type of the hop that talks to the destination; never [`ProxyType::Chain`].
    pub exit: ProxyType,
}

impl Tunnel {
    /// The destination is reached through an HTTP proxy that forwards plain
    /// requests instead of opening a CONNECT tunnel.
    pub fn forwards_plain_http(&self, port: u16) -> bool {
        self.exit == ProxyType::Http && port == 80
    }
}

/// A proxy hop or chain of hops.
#[derive(Debug, Clone)]
pub enum ProxyClient {
    Http(ProxyEndpoint),
    Socks4(ProxyEndpoint),
    Socks4a(ProxyEndpoint),
    Socks5(ProxyEndpoint),
    Chain(ChainProxy),
}

impl ProxyClient {
    /// Create a single-hop proxy of the given type.
    pub fn new(proxy_type: ProxyType, host: &str, port: u16) -> Result<Self, ProxyError> {
        Self::from_endpoint(proxy_type, ProxyEndpoint::new(host, port))
    }

    pub fn from_endpoint(proxy_type: ProxyType, endpoint: ProxyEndpoint) -> Result<Self, ProxyError> {
        Ok(match proxy_type {
            ProxyType::Http => ProxyClient::Http(endpoint),
            ProxyType::Socks4 => ProxyClient::Socks4(endpoint),
            ProxyType::Socks4a => ProxyClient::Socks4a(endpoint),
            ProxyType::Socks5 => ProxyClient::Socks5(endpoint),
            ProxyType::Chain => {
                return Err(ProxyError::new(
                    "chain",
                    ProxyErrorKind::Unsupported("building a chain from an address"),
                ))
            }
        })
    }

    pub fn http(host: &str, port: u16) -> Self {
        ProxyClient::Http(ProxyEndpoint::new(host, port))
    }

    pub fn socks4(host: &str, port: u16) -> Self {
        ProxyClient::Socks4(ProxyEndpoint::new(host, port))
    }

    pub fn socks4a(host: &str, port: u16) -> Self {
        ProxyClient::Socks4a(ProxyEndpoint::new(host, port))
    }

    pub fn socks5(host: &str, port: u16) -> Self {
        ProxyClient::Socks5(ProxyEndpoint::new(host, port))
    }

    /// Parse `host:port:username:password` (port, username and password optional).
    ///
    /// A missing port falls back to the protocol's default port.
    pub fn parse(proxy_type: ProxyType, address: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: String| {
            ProxyError::new(
                format!("{proxy_type} {address}"),
                ProxyErrorKind::InvalidConfig(reason),
            )
        };

        let mut values = address.trim().split(':');
        let host = values.next().unwrap_or_default();
        if host.is_empty() {
            return Err(invalid("host is empty".to_string()));
        }

        let port = match values.next() {
            Some(p) => match p.parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => return Err(invalid(format!("invalid port {p:?}"))),
            },
            None => proxy_type.default_port(),
        };

        let username = values.next().unwrap_or_default();
        let password = values.next().unwrap_or_default();

        let endpoint = ProxyEndpoint::new(host, port).with_auth(username, password);
        let proxy = Self::from_endpoint(proxy_type, endpoint)?;
        proxy.check_state()?;
        Ok(proxy)
    }

    pub fn try_parse(proxy_type: ProxyType, address: &str) -> Option<Self> {
        Self::parse(proxy_type, address).ok()
    }

    pub fn proxy_type(&self) -> ProxyType {
        match self {
            ProxyClient::Http(_) => ProxyType::Http,
            ProxyClient::Socks4(_) => ProxyType::Socks4,
            ProxyClient::Socks4a(_) => ProxyType::Socks4a,
            ProxyClient::Socks5(_) => ProxyType::Socks5,
            ProxyClient::Chain(_) => ProxyType::Chain,
        }
    }

    /// The single hop behind this proxy. Chains report [`ProxyErrorKind::Unsupported`].
    pub fn endpoint(&self) -> Result<&ProxyEndpoint, ProxyError> {
        match self {
            ProxyClient::Http(e)
            | ProxyClient::Socks4(e)
            | ProxyClient::Socks4a(e)
            | ProxyClient::Socks5(e) => Ok(e),
            ProxyClient::Chain(_) => Err(self.unsupported("endpoint of a chain")),
        }
    }

    pub fn endpoint_mut(&mut self) -> Result<&mut ProxyEndpoint, ProxyError> {
        match self {
            ProxyClient::Http(e)
            | ProxyClient::Socks4(e)
            | ProxyClient::Socks4a(e)
            | ProxyClient::Socks5(e) => Ok(e),
            ProxyClient::Chain(_) => Err(ProxyError::new(
                "chain",
                ProxyErrorKind::Unsupported("endpoint of a chain"),
            )),
        }
    }

    pub fn host(&self) -> Result<&str, ProxyError> {
        self.endpoint().map(ProxyEndpoint::host)
    }

    pub fn port(&self) -> Result<u16, ProxyError> {
        self.endpoint().map(ProxyEndpoint::port)
    }

    pub fn username(&self) -> Result<Option<&str>, ProxyError> {
        self.endpoint().map(ProxyEndpoint::username)
    }

    pub fn password(&self) -> Result<Option<&str>, ProxyError> {
        self.endpoint().map(ProxyEndpoint::password)
    }

    pub fn connect_timeout(&self) -> Result<Duration, ProxyError> {
        self.endpoint().map(ProxyEndpoint::connect_timeout)
    }

    pub fn read_write_timeout(&self) -> Result<Duration, ProxyError> {
        self.endpoint().map(ProxyEndpoint::read_write_timeout)
    }

    /// `type host:port`, used to tag errors with the hop that failed.
    pub fn identity(&self) -> String {
        match self {
            ProxyClient::Chain(chain) => format!("chain of {} proxies", chain.len()),
            _ => format!("{} {}", self.proxy_type(), self),
        }
    }

    /// `host:port[:username[:password]]`; one line per hop for a chain.
    pub fn to_extended_string(&self) -> String {
        match self {
            ProxyClient::Chain(chain) => chain
                .proxies()
                .iter()
                .map(ProxyClient::to_extended_string)
                .collect::<Vec<_>>()
                .join("\n"),
            _ => {
                let mut out = self.to_string();
                if let Ok(endpoint) = self.endpoint() {
                    if let Some(username) = endpoint.username() {
                        out.push(':');
                        out.push_str(username);
                        if let Some(password) = endpoint.password() {
                            out.push(':');
                            out.push_str(password);
                        }
                    }
                }
                out
            }
        }
    }

    /// Validate host, port and credential lengths of every hop.
    pub fn check_state(&self) -> Result<(), ProxyError> {
        match self {
            ProxyClient::Chain(chain) => chain.check_state(),
            _ => {
                let endpoint = self.endpoint()?;
                endpoint.check_state(&self.identity())
            }
        }
    }

    /// Open a tunnel to `host:port`.
    ///
    /// When `existing` is given the handshake runs over it instead of a fresh
    /// connection to the proxy; chains use this to stack hops.
    pub fn create_connection(
        &self,
        host: &str,
        port: u16,
        existing: Option<TcpStream>,
    ) -> Result<TcpStream, ProxyError> {
        self.create_connection_with_rng(host, port, existing, &mut rand::rng())
    }

    /// Same as [`create_connection`](Self::create_connection), shuffling chains with `rng`.
    pub fn create_connection_with_rng<R: Rng + ?Sized>(
        &self,
        host: &str,
        port: u16,
        existing: Option<TcpStream>,
        rng: &mut R,
    ) -> Result<TcpStream, ProxyError> {
        self.open_tunnel_with_rng(host, port, existing, rng)
            .map(|tunnel| tunnel.stream)
    }

    /// Open a tunnel to `host:port` and report the route it took.
    pub fn open_tunnel(
        &self,
        host: &str,
        port: u16,
        existing: Option<TcpStream>,
    ) -> Result<Tunnel, ProxyError> {
        self.open_tunnel_with_rng(host, port, existing, &mut rand::rng())
    }

    /// Same as [`open_tunnel`](Self::open_tunnel), shuffling chains with `rng`.
    pub fn open_tunnel_with_rng<R: Rng + ?Sized>(
        &self,
        host: &str,
        port: u16,
        existing: Option<TcpStream>,
        rng: &mut R,
    ) -> Result<Tunnel, ProxyError> {
        if let ProxyClient::Chain(chain) = self {
            return chain.open_tunnel_with_rng(host, port, existing, rng);
        }

        let identity = self.identity();
        self.check_state()?;
        if host.is_empty() {
            return Err(ProxyError::new(
                identity,
                ProxyErrorKind::InvalidConfig("destination host is empty".to_string()),
            ));
        }
        if port == 0 {
            return Err(ProxyError::new(
                identity,
                ProxyErrorKind::InvalidConfig("destination port must be between 1 and 65535".to_string()),
            ));
        }

        let endpoint = self.endpoint()?;
        let mut stream = endpoint.open(&identity, existing)?;

        let result = match self {
            ProxyClient::Http(e) => http::connect(&mut stream, e, &identity, host, port),
            ProxyClient::Socks4(e) => socks4::connect(
                &mut stream,
                e,
                &identity,
                host,
                port,
                socks4::Resolution::Local,
            ),
            ProxyClient::Socks4a(e) => socks4::connect(
                &mut stream,
                e,
                &identity,
                host,
                port,
                socks4::Resolution::Remote,
            ),
            ProxyClient::Socks5(e) => socks5::connect(&mut stream, e, &identity, host, port),
            ProxyClient::Chain(_) => Err(self.unsupported("handshake of a chain")),
        };

        match result {
            Ok(()) => {
                tracing::debug!(proxy = %identity, host = %host, port, "proxy tunnel established");
                Ok(Tunnel {
                    stream,
                    route: vec![identity],
                    exit: self.proxy_type(),
                })
            }
            Err(e) => {
                let _ = stream.shutdown(std::net::Shutdown::Both);
                Err(e)
            }
        }
    }

    fn unsupported(&self, what: &'static str) -> ProxyError {
        ProxyError::new(self.identity(), ProxyErrorKind::Unsupported(what))
    }
}

/// `host:port`; hops joined by ` -> ` for a chain.
impl fmt::Display for ProxyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyClient::Chain(chain) => {
                for (i, proxy) in chain.proxies().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" -> ")?;
                    }
                    write!(f, "{proxy}")?;
                }
                Ok(())
            }
            ProxyClient::Http(e)
            | ProxyClient::Socks4(e)
            | ProxyClient::Socks4a(e)
            | ProxyClient::Socks5(e) => write!(f, "{}:{}", e.host, e.port),
        }
    }
}

/// Proxies are equal when host (ignoring case) and port match; chains compare hop by hop.
impl PartialEq for ProxyClient {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ProxyClient::Chain(a), ProxyClient::Chain(b)) => a.proxies() == b.proxies(),
            (ProxyClient::Chain(_), _) | (_, ProxyClient::Chain(_)) => false,
            _ => match (self.endpoint(), other.endpoint()) {
                (Ok(a), Ok(b)) => a.host.eq_ignore_ascii_case(&b.host) && a.port == b.port,
                _ => false,
            },
        }
    }
}

impl Eq for ProxyClient {}

/// Builder for single-hop proxies.
#[derive(Default)]
pub struct ProxyBuilder {
    proxy_type: Option<ProxyType>,
    address: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connect_timeout: Option<Duration>,
    read_write_timeout: Option<Duration>,
}

impl ProxyBuilder {
    /// Create new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set HTTP proxy address (`host:port`).
    pub fn http(self, address: &str) -> Self {
        self.typed(ProxyType::Http, address)
    }

    /// Set SOCKS4 proxy address.
    pub fn socks4(self, address: &str) -> Self {
        self.typed(ProxyType::Socks4, address)
    }

    /// Set SOCKS4a proxy address.
    pub fn socks4a(self, address: &str) -> Self {
        self.typed(ProxyType::Socks4a, address)
    }

    /// Set SOCKS5 proxy address.
    pub fn socks5(self, address: &str) -> Self {
        self.typed(ProxyType::Socks5, address)
    }

    fn typed(mut self, proxy_type: ProxyType, address: &str) -> Self {
        self.proxy_type = Some(proxy_type);
        self.address = Some(address.to_string());
        self
    }

    /// Set authentication credentials.
    pub fn auth(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn read_write_timeout(mut self, timeout: Duration) -> Self {
        self.read_write_timeout = Some(timeout);
        self
    }

    /// Build the proxy. Credentials given to [`auth`](Self::auth) override any in the address.
    pub fn build(self) -> Result<ProxyClient, ProxyError> {
        let proxy_type = self.proxy_type.ok_or_else(|| {
            ProxyError::new(
                "proxy",
                ProxyErrorKind::InvalidConfig("no proxy address set".to_string()),
            )
        })?;
        let address = self.address.unwrap_or_default();
        let mut proxy = ProxyClient::parse(proxy_type, &address)?;

        let endpoint = proxy.endpoint_mut()?;
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            *endpoint = endpoint.clone().with_auth(username, password);
        }
        if let Some(timeout) = self.connect_timeout {
            endpoint.connect_timeout = timeout;
        }
        if let Some(timeout) = self.read_write_timeout {
            endpoint.read_write_timeout = timeout;
        }

        proxy.check_state()?;
        Ok(proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_address() {
        let proxy = ProxyClient::parse(ProxyType::Socks5, "h:1080:u:p").unwrap();
        assert_eq!(proxy.proxy_type(), ProxyType::Socks5);
        assert_eq!(proxy.host().unwrap(), "h");
        assert_eq!(proxy.port().unwrap(), 1080);
        assert_eq!(proxy.username().unwrap(), Some("u"));
        assert_eq!(proxy.password().unwrap(), Some("p"));
        assert_eq!(proxy.to_extended_string(), "h:1080:u:p");
        assert_eq!(proxy.to_string(), "h:1080");
    }

    #[test]
    fn test_parse_defaults_port() {
        let http = ProxyClient::parse(ProxyType::Http, "proxy.local").unwrap();
        assert_eq!(http.port().unwrap(), DEFAULT_HTTP_PORT);

        let socks = ProxyClient::parse(ProxyType::Socks4, "proxy.local").unwrap();
        assert_eq!(socks.port().unwrap(), DEFAULT_SOCKS_PORT);
    }

    #[test]
    fn test_parse_username_only() {
        let proxy = ProxyClient::parse(ProxyType::Http, "h:3128:user").unwrap();
        assert_eq!(proxy.to_extended_string(), "h:3128:user");
        assert_eq!(proxy.password().unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(ProxyClient::parse(ProxyType::Http, "").is_err());
        assert!(ProxyClient::parse(ProxyType::Http, "h:notaport").is_err());
        assert!(ProxyClient::parse(ProxyType::Http, "h:0").is_err());
        assert!(ProxyClient::parse(ProxyType::Http, "h:70000").is_err());
        assert!(ProxyClient::try_parse(ProxyType::Socks5, "h:1:u:p").is_some());
        assert!(ProxyClient::parse(ProxyType::Chain, "h:1").is_err());
    }

    #[test]
    fn test_check_state_credential_length() {
        let long = "x".repeat(256);
        let proxy = ProxyClient::Socks5(ProxyEndpoint::new("h", 1080).with_auth(&long, "p"));
        let err = proxy.check_state().unwrap_err();
        assert!(matches!(err.kind(), ProxyErrorKind::InvalidConfig(_)));
    }

    #[test]
    fn test_equality_ignores_case_and_credentials() {
        let a = ProxyClient::parse(ProxyType::Http, "Proxy.Example.com:8080:u:p").unwrap();
        let b = ProxyClient::parse(ProxyType::Http, "proxy.example.com:8080").unwrap();
        let c = ProxyClient::parse(ProxyType::Http, "proxy.example.com:8081").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_identity() {
        let proxy = ProxyClient::socks4a("10.0.0.1", 1080);
        assert_eq!(proxy.identity(), "socks4a 10.0.0.1:1080");
    }

    #[test]
    fn test_builder_overrides() {
        let proxy = ProxyBuilder::new()
            .socks5("socks.example.com:1081:a:b")
            .auth("user", "pass")
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(proxy.username().unwrap(), Some("user"));
        assert_eq!(proxy.password().unwrap(), Some("pass"));
        assert_eq!(proxy.connect_timeout().unwrap(), Duration::from_secs(5));
        assert_eq!(proxy.read_write_timeout().unwrap(), DEFAULT_PROXY_TIMEOUT);
    }

    #[test]
    fn test_builder_without_address() {
        assert!(ProxyBuilder::new().build().is_err());
    }

    #[test]
    fn test_empty_destination_rejected() {
        let proxy = ProxyClient::http("127.0.0.1", 9);
        let err = proxy.create_connection("", 443, None).unwrap_err();
        assert!(matches!(err.kind(), ProxyErrorKind::InvalidConfig(_)));
    }

    #[test]
    fn test_adopted_stream_takes_hop_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        connectjob::apply_timeouts(&stream, Duration::from_secs(60)).unwrap();

        let hop = ProxyEndpoint::new("h", 1080).with_read_write_timeout(Duration::from_secs(7));
        let stream = hop.open("socks5 h:1080", Some(stream)).unwrap();
        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_secs(7)));
        assert_eq!(stream.write_timeout().unwrap(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_forwards_plain_http() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let tunnel = |exit| Tunnel {
            stream: TcpStream::connect(listener.local_addr().unwrap()).unwrap(),
            route: Vec::new(),
            exit,
        };
        assert!(tunnel(ProxyType::Http).forwards_plain_http(80));
        assert!(!tunnel(ProxyType::Http).forwards_plain_http(443));
        assert!(!tunnel(ProxyType::Socks5).forwards_plain_http(80));
    }

    #[test]
    fn test_debug_redacts_password() {
        let endpoint = ProxyEndpoint::new("h", 1).with_auth("u", "secret");
        assert!(!format!("{endpoint:?}").contains("secret"));
    }
}
