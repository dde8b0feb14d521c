//! Proxy error types.

use std::fmt;
use std::io;
use thiserror::Error;

/// Why a proxy hop failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyErrorKind {
    /// Invalid host, port, credentials or destination.
    InvalidConfig(String),
    /// The operation has no meaning for this proxy (host of a chain, for example).
    Unsupported(&'static str),
    ConnectFailed,
    ConnectTimeout,
    /// The destination could not be resolved locally (SOCKS4).
    ResolveFailed(String),
    /// The proxy did not answer within the read timeout.
    WaitTimeout,
    EmptyReply,
    MalformedReply,
    /// HTTP CONNECT answered with a non-2xx status.
    BadStatus(u16),
    AuthFailed,
    NoAcceptableMethods,
    Socks4Rejected,
    Socks4IdentdUnreachable,
    Socks4IdentdMismatch,
    Socks5GeneralFailure,
    Socks5RulesetDenied,
    Socks5NetworkUnreachable,
    Socks5HostUnreachable,
    Socks5ConnectionRefused,
    Socks5TtlExpired,
    Socks5CommandUnsupported,
    AddressTypeUnsupported,
    UnknownReply(u8),
    /// Socket failure during the handshake.
    Io,
}

impl fmt::Display for ProxyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid proxy configuration: {reason}"),
            Self::Unsupported(what) => write!(f, "{what} is not supported by this proxy"),
            Self::ConnectFailed => f.write_str("unable to connect to proxy"),
            Self::ConnectTimeout => f.write_str("timed out connecting to proxy"),
            Self::ResolveFailed(host) => write!(f, "failed to resolve {host}"),
            Self::WaitTimeout => f.write_str("timed out waiting for proxy reply"),
            Self::EmptyReply => f.write_str("proxy sent an empty reply"),
            Self::MalformedReply => f.write_str("proxy sent a malformed reply"),
            Self::BadStatus(code) => write!(f, "proxy answered CONNECT with status {code}"),
            Self::AuthFailed => f.write_str("proxy authentication failed"),
            Self::NoAcceptableMethods => f.write_str("no acceptable authentication methods"),
            Self::Socks4Rejected => f.write_str("request rejected or failed"),
            Self::Socks4IdentdUnreachable => {
                f.write_str("request rejected because the proxy cannot reach identd")
            }
            Self::Socks4IdentdMismatch => {
                f.write_str("request rejected because identd reported a different user")
            }
            Self::Socks5GeneralFailure => f.write_str("general SOCKS server failure"),
            Self::Socks5RulesetDenied => f.write_str("connection not allowed by ruleset"),
            Self::Socks5NetworkUnreachable => f.write_str("network unreachable"),
            Self::Socks5HostUnreachable => f.write_str("host unreachable"),
            Self::Socks5ConnectionRefused => f.write_str("connection refused"),
            Self::Socks5TtlExpired => f.write_str("TTL expired"),
            Self::Socks5CommandUnsupported => f.write_str("command not supported"),
            Self::AddressTypeUnsupported => f.write_str("address type not supported"),
            Self::UnknownReply(code) => write!(f, "unknown reply code {code:#04x}"),
            Self::Io => f.write_str("socket error during proxy handshake"),
        }
    }
}

/// A failure of one proxy hop, tagged with that hop's identity (`socks5 host:port`).
#[derive(Debug, Error)]
#[error("{kind} ({proxy})")]
pub struct ProxyError {
    proxy: String,
    kind: ProxyErrorKind,
    #[source]
    source: Option<io::Error>,
}

impl ProxyError {
    pub fn new(proxy: impl Into<String>, kind: ProxyErrorKind) -> Self {
        Self {
            proxy: proxy.into(),
            kind,
            source: None,
        }
    }

    pub fn with_source(proxy: impl Into<String>, kind: ProxyErrorKind, source: io::Error) -> Self {
        Self {
            proxy: proxy.into(),
            kind,
            source: Some(source),
        }
    }

    /// Wrap a socket error raised mid-handshake; read timeouts become [`ProxyErrorKind::WaitTimeout`].
    pub(crate) fn io(proxy: &str, source: io::Error) -> Self {
        let kind = match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ProxyErrorKind::WaitTimeout,
            io::ErrorKind::UnexpectedEof => ProxyErrorKind::EmptyReply,
            _ => ProxyErrorKind::Io,
        };
        Self::with_source(proxy, kind, source)
    }

    /// Identity of the hop that failed.
    pub fn proxy(&self) -> &str {
        &self.proxy
    }

    pub fn kind(&self) -> &ProxyErrorKind {
        &self.kind
    }
}
