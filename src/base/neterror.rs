use crate::socket::proxy::ProxyError;
use http::StatusCode;
use std::io;
use thiserror::Error;

/// Coarse classification of a [`NetError`].
///
/// Callers branch on this rather than on individual variants when they only
/// care about which stage of the request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed wire data, invalid input, redirect limit, local I/O.
    Other,
    /// The server answered with a 4xx or 5xx status.
    ProtocolError,
    /// No connection (direct, tunneled or TLS) could be established.
    ConnectFailure,
    /// Writing the request failed.
    SendFailure,
    /// Reading the response failed.
    ReceiveFailure,
}

#[derive(Debug, Error)]
pub enum NetError {
    // Connection Errors
    #[error("Connection to {host}:{port} failed: {source}")]
    ConnectionFailedTo {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("Failed to resolve {domain}: {source}")]
    NameNotResolvedFor {
        domain: String,
        #[source]
        source: io::Error,
    },
    #[error("Proxy tunnel to {host} failed: {source}")]
    ProxyConnectFailed {
        host: String,
        #[source]
        source: ProxyError,
    },
    #[error("SSL handshake with {host} failed: {reason}")]
    SslHandshakeFailed { host: String, reason: String },

    // Transfer Errors
    #[error("Failed to send request to {host}: {source}")]
    SendFailed {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to receive response from {host}: {source}")]
    ReceiveFailed {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("Received empty response from {host}")]
    EmptyResponse { host: String },
    #[error("Timed out waiting for data from {host}")]
    WaitDataTimeout { host: String },

    // HTTP Errors
    #[error("{host} responded with status {status}")]
    HttpStatus { host: String, status: StatusCode },
    #[error("Too many redirects (limit {limit}) while requesting {host}")]
    TooManyRedirects { host: String, limit: usize },
    #[error("Malformed status line from {host}: {line:?}")]
    MalformedStatusLine { host: String, line: String },
    #[error("Malformed header from {host}: {line:?}")]
    MalformedHeader { host: String, line: String },
    #[error("Malformed cookie from {host}: {value:?}")]
    MalformedCookie { host: String, value: String },
    #[error("Invalid chunk size from {host}: {line:?}")]
    InvalidChunkSize { host: String, line: String },
    #[error("Unsupported Content-Encoding {encoding:?} from {host}")]
    UnsupportedEncoding { host: String, encoding: String },

    // Request Construction Errors
    #[error("Header `{0}` is computed automatically and cannot be set")]
    ClosedHeader(String),
    #[error("Invalid header `{name}`")]
    InvalidHeader { name: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Address is relative and no base address is configured")]
    MissingBaseAddress,
    #[error("Unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("Local I/O failed: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "json")]
    #[error("Failed to parse JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

impl NetError {
    pub fn connection_failed_to(host: &str, port: u16, source: io::Error) -> Self {
        NetError::ConnectionFailedTo {
            host: host.to_string(),
            port,
            source,
        }
    }

    pub fn dns_failed(domain: &str, source: io::Error) -> Self {
        NetError::NameNotResolvedFor {
            domain: domain.to_string(),
            source,
        }
    }

    /// Which stage of the request this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            NetError::ConnectionFailedTo { .. }
            | NetError::NameNotResolvedFor { .. }
            | NetError::ProxyConnectFailed { .. }
            | NetError::SslHandshakeFailed { .. } => ErrorKind::ConnectFailure,
            NetError::SendFailed { .. } => ErrorKind::SendFailure,
            NetError::ReceiveFailed { .. }
            | NetError::EmptyResponse { .. }
            | NetError::WaitDataTimeout { .. } => ErrorKind::ReceiveFailure,
            NetError::HttpStatus { .. } => ErrorKind::ProtocolError,
            _ => ErrorKind::Other,
        }
    }

    /// Status code carried by a protocol error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            NetError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Destination host the failure relates to, when known.
    pub fn host(&self) -> Option<&str> {
        match self {
            NetError::ConnectionFailedTo { host, .. }
            | NetError::ProxyConnectFailed { host, .. }
            | NetError::SslHandshakeFailed { host, .. }
            | NetError::SendFailed { host, .. }
            | NetError::ReceiveFailed { host, .. }
            | NetError::EmptyResponse { host }
            | NetError::WaitDataTimeout { host }
            | NetError::HttpStatus { host, .. }
            | NetError::TooManyRedirects { host, .. }
            | NetError::MalformedStatusLine { host, .. }
            | NetError::MalformedHeader { host, .. }
            | NetError::MalformedCookie { host, .. }
            | NetError::InvalidChunkSize { host, .. }
            | NetError::UnsupportedEncoding { host, .. } => Some(host),
            NetError::NameNotResolvedFor { domain, .. } => Some(domain),
            _ => None,
        }
    }

    /// The server closed or dropped the connection without sending a single byte.
    pub fn is_empty_response(&self) -> bool {
        matches!(self, NetError::EmptyResponse { .. })
    }

    /// The proxy failure behind a connect error, if any.
    pub fn proxy_error(&self) -> Option<&ProxyError> {
        match self {
            NetError::ProxyConnectFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
