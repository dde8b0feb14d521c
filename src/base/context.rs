//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into stage-tagged `NetError` variants.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add connection context to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use proxynet::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr)
    ///     .connection_context("example.com", 443)?;
    /// // Error: "Connection to example.com:443 failed: connection refused"
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Add DNS resolution context to an IO error.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Tag an IO error as a failure while writing the request.
    fn send_context(self, host: &str) -> Result<T, NetError>;

    /// Tag an IO error as a failure while reading the response.
    fn receive_context(self, host: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(host, port, e))
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| NetError::dns_failed(domain, e))
    }

    fn send_context(self, host: &str) -> Result<T, NetError> {
        self.map_err(|source| NetError::SendFailed {
            host: host.to_string(),
            source,
        })
    }

    fn receive_context(self, host: &str) -> Result<T, NetError> {
        self.map_err(|source| NetError::ReceiveFailed {
            host: host.to_string(),
            source,
        })
    }
}
