//! Reconnect policy.
//!
//! A failed attempt is retried on a fresh connection when reconnecting is
//! enabled and the budget is not spent. The delay between attempts is fixed.

use crate::base::neterror::{ErrorKind, NetError};
use std::time::Duration;

/// Why an attempt is being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// No connection or tunnel could be established.
    ConnectFailed,
    /// Writing the request failed.
    SendFailed,
    /// Reading the response failed or timed out.
    ReceiveFailed,
    /// The server sent data that is not a valid HTTP response.
    MalformedResponse,
}

impl RetryReason {
    /// Map a NetError to a RetryReason, if the error is retryable.
    ///
    /// Status errors, redirect limits and local failures are never retried.
    pub fn from_error(error: &NetError) -> Option<Self> {
        match error.kind() {
            ErrorKind::ConnectFailure => Some(Self::ConnectFailed),
            ErrorKind::SendFailure => Some(Self::SendFailed),
            ErrorKind::ReceiveFailure => Some(Self::ReceiveFailed),
            ErrorKind::ProtocolError => None,
            ErrorKind::Other => match error {
                NetError::MalformedStatusLine { .. }
                | NetError::MalformedHeader { .. }
                | NetError::MalformedCookie { .. }
                | NetError::InvalidChunkSize { .. } => Some(Self::MalformedResponse),
                _ => None,
            },
        }
    }
}

/// Configuration for reconnect behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Retry failed attempts at all (default: false)
    pub enabled: bool,
    /// Maximum number of reconnects per call (default: 3)
    pub limit: u32,
    /// Pause before each reconnect (default: 100ms)
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: 3,
            delay: Duration::from_millis(100),
        }
    }
}

impl ReconnectConfig {
    /// Reconnect up to `limit` times, waiting `delay` before each.
    pub fn enabled(limit: u32, delay: Duration) -> Self {
        Self {
            enabled: true,
            limit,
            delay,
        }
    }

    /// Whether another attempt may follow `attempts` reconnects already made.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.enabled && attempts < self.limit
    }
}
