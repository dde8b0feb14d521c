//! Upload and download progress reporting.

use std::io::{self, Write};
use std::sync::Arc;

/// Progress of the request body being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Percentage sent, `0.0..=100.0`.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        self.bytes_sent as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Progress of the response body being received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub bytes_received: u64,
    /// `None` when the server declared no length.
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    /// Percentage received, or `None` when the total is unknown.
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(100.0),
            Some(total) => Some(self.bytes_received as f64 / total as f64 * 100.0),
            None => None,
        }
    }
}

pub type UploadCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;
pub type DownloadCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Writer that slices writes into `chunk_size` pieces and reports after each one.
pub(crate) struct ProgressWriter<'a, W: Write> {
    inner: W,
    chunk_size: usize,
    sent: u64,
    total: u64,
    callback: Option<&'a UploadCallback>,
}

impl<'a, W: Write> ProgressWriter<'a, W> {
    pub(crate) fn new(inner: W, chunk_size: usize, total: u64, callback: Option<&'a UploadCallback>) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            sent: 0,
            total,
            callback,
        }
    }

    pub(crate) fn bytes_sent(&self) -> u64 {
        self.sent
    }
}

impl<W: Write> Write for ProgressWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk_size);
        self.inner.write_all(&buf[..n])?;
        self.sent += n as u64;
        if let Some(callback) = self.callback {
            callback(UploadProgress {
                bytes_sent: self.sent,
                total_bytes: self.total,
            });
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
