//! Buffered reader over a connection.
//!
//! The same `LineReader` parses the status line, the headers and then the body,
//! so bytes read ahead while scanning for a line ending stay in its buffer and
//! are handed to the body reader instead of being lost. It lives as long as
//! the connection, which also keeps any bytes of the next response.

use std::fmt;
use std::io::{self, BufRead, Read};

/// Read-ahead buffer size.
pub const RECEIVE_BUFFER_SIZE: usize = 8192;
const INITIAL_LINE_CAPACITY: usize = 1000;

pub struct LineReader<S> {
    stream: S,
    buf: Box<[u8]>,
    pos: usize,
    len: usize,
    line: Vec<u8>,
}

impl<S: fmt::Debug> fmt::Debug for LineReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineReader")
            .field("stream", &self.stream)
            .field("buffered", &(self.len - self.pos))
            .finish()
    }
}

impl<S: Read> LineReader<S> {
    pub fn new(stream: S) -> Self {
        Self::with_capacity(RECEIVE_BUFFER_SIZE, stream)
    }

    pub fn with_capacity(capacity: usize, stream: S) -> Self {
        Self {
            stream,
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            len: 0,
            line: Vec::with_capacity(INITIAL_LINE_CAPACITY),
        }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Bytes read from the stream but not consumed yet.
    pub fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..self.len]
    }

    pub fn has_buffered(&self) -> bool {
        self.pos < self.len
    }

    /// Read one line, up to and including LF, with the line ending stripped.
    ///
    /// Returns `None` when the stream ends before a single byte was read. A
    /// final line without LF is returned as-is.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = std::mem::take(&mut self.line);
        line.clear();
        let result = self.read_until(b'\n', &mut line);
        let text = match result {
            Ok(0) => None,
            Ok(_) => {
                let mut end = line.len();
                while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
                    end -= 1;
                }
                Some(String::from_utf8_lossy(&line[..end]).into_owned())
            }
            Err(e) => {
                self.line = line;
                return Err(e);
            }
        };
        self.line = line;
        Ok(text)
    }
}

impl<S: Read> Read for LineReader<S> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        // Large reads with an empty buffer bypass it.
        if !self.has_buffered() && out.len() >= self.buf.len() {
            return self.stream.read(out);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<S: Read> BufRead for LineReader<S> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.len {
            self.len = loop {
                match self.stream.read(&mut self.buf) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            self.pos = 0;
        }
        Ok(&self.buf[self.pos..self.len])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.len);
    }
}

/// A read that gave up because the socket timeout expired.
pub fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
