//! Response body streaming.
//!
//! A body is read through two layers:
//!
//! - [`FramedReader`] yields exactly the message's wire bytes (fixed length,
//!   chunked or close-delimited) from the connection's [`LineReader`] and
//!   counts them.
//! - [`BodyReader`] optionally decompresses on top of it. When the
//!   decompressor reports the end of its stream the framing layer is drained
//!   to the message boundary, so the connection can carry the next response.

use crate::base::neterror::NetError;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::progress::{DownloadCallback, DownloadProgress};
use crate::http::reader::{is_timeout, LineReader, RECEIVE_BUFFER_SIZE};
use flate2::bufread::{DeflateDecoder, GzDecoder, ZlibDecoder};
use http::{Method, StatusCode};
use std::io::{self, BufRead, BufReader, Read, Write};

const HTML_OPEN: &[u8] = b"<html";
const HTML_CLOSE: &[u8] = b"</html>";

/// How the end of a message body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// No body follows the headers.
    #[default]
    Empty,
    /// `Transfer-Encoding` is present.
    Chunked,
    /// `Content-Length` bytes.
    Fixed(u64),
    /// Everything until the server closes the connection.
    CloseDelimited,
}

impl Framing {
    /// Pick the framing of a response, in priority order: declared empty,
    /// chunked, fixed length, close-delimited.
    pub fn for_response(
        method: &Method,
        status: StatusCode,
        headers: &OrderedHeaderMap,
        content_length: Option<u64>,
    ) -> Self {
        if *method == Method::HEAD
            || status.is_informational()
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
            || content_length == Some(0)
        {
            return Framing::Empty;
        }
        if headers.contains("Transfer-Encoding") {
            return Framing::Chunked;
        }
        match content_length {
            Some(len) => Framing::Fixed(len),
            None => Framing::CloseDelimited,
        }
    }

    /// The connection can carry another response once this body is read.
    pub fn is_reusable(self) -> bool {
        !matches!(self, Framing::CloseDelimited)
    }
}

/// `Content-Encoding` of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
    Deflate,
}

impl ContentEncoding {
    /// Parse a `Content-Encoding` value; the unsupported value is returned as the error.
    pub fn parse(value: Option<&str>) -> Result<Self, String> {
        let Some(value) = value.map(str::trim) else {
            return Ok(ContentEncoding::Identity);
        };
        match value.to_ascii_lowercase().as_str() {
            "" | "identity" => Ok(ContentEncoding::Identity),
            "gzip" | "x-gzip" => Ok(ContentEncoding::Gzip),
            "deflate" => Ok(ContentEncoding::Deflate),
            _ => Err(value.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid chunk size line {0:?}")]
struct InvalidChunkSize(String);

/// Map an I/O failure while reading a response to the engine's error taxonomy.
pub(crate) fn read_error(host: &str, e: io::Error) -> NetError {
    if let Some(InvalidChunkSize(line)) = e
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<InvalidChunkSize>())
    {
        return NetError::InvalidChunkSize {
            host: host.to_string(),
            line: line.clone(),
        };
    }
    if is_timeout(&e) {
        return NetError::WaitDataTimeout {
            host: host.to_string(),
        };
    }
    NetError::ReceiveFailed {
        host: host.to_string(),
        source: e,
    }
}

/// Tracks the `<html` ... `</html>` heuristic of close-delimited bodies.
#[derive(Debug)]
enum HtmlSniff {
    /// Nothing read yet.
    Pending,
    /// The body does not open with HTML; read until close.
    NotHtml,
    /// The body is HTML; `tail` keeps the last bytes seen so a closing tag
    /// split across two reads is still found.
    Html { tail: Vec<u8> },
}

#[derive(Debug)]
enum State {
    Fixed { remaining: u64 },
    Chunked { remaining: u64 },
    Close { sniff: Option<HtmlSniff> },
    Done,
}

/// Reads exactly one message body's wire bytes off a connection.
pub struct FramedReader<'a, S> {
    reader: &'a mut LineReader<S>,
    state: State,
    wire_bytes: u64,
}

impl<'a, S: Read> FramedReader<'a, S> {
    /// `sniff_html` enables early termination of close-delimited HTML bodies.
    pub fn new(reader: &'a mut LineReader<S>, framing: Framing, sniff_html: bool) -> Self {
        let state = match framing {
            Framing::Empty | Framing::Fixed(0) => State::Done,
            Framing::Fixed(len) => State::Fixed { remaining: len },
            Framing::Chunked => State::Chunked { remaining: 0 },
            Framing::CloseDelimited => State::Close {
                sniff: sniff_html.then_some(HtmlSniff::Pending),
            },
        };
        Self {
            reader,
            state,
            wire_bytes: 0,
        }
    }

    /// Body bytes consumed from the wire so far (chunk-size lines excluded).
    pub fn wire_bytes(&self) -> u64 {
        self.wire_bytes
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Discard the rest of the body.
    pub fn drain(&mut self) -> io::Result<u64> {
        let mut scratch = [0u8; RECEIVE_BUFFER_SIZE];
        let mut drained = 0u64;
        loop {
            match self.read(&mut scratch)? {
                0 => return Ok(drained),
                n => drained += n as u64,
            }
        }
    }

    /// Read the next chunk-size line, skipping the CRLF that ends the previous chunk.
    /// Returns 0 at the last chunk or at end of stream.
    fn next_chunk_size(&mut self) -> io::Result<u64> {
        loop {
            let Some(line) = self.reader.read_line()? else {
                return Ok(0);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let size = line.split(';').next().unwrap_or_default().trim();
            let size = u64::from_str_radix(size, 16).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, InvalidChunkSize(line.to_string()))
            })?;
            tracing::trace!(size, "chunk");
            return Ok(size);
        }
    }

    fn read_limited(&mut self, buf: &mut [u8], limit: u64) -> io::Result<usize> {
        let want = buf.len().min(usize::try_from(limit).unwrap_or(usize::MAX));
        let n = self.reader.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before the body was complete",
            ));
        }
        Ok(n)
    }
}

impl<S: Read> Read for FramedReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = match self.state {
            State::Done => return Ok(0),
            State::Fixed { remaining } => {
                let n = self.read_limited(buf, remaining)?;
                let remaining = remaining - n as u64;
                self.state = if remaining == 0 {
                    State::Done
                } else {
                    State::Fixed { remaining }
                };
                n
            }
            State::Chunked { remaining } => {
                let remaining = if remaining == 0 {
                    match self.next_chunk_size()? {
                        0 => {
                            self.state = State::Done;
                            return Ok(0);
                        }
                        size => size,
                    }
                } else {
                    remaining
                };
                let n = self.read_limited(buf, remaining)?;
                self.state = State::Chunked {
                    remaining: remaining - n as u64,
                };
                n
            }
            State::Close { .. } => {
                let n = self.reader.read(buf)?;
                if n == 0 {
                    self.state = State::Done;
                    return Ok(0);
                }
                if let State::Close { sniff: Some(sniff) } = &mut self.state {
                    if sniff.observe(&buf[..n]) {
                        self.state = State::Done;
                    }
                }
                n
            }
        };
        self.wire_bytes += n as u64;
        Ok(n)
    }
}

impl HtmlSniff {
    /// Feed the next bytes of the body; true once `</html>` has been seen.
    fn observe(&mut self, chunk: &[u8]) -> bool {
        match self {
            HtmlSniff::NotHtml => false,
            HtmlSniff::Pending => {
                if !contains_ignore_case(chunk, HTML_OPEN) {
                    *self = HtmlSniff::NotHtml;
                    return false;
                }
                *self = HtmlSniff::Html { tail: Vec::new() };
                self.observe(chunk)
            }
            HtmlSniff::Html { tail } => {
                let mut window = std::mem::take(tail);
                window.extend_from_slice(chunk);
                if contains_ignore_case(&window, HTML_CLOSE) {
                    return true;
                }
                let keep = HTML_CLOSE.len() - 1;
                let start = window.len().saturating_sub(keep);
                *tail = window.split_off(start);
                false
            }
        }
    }
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}

enum Decoded<'a, S> {
    Plain(FramedReader<'a, S>),
    Gzip(GzDecoder<BufReader<FramedReader<'a, S>>>),
    Zlib(ZlibDecoder<BufReader<FramedReader<'a, S>>>),
    Deflate(DeflateDecoder<BufReader<FramedReader<'a, S>>>),
}

/// A message body, decompressed when the server sent it encoded.
///
/// Single pass: once it returns 0 the message boundary has been reached.
pub struct BodyReader<'a, S> {
    inner: Decoded<'a, S>,
    finished: bool,
}

impl<'a, S: Read> BodyReader<'a, S> {
    pub fn new(
        reader: &'a mut LineReader<S>,
        framing: Framing,
        encoding: ContentEncoding,
    ) -> io::Result<Self> {
        // The heuristic only applies to bytes as they arrive, never to compressed data.
        let sniff_html = encoding == ContentEncoding::Identity;
        let framed = FramedReader::new(reader, framing, sniff_html);
        let inner = if framed.is_done() {
            Decoded::Plain(framed)
        } else {
            match encoding {
                ContentEncoding::Identity => Decoded::Plain(framed),
                ContentEncoding::Gzip => Decoded::Gzip(GzDecoder::new(BufReader::new(framed))),
                ContentEncoding::Deflate => {
                    let mut buffered = BufReader::new(framed);
                    if is_zlib_header(buffered.fill_buf()?) {
                        Decoded::Zlib(ZlibDecoder::new(buffered))
                    } else {
                        Decoded::Deflate(DeflateDecoder::new(buffered))
                    }
                }
            }
        };
        Ok(Self {
            inner,
            finished: false,
        })
    }

    fn framed(&self) -> &FramedReader<'a, S> {
        match &self.inner {
            Decoded::Plain(r) => r,
            Decoded::Gzip(d) => d.get_ref().get_ref(),
            Decoded::Zlib(d) => d.get_ref().get_ref(),
            Decoded::Deflate(d) => d.get_ref().get_ref(),
        }
    }

    fn framed_mut(&mut self) -> &mut FramedReader<'a, S> {
        match &mut self.inner {
            Decoded::Plain(r) => r,
            Decoded::Gzip(d) => d.get_mut().get_mut(),
            Decoded::Zlib(d) => d.get_mut().get_mut(),
            Decoded::Deflate(d) => d.get_mut().get_mut(),
        }
    }

    /// Compressed (wire) bytes consumed so far.
    pub fn wire_bytes(&self) -> u64 {
        self.framed().wire_bytes()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<S: Read> Read for BodyReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished || buf.is_empty() {
            return Ok(0);
        }
        let n = match &mut self.inner {
            Decoded::Plain(r) => r.read(buf)?,
            Decoded::Gzip(d) => d.read(buf)?,
            Decoded::Zlib(d) => d.read(buf)?,
            Decoded::Deflate(d) => d.read(buf)?,
        };
        if n == 0 {
            self.framed_mut().drain()?;
            self.finished = true;
        }
        Ok(n)
    }
}

fn is_zlib_header(bytes: &[u8]) -> bool {
    match bytes {
        [cmf, flg, ..] => cmf & 0x0f == 8 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

/// Copy a body into `out`, reporting download progress after every chunk.
///
/// Read failures are tagged with `host`; write failures are local I/O errors.
pub(crate) fn copy_body<S: Read, W: Write + ?Sized>(
    body: &mut BodyReader<'_, S>,
    out: &mut W,
    host: &str,
    total_bytes: Option<u64>,
    progress: Option<&DownloadCallback>,
) -> Result<u64, NetError> {
    let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => return Ok(written),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(host, e)),
        };
        out.write_all(&buf[..n])?;
        written += n as u64;
        if let Some(callback) = progress {
            callback(DownloadProgress {
                bytes_received: body.wire_bytes(),
                total_bytes,
            });
        }
    }
}
