//! Request body for POST/PUT/DELETE operations.
//!
//! Every variant knows its exact byte length before it is written, so the
//! request can always be framed with `Content-Length`.

use crate::http::charset::Charset;
use crate::http::multipart::Form;
use crate::http::params::{determine_media_type, RequestParams};
use bytes::Bytes;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Buffer size used when streaming files and readers.
pub const COPY_BUFFER_SIZE: usize = 32768;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";

/// A seekable source that can be re-sent on retry.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Request body for HTTP methods that send data.
pub enum RequestBody {
    /// In-memory bytes: raw data, encoded text or a URL-encoded form.
    Bytes { data: Bytes, content_type: String },
    /// A file opened lazily when the body is written.
    File { path: PathBuf, content_type: String },
    /// A seekable stream, rewound to `start` before every write.
    Stream {
        reader: Box<dyn ReadSeek>,
        start: u64,
        len: u64,
        content_type: String,
    },
    /// `multipart/form-data`.
    Multipart(Form),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Bytes { data, content_type } => f
                .debug_struct("Bytes")
                .field("len", &data.len())
                .field("content_type", content_type)
                .finish(),
            RequestBody::File { path, content_type } => f
                .debug_struct("File")
                .field("path", path)
                .field("content_type", content_type)
                .finish(),
            RequestBody::Stream {
                start,
                len,
                content_type,
                ..
            } => f
                .debug_struct("Stream")
                .field("start", start)
                .field("len", len)
                .field("content_type", content_type)
                .finish(),
            RequestBody::Multipart(form) => f.debug_tuple("Multipart").field(form).finish(),
        }
    }
}

impl RequestBody {
    /// Raw bytes sent as `application/octet-stream`.
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        RequestBody::Bytes {
            data: data.into(),
            content_type: OCTET_STREAM.to_string(),
        }
    }

    /// `count` bytes of `data` starting at `offset`.
    pub fn bytes_range(data: impl Into<Bytes>, offset: usize, count: usize) -> io::Result<Self> {
        let data = data.into();
        let end = offset
            .checked_add(count)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "byte range out of bounds")
            })?;
        Ok(Self::bytes(data.slice(offset..end)))
    }

    /// Text encoded with `charset`, sent as `text/plain`.
    pub fn text(text: &str, charset: Charset) -> Self {
        RequestBody::Bytes {
            data: Bytes::from(charset.encode(text)),
            content_type: "text/plain".to_string(),
        }
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn form(params: &RequestParams, dont_escape: bool, charset: Charset) -> Self {
        RequestBody::Bytes {
            data: Bytes::from(params.to_post_query_string(dont_escape, charset)),
            content_type: FORM_URL_ENCODED.to_string(),
        }
    }

    /// A file; the media type is taken from its extension.
    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let content_type = determine_media_type(extension).to_string();
        RequestBody::File { path, content_type }
    }

    /// The remainder of `reader` from its current position.
    pub fn stream<R: ReadSeek + 'static>(mut reader: R) -> io::Result<Self> {
        let start = reader.stream_position()?;
        let end = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(start))?;
        Ok(RequestBody::Stream {
            reader: Box::new(reader),
            start,
            len: end.saturating_sub(start),
            content_type: OCTET_STREAM.to_string(),
        })
    }

    pub fn multipart(form: Form) -> Self {
        RequestBody::Multipart(form)
    }

    /// Override the media type.
    pub fn with_content_type(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        match &mut self {
            RequestBody::Bytes { content_type, .. }
            | RequestBody::File { content_type, .. }
            | RequestBody::Stream { content_type, .. } => *content_type = mime,
            RequestBody::Multipart(_) => {}
        }
        self
    }

    pub fn content_type(&self) -> String {
        match self {
            RequestBody::Bytes { content_type, .. }
            | RequestBody::File { content_type, .. }
            | RequestBody::Stream { content_type, .. } => content_type.clone(),
            RequestBody::Multipart(form) => form.content_type(),
        }
    }

    /// Exact number of bytes [`write_to`](Self::write_to) will produce.
    pub fn content_length(&self) -> io::Result<u64> {
        match self {
            RequestBody::Bytes { data, .. } => Ok(data.len() as u64),
            RequestBody::File { path, .. } => Ok(std::fs::metadata(path)?.len()),
            RequestBody::Stream { len, .. } => Ok(*len),
            RequestBody::Multipart(form) => form.content_length(),
        }
    }

    /// Serialize the body. Streams rewind first, so a retry sends the same bytes.
    pub fn write_to<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<()> {
        match self {
            RequestBody::Bytes { data, .. } => out.write_all(data),
            RequestBody::File { path, .. } => {
                let file = File::open(&*path)?;
                copy_buffered(file, out)
            }
            RequestBody::Stream {
                reader, start, len, ..
            } => {
                reader.seek(SeekFrom::Start(*start))?;
                let copied = copy_buffered_counted(Read::take(&mut **reader, *len), out)?;
                if copied != *len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream shrank while it was being sent",
                    ));
                }
                Ok(())
            }
            RequestBody::Multipart(form) => form.write_to(out),
        }
    }

    /// Write the body as exactly `len` bytes, the value sent as `Content-Length`.
    ///
    /// A source that changed size since `len` was taken (a file that grew or
    /// shrank) fails instead of breaking the message framing.
    pub fn write_framed<W: Write + ?Sized>(&mut self, out: &mut W, len: u64) -> io::Result<()> {
        let mut framed = FramedWriter {
            inner: out,
            remaining: len,
        };
        self.write_to(&mut framed)?;
        if framed.remaining != 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "request body is shorter than its Content-Length",
            ));
        }
        Ok(())
    }
}

/// Passes through at most `remaining` bytes and rejects anything beyond.
struct FramedWriter<'a, W: Write + ?Sized> {
    inner: &'a mut W,
    remaining: u64,
}

impl<W: Write + ?Sized> Write for FramedWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request body is longer than its Content-Length",
            ));
        }
        let allowed = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.inner.write(&buf[..allowed])?;
        self.remaining -= n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::text(&s, Charset::Utf8)
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::text(s, Charset::Utf8)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::bytes(v)
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::bytes(b)
    }
}

impl From<Form> for RequestBody {
    fn from(form: Form) -> Self {
        RequestBody::Multipart(form)
    }
}

fn copy_buffered<R: Read, W: Write + ?Sized>(reader: R, out: &mut W) -> io::Result<()> {
    copy_buffered_counted(reader, out).map(|_| ())
}

fn copy_buffered_counted<R: Read, W: Write + ?Sized>(mut reader: R, out: &mut W) -> io::Result<u64> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
}
