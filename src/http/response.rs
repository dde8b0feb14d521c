//! HTTP response head parsing and body access.
//!
//! [`HttpResponse`] is the parsed head of the last response: status, headers,
//! cookies and the fields derived from them. It outlives the call that
//! produced it and is kept by the client. [`Response`] is the view returned by
//! a call; it borrows the client so the body can be streamed off the
//! connection exactly once.

use crate::base::neterror::NetError;
use crate::cookies::jar::CookieJar;
use crate::cookies::setcookie::SetCookie;
use crate::http::charset::Charset;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::progress::DownloadCallback;
use crate::http::reader::LineReader;
use crate::http::responsebody::{copy_body, read_error, BodyReader, ContentEncoding, Framing};
use bytes::Bytes;
use http::{Method, StatusCode, Version};
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::ops::Deref;
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;
use url::Url;

/// Parsed response head plus the state of its body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: OrderedHeaderMap,
    cookies: CookieJar,
    raw_cookies: CookieJar,
    address: Url,
    method: Method,
    redirect_address: Option<Url>,
    charset: Charset,
    content_length: Option<u64>,
    content_type: String,
    keep_alive_timeout: Option<Duration>,
    maximum_keep_alive_requests: Option<u32>,
    connection_close: bool,
    framing: Framing,
    pub(crate) has_error: bool,
    pub(crate) message_body_loaded: bool,
    pub(crate) reconnect_count: u32,
}

/// What the head parser needs to know about the request.
pub(crate) struct HeadContext<'a> {
    pub method: &'a Method,
    pub address: &'a Url,
    /// Charset used when the response declares none.
    pub charset: Option<Charset>,
    /// The client's jar; responses write into it unless it is locked.
    pub cookies: &'a mut CookieJar,
}

impl HttpResponse {
    /// Read the status line and headers off `reader`.
    ///
    /// Blank lines before the status line are skipped. A stream that ends
    /// before any status line is an [`NetError::EmptyResponse`].
    pub(crate) fn read_head<S: Read>(
        reader: &mut LineReader<S>,
        ctx: HeadContext<'_>,
    ) -> Result<Self, NetError> {
        let host = ctx.address.host_str().unwrap_or_default();

        let status_line = loop {
            match reader.read_line().map_err(|e| read_error(host, e))? {
                None => {
                    return Err(NetError::EmptyResponse {
                        host: host.to_string(),
                    })
                }
                Some(line) if line.is_empty() => continue,
                Some(line) => break line,
            }
        };
        tracing::trace!(host = %host, line = %status_line, "status line");
        let (version, status) = parse_status_line(&status_line).ok_or_else(|| {
            NetError::MalformedStatusLine {
                host: host.to_string(),
                line: status_line.clone(),
            }
        })?;

        let mut headers = OrderedHeaderMap::new();
        let mut raw_cookies = CookieJar::new();
        let mut own_cookies = ctx.cookies.is_locked().then(CookieJar::new);
        let now = OffsetDateTime::now_utc();
        loop {
            let line = match reader.read_line().map_err(|e| read_error(host, e))? {
                Some(line) if line.is_empty() => break,
                Some(line) => line,
                None => {
                    return Err(read_error(
                        host,
                        io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed inside the headers"),
                    ))
                }
            };
            let Some((name, value)) = line.split_once(':') else {
                return Err(NetError::MalformedHeader {
                    host: host.to_string(),
                    line,
                });
            };
            let value = value.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));

            if name.trim().eq_ignore_ascii_case("Set-Cookie") {
                if value.is_empty() {
                    continue;
                }
                let cookie = SetCookie::parse(value, now).ok_or_else(|| NetError::MalformedCookie {
                    host: host.to_string(),
                    value: value.to_string(),
                })?;
                let jar = match own_cookies.as_mut() {
                    Some(jar) => jar,
                    None => &mut *ctx.cookies,
                };
                cookie.apply(jar, &mut raw_cookies);
            } else {
                headers.insert_unchecked(name.trim(), value);
            }
        }

        let cookies = own_cookies.unwrap_or_else(|| ctx.cookies.clone());
        Ok(Self::from_parts(
            status,
            version,
            headers,
            cookies,
            raw_cookies,
            ctx.method.clone(),
            ctx.address.clone(),
            ctx.charset,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn from_parts(
        status: StatusCode,
        version: Version,
        headers: OrderedHeaderMap,
        cookies: CookieJar,
        raw_cookies: CookieJar,
        method: Method,
        address: Url,
        charset_override: Option<Charset>,
    ) -> Self {
        let redirect_address = headers
            .get("Location")
            .or_else(|| headers.get("Redirect-Location"))
            .filter(|location| !location.is_empty())
            .and_then(|location| address.join(location).ok());

        let charset = headers
            .get("Content-Type")
            .and_then(Charset::from_content_type)
            .or(charset_override)
            .unwrap_or_default();

        let content_length = headers
            .get("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok());

        let content_type = headers
            .get("Content-Type")
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_string())
            .unwrap_or_default();

        let keep_alive = headers.get("Keep-Alive");
        let keep_alive_timeout = keep_alive
            .and_then(|v| keep_alive_param(v, "timeout"))
            .map(Duration::from_secs);
        let maximum_keep_alive_requests = keep_alive
            .and_then(|v| keep_alive_param(v, "max"))
            .and_then(|v| u32::try_from(v).ok());

        let connection_close = has_token(headers.get("Connection"), "close")
            || has_token(headers.get("Proxy-Connection"), "close")
            || (version == Version::HTTP_10 && !has_token(headers.get("Connection"), "keep-alive"));

        let framing = Framing::for_response(&method, status, &headers, content_length);

        Self {
            status,
            version,
            headers,
            cookies,
            raw_cookies,
            address,
            method,
            redirect_address,
            charset,
            content_length,
            content_type,
            keep_alive_timeout,
            maximum_keep_alive_requests,
            connection_close,
            framing,
            has_error: false,
            message_body_loaded: framing == Framing::Empty,
            reconnect_count: 0,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    /// Header value by name, ignoring case. `Set-Cookie` is never stored here.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn headers(&self) -> &OrderedHeaderMap {
        &self.headers
    }

    pub fn contains_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// The cookie jar after this response was applied.
    ///
    /// When the client's jar is unlocked this is a snapshot of it; when it is
    /// locked, only the cookies this response set.
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// `Set-Cookie` values exactly as received, keyed by cookie name.
    pub fn raw_cookies(&self) -> &CookieJar {
        &self.raw_cookies
    }

    pub fn contains_cookie(&self, name: &str) -> bool {
        self.cookies.contains(name)
    }

    pub fn raw_cookie(&self, name: &str) -> Option<&str> {
        self.raw_cookies.get(name)
    }

    /// Declared `Content-Length`; `None` when absent or not a number.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Media type without parameters, or empty.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Raw `Location` (or `Redirect-Location`) header value.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get("Location")
            .or_else(|| self.headers.get("Redirect-Location"))
    }

    /// The redirect target resolved against [`address`](Self::address).
    pub fn redirect_address(&self) -> Option<&Url> {
        self.redirect_address.as_ref()
    }

    /// A 3xx status or a redirect header.
    pub fn has_redirect(&self) -> bool {
        self.status.is_redirection() || self.redirect_address.is_some()
    }

    /// The address that was requested.
    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Idle timeout the server advertised with `Keep-Alive: timeout=`.
    pub fn keep_alive_timeout(&self) -> Option<Duration> {
        self.keep_alive_timeout
    }

    /// Request budget the server advertised with `Keep-Alive: max=`.
    pub fn maximum_keep_alive_requests(&self) -> Option<u32> {
        self.maximum_keep_alive_requests
    }

    /// Receiving this response (head or body) failed part way.
    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// The body was read or discarded, or there never was one.
    pub fn message_body_loaded(&self) -> bool {
        self.message_body_loaded
    }

    /// Reconnects spent producing this response.
    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// The server asked to close the connection after this response.
    pub fn connection_close(&self) -> bool {
        self.connection_close
    }

    /// The connection may carry another request once the body is consumed.
    pub(crate) fn allows_reuse(&self) -> bool {
        !self.has_error && !self.connection_close && self.framing.is_reusable()
    }
}

fn parse_status_line(line: &str) -> Option<(Version, StatusCode)> {
    let rest = line.strip_prefix("HTTP/")?;
    let mut parts = rest.splitn(3, ' ');
    let version = match parts.next()? {
        "0.9" => Version::HTTP_09,
        "1.0" => Version::HTTP_10,
        "1.1" => Version::HTTP_11,
        "2" | "2.0" => Version::HTTP_2,
        _ => return None,
    };
    let code = parts.next()?.trim().parse::<u16>().ok()?;
    Some((version, StatusCode::from_u16(code).ok()?))
}

/// A numeric `name=value` parameter of a `Keep-Alive` header.
fn keep_alive_param(header: &str, name: &str) -> Option<u64> {
    header.split([',', ';']).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case(name) {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn has_token(header: Option<&str>, token: &str) -> bool {
    header.is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case(token)))
}

/// The result of a call, with its body still on the connection.
///
/// Derefs to [`HttpResponse`] for the head. The body can be taken once with
/// one of the sinks; later calls return an empty result.
pub struct Response<'a, S = crate::socket::stream::StreamSocket> {
    head: &'a mut HttpResponse,
    conn: Option<&'a mut LineReader<S>>,
    progress: Option<&'a DownloadCallback>,
}

impl<'a, S: Read> Response<'a, S> {
    pub(crate) fn new(
        head: &'a mut HttpResponse,
        conn: Option<&'a mut LineReader<S>>,
        progress: Option<&'a DownloadCallback>,
    ) -> Self {
        Self {
            head,
            conn,
            progress,
        }
    }

    fn host(&self) -> String {
        self.head.address.host_str().unwrap_or_default().to_string()
    }

    /// Stream the body into `out`. Returns the decoded byte count.
    fn copy_to<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64, NetError> {
        if self.head.message_body_loaded {
            return Ok(0);
        }
        self.head.message_body_loaded = true;
        let host = self.host();
        let Some(conn) = self.conn.as_deref_mut() else {
            return Ok(0);
        };

        let result = ContentEncoding::parse(self.head.header("Content-Encoding"))
            .map_err(|encoding| NetError::UnsupportedEncoding {
                host: host.clone(),
                encoding,
            })
            .and_then(|encoding| {
                let mut body = BodyReader::new(conn, self.head.framing, encoding)
                    .map_err(|e| read_error(&host, e))?;
                copy_body(&mut body, out, &host, self.head.content_length, self.progress)
            });
        if result.is_err() {
            self.head.has_error = true;
        }
        result
    }

    /// The whole body in memory.
    pub fn bytes(&mut self) -> Result<Bytes, NetError> {
        let mut out = Vec::with_capacity(initial_capacity(self.head.content_length));
        self.copy_to(&mut out)?;
        Ok(Bytes::from(out))
    }

    /// The body decoded with the response charset.
    pub fn text(&mut self) -> Result<String, NetError> {
        let bytes = self.bytes()?;
        Ok(self.head.charset.decode(&bytes))
    }

    /// Write the body to a file, creating or truncating it.
    pub fn to_file(&mut self, path: impl AsRef<Path>) -> Result<u64, NetError> {
        if self.head.message_body_loaded {
            return Ok(0);
        }
        let mut file = BufWriter::new(File::create(path)?);
        let written = self.copy_to(&mut file)?;
        file.flush()?;
        Ok(written)
    }

    /// The body as a forward-only in-memory stream.
    pub fn to_memory_stream(&mut self) -> Result<Cursor<Vec<u8>>, NetError> {
        Ok(Cursor::new(self.bytes()?.to_vec()))
    }

    /// Discard the body so the connection can be reused.
    ///
    /// When the server asked to close the connection nothing is read.
    pub fn none(&mut self) -> Result<(), NetError> {
        if self.head.connection_close {
            self.head.message_body_loaded = true;
            return Ok(());
        }
        self.copy_to(&mut io::sink()).map(|_| ())
    }

    /// Deserialize a JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T, NetError> {
        let bytes = self.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl<S> Deref for Response<'_, S> {
    type Target = HttpResponse;

    fn deref(&self) -> &HttpResponse {
        &*self.head
    }
}

fn initial_capacity(content_length: Option<u64>) -> usize {
    const MAX_PREALLOCATION: u64 = 1 << 20;
    content_length.map_or(0, |len| len.min(MAX_PREALLOCATION) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn parse(wire: &[u8], jar: &mut CookieJar) -> (Result<HttpResponse, NetError>, LineReader<Cursor<Vec<u8>>>) {
        parse_with(wire, jar, &Method::GET)
    }

    fn parse_with(
        wire: &[u8],
        jar: &mut CookieJar,
        method: &Method,
    ) -> (Result<HttpResponse, NetError>, LineReader<Cursor<Vec<u8>>>) {
        let address = Url::parse("http://example.com/dir/page").unwrap();
        let mut reader = LineReader::new(Cursor::new(wire.to_vec()));
        let head = HttpResponse::read_head(
            &mut reader,
            HeadContext {
                method,
                address: &address,
                charset: None,
                cookies: jar,
            },
        );
        (head, reader)
    }

    #[test]
    fn test_status_line_and_headers() {
        let mut jar = CookieJar::new();
        let wire = b"\r\nHTTP/1.1 200 OK\r\nContent-Type: text/html; charset=ISO-8859-1\r\nX-Test:  spaced  \r\nx-test: again\r\nContent-Length: 3\r\n\r\nabc";
        let (head, _) = parse(wire, &mut jar);
        let head = head.unwrap();

        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.header("X-TEST"), Some("again"));
        assert_eq!(head.content_type(), "text/html");
        assert_eq!(head.charset(), Charset::Latin1);
        assert_eq!(head.content_length(), Some(3));
        assert_eq!(head.framing(), Framing::Fixed(3));
        assert!(head.is_ok());
        assert!(!head.message_body_loaded());
    }

    #[test]
    fn test_status_without_reason() {
        let mut jar = CookieJar::new();
        let (head, _) = parse(b"HTTP/1.0 404\r\n\r\n", &mut jar);
        let head = head.unwrap();
        assert_eq!(head.status(), StatusCode::NOT_FOUND);
        assert!(head.connection_close());
    }

    #[test]
    fn test_empty_and_malformed_status() {
        let mut jar = CookieJar::new();
        let (head, _) = parse(b"", &mut jar);
        assert!(head.unwrap_err().is_empty_response());

        let (head, _) = parse(b"HTTP/1.1\r\n\r\n", &mut jar);
        assert!(matches!(head.unwrap_err(), NetError::MalformedStatusLine { .. }));

        let (head, _) = parse(b"SSH-2.0-OpenSSH\r\n", &mut jar);
        assert!(matches!(head.unwrap_err(), NetError::MalformedStatusLine { .. }));
    }

    #[test]
    fn test_malformed_header() {
        let mut jar = CookieJar::new();
        let (head, _) = parse(b"HTTP/1.1 200 OK\r\nno separator\r\n\r\n", &mut jar);
        match head.unwrap_err() {
            NetError::MalformedHeader { line, host } => {
                assert_eq!(line, "no separator");
                assert_eq!(host, "example.com");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_set_cookie_updates_client_jar() {
        let mut jar: CookieJar = [("a", "old"), ("keep", "1")].into_iter().collect();
        let wire = b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1; expires=Mon, 01 Jan 2001 00:00:00 GMT\r\nSet-Cookie: b=2; Path=/\r\nContent-Length: 0\r\n\r\n";
        let (head, _) = parse(wire, &mut jar);
        let head = head.unwrap();

        assert!(!jar.contains("a"));
        assert_eq!(jar.get("b"), Some("2"));
        assert_eq!(jar.get("keep"), Some("1"));
        assert!(!head.contains_header("Set-Cookie"));
        assert_eq!(head.cookies(), &jar);
        assert_eq!(head.raw_cookie("b"), Some("b=2; Path=/"));
    }

    #[test]
    fn test_locked_jar_is_untouched() {
        let mut jar = CookieJar::locked();
        jar.insert("a", "1");
        let wire = b"HTTP/1.1 200 OK\r\nSet-Cookie: b=2\r\n\r\n";
        let (head, _) = parse(wire, &mut jar);
        let head = head.unwrap();

        assert!(!jar.contains("b"));
        assert_eq!(head.cookies().get("b"), Some("2"));
        assert!(!head.contains_cookie("a"));
    }

    #[test]
    fn test_malformed_cookie() {
        let mut jar = CookieJar::new();
        let (head, _) = parse(b"HTTP/1.1 200 OK\r\nSet-Cookie: broken\r\n\r\n", &mut jar);
        assert!(matches!(head.unwrap_err(), NetError::MalformedCookie { .. }));
    }

    #[test]
    fn test_redirect_and_keep_alive_fields() {
        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 302 Found\r\nLocation: ../other?q=1\r\nKeep-Alive: timeout=5, max=7\r\nContent-Length: oops\r\n\r\n";
        let (head, _) = parse(wire, &mut jar);
        let head = head.unwrap();

        assert!(head.has_redirect());
        assert_eq!(head.location(), Some("../other?q=1"));
        assert_eq!(
            head.redirect_address().map(Url::as_str),
            Some("http://example.com/other?q=1")
        );
        assert_eq!(head.keep_alive_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(head.maximum_keep_alive_requests(), Some(7));
        assert_eq!(head.content_length(), None);
        assert_eq!(head.framing(), Framing::CloseDelimited);
        assert!(!head.allows_reuse());
    }

    #[test]
    fn test_redirect_location_header() {
        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 200 OK\r\nRedirect-Location: /next\r\nContent-Length: 0\r\n\r\n";
        let (head, _) = parse(wire, &mut jar);
        let head = head.unwrap();
        assert!(head.has_redirect());
        assert_eq!(head.redirect_address().map(Url::path), Some("/next"));
    }

    #[test]
    fn test_head_request_has_no_body() {
        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n";
        let (head, _) = parse_with(wire, &mut jar, &Method::HEAD);
        let head = head.unwrap();
        assert_eq!(head.framing(), Framing::Empty);
        assert!(head.message_body_loaded());
        assert!(head.allows_reuse());
    }

    #[test]
    fn test_body_is_taken_once() {
        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let (head, mut reader) = parse(wire, &mut jar);
        let mut head = head.unwrap();

        let mut response = Response::new(&mut head, Some(&mut reader), None);
        assert_eq!(response.text().unwrap(), "hello");
        assert!(response.message_body_loaded());
        assert!(response.bytes().unwrap().is_empty());
        assert!(response.text().unwrap().is_empty());
    }

    #[test]
    fn test_gzip_body_sink() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"ok\":true}").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut wire = format!(
            "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\n\r\n",
            compressed.len()
        )
        .into_bytes();
        wire.extend_from_slice(&compressed);

        let mut jar = CookieJar::new();
        let (head, mut reader) = parse(&wire, &mut jar);
        let mut head = head.unwrap();
        let mut response = Response::new(&mut head, Some(&mut reader), None);
        let mut stream = response.to_memory_stream().unwrap();
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[test]
    fn test_unsupported_encoding_marks_error() {
        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 200 OK\r\nContent-Encoding: br\r\nContent-Length: 2\r\n\r\nxx";
        let (head, mut reader) = parse(wire, &mut jar);
        let mut head = head.unwrap();
        let mut response = Response::new(&mut head, Some(&mut reader), None);
        assert!(matches!(
            response.bytes().unwrap_err(),
            NetError::UnsupportedEncoding { .. }
        ));
        assert!(response.has_error());
        assert!(!response.allows_reuse());
    }

    #[test]
    fn test_none_discards_body() {
        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n";
        let (head, mut reader) = parse(wire, &mut jar);
        let mut head = head.unwrap();
        Response::new(&mut head, Some(&mut reader), None).none().unwrap();
        assert!(head.message_body_loaded());
        assert!(head.allows_reuse());

        let address = Url::parse("http://example.com/").unwrap();
        let next = HttpResponse::read_head(
            &mut reader,
            HeadContext {
                method: &Method::GET,
                address: &address,
                charset: None,
                cookies: &mut jar,
            },
        );
        assert_eq!(next.unwrap().status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_to_file() {
        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ndata";
        let (head, mut reader) = parse(wire, &mut jar);
        let mut head = head.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let written = Response::new(&mut head, Some(&mut reader), None)
            .to_file(&path)
            .unwrap();
        assert_eq!(written, 4);
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_body() {
        #[derive(serde::Deserialize)]
        struct Payload {
            id: u32,
        }

        let mut jar = CookieJar::new();
        let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\n{\"id\":42}";
        let (head, mut reader) = parse(wire, &mut jar);
        let mut head = head.unwrap();
        let payload: Payload = Response::new(&mut head, Some(&mut reader), None)
            .json()
            .unwrap();
        assert_eq!(payload.id, 42);
    }

    #[test]
    fn test_keep_alive_param() {
        assert_eq!(keep_alive_param("timeout=15, max=100", "timeout"), Some(15));
        assert_eq!(keep_alive_param("timeout=15, max=100", "MAX"), Some(100));
        assert_eq!(keep_alive_param("max=abc", "max"), None);
    }
}
