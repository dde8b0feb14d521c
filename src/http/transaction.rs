//! One logical request: connect or reuse, send, receive.
//!
//! An attempt runs through these states:
//!
//! 1. Drain the previous response if its body was left on the connection.
//! 2. Pick the proxy for the destination.
//! 3. Reuse the keep-alive connection or open a new one (tunnel and TLS included).
//! 4. Send the start line, headers and body.
//! 5. Read the response head.
//!
//! A failed attempt closes the connection. It is retried while the reconnect
//! budget lasts; an empty response on a reused connection is retried once
//! more for free, since the server most likely dropped the idle connection.

use crate::base::context::IoResultExt;
use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::client::ClientConfig;
use crate::cookies::jar::CookieJar;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::progress::{ProgressWriter, UploadCallback};
use crate::http::requestbody::RequestBody;
use crate::http::response::{HeadContext, HttpResponse, Response};
use crate::http::retry::RetryReason;
use crate::socket::connectjob::{self, ConnectJob};
use crate::socket::keepalive::{ConnectionKey, ConnectionManager};
use crate::socket::proxy::http::{basic_authorization, proxy_authorization};
use crate::socket::proxy::{ProxyClient, ProxyEndpoint};
use http::Method;
use std::io::{self, Write};
use url::{Position, Url};

/// Methods that carry a request body.
pub fn can_contain_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::DELETE
}

/// The client state a transaction works on.
pub(crate) struct HttpTransaction<'a> {
    pub config: &'a ClientConfig,
    /// Headers set on the client for every request.
    pub headers: &'a OrderedHeaderMap,
    /// Headers for this call only; dropped on redirect.
    pub oneshot_headers: Option<&'a OrderedHeaderMap>,
    pub cookies: &'a mut CookieJar,
    pub connections: &'a mut ConnectionManager,
    pub last: &'a mut Option<HttpResponse>,
    pub load_state: &'a mut LoadState,
    pub upload_progress: Option<&'a UploadCallback>,
}

/// A failed attempt and whether it ran on a reused connection.
struct AttemptError {
    error: NetError,
    reused: bool,
}

impl From<NetError> for AttemptError {
    fn from(error: NetError) -> Self {
        Self {
            error,
            reused: false,
        }
    }
}

impl HttpTransaction<'_> {
    /// Run the request until a response head arrives or the retry budget is
    /// spent. The head is stored in `last`; its body stays on the connection.
    pub fn start(
        &mut self,
        method: &Method,
        url: &Url,
        mut body: Option<&mut RequestBody>,
    ) -> Result<(), NetError> {
        let mut reconnects = 0u32;
        let mut keep_alive_retried = false;

        loop {
            match self.attempt(method, url, body.as_deref_mut()) {
                Ok(mut head) => {
                    head.reconnect_count = reconnects;
                    *self.last = Some(head);
                    break;
                }
                Err(AttemptError { error, reused }) => {
                    self.connections.dispose();
                    *self.last = None;

                    if RetryReason::from_error(&error).is_some()
                        && self.config.reconnect.should_retry(reconnects)
                    {
                        reconnects += 1;
                        tracing::debug!(host = %host_of(url), attempt = reconnects, error = %error, "reconnecting");
                        std::thread::sleep(self.config.reconnect.delay);
                        continue;
                    }
                    if reused
                        && error.is_empty_response()
                        && self.config.keep_alive.enabled
                        && !keep_alive_retried
                    {
                        keep_alive_retried = true;
                        tracing::debug!(host = %host_of(url), "keep-alive connection dropped by server, retrying");
                        continue;
                    }
                    *self.load_state = LoadState::Idle;
                    return Err(error);
                }
            }
        }

        *self.load_state = LoadState::ReadingResponse;
        if let Some(head) = self.last.as_ref() {
            let status = head.status();
            if !self.config.ignore_protocol_errors
                && (status.is_client_error() || status.is_server_error())
            {
                return Err(NetError::HttpStatus {
                    host: host_of(url).to_string(),
                    status,
                });
            }
        }
        Ok(())
    }

    fn attempt(
        &mut self,
        method: &Method,
        url: &Url,
        body: Option<&mut RequestBody>,
    ) -> Result<HttpResponse, AttemptError> {
        self.close_if_stale();

        *self.load_state = LoadState::ResolvingProxyForUrl;
        let proxy = self.resolve_proxy(url)?;
        let key = ConnectionKey::new(url, proxy.as_ref())
            .ok_or(NetError::InvalidUrl(url::ParseError::EmptyHost))?;

        let body = body.filter(|_| can_contain_body(method));
        let content = match &body {
            Some(b) => Some((b.content_length().map_err(NetError::Io)?, b.content_type())),
            None if can_contain_body(method) => Some((0, String::new())),
            None => None,
        };
        let previous_ok = self.last.as_ref().is_some_and(HttpResponse::allows_reuse);
        *self.load_state = if proxy.is_some() {
            LoadState::EstablishingProxyTunnel
        } else {
            LoadState::Connecting
        };
        let config = self.config;
        let (forwarding, reused) = {
            let (conn, reused) =
                self.connections
                    .acquire(key, &config.keep_alive, previous_ok, |key| {
                        ConnectJob {
                            host: key.host(),
                            port: key.port(),
                            secure: key.is_secure(),
                            proxy: proxy.as_ref(),
                            connect_timeout: config.connect_timeout,
                            read_write_timeout: config.read_write_timeout,
                            tls: &config.tls,
                        }
                        .connect()
                    })?;
            (conn.is_forwarding(), reused)
        };

        // The request form follows the route the connection actually took,
        // which for a shuffled chain is only known once it is open.
        let head = self.compose_head(method, url, proxy.as_ref(), forwarding, content.as_ref());
        let content_length = content.map_or(0, |(len, _)| len);

        let host = host_of(url);
        let conn = self.connections.current().ok_or_else(|| AttemptError {
            error: NetError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection closed before sending",
            )),
            reused,
        })?;
        *self.load_state = LoadState::SendingRequest;
        tracing::trace!(host = %host, request = %head.lines().next().unwrap_or_default(), "sending request");
        send(
            conn.reader().get_mut(),
            &head,
            body,
            content_length,
            config.send_buffer_size,
            self.upload_progress,
        )
        .send_context(host)
        .map_err(|error| AttemptError { error, reused })?;

        *self.load_state = LoadState::WaitingForResponse;
        let response = HttpResponse::read_head(
            conn.reader(),
            HeadContext {
                method,
                address: url,
                charset: config.character_set,
                cookies: &mut *self.cookies,
            },
        )
        .map_err(|error| AttemptError { error, reused })?;

        self.connections.response_received(
            response.keep_alive_timeout(),
            response.maximum_keep_alive_requests(),
        );
        Ok(response)
    }

    /// Drain a body the caller left unread, so the connection can carry the
    /// next request. A connection that cannot be reused anyway is not drained.
    fn close_if_stale(&mut self) {
        if !self.connections.is_connected() {
            return;
        }
        let Some(head) = self.last.as_mut() else {
            return;
        };
        if head.has_error || head.message_body_loaded {
            return;
        }
        if !head.allows_reuse() {
            head.message_body_loaded = true;
            return;
        }
        let drained = Response::new(head, self.connections.reader(), None).none();
        if let Err(e) = drained {
            tracing::warn!(error = %e, "failed to drain previous response, dropping connection");
            self.connections.dispose();
        }
    }

    /// Per-client proxy, else the global one, else the provider's. Loopback
    /// destinations skip proxying when so configured.
    fn resolve_proxy(&self, url: &Url) -> Result<Option<ProxyClient>, NetError> {
        if self.config.disable_proxy_for_local_address
            && connectjob::resolves_to_loopback(host_of(url))?
        {
            return Ok(None);
        }
        let proxy = self
            .config
            .proxy
            .clone()
            .or_else(|| self.config.global_proxy.clone());
        if proxy.is_some() || !self.config.use_default_proxy {
            return Ok(proxy);
        }
        Ok(self
            .config
            .default_proxy_provider
            .as_ref()
            .and_then(|provider| provider.default_proxy()))
    }

    /// Start line and header block.
    ///
    /// Headers are merged lowest to highest priority: computed headers,
    /// client headers, then this call's headers. The cookie jar becomes the
    /// `Cookie` header unless one was set explicitly.
    ///
    /// `forwarding` says the connection ends at an HTTP proxy that takes
    /// plain requests: the target is then the absolute URI and the proxy
    /// headers replace `Connection`.
    fn compose_head(
        &self,
        method: &Method,
        url: &Url,
        proxy: Option<&ProxyClient>,
        forwarding: bool,
        content: Option<&(u64, String)>,
    ) -> String {
        let target = if forwarding {
            &url[..Position::AfterQuery]
        } else {
            &url[Position::BeforePath..Position::AfterQuery]
        };

        let mut headers = OrderedHeaderMap::new();
        let host = host_of(url);
        match url.port() {
            Some(port) => headers.insert_unchecked("Host", &format!("{host}:{port}")),
            None => headers.insert_unchecked("Host", host),
        }

        let connection = if self.config.keep_alive.enabled {
            "keep-alive"
        } else {
            "close"
        };
        if forwarding {
            headers.insert_unchecked("Proxy-Connection", connection);
            if let Some(auth) = proxy.and_then(forwarding_proxy).and_then(proxy_authorization) {
                headers.insert_unchecked("Proxy-Authorization", &auth);
            }
        } else {
            headers.insert_unchecked("Connection", connection);
        }

        if self.config.username.is_some() || self.config.password.is_some() {
            let auth = basic_authorization(
                self.config.username.as_deref().unwrap_or_default(),
                self.config.password.as_deref().unwrap_or_default(),
            );
            headers.insert_unchecked("Authorization", &auth);
        }

        if self.config.enable_encoding_content {
            headers.insert_unchecked("Accept-Encoding", "gzip,deflate");
        }
        if let Some(culture) = &self.config.culture {
            headers.insert_unchecked("Accept-Language", &language_header(culture));
        }
        if let Some(charset) = self.config.character_set {
            headers.insert_unchecked("Accept-Charset", &charset.accept_charset());
        }

        if let Some((length, content_type)) = content {
            if *length > 0 {
                headers.insert_unchecked("Content-Type", content_type);
            }
            headers.insert_unchecked("Content-Length", &length.to_string());
        }

        headers.extend_from(self.headers);
        if let Some(oneshot) = self.oneshot_headers {
            headers.extend_from(oneshot);
        }
        if !self.cookies.is_empty() && !headers.contains("Cookie") {
            headers.insert_unchecked("Cookie", &self.cookies.to_string());
        }

        let mut head = format!("{method} {target} HTTP/1.1\r\n");
        headers.write_to(&mut head);
        head.push_str("\r\n");
        head
    }
}

/// Write the request. Progress is reported in `chunk_size` slices over head and body.
fn send<W: Write>(
    stream: W,
    head: &str,
    body: Option<&mut RequestBody>,
    content_length: u64,
    chunk_size: usize,
    progress: Option<&UploadCallback>,
) -> io::Result<()> {
    let total = head.len() as u64 + content_length;
    let mut writer = ProgressWriter::new(stream, chunk_size, total, progress);
    writer.write_all(head.as_bytes())?;
    if let Some(body) = body {
        if content_length > 0 {
            body.write_framed(&mut writer, content_length)?;
        }
    }
    writer.flush()
}

/// The HTTP proxy whose credentials go into `Proxy-Authorization` when
/// plain requests are forwarded; for a chain, the hop picked by
/// [`ChainProxy::find_http_proxy`](crate::socket::proxy::ChainProxy::find_http_proxy).
fn forwarding_proxy(proxy: &ProxyClient) -> Option<&ProxyEndpoint> {
    match proxy {
        ProxyClient::Http(endpoint) => Some(endpoint),
        ProxyClient::Chain(chain) => chain.find_http_proxy(),
        _ => None,
    }
}

/// `xx-YY,xx;q=0.8,en-US;q=0.6,en;q=0.4`, or the bare culture for English.
fn language_header(culture: &str) -> String {
    if culture.starts_with("en") {
        return culture.to_string();
    }
    let language = culture.get(..2).unwrap_or(culture);
    format!("{culture},{language};q=0.8,en-US;q=0.6,en;q=0.4")
}

fn host_of(url: &Url) -> &str {
    url.host_str().unwrap_or_default()
}
