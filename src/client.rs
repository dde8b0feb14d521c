//! Blocking HTTP/1.1 client.
//!
//! One [`HttpClient`] owns one connection and runs one request at a time.
//! Parallelism comes from running independent clients on separate threads.
//!
//! # Example
//!
//! ```rust,no_run
//! use proxynet::{HttpClient, ProxyClient, ProxyType};
//!
//! let proxy = ProxyClient::parse(ProxyType::Socks5, "127.0.0.1:1080")?;
//! let mut client = HttpClient::builder().proxy(proxy).build();
//! client.user_agent("proxynet")?;
//!
//! let body = client.get("http://example.com/")?.text()?;
//! println!("{body}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::cookies::jar::CookieJar;
use crate::http::charset::Charset;
use crate::http::job::HttpJob;
use crate::http::multipart::{Form, Part};
use crate::http::orderedheaders::{is_reserved, OrderedHeaderMap};
use crate::http::params::RequestParams;
use crate::http::progress::{DownloadCallback, DownloadProgress, UploadCallback, UploadProgress};
use crate::http::requestbody::RequestBody;
use crate::http::response::{HttpResponse, Response};
use crate::http::retry::ReconnectConfig;
use crate::http::transaction::{can_contain_body, HttpTransaction};
use crate::socket::keepalive::{ConnectionManager, KeepAliveConfig};
use crate::socket::proxy::ProxyClient;
use crate::socket::tls::TlsConfig;
use bytes::Bytes;
use http::Method;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Supplies a fallback proxy when the client has none configured.
///
/// Consulted only when [`ClientConfig::use_default_proxy`] is set.
pub trait DefaultProxyProvider: Send + Sync {
    fn default_proxy(&self) -> Option<ProxyClient>;
}

/// Everything that shapes a call. Changes take effect on the next call.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base for relative request addresses.
    pub base_address: Option<Url>,
    /// Proxy for this client.
    pub proxy: Option<ProxyClient>,
    /// Proxy shared by clients that have none of their own.
    pub global_proxy: Option<ProxyClient>,
    /// Ask `default_proxy_provider` when neither proxy is set.
    pub use_default_proxy: bool,
    pub default_proxy_provider: Option<Arc<dyn DefaultProxyProvider>>,
    /// Connect directly when the destination resolves to loopback.
    pub disable_proxy_for_local_address: bool,
    /// TCP connect timeout (default: 60s)
    pub connect_timeout: Duration,
    /// Socket read and write timeout (default: 60s)
    pub read_write_timeout: Duration,
    pub keep_alive: KeepAliveConfig,
    pub allow_auto_redirect: bool,
    /// Redirects followed per call (default: 5)
    pub maximum_automatic_redirections: usize,
    pub reconnect: ReconnectConfig,
    /// Return 4xx/5xx responses instead of failing with [`NetError::HttpStatus`].
    pub ignore_protocol_errors: bool,
    /// Advertise gzip/deflate and decode compressed bodies.
    pub enable_encoding_content: bool,
    /// Request charset, sent as `Accept-Charset`; also the fallback for
    /// decoding bodies that declare none.
    pub character_set: Option<Charset>,
    /// Culture sent as `Accept-Language`, such as `de-DE`.
    pub culture: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upload slice size; progress is reported after each slice (default: 8192)
    pub send_buffer_size: usize,
    pub tls: TlsConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_address: None,
            proxy: None,
            global_proxy: None,
            use_default_proxy: false,
            default_proxy_provider: None,
            disable_proxy_for_local_address: false,
            connect_timeout: Duration::from_secs(60),
            read_write_timeout: Duration::from_secs(60),
            keep_alive: KeepAliveConfig::default(),
            allow_auto_redirect: true,
            maximum_automatic_redirections: 5,
            reconnect: ReconnectConfig::default(),
            ignore_protocol_errors: false,
            enable_encoding_content: true,
            character_set: None,
            culture: None,
            username: None,
            password: None,
            send_buffer_size: 8192,
            tls: TlsConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_address", &self.base_address)
            .field("proxy", &self.proxy)
            .field("global_proxy", &self.global_proxy)
            .field("use_default_proxy", &self.use_default_proxy)
            .field("disable_proxy_for_local_address", &self.disable_proxy_for_local_address)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_write_timeout", &self.read_write_timeout)
            .field("keep_alive", &self.keep_alive)
            .field("allow_auto_redirect", &self.allow_auto_redirect)
            .field("maximum_automatic_redirections", &self.maximum_automatic_redirections)
            .field("reconnect", &self.reconnect)
            .field("ignore_protocol_errors", &self.ignore_protocol_errors)
            .field("enable_encoding_content", &self.enable_encoding_content)
            .field("character_set", &self.character_set)
            .field("culture", &self.culture)
            .field("username", &self.username)
            .field("send_buffer_size", &self.send_buffer_size)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    cookies: CookieJar,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative addresses against `base`.
    pub fn base_address(mut self, base: Url) -> Self {
        self.config.base_address = Some(base);
        self
    }

    pub fn proxy(mut self, proxy: ProxyClient) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Proxy used when no per-client proxy is set.
    pub fn global_proxy(mut self, proxy: ProxyClient) -> Self {
        self.config.global_proxy = Some(proxy);
        self
    }

    /// Fall back to `provider` when no proxy is configured.
    pub fn default_proxy_provider(mut self, provider: Arc<dyn DefaultProxyProvider>) -> Self {
        self.config.use_default_proxy = true;
        self.config.default_proxy_provider = Some(provider);
        self
    }

    pub fn disable_proxy_for_local_address(mut self, disable: bool) -> Self {
        self.config.disable_proxy_for_local_address = disable;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_write_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.config.keep_alive.enabled = enabled;
        self
    }

    pub fn keep_alive_timeout(mut self, timeout: Duration) -> Self {
        self.config.keep_alive.timeout = timeout;
        self
    }

    pub fn maximum_keep_alive_requests(mut self, max: u32) -> Self {
        self.config.keep_alive.max_requests = max;
        self
    }

    pub fn allow_auto_redirect(mut self, allow: bool) -> Self {
        self.config.allow_auto_redirect = allow;
        self
    }

    pub fn maximum_automatic_redirections(mut self, max: usize) -> Self {
        self.config.maximum_automatic_redirections = max;
        self
    }

    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    pub fn ignore_protocol_errors(mut self, ignore: bool) -> Self {
        self.config.ignore_protocol_errors = ignore;
        self
    }

    pub fn enable_encoding_content(mut self, enable: bool) -> Self {
        self.config.enable_encoding_content = enable;
        self
    }

    pub fn character_set(mut self, charset: Charset) -> Self {
        self.config.character_set = Some(charset);
        self
    }

    pub fn culture(mut self, culture: impl Into<String>) -> Self {
        self.config.culture = Some(culture.into());
        self
    }

    /// Credentials sent as `Authorization: Basic`.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    pub fn send_buffer_size(mut self, size: usize) -> Self {
        self.config.send_buffer_size = size.max(1);
        self
    }

    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.config.tls = tls;
        self
    }

    pub fn cookies(mut self, cookies: CookieJar) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn build(self) -> HttpClient {
        HttpClient {
            config: self.config,
            headers: OrderedHeaderMap::new(),
            cookies: self.cookies,
            connections: ConnectionManager::new(),
            last: None,
            load_state: LoadState::Idle,
            oneshot: OneShot::default(),
            upload_progress: None,
            download_progress: None,
        }
    }
}

/// Request state that applies to the next call only.
#[derive(Debug, Default)]
struct OneShot {
    headers: OrderedHeaderMap,
    params: RequestParams,
    url_params: RequestParams,
    fields: Option<Form>,
}

impl OneShot {
    /// The body made of one-shot params and fields, if any were added.
    fn take_body(&mut self, charset: Charset) -> Option<RequestBody> {
        if let Some(mut form) = self.fields.take() {
            for (name, value) in self.params.iter() {
                form.push(name, Part::new(RequestBody::text(value, charset)));
            }
            return Some(RequestBody::multipart(form));
        }
        if !self.params.is_empty() {
            return Some(RequestBody::form(&self.params, false, charset));
        }
        None
    }
}

/// A blocking HTTP/1.1 client with keep-alive, redirects, retries and proxy
/// tunneling.
///
/// Calls take `&mut self`; the returned [`Response`] borrows the client, so
/// the body must be consumed (or the response dropped) before the next call.
/// A body left unread is drained automatically when the next call reuses
/// the connection.
pub struct HttpClient {
    config: ClientConfig,
    headers: OrderedHeaderMap,
    cookies: CookieJar,
    connections: ConnectionManager,
    last: Option<HttpResponse>,
    load_state: LoadState,
    oneshot: OneShot,
    upload_progress: Option<UploadCallback>,
    download_progress: Option<DownloadCallback>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("connected", &self.connections.is_connected())
            .field("load_state", &self.load_state)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        ClientBuilder::new().build()
    }

    /// A client resolving relative addresses against `base`.
    pub fn with_base_address(base: Url) -> Self {
        ClientBuilder::new().base_address(base).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    pub fn set_proxy(&mut self, proxy: Option<ProxyClient>) {
        self.config.proxy = proxy;
    }

    pub fn get(&mut self, address: &str) -> Result<Response<'_>, NetError> {
        self.raw(Method::GET, address, None)
    }

    /// POST `body`, or the one-shot params/fields when `body` is `None`.
    pub fn post(&mut self, address: &str, body: Option<RequestBody>) -> Result<Response<'_>, NetError> {
        self.raw(Method::POST, address, body)
    }

    pub fn put(&mut self, address: &str, body: Option<RequestBody>) -> Result<Response<'_>, NetError> {
        self.raw(Method::PUT, address, body)
    }

    pub fn delete(&mut self, address: &str, body: Option<RequestBody>) -> Result<Response<'_>, NetError> {
        self.raw(Method::DELETE, address, body)
    }

    /// Send a request with any method.
    ///
    /// A body is only sent for POST, PUT and DELETE. One-shot state added
    /// since the last call applies to this call and is cleared whether it
    /// succeeds or not.
    pub fn raw(
        &mut self,
        method: Method,
        address: &str,
        body: Option<RequestBody>,
    ) -> Result<Response<'_>, NetError> {
        let oneshot = std::mem::take(&mut self.oneshot);
        self.execute(&method, address, body, oneshot)?;
        self.response().ok_or_else(|| NetError::EmptyResponse {
            host: address.to_string(),
        })
    }

    fn execute(
        &mut self,
        method: &Method,
        address: &str,
        body: Option<RequestBody>,
        mut oneshot: OneShot,
    ) -> Result<(), NetError> {
        let mut url = self.resolve_address(address)?;
        if !oneshot.url_params.is_empty() {
            let extra = oneshot.url_params.to_query_string(false);
            let query = match url.query() {
                Some(q) if !q.is_empty() => format!("{q}&{extra}"),
                _ => extra,
            };
            url.set_query(Some(&query));
        }

        let charset = self.config.character_set.unwrap_or_default();
        let mut body = match body {
            Some(body) => Some(body),
            None if can_contain_body(method) => oneshot.take_body(charset),
            None => None,
        };

        let transaction = HttpTransaction {
            config: &self.config,
            headers: &self.headers,
            oneshot_headers: Some(&oneshot.headers),
            cookies: &mut self.cookies,
            connections: &mut self.connections,
            last: &mut self.last,
            load_state: &mut self.load_state,
            upload_progress: self.upload_progress.as_ref(),
        };
        HttpJob::new(transaction, url).start(method, body.as_mut())
    }

    /// Absolute `address`, or `address` joined onto the base address.
    fn resolve_address(&self, address: &str) -> Result<Url, NetError> {
        let url = match Url::parse(address) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .config
                .base_address
                .as_ref()
                .ok_or(NetError::MissingBaseAddress)?
                .join(address)?,
            Err(e) => return Err(e.into()),
        };
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(NetError::UnsupportedScheme(other.to_string())),
        }
    }

    /// The body of `address` in memory.
    pub fn get_bytes(&mut self, address: &str) -> Result<Bytes, NetError> {
        self.get(address)?.bytes()
    }

    /// The body of `address` decoded as text.
    pub fn get_string(&mut self, address: &str) -> Result<String, NetError> {
        self.get(address)?.text()
    }

    /// Save the body of `address` to `path`. Returns the bytes written.
    pub fn download_file(&mut self, address: &str, path: impl AsRef<Path>) -> Result<u64, NetError> {
        self.get(address)?.to_file(path)
    }

    /// The last response, including one that failed the status check.
    pub fn response(&mut self) -> Option<Response<'_>> {
        let head = self.last.as_mut()?;
        Some(Response::new(
            head,
            self.connections.reader(),
            self.download_progress.as_ref(),
        ))
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    // Persistent headers

    /// Set a header sent with every request.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, NetError> {
        check_header_name(name)?;
        self.headers.insert(name, value)?;
        Ok(self)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    pub fn user_agent(&mut self, user_agent: &str) -> Result<&mut Self, NetError> {
        self.set_header("User-Agent", user_agent)
    }

    pub fn referer(&mut self, referer: &str) -> Result<&mut Self, NetError> {
        self.set_header("Referer", referer)
    }

    // One-shot state for the next call

    /// A header for the next call only. Overrides a persistent header of the same name.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self, NetError> {
        check_header_name(name)?;
        self.oneshot.headers.insert(name, value)?;
        Ok(self)
    }

    /// A form parameter for the next POST/PUT/DELETE without a body.
    pub fn add_param(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.oneshot.params.add(name, value);
        self
    }

    /// A query parameter appended to the next call's address.
    pub fn add_url_param(&mut self, name: &str, value: impl ToString) -> &mut Self {
        self.oneshot.url_params.add(name, value);
        self
    }

    /// A multipart text field for the next body-less call.
    pub fn add_field(&mut self, name: &str, value: &str) -> &mut Self {
        let charset = self.config.character_set.unwrap_or_default();
        self.oneshot
            .fields
            .get_or_insert_with(Form::new)
            .push(name, Part::new(RequestBody::text(value, charset)));
        self
    }

    /// A multipart file field for the next body-less call.
    pub fn add_file(&mut self, name: &str, path: impl AsRef<Path>) -> &mut Self {
        self.oneshot
            .fields
            .get_or_insert_with(Form::new)
            .push(name, Part::file(path));
        self
    }

    // Cookies

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn cookies_mut(&mut self) -> &mut CookieJar {
        &mut self.cookies
    }

    pub fn set_cookies(&mut self, cookies: CookieJar) {
        self.cookies = cookies;
    }

    // Progress

    pub fn on_upload_progress<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        self.upload_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_download_progress<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(DownloadProgress) + Send + Sync + 'static,
    {
        self.download_progress = Some(Arc::new(callback));
        self
    }

    /// Close the connection. The next call opens a new one.
    pub fn dispose(&mut self) {
        self.connections.dispose();
        self.last = None;
        self.load_state = LoadState::Idle;
    }
}

fn check_header_name(name: &str) -> Result<(), NetError> {
    if is_reserved(name) {
        return Err(NetError::ClosedHeader(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(60));
        assert_eq!(config.read_write_timeout, Duration::from_secs(60));
        assert!(config.keep_alive.enabled);
        assert_eq!(config.keep_alive.timeout, Duration::from_secs(30));
        assert_eq!(config.keep_alive.max_requests, 100);
        assert!(config.allow_auto_redirect);
        assert_eq!(config.maximum_automatic_redirections, 5);
        assert!(!config.reconnect.enabled);
        assert!(!config.ignore_protocol_errors);
        assert!(config.enable_encoding_content);
        assert_eq!(config.send_buffer_size, 8192);
        assert!(config.proxy.is_none() && !config.use_default_proxy);
    }

    #[test]
    fn test_reserved_headers_rejected() {
        let mut client = HttpClient::new();
        assert!(matches!(
            client.set_header("content-length", "5"),
            Err(NetError::ClosedHeader(_))
        ));
        assert!(matches!(client.add_header("Host", "x"), Err(NetError::ClosedHeader(_))));
        assert!(matches!(
            client.set_header("Bad Name", "x"),
            Err(NetError::InvalidHeader { .. })
        ));

        client.user_agent("agent/1.0").unwrap();
        assert_eq!(client.header("user-agent"), Some("agent/1.0"));
        assert_eq!(client.remove_header("User-Agent").as_deref(), Some("agent/1.0"));
    }

    #[test]
    fn test_address_resolution() {
        let client = HttpClient::with_base_address(Url::parse("http://example.com/api/").unwrap());
        assert_eq!(
            client.resolve_address("users?id=1").unwrap().as_str(),
            "http://example.com/api/users?id=1"
        );
        assert_eq!(
            client.resolve_address("https://other.org/").unwrap().as_str(),
            "https://other.org/"
        );
        assert!(matches!(
            client.resolve_address("ftp://example.com/"),
            Err(NetError::UnsupportedScheme(s)) if s == "ftp"
        ));

        let client = HttpClient::new();
        assert!(matches!(client.resolve_address("/relative"), Err(NetError::MissingBaseAddress)));
    }

    #[test]
    fn test_oneshot_body() {
        let mut oneshot = OneShot::default();
        assert!(oneshot.take_body(Charset::Utf8).is_none());

        oneshot.params.add("a", "1").add("b", "x y");
        let body = oneshot.take_body(Charset::Utf8).unwrap();
        assert_eq!(body.content_type(), "application/x-www-form-urlencoded");
        assert_eq!(body.content_length().unwrap(), "a=1&b=x+y".len() as u64);

        oneshot.fields = Some(Form::with_boundary("XyZ").unwrap());
        let body = oneshot.take_body(Charset::Utf8).unwrap();
        assert!(body.content_type().starts_with("multipart/form-data; boundary="));
        assert!(oneshot.fields.is_none());
    }

    #[test]
    fn test_oneshot_cleared_after_failed_call() {
        let mut client = HttpClient::new();
        client.add_header("X-Once", "1").unwrap();
        client.add_url_param("q", "1");
        assert!(client.get("/needs-base").is_err());
        assert!(client.oneshot.headers.is_empty());
        assert!(client.oneshot.url_params.is_empty());
    }
}
