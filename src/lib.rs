//! # proxynet
//!
//! A blocking HTTP/1.1 client with a hand-written proxy tunneling stack.
//!
//! `proxynet` routes requests directly or through HTTP CONNECT, SOCKS4,
//! SOCKS4a and SOCKS5 proxies, or chains of them. It keeps one connection
//! alive between calls, follows redirects, retries transient failures and
//! decodes chunked, gzip and deflate bodies.
//!
//! ## Features
//!
//! - **Proxy tunnels**: HTTP CONNECT, SOCKS4/4a/5 with username/password, chains with optional shuffling
//! - **Keep-Alive**: connection reuse bounded by request count and idle time, server `Keep-Alive` limits honored
//! - **Framing**: Content-Length, chunked and close-delimited bodies; gzip/deflate decoding
//! - **Cookies**: `Set-Cookie` handling with expiry and deletion
//! - **TLS**: BoringSSL with a pluggable certificate validator
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proxynet::{HttpClient, ProxyBuilder};
//!
//! let proxy = ProxyBuilder::new()
//!     .socks5("127.0.0.1:1080")
//!     .auth("user", "secret")
//!     .build()?;
//!
//! let mut client = HttpClient::builder().proxy(proxy).build();
//! let mut response = client.get("https://example.com/")?;
//! println!("Status: {}", response.status());
//! println!("{}", response.text()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types and load states
//! - [`cookies`] - Cookie jar and `Set-Cookie` handling
//! - [`http`] - Request bodies, response parsing, transactions
//! - [`socket`] - Connections, proxy handshakes and TLS
//! - [`client`] - The [`HttpClient`] and its configuration

pub mod base;
pub mod client;
pub mod cookies;
pub mod http;
pub mod socket;

pub use base::loadstate::LoadState;
pub use base::neterror::{ErrorKind, NetError};
pub use client::{ClientBuilder, ClientConfig, DefaultProxyProvider, HttpClient};
pub use cookies::jar::CookieJar;
pub use http::charset::Charset;
pub use http::multipart::{Form, Part};
pub use http::params::RequestParams;
pub use http::progress::{DownloadProgress, UploadProgress};
pub use http::requestbody::RequestBody;
pub use http::response::{HttpResponse, Response};
pub use http::retry::ReconnectConfig;
pub use socket::keepalive::KeepAliveConfig;
pub use socket::proxy::{
    ChainProxy, ProxyBuilder, ProxyClient, ProxyError, ProxyErrorKind, ProxyType, Tunnel,
};
pub use socket::tls::TlsConfig;
