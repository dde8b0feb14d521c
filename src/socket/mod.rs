//! Socket and connection management.
//!
//! - [`connectjob`]: DNS → TCP (directly or through a proxy) → TLS connection flow
//! - [`proxy`]: HTTP CONNECT, SOCKS4, SOCKS4a, SOCKS5 and chained proxy tunnels
//! - [`tls`]: TLS configuration with BoringSSL
//! - [`stream`]: plain or TLS stream behind one blocking `Read`/`Write` type
//! - [`keepalive`]: the client's single keep-alive connection and its budget

pub mod connectjob;
pub mod keepalive;
pub mod proxy;
pub mod stream;
pub mod tls;
