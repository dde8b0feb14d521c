use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::socket::proxy::ProxyClient;
use crate::socket::stream::StreamSocket;
use crate::socket::tls::TlsConfig;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Resolve `host:port` to every address the system resolver returns.
pub(crate) fn resolve(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses found for {host}"),
        ));
    }
    Ok(addrs)
}

/// Connect to the first reachable address. A zero `connect_timeout` blocks
/// without a deadline; a zero `read_write_timeout` leaves reads and writes unbounded.
pub(crate) fn connect_addrs(
    addrs: &[SocketAddr],
    connect_timeout: Duration,
    read_write_timeout: Duration,
) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        let attempt = if connect_timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(addr, connect_timeout)
        };
        match attempt {
            Ok(stream) => {
                apply_timeouts(&stream, read_write_timeout)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses to connect to")))
}

pub(crate) fn apply_timeouts(stream: &TcpStream, timeout: Duration) -> io::Result<()> {
    let timeout = (!timeout.is_zero()).then_some(timeout);
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)
}

/// True when `host` is a loopback literal or resolves to a loopback address.
pub(crate) fn resolves_to_loopback(host: &str) -> Result<bool, NetError> {
    if host.eq_ignore_ascii_case("localhost") {
        return Ok(true);
    }
    let addrs = resolve(host, 0).dns_context(host)?;
    Ok(addrs.iter().any(|addr| addr.ip().is_loopback()))
}

/// A connected socket and how requests on it are addressed.
#[derive(Debug)]
pub struct Established {
    pub socket: StreamSocket,
    /// The socket ends at an HTTP proxy that forwards plain requests, so they
    /// go out in absolute form. Decided by the hop order actually used.
    pub forwarding: bool,
}

/// Manages the connection process: DNS -> TCP -> proxy tunnel -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob<'a> {
    pub host: &'a str,
    pub port: u16,
    pub secure: bool,
    pub proxy: Option<&'a ProxyClient>,
    pub connect_timeout: Duration,
    pub read_write_timeout: Duration,
    pub tls: &'a TlsConfig,
}

impl ConnectJob<'_> {
    pub fn connect(&self) -> Result<Established, NetError> {
        let (tcp, forwarding) = match self.proxy {
            Some(proxy) => {
                let tunnel = proxy
                    .open_tunnel(self.host, self.port, None)
                    .map_err(|source| NetError::ProxyConnectFailed {
                        host: self.host.to_string(),
                        source,
                    })?;
                tracing::debug!(host = %self.host, route = ?tunnel.route, "tunnel route");
                apply_timeouts(&tunnel.stream, self.read_write_timeout)
                    .connection_context(self.host, self.port)?;
                let forwarding = tunnel.forwards_plain_http(self.port);
                (tunnel.stream, forwarding)
            }
            None => {
                let addrs = resolve(self.host, self.port).dns_context(self.host)?;
                let tcp = connect_addrs(&addrs, self.connect_timeout, self.read_write_timeout)
                    .connection_context(self.host, self.port)?;
                (tcp, false)
            }
        };
        let _ = tcp.set_nodelay(true);

        let socket = if self.secure {
            let tls_stream = self.tls.connect(self.host, tcp)?;
            tracing::debug!(host = %self.host, port = self.port, "SSL handshake complete");
            StreamSocket::Ssl(Box::new(tls_stream))
        } else {
            StreamSocket::Tcp(tcp)
        };
        Ok(Established { socket, forwarding })
    }
}
