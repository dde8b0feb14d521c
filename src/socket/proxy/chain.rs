//! Proxy chains.

use super::{ProxyClient, ProxyEndpoint, ProxyError, ProxyErrorKind, ProxyType, Tunnel};
use rand::seq::SliceRandom;
use rand::Rng;
use std::borrow::Cow;
use std::net::TcpStream;

/// An ordered list of proxies, each tunneling to the next.
///
/// With shuffling enabled a fresh copy of the hop list is shuffled before every
/// connection; the stored order never changes.
#[derive(Debug, Clone, Default)]
pub struct ChainProxy {
    proxies: Vec<ProxyClient>,
    shuffle: bool,
}

impl ChainProxy {
    pub fn new(shuffle: bool) -> Self {
        Self {
            proxies: Vec::new(),
            shuffle,
        }
    }

    pub fn proxies(&self) -> &[ProxyClient] {
        &self.proxies
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn enable_shuffle(&mut self, shuffle: bool) -> &mut Self {
        self.shuffle = shuffle;
        self
    }

    pub fn add_proxy(&mut self, proxy: ProxyClient) -> &mut Self {
        self.proxies.push(proxy);
        self
    }

    pub fn add_http_proxy(&mut self, address: &str) -> Result<&mut Self, ProxyError> {
        self.add_parsed(ProxyType::Http, address)
    }

    pub fn add_socks4_proxy(&mut self, address: &str) -> Result<&mut Self, ProxyError> {
        self.add_parsed(ProxyType::Socks4, address)
    }

    pub fn add_socks4a_proxy(&mut self, address: &str) -> Result<&mut Self, ProxyError> {
        self.add_parsed(ProxyType::Socks4a, address)
    }

    pub fn add_socks5_proxy(&mut self, address: &str) -> Result<&mut Self, ProxyError> {
        self.add_parsed(ProxyType::Socks5, address)
    }

    fn add_parsed(&mut self, proxy_type: ProxyType, address: &str) -> Result<&mut Self, ProxyError> {
        let proxy = ProxyClient::parse(proxy_type, address)?;
        Ok(self.add_proxy(proxy))
    }

    /// The HTTP hop whose credentials go into `Proxy-Authorization`:
    /// the first HTTP hop with credentials, else the first HTTP hop.
    /// Nested chains are searched in place.
    pub fn find_http_proxy(&self) -> Option<&ProxyEndpoint> {
        let mut first = None;
        self.find_authenticated_http(&mut first).or(first)
    }

    fn find_authenticated_http<'a>(
        &'a self,
        first: &mut Option<&'a ProxyEndpoint>,
    ) -> Option<&'a ProxyEndpoint> {
        for proxy in &self.proxies {
            match proxy {
                ProxyClient::Http(endpoint) => {
                    if endpoint.has_credentials() {
                        return Some(endpoint);
                    }
                    first.get_or_insert(endpoint);
                }
                ProxyClient::Chain(nested) => {
                    if let Some(found) = nested.find_authenticated_http(first) {
                        return Some(found);
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub(crate) fn check_state(&self) -> Result<(), ProxyError> {
        if self.proxies.is_empty() {
            return Err(self.empty_error());
        }
        self.proxies.iter().try_for_each(ProxyClient::check_state)
    }

    pub fn create_connection_with_rng<R: Rng + ?Sized>(
        &self,
        host: &str,
        port: u16,
        existing: Option<TcpStream>,
        rng: &mut R,
    ) -> Result<TcpStream, ProxyError> {
        self.open_tunnel_with_rng(host, port, existing, rng)
            .map(|tunnel| tunnel.stream)
    }

    /// Fold the hops left to right: hop `i` tunnels to hop `i + 1`, the last hop
    /// tunnels to `host:port`. The returned route lists the hops in the order
    /// used, which differs from [`proxies`](Self::proxies) when shuffling.
    pub fn open_tunnel_with_rng<R: Rng + ?Sized>(
        &self,
        host: &str,
        port: u16,
        existing: Option<TcpStream>,
        rng: &mut R,
    ) -> Result<Tunnel, ProxyError> {
        self.check_state()?;

        let hops: Cow<'_, [ProxyClient]> = if self.shuffle {
            let mut copy = self.proxies.clone();
            copy.shuffle(&mut *rng);
            Cow::Owned(copy)
        } else {
            Cow::Borrowed(&self.proxies)
        };

        let (last, leading) = hops.split_last().ok_or_else(|| self.empty_error())?;

        let mut stream = existing;
        let mut route = Vec::with_capacity(hops.len());
        for (i, hop) in leading.iter().enumerate() {
            let next = &hops[i + 1];
            let tunnel = hop.open_tunnel_with_rng(next.host()?, next.port()?, stream, &mut *rng)?;
            route.extend(tunnel.route);
            stream = Some(tunnel.stream);
        }
        let mut tunnel = last.open_tunnel_with_rng(host, port, stream, rng)?;
        route.append(&mut tunnel.route);
        tunnel.route = route;
        Ok(tunnel)
    }

    fn empty_error(&self) -> ProxyError {
        ProxyError::new(
            "chain of 0 proxies",
            ProxyErrorKind::InvalidConfig("chain has no proxies".to_string()),
        )
    }
}

impl PartialEq for ChainProxy {
    fn eq(&self, other: &Self) -> bool {
        self.proxies == other.proxies
    }
}

impl From<ChainProxy> for ProxyClient {
    fn from(chain: ChainProxy) -> Self {
        ProxyClient::Chain(chain)
    }
}
