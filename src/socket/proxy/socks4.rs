//! SOCKS4 and SOCKS4a handshakes.
//!
//! Both protocols send one request frame and read an 8-byte reply:
//!
//! ```text
//! request: VN(1)=4 CD(1)=1 DSTPORT(2) DSTIP(4) USERID(var) NUL(1) [DOMAIN(var) NUL(1)]
//! reply:   VN(1)=0 CD(1)   DSTPORT(2) DSTIP(4)
//! ```
//!
//! SOCKS4 resolves the destination locally; SOCKS4a sends the sentinel
//! address `0.0.0.1` followed by the domain name and lets the proxy resolve it.

use super::{ProxyEndpoint, ProxyError, ProxyErrorKind};
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

const VERSION: u8 = 4;
const CMD_CONNECT: u8 = 0x01;

const REPLY_GRANTED: u8 = 0x5a;
const REPLY_REJECTED: u8 = 0x5b;
const REPLY_IDENTD_UNREACHABLE: u8 = 0x5c;
const REPLY_IDENTD_MISMATCH: u8 = 0x5d;

const SOCKS4A_SENTINEL: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 1);

/// Where the destination name is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// SOCKS4: resolve to IPv4 before sending.
    Local,
    /// SOCKS4a: send the name to the proxy.
    Remote,
}

pub(crate) fn connect<S: Read + Write>(
    stream: &mut S,
    endpoint: &ProxyEndpoint,
    identity: &str,
    host: &str,
    port: u16,
    resolution: Resolution,
) -> Result<(), ProxyError> {
    let user_id = endpoint.username().unwrap_or_default();
    let frame = match resolution {
        Resolution::Local => {
            let ip = resolve_ipv4(host, port, identity)?;
            build_request(port, ip, user_id, None)
        }
        Resolution::Remote => build_request(port, SOCKS4A_SENTINEL, user_id, Some(host)),
    };

    stream
        .write_all(&frame)
        .and_then(|()| stream.flush())
        .map_err(|e| ProxyError::io(identity, e))?;

    let mut reply = [0u8; 8];
    stream
        .read_exact(&mut reply)
        .map_err(|e| ProxyError::io(identity, e))?;

    match reply[1] {
        REPLY_GRANTED => Ok(()),
        code => Err(ProxyError::new(identity, reply_error(code))),
    }
}

pub(crate) fn build_request(port: u16, ip: Ipv4Addr, user_id: &str, domain: Option<&str>) -> Vec<u8> {
    let mut frame = Vec::with_capacity(10 + user_id.len() + domain.map_or(0, str::len));
    frame.push(VERSION);
    frame.push(CMD_CONNECT);
    frame.extend_from_slice(&port.to_be_bytes());
    frame.extend_from_slice(&ip.octets());
    frame.extend_from_slice(user_id.as_bytes());
    frame.push(0x00);
    if let Some(domain) = domain {
        frame.extend_from_slice(domain.as_bytes());
        frame.push(0x00);
    }
    frame
}

fn resolve_ipv4(host: &str, port: u16, identity: &str) -> Result<Ipv4Addr, ProxyError> {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => return Ok(ip),
        Ok(IpAddr::V6(_)) => {
            return Err(ProxyError::new(
                identity,
                ProxyErrorKind::AddressTypeUnsupported,
            ))
        }
        Err(_) => {}
    }

    let resolve_failed = || ProxyErrorKind::ResolveFailed(host.to_string());
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| ProxyError::with_source(identity, resolve_failed(), e))?;
    addrs
        .filter_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| ProxyError::new(identity, resolve_failed()))
}

fn reply_error(code: u8) -> ProxyErrorKind {
    match code {
        REPLY_REJECTED => ProxyErrorKind::Socks4Rejected,
        REPLY_IDENTD_UNREACHABLE => ProxyErrorKind::Socks4IdentdUnreachable,
        REPLY_IDENTD_MISMATCH => ProxyErrorKind::Socks4IdentdMismatch,
        other => ProxyErrorKind::UnknownReply(other),
    }
}
