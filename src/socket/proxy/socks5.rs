//! SOCKS5 handshake (RFC 1928) with username/password auth (RFC 1929).

use super::{ProxyEndpoint, ProxyError, ProxyErrorKind};
use std::io::{Read, Write};
use std::net::IpAddr;

const VERSION: u8 = 5;

const AUTH_NONE: u8 = 0x00;
const AUTH_PASSWORD: u8 = 0x02;
const AUTH_NO_ACCEPT: u8 = 0xff;
const AUTH_PASSWORD_VERSION: u8 = 0x01;

const CMD_CONNECT: u8 = 0x01;

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

const REP_SUCCEEDED: u8 = 0x00;
const REP_GENERAL_FAILURE: u8 = 0x01;
const REP_RULESET_DENIED: u8 = 0x02;
const REP_NETWORK_UNREACHABLE: u8 = 0x03;
const REP_HOST_UNREACHABLE: u8 = 0x04;
const REP_CONNECTION_REFUSED: u8 = 0x05;
const REP_TTL_EXPIRED: u8 = 0x06;
const REP_COMMAND_UNSUPPORTED: u8 = 0x07;
const REP_ADDRESS_UNSUPPORTED: u8 = 0x08;

pub(crate) fn connect<S: Read + Write>(
    stream: &mut S,
    endpoint: &ProxyEndpoint,
    identity: &str,
    host: &str,
    port: u16,
) -> Result<(), ProxyError> {
    negotiate(stream, endpoint, identity)?;
    send_command(stream, identity, host, port)
}

fn negotiate<S: Read + Write>(
    stream: &mut S,
    endpoint: &ProxyEndpoint,
    identity: &str,
) -> Result<(), ProxyError> {
    let io_err = |e| ProxyError::io(identity, e);

    let method = if endpoint.requires_auth() {
        AUTH_PASSWORD
    } else {
        AUTH_NONE
    };
    stream.write_all(&[VERSION, 1, method]).map_err(io_err)?;
    stream.flush().map_err(io_err)?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).map_err(io_err)?;

    // The server must pick the method we offered.
    match reply[1] {
        AUTH_NONE => Ok(()),
        AUTH_PASSWORD if method == AUTH_PASSWORD => authenticate(stream, endpoint, identity),
        AUTH_PASSWORD => Err(ProxyError::new(identity, ProxyErrorKind::MalformedReply)),
        AUTH_NO_ACCEPT => Err(ProxyError::new(identity, ProxyErrorKind::NoAcceptableMethods)),
        code => Err(ProxyError::new(identity, reply_error(code))),
    }
}

fn authenticate<S: Read + Write>(
    stream: &mut S,
    endpoint: &ProxyEndpoint,
    identity: &str,
) -> Result<(), ProxyError> {
    let io_err = |e| ProxyError::io(identity, e);
    let username = endpoint.username().unwrap_or_default().as_bytes();
    let password = endpoint.password().unwrap_or_default().as_bytes();

    let mut frame = Vec::with_capacity(3 + username.len() + password.len());
    frame.push(AUTH_PASSWORD_VERSION);
    frame.push(username.len() as u8);
    frame.extend_from_slice(username);
    frame.push(password.len() as u8);
    frame.extend_from_slice(password);
    stream.write_all(&frame).map_err(io_err)?;
    stream.flush().map_err(io_err)?;

    let mut reply = [0u8; 2];
    stream.read_exact(&mut reply).map_err(io_err)?;
    if reply[1] != 0x00 {
        return Err(ProxyError::new(identity, ProxyErrorKind::AuthFailed));
    }
    Ok(())
}

fn send_command<S: Read + Write>(
    stream: &mut S,
    identity: &str,
    host: &str,
    port: u16,
) -> Result<(), ProxyError> {
    let io_err = |e| ProxyError::io(identity, e);

    let mut frame = vec![VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            frame.push(ATYP_IPV4);
            frame.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            frame.push(ATYP_IPV6);
            frame.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            let name = host.as_bytes();
            if name.len() > u8::MAX as usize {
                return Err(ProxyError::new(
                    identity,
                    ProxyErrorKind::InvalidConfig("destination host is longer than 255 bytes".to_string()),
                ));
            }
            frame.push(ATYP_DOMAIN);
            frame.push(name.len() as u8);
            frame.extend_from_slice(name);
        }
    }
    frame.extend_from_slice(&port.to_be_bytes());
    stream.write_all(&frame).map_err(io_err)?;
    stream.flush().map_err(io_err)?;

    // VER REP RSV ATYP, then the bound address and port
    let mut head = [0u8; 4];
    stream.read_exact(&mut head).map_err(io_err)?;
    if head[1] != REP_SUCCEEDED {
        return Err(ProxyError::new(identity, reply_error(head[1])));
    }

    let addr_len = match head[3] {
        ATYP_IPV4 => 4,
        ATYP_IPV6 => 16,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).map_err(io_err)?;
            len[0] as usize
        }
        _ => return Err(ProxyError::new(identity, ProxyErrorKind::MalformedReply)),
    };
    let mut bound = vec![0u8; addr_len + 2];
    stream.read_exact(&mut bound).map_err(io_err)?;
    Ok(())
}

fn reply_error(code: u8) -> ProxyErrorKind {
    match code {
        REP_GENERAL_FAILURE => ProxyErrorKind::Socks5GeneralFailure,
        REP_RULESET_DENIED => ProxyErrorKind::Socks5RulesetDenied,
        REP_NETWORK_UNREACHABLE => ProxyErrorKind::Socks5NetworkUnreachable,
        REP_HOST_UNREACHABLE => ProxyErrorKind::Socks5HostUnreachable,
        REP_CONNECTION_REFUSED => ProxyErrorKind::Socks5ConnectionRefused,
        REP_TTL_EXPIRED => ProxyErrorKind::Socks5TtlExpired,
        REP_COMMAND_UNSUPPORTED => ProxyErrorKind::Socks5CommandUnsupported,
        REP_ADDRESS_UNSUPPORTED => ProxyErrorKind::AddressTypeUnsupported,
        AUTH_NO_ACCEPT => ProxyErrorKind::NoAcceptableMethods,
        other => ProxyErrorKind::UnknownReply(other),
    }
}
