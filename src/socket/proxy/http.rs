//! HTTP CONNECT tunnels.

use super::{ProxyEndpoint, ProxyError, ProxyErrorKind};
use base64::{engine::general_purpose, Engine as _};
use std::io::{self, Read, Write};

const MAX_REPLY_LEN: usize = 16 * 1024;

/// `Basic <base64(username:password)>`
pub fn basic_authorization(username: &str, password: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

/// `Proxy-Authorization` value for an endpoint with credentials.
pub fn proxy_authorization(endpoint: &ProxyEndpoint) -> Option<String> {
    endpoint.has_credentials().then(|| {
        basic_authorization(
            endpoint.username().unwrap_or_default(),
            endpoint.password().unwrap_or_default(),
        )
    })
}

/// `host:port`, bracketing IPv6 literals.
pub(crate) fn authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Ask the proxy for a tunnel. Port 80 is forwarded as plain HTTP, so no tunnel is opened.
pub(crate) fn connect<S: Read + Write>(
    stream: &mut S,
    endpoint: &ProxyEndpoint,
    identity: &str,
    host: &str,
    port: u16,
) -> Result<(), ProxyError> {
    if port == 80 {
        return Ok(());
    }

    let target = authority(host, port);
    let mut request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n");
    if let Some(auth) = proxy_authorization(endpoint) {
        request.push_str(&format!("Proxy-Authorization: {auth}\r\n"));
    }
    request.push_str("\r\n");

    stream
        .write_all(request.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| ProxyError::io(identity, e))?;

    let reply = read_reply(stream, identity)?;
    let status = parse_status(&reply)
        .ok_or_else(|| ProxyError::new(identity, ProxyErrorKind::MalformedReply))?;
    if !(200..300).contains(&status) {
        return Err(ProxyError::new(identity, ProxyErrorKind::BadStatus(status)));
    }
    Ok(())
}

/// Read the reply head byte by byte so nothing past the blank line is consumed.
fn read_reply<S: Read>(stream: &mut S, identity: &str) -> Result<Vec<u8>, ProxyError> {
    let mut reply = Vec::with_capacity(128);
    let mut byte = [0u8; 1];

    while !reply.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte) {
            Ok(0) if reply.is_empty() => {
                return Err(ProxyError::new(identity, ProxyErrorKind::EmptyReply))
            }
            Ok(0) => break,
            Ok(_) => reply.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ProxyError::io(identity, e)),
        }
        if reply.len() > MAX_REPLY_LEN {
            return Err(ProxyError::new(identity, ProxyErrorKind::MalformedReply));
        }
    }
    Ok(reply)
}

fn parse_status(reply: &[u8]) -> Option<u16> {
    let line_end = reply.iter().position(|&b| b == b'\n').unwrap_or(reply.len());
    let line = std::str::from_utf8(&reply[..line_end]).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
