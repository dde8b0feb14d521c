//! Socket abstraction over plain TCP and TLS-over-TCP.
//!
//! `StreamSocket` gives the HTTP layer one blocking `Read + Write` type no matter
//! whether the connection was tunneled through proxies or wrapped in TLS.
//! Chromium equivalent: `net::StreamSocket`.

use boring::ssl::SslStream;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

#[derive(Debug)]
pub enum StreamSocket {
    Tcp(TcpStream),
    Ssl(Box<SslStream<TcpStream>>),
}

impl StreamSocket {
    pub fn is_ssl(&self) -> bool {
        matches!(self, StreamSocket::Ssl(_))
    }

    /// The underlying TCP stream.
    pub fn tcp(&self) -> &TcpStream {
        match self {
            StreamSocket::Tcp(tcp) => tcp,
            StreamSocket::Ssl(ssl) => ssl.get_ref(),
        }
    }

    pub fn read_timeout(&self) -> io::Result<Option<Duration>> {
        self.tcp().read_timeout()
    }

    /// Close both directions. TLS sends `close_notify` first; failures are ignored.
    pub fn shutdown(&mut self) {
        if let StreamSocket::Ssl(ssl) = self {
            let _ = ssl.shutdown();
        }
        let _ = self.tcp().shutdown(Shutdown::Both);
    }
}

impl Read for StreamSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StreamSocket::Tcp(tcp) => tcp.read(buf),
            StreamSocket::Ssl(ssl) => ssl.read(buf),
        }
    }
}

impl Write for StreamSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StreamSocket::Tcp(tcp) => tcp.write(buf),
            StreamSocket::Ssl(ssl) => ssl.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StreamSocket::Tcp(tcp) => tcp.flush(),
            StreamSocket::Ssl(ssl) => ssl.flush(),
        }
    }
}

impl From<TcpStream> for StreamSocket {
    fn from(tcp: TcpStream) -> Self {
        StreamSocket::Tcp(tcp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_plain_socket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            conn.read_exact(&mut buf).unwrap();
            conn.write_all(&buf).unwrap();
        });

        let mut socket = StreamSocket::from(TcpStream::connect(addr).unwrap());
        assert!(!socket.is_ssl());
        socket.write_all(b"ping").unwrap();
        let mut echo = [0u8; 4];
        socket.read_exact(&mut echo).unwrap();
        assert_eq!(&echo, b"ping");

        socket.shutdown();
        server.join().unwrap();
    }
}
