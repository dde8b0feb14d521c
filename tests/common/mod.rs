//! Scripted HTTP/1.1 server for integration tests.
//!
//! Each accepted connection runs on its own thread and answers requests in
//! order until the handler asks it to close or the client goes away.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Start line and headers, without the blank line.
    pub head: String,
    pub body: Vec<u8>,
    /// Zero-based index of the connection that carried it.
    pub connection: usize,
    /// Zero-based index of the request on its connection.
    pub index: usize,
}

impl Recorded {
    pub fn start_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

/// What to do with a request.
pub enum Reply {
    /// Write these segments, pausing between them, and keep the connection.
    Send(Vec<Vec<u8>>),
    /// Write the response and close the connection.
    SendAndClose(Vec<u8>),
    /// Close the connection without answering.
    Hangup,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Send(vec![format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()])
    }

    pub fn raw(response: impl Into<Vec<u8>>) -> Self {
        Reply::Send(vec![response.into()])
    }
}

pub type Handler = dyn Fn(&Recorded) -> Reply + Send + Sync;

pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    connections: Arc<AtomicUsize>,
}

impl MockServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let handler: Arc<Handler> = Arc::new(handler);

        let server = Self {
            addr,
            requests: Arc::clone(&requests),
            connections: Arc::clone(&connections),
        };

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let connection = connections.fetch_add(1, Ordering::SeqCst);
                let handler = Arc::clone(&handler);
                let requests = Arc::clone(&requests);
                thread::spawn(move || serve(stream, connection, &*handler, &requests));
            }
        });
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Answer requests on `stream` until the handler or the client ends it.
pub fn serve(stream: TcpStream, connection: usize, handler: &Handler, requests: &Mutex<Vec<Recorded>>) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);
    let mut index = 0;
    while let Some((head, body)) = read_request(&mut reader) {
        let request = Recorded {
            head,
            body,
            connection,
            index,
        };
        requests.lock().unwrap().push(request.clone());
        index += 1;

        match handler(&request) {
            Reply::Send(segments) => {
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        thread::sleep(Duration::from_millis(50));
                    }
                    if writer.write_all(segment).and_then(|()| writer.flush()).is_err() {
                        return;
                    }
                }
            }
            Reply::SendAndClose(response) => {
                let _ = writer.write_all(&response);
                let _ = writer.shutdown(std::net::Shutdown::Both);
                return;
            }
            Reply::Hangup => {
                let _ = writer.shutdown(std::net::Shutdown::Both);
                return;
            }
        }
    }
}

/// Head and `Content-Length` body of the next request, or `None` at EOF.
pub fn read_request<R: BufRead>(reader: &mut R) -> Option<(String, Vec<u8>)> {
    let mut head = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        if line == "\r\n" || line == "\n" {
            if head.is_empty() {
                continue;
            }
            break;
        }
        head.push_str(&line);
    }

    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("Content-Length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;
    Some((head.trim_end().to_string(), body))
}
