//! Client behavior against a scripted server.

mod common;

use common::{MockServer, Reply};
use flate2::write::GzEncoder;
use flate2::Compression;
use http::StatusCode;
use proxynet::{ErrorKind, HttpClient, NetError, RequestBody};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[test]
fn test_get_sends_computed_headers() {
    let server = MockServer::start(|_| Reply::ok("hello"));
    let mut client = HttpClient::new();
    client.user_agent("proxynet-test").unwrap();

    let body = client.get_string(&server.url("/path?x=1")).unwrap();
    assert_eq!(body, "hello");

    let requests = server.requests();
    let request = &requests[0];
    assert_eq!(request.start_line(), "GET /path?x=1 HTTP/1.1");
    assert_eq!(request.header("Host"), Some(format!("127.0.0.1:{}", server.port()).as_str()));
    assert_eq!(request.header("Connection"), Some("keep-alive"));
    assert_eq!(request.header("Accept-Encoding"), Some("gzip,deflate"));
    assert_eq!(request.header("User-Agent"), Some("proxynet-test"));
}

#[test]
fn test_keep_alive_budget() {
    let server = MockServer::start(|_| Reply::ok("ok"));
    let mut client = HttpClient::builder().maximum_keep_alive_requests(2).build();

    for _ in 0..3 {
        assert_eq!(client.get_string(&server.url("/")).unwrap(), "ok");
    }

    assert_eq!(server.connections(), 2);
    let connections: Vec<_> = server.requests().iter().map(|r| r.connection).collect();
    assert_eq!(connections, vec![0, 0, 1]);
}

#[test]
fn test_server_keep_alive_max_overrides_client() {
    let server = MockServer::start(|_| {
        Reply::raw("HTTP/1.1 200 OK\r\nKeep-Alive: timeout=5, max=1\r\nContent-Length: 2\r\n\r\nok")
    });
    let mut client = HttpClient::new();

    client.get_string(&server.url("/")).unwrap();
    let response = client.response().unwrap();
    assert_eq!(response.keep_alive_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(response.maximum_keep_alive_requests(), Some(1));

    client.get_string(&server.url("/")).unwrap();
    assert_eq!(server.connections(), 2);
}

#[test]
fn test_keep_alive_disabled() {
    let server = MockServer::start(|_| Reply::ok("ok"));
    let mut client = HttpClient::builder().keep_alive(false).build();

    client.get_string(&server.url("/")).unwrap();
    client.get_string(&server.url("/")).unwrap();

    assert_eq!(server.requests()[0].header("Connection"), Some("close"));
    assert_eq!(server.connections(), 2);
}

#[test]
fn test_unread_body_is_drained_before_reuse() {
    let server = MockServer::start(|r| Reply::ok(if r.index == 0 { "first body" } else { "second" }));
    let mut client = HttpClient::new();

    let response = client.get(&server.url("/one")).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);

    assert_eq!(client.get_string(&server.url("/two")).unwrap(), "second");
    assert_eq!(server.connections(), 1);
}

#[test]
fn test_chunked_body_and_reuse() {
    let server = MockServer::start(|r| {
        if r.index == 0 {
            Reply::raw("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nabcde\r\n3\r\nxyz\r\n0\r\n\r\n")
        } else {
            Reply::ok("next")
        }
    });
    let mut client = HttpClient::new();

    assert_eq!(client.get_string(&server.url("/")).unwrap(), "abcdexyz");
    assert_eq!(client.get_string(&server.url("/")).unwrap(), "next");
    assert_eq!(server.connections(), 1);
}

#[test]
fn test_gzip_body() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"compressed payload").unwrap();
    let gzipped = encoder.finish().unwrap();

    let server = MockServer::start(move |_| {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\n\r\n",
            gzipped.len()
        )
        .into_bytes();
        response.extend_from_slice(&gzipped);
        Reply::raw(response)
    });
    let mut client = HttpClient::new();

    assert_eq!(client.get_string(&server.url("/")).unwrap(), "compressed payload");
    assert_eq!(client.get_string(&server.url("/")).unwrap(), "compressed payload");
    assert_eq!(server.connections(), 1);
}

#[test]
fn test_html_close_delimited_sniffing() {
    let server = MockServer::start(|_| {
        Reply::Send(vec![
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html><body>hi".to_vec(),
            b"</body></HTML>".to_vec(),
        ])
    });
    let mut client = HttpClient::builder()
        .read_write_timeout(Duration::from_secs(5))
        .build();

    let body = client.get_string(&server.url("/")).unwrap();
    assert_eq!(body, "<html><body>hi</body></HTML>");
}

#[test]
fn test_close_delimited_body() {
    let server = MockServer::start(|_| {
        Reply::SendAndClose(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nuntil close".to_vec())
    });
    let mut client = HttpClient::new();

    assert_eq!(client.get_string(&server.url("/")).unwrap(), "until close");
    assert_eq!(client.get_string(&server.url("/")).unwrap(), "until close");
    assert_eq!(server.connections(), 2);
}

#[test]
fn test_head_has_no_body() {
    let server = MockServer::start(|r| {
        if r.start_line().starts_with("HEAD") {
            Reply::raw("HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n")
        } else {
            Reply::ok("after")
        }
    });
    let mut client = HttpClient::new();

    let body = client.raw(http::Method::HEAD, &server.url("/"), None).unwrap().bytes().unwrap();
    assert!(body.is_empty());
    assert_eq!(client.get_string(&server.url("/")).unwrap(), "after");
    assert_eq!(server.connections(), 1);
}

#[test]
fn test_status_policy() {
    let server = MockServer::start(|_| Reply::raw("HTTP/1.1 404 Not Found\r\nContent-Length: 4\r\n\r\ngone"));
    let mut client = HttpClient::new();

    let err = client.get(&server.url("/missing")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolError);
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(client.response().unwrap().status(), StatusCode::NOT_FOUND);

    client.config_mut().ignore_protocol_errors = true;
    let mut response = client.get(&server.url("/missing")).unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response.is_ok());
    assert_eq!(response.text().unwrap(), "gone");
}

#[test]
fn test_cookies_round_trip_and_expiry() {
    let server = MockServer::start(|r| {
        if r.index == 0 {
            Reply::raw(
                "HTTP/1.1 200 OK\r\n\
                 Set-Cookie: a=1; expires=Mon, 01 Jan 2001 00:00:00 GMT\r\n\
                 Set-Cookie: b=2; path=/\r\n\
                 Set-Cookie: c=deleted\r\n\
                 Content-Length: 0\r\n\r\n",
            )
        } else {
            Reply::ok("")
        }
    });
    let mut client = HttpClient::new();
    client.cookies_mut().insert("c", "old");

    client.get(&server.url("/")).unwrap().none().unwrap();
    assert!(!client.cookies().contains("a"));
    assert!(!client.cookies().contains("c"));
    assert_eq!(client.cookies().get("b"), Some("2"));

    client.get(&server.url("/")).unwrap().none().unwrap();
    assert_eq!(server.requests()[1].header("Cookie"), Some("b=2"));
}

#[test]
fn test_post_content_length_matches_bytes_sent() {
    let server = MockServer::start(|_| Reply::ok("done"));
    let mut client = HttpClient::new();

    let payload = "x".repeat(20_000);
    client
        .post(&server.url("/upload"), Some(RequestBody::from(payload.as_str())))
        .unwrap()
        .none()
        .unwrap();
    client.get_string(&server.url("/after")).unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].header("Content-Length"), Some("20000"));
    assert_eq!(requests[0].body, payload.as_bytes());
    // The next request on the same connection parsed cleanly, so no extra bytes were sent.
    assert_eq!(requests[1].start_line(), "GET /after HTTP/1.1");
    assert_eq!(requests[1].connection, 0);
}

#[test]
fn test_body_ignored_for_get_and_empty_post() {
    let server = MockServer::start(|_| Reply::ok(""));
    let mut client = HttpClient::new();

    client.raw(http::Method::GET, &server.url("/"), Some(RequestBody::from("ignored"))).unwrap();
    client.post(&server.url("/"), None).unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].header("Content-Length"), None);
    assert!(requests[0].body.is_empty());
    assert_eq!(requests[1].header("Content-Length"), Some("0"));
    assert_eq!(requests[1].header("Content-Type"), None);
}

#[test]
fn test_oneshot_state_applies_once() {
    let server = MockServer::start(|_| Reply::ok(""));
    let mut client = HttpClient::new();
    client.set_header("X-Persistent", "p").unwrap();

    client.add_header("X-Once", "1").unwrap();
    client.add_url_param("page", 2);
    client.add_param("name", "a b");
    client.post(&server.url("/form?x=1"), None).unwrap();
    client.post(&server.url("/form"), None).unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].start_line(), "POST /form?x=1&page=2 HTTP/1.1");
    assert_eq!(requests[0].header("X-Once"), Some("1"));
    assert_eq!(requests[0].header("Content-Type"), Some("application/x-www-form-urlencoded"));
    assert_eq!(requests[0].body, b"name=a+b");

    assert_eq!(requests[1].start_line(), "POST /form HTTP/1.1");
    assert_eq!(requests[1].header("X-Once"), None);
    assert_eq!(requests[1].header("X-Persistent"), Some("p"));
    assert!(requests[1].body.is_empty());
}

#[test]
fn test_multipart_fields_and_file() {
    let server = MockServer::start(|_| Reply::ok(""));
    let mut client = HttpClient::new();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, "file contents").unwrap();

    client.add_field("title", "hello");
    client.add_file("upload", &path);
    client.post(&server.url("/multipart"), None).unwrap();
    client.get(&server.url("/after")).unwrap();

    let requests = server.requests();
    let content_type = requests[0].header("Content-Type").unwrap();
    let boundary = content_type.strip_prefix("multipart/form-data; boundary=").unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();

    assert_eq!(requests[0].header("Content-Length"), Some(body.len().to_string().as_str()));
    assert!(body.starts_with(&format!("--{boundary}\r\n")));
    assert!(body.contains("Content-Disposition: form-data; name=\"title\"\r\n\r\nhello\r\n"));
    assert!(body.contains("name=\"upload\"; filename=\"note.txt\"\r\nContent-Type: text/plain\r\n\r\nfile contents\r\n"));
    assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    assert_eq!(requests[1].start_line(), "GET /after HTTP/1.1");
}

#[test]
fn test_progress_events() {
    let server = MockServer::start(|_| Reply::ok("0123456789"));
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let downloads = Arc::new(Mutex::new(Vec::new()));

    let mut client = HttpClient::builder().send_buffer_size(64).build();
    let sink = Arc::clone(&uploads);
    client.on_upload_progress(move |p| sink.lock().unwrap().push((p.bytes_sent, p.total_bytes)));
    let sink = Arc::clone(&downloads);
    client.on_download_progress(move |p| sink.lock().unwrap().push((p.bytes_received, p.total_bytes)));

    let payload = vec![b'a'; 1000];
    let body = client
        .post(&server.url("/"), Some(RequestBody::from(payload)))
        .unwrap()
        .bytes()
        .unwrap();
    assert_eq!(&body[..], b"0123456789");

    let uploads = uploads.lock().unwrap();
    assert!(uploads.len() > 1);
    let (sent, total) = *uploads.last().unwrap();
    assert_eq!(sent, total);
    assert!(uploads.windows(2).all(|w| w[0].0 < w[1].0));

    let downloads = downloads.lock().unwrap();
    assert_eq!(downloads.last(), Some(&(10, Some(10))));
}

#[test]
fn test_download_file() {
    let server = MockServer::start(|_| Reply::ok("saved to disk"));
    let mut client = HttpClient::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.bin");

    let written = client.download_file(&server.url("/file"), &path).unwrap();
    assert_eq!(written, 13);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "saved to disk");
}

#[test]
fn test_body_consumed_once() {
    let server = MockServer::start(|_| Reply::ok("once"));
    let mut client = HttpClient::new();

    let mut response = client.get(&server.url("/")).unwrap();
    assert_eq!(response.text().unwrap(), "once");
    assert!(response.message_body_loaded());
    assert!(response.bytes().unwrap().is_empty());
}

#[test]
fn test_base_address_and_basic_auth() {
    let server = MockServer::start(|_| Reply::ok(""));
    let mut client = HttpClient::builder()
        .base_address(url::Url::parse(&server.url("/api/")).unwrap())
        .credentials("user", "pass")
        .culture("fr-FR")
        .build();

    client.get("items").unwrap();
    let request = &server.requests()[0];
    assert_eq!(request.start_line(), "GET /api/items HTTP/1.1");
    assert_eq!(request.header("Authorization"), Some("Basic dXNlcjpwYXNz"));
    assert_eq!(request.header("Accept-Language"), Some("fr-FR,fr;q=0.8,en-US;q=0.6,en;q=0.4"));
}

#[test]
fn test_malformed_status_line() {
    let server = MockServer::start(|_| Reply::SendAndClose(b"SPDY/3 200 OK\r\n\r\n".to_vec()));
    let mut client = HttpClient::new();

    let err = client.get(&server.url("/")).unwrap_err();
    assert!(matches!(err, NetError::MalformedStatusLine { .. }));
    assert_eq!(err.kind(), ErrorKind::Other);
}
