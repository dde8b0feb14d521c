use crate::base::neterror::{ErrorKind, NetError};
use crate::socket::proxy::{ProxyError, ProxyErrorKind};
use http::StatusCode;

#[test]
fn test_protocol_error_carries_status() {
    let err = NetError::HttpStatus {
        host: "example.com".to_string(),
        status: StatusCode::NOT_FOUND,
    };
    assert_eq!(err.kind(), ErrorKind::ProtocolError);
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.host(), Some("example.com"));
}

#[test]
fn test_malformed_wire_data_is_other() {
    let errors = [
        NetError::MalformedStatusLine {
            host: "h".into(),
            line: "garbage".into(),
        },
        NetError::MalformedHeader {
            host: "h".into(),
            line: "NoColon".into(),
        },
        NetError::InvalidChunkSize {
            host: "h".into(),
            line: "zz".into(),
        },
        NetError::UnsupportedEncoding {
            host: "h".into(),
            encoding: "br".into(),
        },
    ];
    for err in errors {
        assert_eq!(err.kind(), ErrorKind::Other, "{err}");
        assert!(err.status().is_none());
    }
}

#[test]
fn test_empty_response_flag() {
    let err = NetError::EmptyResponse { host: "h".into() };
    assert!(err.is_empty_response());
    assert_eq!(err.kind(), ErrorKind::ReceiveFailure);

    let other = NetError::WaitDataTimeout { host: "h".into() };
    assert!(!other.is_empty_response());
}

#[test]
fn test_proxy_failure_is_connect_failure() {
    let err = NetError::ProxyConnectFailed {
        host: "example.com".into(),
        source: ProxyError::new("socks5 127.0.0.1:1080", ProxyErrorKind::AuthFailed),
    };
    assert_eq!(err.kind(), ErrorKind::ConnectFailure);
    let proxy = err.proxy_error().unwrap();
    assert_eq!(proxy.proxy(), "socks5 127.0.0.1:1080");
    assert_eq!(proxy.kind(), &ProxyErrorKind::AuthFailed);
}
