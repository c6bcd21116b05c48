use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use nano_http::connection::{Connection, Peer};
use nano_http::handler::{make_handler, BoxError};
use nano_http::protocol::{Method, Request, Response};

fn connection_pair() -> (Connection, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (accepted, peer_addr) = listener.accept().unwrap();
    (Connection::new(Arc::new(Peer::new(1, accepted, peer_addr))), client)
}

fn read_response(mut client: TcpStream, connection: Connection) -> String {
    drop(connection);
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).unwrap();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn test_complete_request_reaches_handler() {
    let (mut connection, client) = connection_pair();

    let handler = make_handler(|request: Request, mut response: Response| -> Result<(), BoxError> {
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.resource(), "/greet");
        response.send_with(StatusCode::OK, b"hello", Some(mime::TEXT_PLAIN))?;
        Ok(())
    });

    connection.on_input(b"GET /greet HTTP/1.1\r\nHost: test\r\n\r\n", &handler);

    let text = read_response(client, connection);
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.ends_with("\r\n\r\nhello"));
}

#[test]
fn test_request_arriving_in_fragments_dispatches_once() {
    let (mut connection, client) = connection_pair();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let handler = make_handler(move |request: Request, mut response: Response| -> Result<(), BoxError> {
        seen.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.body(), b"abc");
        response.send(StatusCode::NO_CONTENT)?;
        Ok(())
    });

    connection.on_input(b"POST /x HTTP/1.0\r\nConte", &handler);
    connection.on_input(b"nt-Length: 3\r\n\r\na", &handler);
    connection.on_input(b"bc", &handler);

    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let text = read_response(client, connection);
    assert!(text.starts_with("HTTP/1.1 204 No Content\r\n"));
}

#[test]
fn test_protocol_error_is_answered_with_status_and_reason() {
    let (mut connection, client) = connection_pair();

    let handler = make_handler(|_request: Request, _response: Response| -> Result<(), BoxError> {
        panic!("handler must not run for a malformed request");
    });

    connection.on_input(b"FOO / HTTP/1.1\r\n\r\n", &handler);

    let text = read_response(client, connection);
    assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"), "got: {text}");
    assert!(text.ends_with("Unknown HTTP request method"));
}

#[test]
fn test_handler_error_maps_to_internal_server_error() {
    let (mut connection, client) = connection_pair();

    let handler = make_handler(|_request: Request, _response: Response| -> Result<(), BoxError> {
        Err("database exploded".into())
    });

    connection.on_input(b"GET / HTTP/1.1\r\n\r\n", &handler);

    let text = read_response(client, connection);
    assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "got: {text}");
    assert!(text.ends_with("database exploded"));
}

#[test]
fn test_buffer_overflow_maps_to_payload_too_large() {
    let (mut connection, client) = connection_pair();

    let handler = make_handler(|_request: Request, _response: Response| -> Result<(), BoxError> {
        panic!("handler must not run for an oversized request");
    });

    let oversized = vec![b'a'; nano_http::MAX_REQUEST_BUFFER + 1];
    connection.on_input(&oversized, &handler);

    let text = read_response(client, connection);
    assert!(text.starts_with("HTTP/1.1 413 "), "got: {text}");
    assert!(text.ends_with("Request exceeded maximum buffer size"));
}

#[test]
fn test_parser_recovers_after_protocol_error() {
    let (mut connection, client) = connection_pair();

    let handler = make_handler(|_request: Request, mut response: Response| -> Result<(), BoxError> {
        response.send(StatusCode::OK)?;
        Ok(())
    });

    connection.on_input(b"GET / HTTP/2.0\r\n\r\n", &handler);
    connection.on_input(b"GET / HTTP/1.1\r\n\r\n", &handler);

    let text = read_response(client, connection);
    let bad = text.find("HTTP/1.1 400 Bad Request").unwrap();
    let ok = text.find("HTTP/1.1 200 OK").unwrap();
    assert!(bad < ok, "error response first, fresh parse afterwards: {text}");
}
