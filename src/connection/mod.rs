//! Per-connection state and the glue between transport, parser, and
//! handler.
//!
//! A [`Peer`] is the server-side identity of one connected client: it owns
//! the socket and is shared (via `Arc`) between the worker that drives the
//! connection and any [`Response`](crate::protocol::Response) still
//! holding a weak reference to it. A [`Connection`] couples the peer with
//! a small per-connection key/value store; the request parser lives in
//! that store under [`PARSER_DATA`], attached when the connection is set
//! up and destroyed with it.

use std::any::Any;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, info, warn};

use crate::codec::{ParseState, RequestParser};
use crate::ensure;
use crate::handler::Handler;
use crate::protocol::{HttpError, Response, SendError};

/// Well-known data key under which the glue stores the request parser.
pub const PARSER_DATA: &str = "__parser";

/// One connected client: the socket plus identity.
#[derive(Debug)]
pub struct Peer {
    id: u64,
    addr: SocketAddr,
    stream: TcpStream,
}

impl Peer {
    pub fn new(id: u64, stream: TcpStream, addr: SocketAddr) -> Self {
        Self { id, addr, stream }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Writes a rendered response to the socket in a single transport
    /// send. A short write is reported, not retried.
    pub fn send(&self, bytes: &[u8]) -> Result<usize, SendError> {
        let written = (&self.stream).write(bytes)?;
        ensure!(written == bytes.len(), SendError::PartialWrite { written, expected: bytes.len() });
        Ok(written)
    }

    pub(crate) fn receive(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.stream).read(buf)
    }
}

impl AsRawFd for Peer {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

/// Small per-connection key/value store, keyed by short string constants.
#[derive(Default)]
pub struct DataMap {
    entries: Vec<(&'static str, Box<dyn Any + Send>)>,
}

impl DataMap {
    pub fn put<T: Any + Send>(&mut self, key: &'static str, value: T) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = Box::new(value),
            None => self.entries.push((key, Box::new(value))),
        }
    }

    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(existing, _)| *existing == key).and_then(|(_, value)| value.downcast_ref())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.iter_mut().find(|(existing, _)| *existing == key).and_then(|(_, value)| value.downcast_mut())
    }
}

/// The per-connection glue driving parser, handler, and response.
pub struct Connection {
    peer: Arc<Peer>,
    data: DataMap,
}

impl Connection {
    /// Sets up a freshly accepted connection, attaching a new parser
    /// under [`PARSER_DATA`].
    pub fn new(peer: Arc<Peer>) -> Self {
        let mut data = DataMap::default();
        data.put(PARSER_DATA, RequestParser::new());
        Self { peer, data }
    }

    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    pub fn data(&self) -> &DataMap {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataMap {
        &mut self.data
    }

    /// Feeds received bytes to the parser and dispatches the outcome: a
    /// complete request goes to the handler, a protocol error is answered
    /// with its status and reason, a handler failure with 500. The parser
    /// is reset after each outcome so the next request parses fresh.
    pub fn on_input<H: Handler>(&mut self, bytes: &[u8], handler: &H) {
        if let Err(error) = self.process(bytes, handler) {
            debug!(status = %error.status(), reason = %error.reason(), "answering failed request");

            let mut response = Response::new(Arc::downgrade(&self.peer));
            if let Err(send_error) = response.send_with(error.status(), error.reason().as_bytes(), None) {
                warn!(cause = %send_error, "could not deliver error response");
            }

            if let Some(parser) = self.data.get_mut::<RequestParser>(PARSER_DATA) {
                parser.reset();
            }
        }
    }

    fn process<H: Handler>(&mut self, bytes: &[u8], handler: &H) -> Result<(), HttpError> {
        let peer = Arc::clone(&self.peer);
        let parser = self.data.get_mut::<RequestParser>(PARSER_DATA).expect("parser attached at connection setup");

        if !parser.feed(bytes) {
            return Err(HttpError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request exceeded maximum buffer size"));
        }

        if parser.parse()? == ParseState::Done {
            let request = parser.take_request();
            info!(method = %request.method(), resource = %request.resource(), "received request");

            let response = Response::new(Arc::downgrade(&peer));
            let outcome = handler.on_request(request, response);
            parser.reset();

            if let Err(error) = outcome {
                return Err(HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()));
            }
        }

        Ok(())
    }
}
