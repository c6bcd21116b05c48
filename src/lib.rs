//! An embeddable, readiness-driven HTTP/1.x server core.
//!
//! The crate accepts TCP connections, incrementally parses request bytes
//! into a [`protocol::Request`] as they arrive, hands the request to a
//! user-supplied [`handler::Handler`] together with a
//! [`protocol::Response`], and serializes the response back onto the
//! connection. I/O is never awaited inside the engine: a fixed pool of
//! workers blocks in [`polling::Poller::poll`] and dispatches readiness
//! events to the connections it owns, and the parser suspends (instead of
//! blocking) whenever a request section is still incomplete.
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use nano_http::handler::{make_handler, BoxError};
//! use nano_http::protocol::{Request, Response};
//! use nano_http::server::Server;
//!
//! let handler = make_handler(|_request: Request, mut response: Response| -> Result<(), BoxError> {
//!     response.send_with(StatusCode::OK, b"Hello, World!", Some(mime::TEXT_PLAIN))?;
//!     Ok(())
//! });
//!
//! let server = Server::builder().address("127.0.0.1:8080").build().expect("bind");
//! server.serve(handler).expect("serve");
//! ```

pub mod codec;
pub mod connection;
pub mod handler;
pub mod headers;
pub mod polling;
pub mod protocol;
pub mod server;
pub mod stream;

/// Capacity of the per-connection request buffer.
pub const MAX_REQUEST_BUFFER: usize = 4096;

/// Capacity of the response scratch buffer.
pub const MAX_RESPONSE_BUFFER: usize = MAX_REQUEST_BUFFER << 1;

/// Most events one `poll` call collects.
pub const MAX_EVENTS: usize = 1024;

pub(crate) use help::ensure;

mod help {

    macro_rules! ensure {
        ($predicate:expr, $error:expr) => {
            if !$predicate {
                return Err($error);
            }
        };
    }
    pub(crate) use ensure;
}
