//! Error types for request parsing and response sending.
//!
//! [`HttpError`] is the protocol-level error: it carries the HTTP status
//! code to answer with and a human-readable reason. The parser raises it
//! and never retries; the connection glue recovers by turning it into a
//! response and resetting the parser. [`SendError`] covers everything that
//! can go wrong between a rendered response and the peer's socket.

use std::borrow::Cow;
use std::io;

use http::StatusCode;
use thiserror::Error;

/// A protocol error with the status code it should be answered with.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct HttpError {
    status: StatusCode,
    reason: Cow<'static, str>,
}

impl HttpError {
    pub fn new(status: StatusCode, reason: impl Into<Cow<'static, str>>) -> Self {
        Self { status, reason: reason.into() }
    }

    /// A 400 with the given reason, the default for malformed requests.
    pub fn bad_request(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, reason)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Errors that occur while rendering or transmitting a response.
#[derive(Error, Debug)]
pub enum SendError {
    /// The rendered response does not fit the fixed scratch buffer. No
    /// bytes have been handed to the peer.
    #[error("could not write response: insufficient space")]
    InsufficientSpace,

    /// The peer disconnected before the response was sent.
    #[error("broken pipe: peer is gone")]
    BrokenPipe,

    /// The transport accepted fewer bytes than the rendered response.
    #[error("partial write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    /// I/O error from the transport.
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}
