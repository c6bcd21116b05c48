//! The parser driver: owns the buffer, the in-progress request, and the
//! current step, and runs the steps in order across resumptions.

use tracing::trace;

use crate::codec::{body, headers, request_line, ParseState};
use crate::protocol::{HttpError, Request};
use crate::stream::{ArrayBuffer, StreamCursor};
use crate::MAX_REQUEST_BUFFER;

/// The ordered parser stages; one request walks them front to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    RequestLine,
    Headers,
    Body,
}

impl Step {
    fn next(self) -> Self {
        match self {
            Step::RequestLine => Step::Headers,
            Step::Headers | Step::Body => Step::Body,
        }
    }
}

/// Incremental request parser, one per connection.
///
/// Bytes are appended with [`feed`](Self::feed) as they arrive and
/// [`parse`](Self::parse) is called after every append; it reports
/// [`ParseState::Again`] until a whole request has been consumed. The
/// driver never reads past the end of the current request; a
/// [`reset`](Self::reset) is required before the next request can be
/// parsed on the same connection.
pub struct RequestParser {
    buffer: ArrayBuffer,
    position: usize,
    step: Step,
    body_progress: Option<usize>,
    request: Request,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_capacity(MAX_REQUEST_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: ArrayBuffer::with_capacity(capacity),
            position: 0,
            step: Step::RequestLine,
            body_progress: None,
            request: Request::default(),
        }
    }

    /// Appends arriving bytes; `false` means the bounded buffer would
    /// overflow and nothing was appended. The caller should reset the
    /// parser and fail the request as too large.
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        self.buffer.feed(bytes)
    }

    /// Runs the current step over the buffered bytes, advancing through
    /// the steps within the same call as sections complete.
    pub fn parse(&mut self) -> Result<ParseState, HttpError> {
        loop {
            let mut cursor = StreamCursor::with_position(self.buffer.as_slice(), self.position);

            let state = match self.step {
                Step::RequestLine => request_line::apply(&mut cursor, &mut self.request),
                Step::Headers => headers::apply(&mut cursor, &mut self.request),
                Step::Body => body::apply(&mut cursor, &mut self.request, &mut self.body_progress),
            };

            self.position = cursor.position();

            match state? {
                ParseState::Next => {
                    trace!(step = ?self.step, "section complete");
                    self.step = self.step.next();
                }
                state => return Ok(state),
            }
        }
    }

    /// Takes the parsed request out, leaving an empty one behind.
    pub fn take_request(&mut self) -> Request {
        std::mem::take(&mut self.request)
    }

    /// A view of the in-progress request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Restores the fresh-parser state without deallocating: clears the
    /// buffer and the request fields and rewinds to the first step.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.position = 0;
        self.step = Step::RequestLine;
        self.body_progress = None;
        self.request.clear();
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Method, Version};

    #[test]
    fn test_steps_advance_in_a_single_parse_call() {
        let mut parser = RequestParser::new();
        assert!(parser.feed(b"GET /index HTTP/1.1\r\nHost: x\r\n\r\n"));
        assert_eq!(parser.parse().unwrap(), ParseState::Done);

        let request = parser.take_request();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.resource(), "/index");
        assert_eq!(request.version(), Version::Http11);
    }

    #[test]
    fn test_reset_restores_fresh_state() {
        let mut parser = RequestParser::new();
        assert!(parser.feed(b"POST /a HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi"));
        assert_eq!(parser.parse().unwrap(), ParseState::Done);

        parser.reset();
        assert!(parser.feed(b"GET /b HTTP/1.0\r\n\r\n"));
        assert_eq!(parser.parse().unwrap(), ParseState::Done);

        let request = parser.take_request();
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.resource(), "/b");
        assert_eq!(request.version(), Version::Http10);
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_error_position_does_not_matter_after_reset() {
        let mut parser = RequestParser::new();
        assert!(parser.feed(b"FOO / HTTP/1.1\r\n\r\n"));
        assert!(parser.parse().is_err());

        parser.reset();
        assert!(parser.feed(b"GET / HTTP/1.1\r\n\r\n"));
        assert_eq!(parser.parse().unwrap(), ParseState::Done);
    }
}
