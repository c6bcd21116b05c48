//! The response value and its serializer.
//!
//! A [`Response`] owns an ordered header collection and a fixed-size
//! scratch buffer the serializer renders into; the rendered bytes are
//! handed to the peer in a single send. The association to the peer is
//! weak: a client that disconnects between handler invocation and `send`
//! turns the send into an observable broken-pipe failure instead of a
//! write to a dangling socket.

use std::fmt::{self, Write as _};
use std::sync::Weak;

use bytes::BytesMut;
use http::StatusCode;
use mime::Mime;

use crate::connection::Peer;
use crate::ensure;
use crate::headers::{Collection, ContentType};
use crate::protocol::SendError;
use crate::MAX_RESPONSE_BUFFER;

pub struct Response {
    headers: Collection,
    scratch: BytesMut,
    limit: usize,
    peer: Weak<Peer>,
}

impl Response {
    pub fn new(peer: Weak<Peer>) -> Self {
        Self {
            headers: Collection::default(),
            scratch: BytesMut::with_capacity(MAX_RESPONSE_BUFFER),
            limit: MAX_RESPONSE_BUFFER,
            peer,
        }
    }

    pub fn headers(&self) -> &Collection {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Collection {
        &mut self.headers
    }

    /// Sends a bodyless response with the given status.
    pub fn send(&mut self, status: StatusCode) -> Result<usize, SendError> {
        self.send_with(status, b"", None)
    }

    /// Renders the status line, headers, and body into the scratch buffer
    /// and hands the whole rendering to the peer.
    ///
    /// When `mime` is given and a Content-Type header is already present,
    /// its MIME is replaced in place; otherwise a Content-Type header is
    /// appended. A non-empty body gets an automatic Content-Length. Every
    /// write is bounds-checked against the scratch buffer; on overflow the
    /// send fails and no bytes reach the peer.
    pub fn send_with(&mut self, status: StatusCode, body: &[u8], mime: Option<Mime>) -> Result<usize, SendError> {
        if let Some(mime) = mime {
            match self.headers.typed_mut::<ContentType>() {
                Some(content_type) => content_type.set_mime(mime),
                None => self.headers.add(Box::new(ContentType::new(mime))),
            }
        }

        self.scratch.clear();
        let mut out = BoundedWriter { buf: &mut self.scratch, limit: self.limit };
        render(&mut out, status, &self.headers, body.len()).map_err(|_| SendError::InsufficientSpace)?;

        if !body.is_empty() {
            ensure!(self.scratch.len() + body.len() <= self.limit, SendError::InsufficientSpace);
            self.scratch.extend_from_slice(body);
        }

        let peer = self.peer.upgrade().ok_or(SendError::BrokenPipe)?;
        peer.send(&self.scratch)
    }
}

fn render(out: &mut BoundedWriter<'_>, status: StatusCode, headers: &Collection, body_len: usize) -> fmt::Result {
    write!(out, "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or("Unknown"))?;

    for entry in headers.iter() {
        write!(out, "{}: ", entry.name())?;
        entry.write_value(out)?;
        out.write_str("\r\n")?;
    }

    if body_len > 0 {
        write!(out, "Content-Length: {body_len}\r\n\r\n")?;
    } else {
        out.write_str("\r\n")?;
    }

    Ok(())
}

// fmt adapter over the scratch buffer; a write past the limit reports
// fmt::Error, which the serializer maps to InsufficientSpace.
struct BoundedWriter<'a> {
    buf: &'a mut BytesMut,
    limit: usize,
}

impl fmt::Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > self.limit {
            return Err(fmt::Error);
        }
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_writer_rejects_overflow() {
        let mut buf = BytesMut::new();
        let mut out = BoundedWriter { buf: &mut buf, limit: 4 };
        assert!(out.write_str("abcd").is_ok());
        assert!(out.write_str("e").is_err());
        assert_eq!(&buf[..], b"abcd");
    }

    #[test]
    fn test_render_without_body_ends_with_blank_line() {
        let mut buf = BytesMut::new();
        let mut out = BoundedWriter { buf: &mut buf, limit: 1024 };
        render(&mut out, StatusCode::NO_CONTENT, &Collection::default(), 0).unwrap();
        assert_eq!(&buf[..], b"HTTP/1.1 204 No Content\r\n\r\n");
    }
}
