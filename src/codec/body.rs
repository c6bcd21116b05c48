//! The body step: exactly `Content-Length` bytes after the blank line.
//!
//! This is the only step with persistent mid-section state, so it takes no
//! revert guard: consumed body bytes stay consumed across suspensions and
//! only the still-missing tail is read on resumption. `progress` is `None`
//! until the blank line separating headers from body has been consumed,
//! which keeps resumption idempotent even when the body bytes arrive in a
//! later read than the separator.

use crate::codec::ParseState;
use crate::headers::ContentLength;
use crate::protocol::{HttpError, Request};
use crate::stream::StreamCursor;

pub(super) fn apply(cursor: &mut StreamCursor, request: &mut Request, progress: &mut Option<usize>) -> Result<ParseState, HttpError> {
    let content_length = match request.headers.typed::<ContentLength>() {
        None => return Ok(ParseState::Done),
        Some(header) => header.value() as usize,
    };

    let bytes_read = match *progress {
        Some(bytes_read) => bytes_read,
        None => {
            // the blank line between headers and body
            if !cursor.advance(2) {
                return Ok(ParseState::Again);
            }
            // Content-Length is untrusted; no request exceeds the buffer bound
            request.body.reserve(content_length.min(crate::MAX_REQUEST_BUFFER));
            *progress = Some(0);
            0
        }
    };

    let wanted = content_length - bytes_read;
    let available = cursor.remaining().min(wanted);

    let start = cursor.position();
    cursor.advance(available);
    request.body.extend_from_slice(cursor.slice_from(start));

    let bytes_read = bytes_read + available;
    if bytes_read < content_length {
        *progress = Some(bytes_read);
        return Ok(ParseState::Again);
    }

    *progress = None;
    Ok(ParseState::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::Header;

    fn request_with_content_length(length: u64) -> Request {
        let mut request = Request::default();
        let mut header = ContentLength::default();
        header.parse_raw(length.to_string().as_bytes()).unwrap();
        request.headers.add(Box::new(header));
        request
    }

    #[test]
    fn test_no_content_length_means_empty_body() {
        let mut cursor = StreamCursor::new(b"\r\nignored");
        let mut request = Request::default();
        let mut progress = None;
        assert_eq!(apply(&mut cursor, &mut request, &mut progress).unwrap(), ParseState::Done);
        assert!(request.body().is_empty());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_full_body_in_one_pass() {
        let mut cursor = StreamCursor::new(b"\r\nabc");
        let mut request = request_with_content_length(3);
        let mut progress = None;
        assert_eq!(apply(&mut cursor, &mut request, &mut progress).unwrap(), ParseState::Done);
        assert_eq!(request.body(), b"abc");
        assert_eq!(progress, None);
    }

    #[test]
    fn test_partial_body_resumes_without_doubling() {
        let mut request = request_with_content_length(6);
        let mut progress = None;

        let mut cursor = StreamCursor::new(b"\r\nabc");
        assert_eq!(apply(&mut cursor, &mut request, &mut progress).unwrap(), ParseState::Again);
        assert_eq!(progress, Some(3));

        // the rest of the body is all the next invocation may consume
        let mut cursor = StreamCursor::new(b"def");
        assert_eq!(apply(&mut cursor, &mut request, &mut progress).unwrap(), ParseState::Done);
        assert_eq!(request.body(), b"abcdef");
    }

    #[test]
    fn test_separator_consumed_once_when_body_lags() {
        let mut request = request_with_content_length(2);
        let mut progress = None;

        // separator arrives alone; the step must not re-skip it later
        let mut cursor = StreamCursor::new(b"\r\n");
        assert_eq!(apply(&mut cursor, &mut request, &mut progress).unwrap(), ParseState::Again);
        assert_eq!(progress, Some(0));

        let mut cursor = StreamCursor::new(b"hi");
        assert_eq!(apply(&mut cursor, &mut request, &mut progress).unwrap(), ParseState::Done);
        assert_eq!(request.body(), b"hi");
    }

    #[test]
    fn test_zero_length_body_is_done_after_separator() {
        let mut cursor = StreamCursor::new(b"\r\n");
        let mut request = request_with_content_length(0);
        let mut progress = None;
        assert_eq!(apply(&mut cursor, &mut request, &mut progress).unwrap(), ParseState::Done);
        assert!(request.body().is_empty());
    }
}
