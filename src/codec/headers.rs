//! The headers step: `Name: value CRLF` fields up to the blank line.
//!
//! The terminating CRLF of the blank line is left in the stream; the body
//! step consumes it when it starts. Field values are trimmed of trailing
//! SP/HTAB. On suspension the whole section is re-parsed, which is safe
//! because the header collection replaces entries added under the same
//! canonical name.

use crate::codec::ParseState;
use crate::headers::{registry, Raw};
use crate::protocol::{HttpError, Request};
use crate::stream::{Revert, StreamCursor, Token};

pub(super) fn apply(cursor: &mut StreamCursor, request: &mut Request) -> Result<ParseState, HttpError> {
    let mut cursor = Revert::new(cursor);

    while !cursor.eol() {
        // field name, up to ':'
        let name = Token::new(&cursor);
        loop {
            match cursor.current() {
                None => return Ok(ParseState::Again),
                Some(b':') => break,
                Some(_) => {
                    cursor.advance(1);
                }
            }
        }
        let name = name.text(&cursor);
        cursor.advance(1);

        // any run of SP before the value
        while cursor.current() == Some(b' ') {
            cursor.advance(1);
        }

        // field value, up to CRLF
        let value = Token::new(&cursor);
        while !cursor.eol() {
            if !cursor.advance(1) {
                return Ok(ParseState::Again);
            }
        }
        let raw_value = trim_trailing_whitespace(value.raw(&cursor));

        match registry::make_header(&name) {
            Some(mut header) => {
                header.parse_raw(raw_value)?;
                request.headers.add(header);
            }
            None => {
                let value = String::from_utf8_lossy(raw_value).into_owned();
                request.headers.add_raw(Raw::new(name, value));
            }
        }

        // CRLF
        if !cursor.advance(2) {
            return Ok(ParseState::Again);
        }
    }

    cursor.commit();
    Ok(ParseState::Next)
}

fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && matches!(bytes[end - 1], b' ' | b'\t') {
        end -= 1;
    }
    &bytes[..end]
}
