//! The request-line step: `METHOD SP request-target SP HTTP/1.x CRLF`.

use crate::codec::ParseState;
use crate::protocol::{HttpError, Method, Request, Version};
use crate::stream::{match_literal, match_until, Revert, StreamCursor, Token};

pub(super) fn apply(cursor: &mut StreamCursor, request: &mut Request) -> Result<ParseState, HttpError> {
    let mut cursor = Revert::new(cursor);

    // Method, by first literal match against the method table
    let mut found = None;
    for method in Method::ALL {
        if match_literal(method.as_str().as_bytes(), &mut cursor) {
            found = Some(method);
            break;
        }
    }
    let Some(method) = found else {
        // a proper prefix of a method literal may still grow into one
        let partial = cursor.tail();
        let may_extend =
            Method::ALL.iter().any(|method| method.as_str().as_bytes().starts_with(partial) && partial.len() < method.as_str().len());
        if may_extend {
            return Ok(ParseState::Again);
        }
        return Err(HttpError::bad_request("Unknown HTTP request method"));
    };
    request.method = method;

    // SP
    match cursor.current() {
        None => return Ok(ParseState::Again),
        Some(b' ') => {}
        Some(_) => return Err(HttpError::bad_request("Malformed HTTP request after Method, expected SP")),
    }
    if !cursor.advance(1) {
        return Ok(ParseState::Again);
    }

    // Resource path, up to the first SP or '?'
    let resource = Token::new(&cursor);
    loop {
        match cursor.current() {
            None => return Ok(ParseState::Again),
            Some(b' ') | Some(b'?') => break,
            Some(_) => {
                cursor.advance(1);
            }
        }
    }
    request.resource = resource.text(&cursor);

    // Query parameters of the request target
    if cursor.current() == Some(b'?') {
        if !cursor.advance(1) {
            return Ok(ParseState::Again);
        }

        while cursor.current() != Some(b' ') {
            if cursor.eof() {
                return Ok(ParseState::Again);
            }

            let key = Token::new(&cursor);
            if !match_until(b"=", &mut cursor) {
                return Ok(ParseState::Again);
            }
            let key = key.text(&cursor);

            if !cursor.advance(1) {
                return Ok(ParseState::Again);
            }

            let value = Token::new(&cursor);
            if !match_until(b" &", &mut cursor) {
                return Ok(ParseState::Again);
            }
            request.query.add(key, value.text(&cursor));

            if cursor.current() == Some(b'&') {
                cursor.advance(1);
            }
        }
    }

    // SP
    if !cursor.advance(1) {
        return Ok(ParseState::Again);
    }

    // HTTP-Version, up to CRLF
    let version = Token::new(&cursor);
    while !cursor.eol() {
        if !cursor.advance(1) {
            return Ok(ParseState::Again);
        }
    }
    request.version = Version::try_from(version.raw(&cursor))?;

    if !cursor.advance(2) {
        return Ok(ParseState::Again);
    }

    cursor.commit();
    Ok(ParseState::Next)
}
