//! The typed headers the engine itself consumes.

use std::any::Any;
use std::fmt;

use mime::Mime;

use crate::headers::Header;
use crate::protocol::HttpError;

/// `Content-Length`, the body size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentLength(u64);

impl ContentLength {
    pub const NAME: &'static str = "Content-Length";

    pub fn new(length: u64) -> Self {
        Self(length)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Header for ContentLength {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse_raw(&mut self, raw: &[u8]) -> Result<(), HttpError> {
        let text = std::str::from_utf8(raw).map_err(|_| HttpError::bad_request("Invalid Content-Length header"))?;
        self.0 = text.trim().parse().map_err(|_| HttpError::bad_request("Invalid Content-Length header"))?;
        Ok(())
    }

    fn write(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.0)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// `Content-Type`, carrying a parsed MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentType {
    mime: Mime,
}

impl ContentType {
    pub const NAME: &'static str = "Content-Type";

    pub fn new(mime: Mime) -> Self {
        Self { mime }
    }

    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    pub fn set_mime(&mut self, mime: Mime) {
        self.mime = mime;
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self { mime: mime::TEXT_PLAIN }
    }
}

impl Header for ContentType {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse_raw(&mut self, raw: &[u8]) -> Result<(), HttpError> {
        let text = std::str::from_utf8(raw).map_err(|_| HttpError::bad_request("Invalid Content-Type header"))?;
        self.mime = text.trim().parse().map_err(|_| HttpError::bad_request("Invalid Content-Type header"))?;
        Ok(())
    }

    fn write(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.mime)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// `Host`, kept as the verbatim authority string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Host {
    host: String,
}

impl Host {
    pub const NAME: &'static str = "Host";

    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn value(&self) -> &str {
        &self.host
    }
}

impl Header for Host {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse_raw(&mut self, raw: &[u8]) -> Result<(), HttpError> {
        let text = std::str::from_utf8(raw).map_err(|_| HttpError::bad_request("Invalid Host header"))?;
        self.host = text.trim().to_owned();
        Ok(())
    }

    fn write(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(&self.host)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_length_parse() {
        let mut header = ContentLength::default();
        header.parse_raw(b"42").unwrap();
        assert_eq!(header.value(), 42);

        assert!(ContentLength::default().parse_raw(b"abc").is_err());
        assert!(ContentLength::default().parse_raw(b"-1").is_err());
    }

    #[test]
    fn test_content_type_parse_and_write() {
        let mut header = ContentType::default();
        header.parse_raw(b"application/json").unwrap();
        assert_eq!(header.mime(), &mime::APPLICATION_JSON);

        let mut rendered = String::new();
        header.write(&mut rendered).unwrap();
        assert_eq!(rendered, "application/json");
    }

    #[test]
    fn test_host_parse() {
        let mut header = Host::default();
        header.parse_raw(b"127.0.0.1:8080").unwrap();
        assert_eq!(header.value(), "127.0.0.1:8080");
    }
}
