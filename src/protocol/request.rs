//! The request value produced by the parser.

use bytes::{Bytes, BytesMut};

use crate::headers::Collection;
use crate::protocol::{Method, Query, Version};

/// A fully parsed HTTP/1.x request.
///
/// Created empty when a parse begins and populated section by section by
/// the parser steps; handed to the application handler once complete.
#[derive(Debug, Default)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) version: Version,
    pub(crate) resource: String,
    pub(crate) query: Query,
    pub(crate) headers: Collection,
    pub(crate) body: BytesMut,
}

impl Request {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The request path, recorded as-is (no percent-decoding).
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn headers(&self) -> &Collection {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }

    /// Clears every field back to the fresh state without deallocating.
    pub(crate) fn clear(&mut self) {
        self.method = Method::default();
        self.version = Version::default();
        self.resource.clear();
        self.query.clear();
        self.headers.clear();
        self.body.clear();
    }
}
