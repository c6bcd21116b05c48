use std::fmt::{Display, Formatter};

use crate::protocol::error::HttpError;

/// The protocol versions the parser accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&[u8]> for Version {
    type Error = HttpError;

    // Exact literals only; a truncated token such as "HTTP/1." is invalid.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match bytes {
            b"HTTP/1.0" => Ok(Version::Http10),
            b"HTTP/1.1" => Ok(Version::Http11),
            _ => Err(HttpError::bad_request("Encountered invalid HTTP version")),
        }
    }
}
