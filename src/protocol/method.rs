use std::fmt::{Display, Formatter};

use crate::protocol::error::HttpError;

/// The request methods recognized by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    Options,
    #[default]
    Get,
    Post,
    Head,
    Put,
    Delete,
    Trace,
    Connect,
    Patch,
}

impl Method {
    /// Every method, in the order the request-line step tries them.
    pub const ALL: [Method; 9] = [
        Method::Options,
        Method::Get,
        Method::Post,
        Method::Head,
        Method::Put,
        Method::Delete,
        Method::Trace,
        Method::Connect,
        Method::Patch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Patch => "PATCH",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Method {
    type Error = HttpError;

    fn try_from(str: &str) -> Result<Self, Self::Error> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == str)
            .ok_or_else(|| HttpError::bad_request("Unknown HTTP request method"))
    }
}
