//! The semantic request/response entities produced by the parser and
//! consumed by the handler.

mod error;
mod method;
mod query;
mod request;
mod response;
mod version;

pub use error::{HttpError, SendError};
pub use method::Method;
pub use query::Query;
pub use request::Request;
pub use response::Response;
pub use version::Version;
