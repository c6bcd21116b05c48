//! The application-facing handler contract.

use std::error::Error;
use std::sync::Arc;

use crate::connection::Peer;
use crate::protocol::{Request, Response};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// A request handler invoked by the worker that owns the connection.
///
/// `on_request` runs synchronously on that worker and must eventually call
/// [`Response::send`](crate::protocol::Response::send) (or
/// [`send_with`](crate::protocol::Response::send_with)); an error return
/// is answered with 500 Internal Server Error carrying the error's
/// message. Neither the request nor the response may be retained past
/// return unless the peer is kept alive by other means.
pub trait Handler: Send + Sync + 'static {
    fn on_request(&self, request: Request, response: Response) -> Result<(), BoxError>;

    fn on_disconnection(&self, peer: &Arc<Peer>) {
        let _ = peer;
    }
}

/// A [`Handler`] built from a plain function or closure.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(Request, Response) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn on_request(&self, request: Request, response: Response) -> Result<(), BoxError> {
        (self.f)(request, response)
    }
}

pub fn make_handler<F>(f: F) -> HandlerFn<F>
where
    F: Fn(Request, Response) -> Result<(), BoxError> + Send + Sync + 'static,
{
    HandlerFn { f }
}
