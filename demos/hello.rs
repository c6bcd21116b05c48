use http::StatusCode;
use nano_http::handler::{make_handler, BoxError};
use nano_http::protocol::{Request, Response};
use nano_http::server::Server;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let handler = make_handler(|request: Request, mut response: Response| -> Result<(), BoxError> {
        let body = format!("Hello from {}!\n", request.resource());
        response.send_with(StatusCode::OK, body.as_bytes(), Some(mime::TEXT_PLAIN))?;
        Ok(())
    });

    let server = Server::builder().address("127.0.0.1:8080").workers(2).build().expect("server configuration");

    if let Err(e) = server.serve(handler) {
        error!(cause = %e, "server stopped");
    }
}
