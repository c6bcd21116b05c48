//! The listener endpoint: socket setup, options, and the accept loop
//! distributing connections over the worker pool.

mod worker;

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::handler::Handler;
use worker::Worker;

const DEFAULT_BACKLOG: libc::c_int = 128;

pub struct ServerBuilder {
    address: Option<Vec<SocketAddr>>,
    workers: usize,
    backlog: libc::c_int,
    reuse_addr: bool,
    nodelay: bool,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: None, workers: 1, backlog: DEFAULT_BACKLOG, reuse_addr: true, nodelay: false }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = address.to_socket_addrs().ok().map(|addrs| addrs.collect());
        self
    }

    /// Number of worker threads, at least 1.
    pub fn workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn reuse_addr(mut self, reuse_addr: bool) -> Self {
        self.reuse_addr = reuse_addr;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Binds the listener with the configured options.
    pub fn build(self) -> Result<Server, ServerBuildError> {
        let addresses = self.address.filter(|addresses| !addresses.is_empty()).ok_or(ServerBuildError::MissingAddress)?;
        let listener = bind_listener(&addresses, self.backlog, self.reuse_addr)?;
        Ok(Server { listener, workers: self.workers, nodelay: self.nodelay })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("address must be set")]
    MissingAddress,

    #[error("bind error: {source}")]
    Bind {
        #[from]
        source: io::Error,
    },
}

/// A bound HTTP endpoint ready to serve.
pub struct Server {
    listener: TcpListener,
    workers: usize,
    nodelay: bool,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the worker pool and accepts connections until the process
    /// exits, handing each accepted socket to a worker round-robin.
    pub fn serve<H: Handler>(self, handler: H) -> io::Result<()> {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr()?, workers = self.workers, "server listening");

        let mut mailboxes = Vec::with_capacity(self.workers);
        for index in 0..self.workers {
            let worker = Worker::new(index, Arc::clone(&handler))?;
            mailboxes.push(worker.mailbox());
            thread::Builder::new().name(format!("worker-{index}")).spawn(move || {
                if let Err(e) = worker.run() {
                    error!(cause = %e, "worker terminated");
                }
            })?;
        }

        let mut next = 0usize;
        loop {
            let (stream, addr) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            if let Err(e) = stream.set_nonblocking(true) {
                warn!(cause = %e, peer = %addr, "could not make connection non-blocking");
                continue;
            }
            if self.nodelay {
                let _ = stream.set_nodelay(true);
            }

            if let Err(e) = mailboxes[next % self.workers].dispatch(stream, addr) {
                warn!(cause = %e, "worker unavailable, dropping connection");
            }
            next = next.wrapping_add(1);
        }
    }
}

// std's TcpListener::bind hardcodes its backlog, so the listening socket
// is set up through libc to honor the configured one.
fn bind_listener(addresses: &[SocketAddr], backlog: libc::c_int, reuse_addr: bool) -> io::Result<TcpListener> {
    let mut last_error = None;
    for address in addresses {
        match bind_one(address, backlog, reuse_addr) {
            Ok(listener) => return Ok(listener),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address to bind")))
}

fn bind_one(address: &SocketAddr, backlog: libc::c_int, reuse_addr: bool) -> io::Result<TcpListener> {
    let domain = match address {
        SocketAddr::V4(_) => libc::AF_INET,
        SocketAddr::V6(_) => libc::AF_INET6,
    };

    let fd = syscall(unsafe { libc::socket(domain, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0) })?;
    let socket = unsafe { OwnedFd::from_raw_fd(fd) };

    if reuse_addr {
        let yes: libc::c_int = 1;
        syscall(unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_REUSEADDR,
                (&yes as *const libc::c_int).cast(),
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        })?;
    }

    match address {
        SocketAddr::V4(v4) => {
            let sin = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: v4.port().to_be(),
                sin_addr: libc::in_addr { s_addr: u32::from(*v4.ip()).to_be() },
                sin_zero: [0; 8],
            };
            syscall(unsafe {
                libc::bind(socket.as_raw_fd(), (&sin as *const libc::sockaddr_in).cast(), std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
            })?;
        }
        SocketAddr::V6(v6) => {
            let sin6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: v6.port().to_be(),
                sin6_flowinfo: v6.flowinfo(),
                sin6_addr: libc::in6_addr { s6_addr: v6.ip().octets() },
                sin6_scope_id: v6.scope_id(),
            };
            syscall(unsafe {
                libc::bind(socket.as_raw_fd(), (&sin6 as *const libc::sockaddr_in6).cast(), std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t)
            })?;
        }
    }

    syscall(unsafe { libc::listen(socket.as_raw_fd(), backlog) })?;

    Ok(TcpListener::from(socket))
}

fn syscall(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc)
}
