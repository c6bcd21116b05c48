//! The event-loop workers.
//!
//! Each worker owns a [`Poller`] and a disjoint set of connections;
//! everything it does is single-threaded and cooperative, with `poll` as
//! the only blocking point. New connections arrive over a mailbox paired
//! with an eventfd registered in the poller under a reserved tag.
//! Connection sockets are registered edge-triggered, so every readability
//! event drains the socket until it reports would-block.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::{Connection, Peer};
use crate::handler::Handler;
use crate::polling::{Event, Interest, Mode, Poller, Tag};
use crate::MAX_EVENTS;

/// Tag reserved for the mailbox eventfd; connection ids start above it.
const MAILBOX_TAG: Tag = Tag::new(0);

const READ_CHUNK: usize = 4096;

/// Handle the acceptor uses to hand a connection to a worker.
pub(super) struct Mailbox {
    sender: Sender<(TcpStream, SocketAddr)>,
    wake: Arc<WakeFd>,
}

impl Mailbox {
    pub(super) fn dispatch(&self, stream: TcpStream, addr: SocketAddr) -> io::Result<()> {
        self.sender
            .send((stream, addr))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "worker mailbox closed"))?;
        self.wake.wake()
    }
}

pub(super) struct Worker<H> {
    index: usize,
    poller: Poller,
    wake: Arc<WakeFd>,
    sender: Sender<(TcpStream, SocketAddr)>,
    receiver: Receiver<(TcpStream, SocketAddr)>,
    connections: HashMap<u64, Connection>,
    next_id: u64,
    handler: Arc<H>,
}

impl<H: Handler> Worker<H> {
    pub(super) fn new(index: usize, handler: Arc<H>) -> io::Result<Self> {
        let poller = Poller::new()?;
        let wake = Arc::new(WakeFd::new()?);
        poller.add(wake.as_raw_fd(), Interest::READABLE, MAILBOX_TAG, Mode::Edge)?;

        let (sender, receiver) = channel();

        Ok(Self { index, poller, wake, sender, receiver, connections: HashMap::new(), next_id: 1, handler })
    }

    pub(super) fn mailbox(&self) -> Mailbox {
        Mailbox { sender: self.sender.clone(), wake: Arc::clone(&self.wake) }
    }

    pub(super) fn run(mut self) -> io::Result<()> {
        let mut events = Vec::with_capacity(MAX_EVENTS);
        loop {
            events.clear();
            self.poller.poll(&mut events, MAX_EVENTS, None)?;

            for event in &events {
                if event.tag == MAILBOX_TAG {
                    self.register_pending();
                } else {
                    self.handle_event(*event);
                }
            }
        }
    }

    fn register_pending(&mut self) {
        self.wake.drain();

        while let Ok((stream, addr)) = self.receiver.try_recv() {
            let id = self.next_id;
            self.next_id += 1;

            let peer = Arc::new(Peer::new(id, stream, addr));
            if let Err(e) = self.poller.add(peer.as_raw_fd(), Interest::READABLE | Interest::HANGUP, Tag::new(id), Mode::Edge) {
                warn!(cause = %e, peer = %addr, "could not register connection");
                continue;
            }

            debug!(worker = self.index, peer = %addr, "connection established");
            self.connections.insert(id, Connection::new(peer));
        }
    }

    fn handle_event(&mut self, event: Event) {
        let id = event.tag.value();

        if event.readiness.contains(Interest::HANGUP) {
            self.disconnect(id);
            return;
        }

        if event.readiness.contains(Interest::READABLE) {
            self.read_ready(id);
        }
    }

    // Drains the socket until would-block; required under edge triggering.
    fn read_ready(&mut self, id: u64) {
        let mut closed = false;

        if let Some(connection) = self.connections.get_mut(&id) {
            let handler = Arc::clone(&self.handler);
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                match connection.peer().receive(&mut chunk) {
                    Ok(0) => {
                        closed = true;
                        break;
                    }
                    Ok(received) => connection.on_input(&chunk[..received], handler.as_ref()),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(cause = %e, "read failed");
                        closed = true;
                        break;
                    }
                }
            }
        }

        if closed {
            self.disconnect(id);
        }
    }

    fn disconnect(&mut self, id: u64) {
        if let Some(connection) = self.connections.remove(&id) {
            let _ = self.poller.remove(connection.peer().as_raw_fd());
            self.handler.on_disconnection(connection.peer());
            debug!(worker = self.index, peer = %connection.peer().addr(), "connection closed");
        }
    }
}

// Eventfd used to interrupt `poll` when the mailbox receives work.
struct WakeFd {
    fd: OwnedFd,
}

impl WakeFd {
    fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { fd: unsafe { OwnedFd::from_raw_fd(fd) } })
    }

    fn wake(&self) -> io::Result<()> {
        let one: u64 = 1;
        let rc = unsafe { libc::write(self.fd.as_raw_fd(), (&one as *const u64).cast(), 8) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn drain(&self) {
        let mut counter: u64 = 0;
        let _ = unsafe { libc::read(self.fd.as_raw_fd(), (&mut counter as *mut u64).cast(), 8) };
    }

    fn as_raw_fd(&self) -> libc::c_int {
        self.fd.as_raw_fd()
    }
}
