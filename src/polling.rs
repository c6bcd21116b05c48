//! Readiness notification over the OS polling facility.
//!
//! [`Poller`] is a thin portable handle over epoll: registrations pair a
//! file descriptor with an [`Interest`] set, an opaque [`Tag`] echoed back
//! verbatim in every matching [`Event`], and a triggering [`Mode`]. The
//! mapping between interest bits and the native epoll bits lives entirely
//! in this module.

use std::io;
use std::ops::{BitOr, BitOrAssign};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

pub type Fd = RawFd;

/// A set of readiness conditions to be notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest(u32);

impl Interest {
    pub const NONE: Interest = Interest(0);
    pub const READABLE: Interest = Interest(0b001);
    pub const WRITABLE: Interest = Interest(0b010);
    pub const HANGUP: Interest = Interest(0b100);

    pub const fn contains(self, other: Interest) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, rhs: Interest) -> Interest {
        Interest(self.0 | rhs.0)
    }
}

impl BitOrAssign for Interest {
    fn bitor_assign(&mut self, rhs: Interest) {
        self.0 |= rhs.0;
    }
}

/// Level reports as long as the condition holds; Edge reports once per
/// transition and requires the consumer to drain until would-block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Level,
    Edge,
}

/// Opaque user token associated with a registration and returned bitwise
/// unchanged with each of its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(u64);

impl Tag {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

/// One delivered readiness notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub tag: Tag,
    pub readiness: Interest,
}

/// A handle over one epoll instance.
pub struct Poller {
    epoll: OwnedFd,
}

impl Poller {
    pub fn new() -> io::Result<Self> {
        let fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { epoll: unsafe { OwnedFd::from_raw_fd(fd) } })
    }

    /// Registers `fd`; events carrying `tag` are delivered whenever any of
    /// the interest conditions holds (subject to `mode`).
    pub fn add(&self, fd: Fd, interest: Interest, tag: Tag, mode: Mode) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, to_epoll_events(interest, mode), tag)
    }

    /// Like [`add`](Self::add), but the registration disables itself after
    /// one delivery and must be re-enabled with [`rearm`](Self::rearm).
    pub fn add_oneshot(&self, fd: Fd, interest: Interest, tag: Tag, mode: Mode) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_ADD, fd, to_epoll_events(interest, mode) | libc::EPOLLONESHOT as u32, tag)
    }

    /// Reconfigures an existing registration, re-enabling it if it was
    /// added one-shot.
    pub fn rearm(&self, fd: Fd, interest: Interest, tag: Tag, mode: Mode) -> io::Result<()> {
        self.ctl(libc::EPOLL_CTL_MOD, fd, to_epoll_events(interest, mode), tag)
    }

    pub fn remove(&self, fd: Fd) -> io::Result<()> {
        let rc = unsafe { libc::epoll_ctl(self.epoll.as_raw_fd(), libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Blocks up to `timeout` (forever when `None`) collecting up to
    /// `max_events` events into `events`; returns how many were delivered.
    /// An expired timeout delivers zero events.
    pub fn poll(&self, events: &mut Vec<Event>, max_events: usize, timeout: Option<Duration>) -> io::Result<usize> {
        let capacity = max_events.max(1);
        let mut ready = vec![libc::epoll_event { events: 0, u64: 0 }; capacity];
        let timeout_ms = timeout.map_or(-1, |t| t.as_millis().min(libc::c_int::MAX as u128) as libc::c_int);

        let count = loop {
            let rc = unsafe { libc::epoll_wait(self.epoll.as_raw_fd(), ready.as_mut_ptr(), capacity as libc::c_int, timeout_ms) };
            if rc >= 0 {
                break rc as usize;
            }
            let error = io::Error::last_os_error();
            if error.kind() != io::ErrorKind::Interrupted {
                return Err(error);
            }
        };

        for raw in ready.iter().take(count).copied() {
            events.push(Event { tag: Tag::new(raw.u64), readiness: from_epoll_events(raw.events) });
        }

        Ok(count)
    }

    fn ctl(&self, op: libc::c_int, fd: Fd, events: u32, tag: Tag) -> io::Result<()> {
        let mut event = libc::epoll_event { events, u64: tag.value() };
        let rc = unsafe { libc::epoll_ctl(self.epoll.as_raw_fd(), op, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

fn to_epoll_events(interest: Interest, mode: Mode) -> u32 {
    let mut events = 0u32;
    if interest.contains(Interest::READABLE) {
        events |= libc::EPOLLIN as u32;
    }
    if interest.contains(Interest::WRITABLE) {
        events |= libc::EPOLLOUT as u32;
    }
    if interest.contains(Interest::HANGUP) {
        events |= libc::EPOLLHUP as u32;
    }
    if mode == Mode::Edge {
        events |= libc::EPOLLET as u32;
    }
    events
}

fn from_epoll_events(events: u32) -> Interest {
    let mut readiness = Interest::NONE;
    if events & libc::EPOLLIN as u32 != 0 {
        readiness |= Interest::READABLE;
    }
    if events & libc::EPOLLOUT as u32 != 0 {
        readiness |= Interest::WRITABLE;
    }
    if events & libc::EPOLLHUP as u32 != 0 {
        readiness |= Interest::HANGUP;
    }
    readiness
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe_pair() -> (OwnedFd, OwnedFd) {
        let mut fds = [0; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "pipe: {}", io::Error::last_os_error());
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
    }

    fn write_byte(fd: &OwnedFd) {
        let byte = [1u8];
        let rc = unsafe { libc::write(fd.as_raw_fd(), byte.as_ptr().cast(), 1) };
        assert_eq!(rc, 1);
    }

    #[test]
    fn test_event_echoes_registered_tag() {
        let poller = Poller::new().unwrap();
        let (read_end, write_end) = pipe_pair();

        poller.add(read_end.as_raw_fd(), Interest::READABLE, Tag::new(0xfeed_beef), Mode::Level).unwrap();
        write_byte(&write_end);

        let mut events = Vec::new();
        let count = poller.poll(&mut events, 16, Some(Duration::from_secs(1))).unwrap();
        assert_eq!(count, 1);
        assert_eq!(events[0].tag.value(), 0xfeed_beef);
        assert!(events[0].readiness.contains(Interest::READABLE));
    }

    #[test]
    fn test_timeout_delivers_no_events() {
        let poller = Poller::new().unwrap();
        let (read_end, _write_end) = pipe_pair();

        poller.add(read_end.as_raw_fd(), Interest::READABLE, Tag::new(1), Mode::Level).unwrap();

        let mut events = Vec::new();
        let count = poller.poll(&mut events, 16, Some(Duration::from_millis(20))).unwrap();
        assert_eq!(count, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_oneshot_needs_rearm() {
        let poller = Poller::new().unwrap();
        let (read_end, write_end) = pipe_pair();

        poller.add_oneshot(read_end.as_raw_fd(), Interest::READABLE, Tag::new(7), Mode::Level).unwrap();
        write_byte(&write_end);

        let mut events = Vec::new();
        assert_eq!(poller.poll(&mut events, 16, Some(Duration::from_secs(1))).unwrap(), 1);

        // disabled after the first delivery even though data remains
        events.clear();
        assert_eq!(poller.poll(&mut events, 16, Some(Duration::from_millis(20))).unwrap(), 0);

        poller.rearm(read_end.as_raw_fd(), Interest::READABLE, Tag::new(7), Mode::Level).unwrap();
        events.clear();
        assert_eq!(poller.poll(&mut events, 16, Some(Duration::from_secs(1))).unwrap(), 1);
        assert_eq!(events[0].tag.value(), 7);
    }

    #[test]
    fn test_writable_interest_reports_immediately() {
        let poller = Poller::new().unwrap();
        let (_read_end, write_end) = pipe_pair();

        poller.add(write_end.as_raw_fd(), Interest::WRITABLE, Tag::new(9), Mode::Level).unwrap();

        let mut events = Vec::new();
        assert_eq!(poller.poll(&mut events, 16, Some(Duration::from_secs(1))).unwrap(), 1);
        assert!(events[0].readiness.contains(Interest::WRITABLE));
        assert!(!events[0].readiness.contains(Interest::READABLE));
    }

    #[test]
    fn test_remove_stops_delivery() {
        let poller = Poller::new().unwrap();
        let (read_end, write_end) = pipe_pair();

        poller.add(read_end.as_raw_fd(), Interest::READABLE, Tag::new(3), Mode::Level).unwrap();
        poller.remove(read_end.as_raw_fd()).unwrap();
        write_byte(&write_end);

        let mut events = Vec::new();
        assert_eq!(poller.poll(&mut events, 16, Some(Duration::from_millis(20))).unwrap(), 0);
    }
}
