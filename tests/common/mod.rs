#![allow(dead_code)]

use pollux::{Direction, EventListener, WatchToken};

use std::cell::{Cell, RefCell};
use std::os::fd::RawFd;
use std::rc::Rc;

/// Installs a tracing subscriber driven by `RUST_LOG`, once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// A listener that records every callback it receives.
pub struct Recorder {
    pub events: RefCell<Vec<(RawFd, Direction)>>,
    pub timer_fires: Cell<usize>,
    pub tokens: RefCell<Vec<(RawFd, WatchToken)>>,
}

impl Recorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            events: RefCell::new(Vec::new()),
            timer_fires: Cell::new(0),
            tokens: RefCell::new(Vec::new()),
        })
    }

    pub fn total_events(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn events_for(&self, fd: RawFd, direction: Direction) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|(f, d)| *f == fd && *d == direction)
            .count()
    }

    pub fn token_for(&self, fd: RawFd) -> Option<WatchToken> {
        self.tokens
            .borrow()
            .iter()
            .find(|(f, _)| *f == fd)
            .map(|(_, t)| *t)
    }

    pub fn tokens_for(&self, fd: RawFd) -> usize {
        self.tokens.borrow().iter().filter(|(f, _)| *f == fd).count()
    }
}

impl EventListener for Recorder {
    fn on_socket_event(&self, fd: RawFd, direction: Direction) {
        self.events.borrow_mut().push((fd, direction));
    }

    fn on_timer(&self) {
        self.timer_fires.set(self.timer_fires.get() + 1);
    }

    fn set_socket_data(&self, fd: RawFd, token: WatchToken) {
        self.tokens.borrow_mut().push((fd, token));
    }
}

/// A non-blocking Unix socket pair for driving readiness by hand.
pub struct SocketPair {
    pub left: RawFd,
    pub right: RawFd,
}

impl SocketPair {
    pub fn new() -> Self {
        let mut fds = [0 as RawFd; 2];
        let rc = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "socketpair failed");

        for fd in fds {
            set_nonblocking(fd);
        }

        Self {
            left: fds[0],
            right: fds[1],
        }
    }

    /// Makes `left` readable by writing a byte into `right`.
    pub fn make_left_readable(&self) {
        let n = unsafe { libc::write(self.right, b"x".as_ptr() as *const _, 1) };
        assert_eq!(n, 1, "failed to make socket readable");
    }
}

impl Drop for SocketPair {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.left);
            libc::close(self.right);
        }
    }
}

fn set_nonblocking(fd: RawFd) {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    assert!(flags >= 0, "fcntl(F_GETFL) failed");

    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    assert!(rc >= 0, "fcntl(F_SETFL) failed");
}
