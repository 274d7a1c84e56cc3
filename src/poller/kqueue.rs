//! macOS `kqueue`-based poller implementation.
//!
//! This module provides the macOS backend for the event loop. It is
//! functionally equivalent to the Linux `epoll` poller and exposes
//! the same interface.
//!
//! Responsibilities:
//! - Register descriptors with one-shot read/write interests
//! - Block waiting for I/O readiness
//! - Wake the loop when tasks are posted from other threads
//! - Support timer-driven wakeups via poll timeouts
//!
//! kqueue tracks the two directions as separate filters, which maps
//! directly onto the per-direction one-shot waits: each filter is
//! added with `EV_ONESHOT` and vanishes after firing until the
//! dispatcher explicitly re-arms it.
//!
//! This backend is selected automatically on macOS targets.

use crate::event_loop::event::Event;
use crate::listener::Interest;
use crate::poller::Waker;

use libc::{
    EV_ADD, EV_CLEAR, EV_DELETE, EV_EOF, EV_ERROR, EV_ONESHOT, EVFILT_READ, EVFILT_USER,
    EVFILT_WRITE, NOTE_TRIGGER, kevent, kqueue, timespec,
};
use std::io;
use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

/// Identifier of the internal `EVFILT_USER` wake-up event.
const WAKE_IDENT: usize = 0;

/// macOS `kqueue` poller.
///
/// This poller owns:
/// - a `kqueue` instance,
/// - an internal `EVFILT_USER` event used as a wake-up signal,
/// - a reusable event buffer.
///
/// The wake-up mechanism allows other threads (via a loop handle) to
/// interrupt a blocking `kevent()` call.
pub(crate) struct KqueuePoller {
    /// kqueue file descriptor.
    kq: RawFd,

    /// Reusable buffer for kernel events.
    events: Vec<libc::kevent>,

    /// Waker wrapping the kqueue descriptor itself.
    waker: Arc<Waker>,
}

unsafe impl Send for KqueuePoller {}

impl Waker {
    /// Wake the poller.
    ///
    /// This triggers the internal `EVFILT_USER` event, causing
    /// `kevent` to return immediately.
    pub(crate) fn wake(&self) {
        let change = libc::kevent {
            ident: WAKE_IDENT,
            filter: EVFILT_USER,
            flags: 0,
            fflags: NOTE_TRIGGER,
            data: 0,
            udata: ptr::null_mut(),
        };

        unsafe {
            kevent(self.0, &change, 1, ptr::null_mut(), 0, ptr::null());
        }
    }
}

impl KqueuePoller {
    /// Create a new `KqueuePoller`.
    ///
    /// This:
    /// - creates the kqueue instance,
    /// - registers a persistent `EVFILT_USER` event as the wake
    ///   source.
    pub(crate) fn new(event_capacity: usize) -> Self {
        let kq = unsafe { kqueue() };
        assert!(kq >= 0, "kqueue failed");

        let change = libc::kevent {
            ident: WAKE_IDENT,
            filter: EVFILT_USER,
            flags: EV_ADD | EV_CLEAR,
            fflags: 0,
            data: 0,
            udata: ptr::null_mut(),
        };

        let rc = unsafe { kevent(kq, &change, 1, ptr::null_mut(), 0, ptr::null()) };
        assert!(rc == 0, "failed to register wake event");

        Self {
            kq,
            events: Vec::with_capacity(event_capacity),
            waker: Arc::new(Waker(kq)),
        }
    }

    /// Return the poller waker.
    ///
    /// Loop handles use this to interrupt `kevent` when posting
    /// tasks or requesting shutdown.
    pub(crate) fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// Register a descriptor with the poller under a one-shot armed
    /// set.
    ///
    /// Fails if the OS rejects the descriptor.
    pub(crate) fn register(&self, fd: RawFd, token: u64, armed: Interest) -> io::Result<()> {
        self.apply(fd, token, armed)
    }

    /// Replace the armed set of an already registered descriptor.
    ///
    /// Also serves as the explicit re-arm after a one-shot firing.
    pub(crate) fn rearm(&self, fd: RawFd, token: u64, armed: Interest) -> io::Result<()> {
        self.apply(fd, token, armed)
    }

    /// Remove a descriptor from the poller.
    ///
    /// Best effort: fired one-shot filters are already gone, and the
    /// engine may have closed the descriptor outright.
    pub(crate) fn deregister(&self, fd: RawFd) {
        let _ = self.delete(fd, EVFILT_READ);
        let _ = self.delete(fd, EVFILT_WRITE);
    }

    /// Poll for I/O readiness events.
    ///
    /// Blocks until:
    /// - at least one descriptor becomes ready,
    /// - the wake event is triggered,
    /// - or the optional timeout expires.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<Event>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        events.clear();

        let ts = timeout.map(|t| timespec {
            tv_sec: t.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: t.subsec_nanos() as _,
        });
        let ts_ptr = ts.as_ref().map_or(ptr::null(), |ts| ts as *const _);

        unsafe {
            self.events.set_len(self.events.capacity());
        }

        let n = unsafe {
            kevent(
                self.kq,
                ptr::null(),
                0,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                ts_ptr,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            unsafe {
                self.events.set_len(0);
            }
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        for ev in &self.events {
            // Wake-up event
            if ev.filter == EVFILT_USER {
                continue;
            }

            let token = ev.udata as usize as u64;
            let error = ev.flags & (EV_ERROR | EV_EOF) != 0;
            let readable = ev.filter == EVFILT_READ;
            let writable = ev.filter == EVFILT_WRITE;

            if let Some(e) = events.iter_mut().find(|e| e.token == token) {
                e.readable |= readable;
                e.writable |= writable;
                e.error |= error;
            } else {
                events.push(Event {
                    token,
                    readable,
                    writable,
                    error,
                });
            }
        }

        Ok(())
    }

    /// Applies the armed set for `fd`, adding one-shot filters for
    /// armed directions and deleting the rest.
    fn apply(&self, fd: RawFd, token: u64, armed: Interest) -> io::Result<()> {
        for (wanted, filter) in [(armed.read, EVFILT_READ), (armed.write, EVFILT_WRITE)] {
            if wanted {
                let change = libc::kevent {
                    ident: fd as usize,
                    filter,
                    flags: EV_ADD | EV_ONESHOT,
                    fflags: 0,
                    data: 0,
                    udata: token as usize as *mut _,
                };

                let rc = unsafe { kevent(self.kq, &change, 1, ptr::null_mut(), 0, ptr::null()) };
                if rc < 0 {
                    return Err(io::Error::last_os_error());
                }
            } else {
                // A fired one-shot filter is already gone; ignore.
                let _ = self.delete(fd, filter);
            }
        }

        Ok(())
    }

    fn delete(&self, fd: RawFd, filter: i16) -> io::Result<()> {
        let change = libc::kevent {
            ident: fd as usize,
            filter,
            flags: EV_DELETE,
            fflags: 0,
            data: 0,
            udata: ptr::null_mut(),
        };

        let rc = unsafe { kevent(self.kq, &change, 1, ptr::null_mut(), 0, ptr::null()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl Drop for KqueuePoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.kq);
        }
    }
}
