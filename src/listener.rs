//! Callback surface between the multiplexer and the poll-driven engine.
//!
//! The engine implements [`EventListener`]; the event loop invokes it
//! whenever a watched descriptor becomes ready, the logical timer
//! fires, or a new watch is created and its token must be handed over.
//!
//! All callbacks are delivered synchronously on the loop thread. The
//! engine may reenter the event loop from inside any of them; mutating
//! or removing the very watch that is being delivered is supported.

use crate::event_loop::WatchToken;

use std::os::fd::RawFd;

/// A single readiness direction of a descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    /// The descriptor is ready for reading.
    Read,

    /// The descriptor is ready for writing.
    Write,
}

/// The set of readiness directions watched for a descriptor.
///
/// An empty interest passed to
/// [`socket_request`](crate::EventLoop::socket_request) removes the
/// watch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    /// Watch no direction; as a request, removes the watch.
    pub const NONE: Self = Self {
        read: false,
        write: false,
    };

    /// Watch readability only.
    pub const READ: Self = Self {
        read: true,
        write: false,
    };

    /// Watch writability only.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
    };

    /// Watch both directions.
    pub const BOTH: Self = Self {
        read: true,
        write: true,
    };

    /// Returns `true` if no direction is watched.
    pub fn is_empty(self) -> bool {
        !self.read && !self.write
    }

    /// Returns `true` if `direction` is part of this interest.
    pub(crate) fn contains(self, direction: Direction) -> bool {
        match direction {
            Direction::Read => self.read,
            Direction::Write => self.write,
        }
    }
}

/// Callbacks implemented by the poll-driven engine.
///
/// The event loop never retains a callback past the synchronous
/// delivery: every notification re-resolves its watch beforehand, so
/// a listener that removes its own watch mid-callback is never
/// notified for it again.
pub trait EventListener {
    /// A watched descriptor became ready in `direction`.
    ///
    /// Delivered once per ready direction. Poller-level error
    /// conditions are folded into ordinary readiness; the engine is
    /// expected to discover true failures through its own
    /// descriptor-level handling.
    fn on_socket_event(&self, fd: RawFd, direction: Direction);

    /// The logical timer fired.
    ///
    /// Only an actual firing is delivered; replaced or cancelled
    /// timers are silent.
    fn on_timer(&self);

    /// A watch was created for `fd`; `token` identifies it on
    /// subsequent [`socket_request`](crate::EventLoop::socket_request)
    /// calls.
    ///
    /// Invoked exactly once per created watch, after the descriptor
    /// was accepted by the OS polling facility.
    fn set_socket_data(&self, fd: RawFd, token: WatchToken);
}
