use crate::listener::{Direction, Interest};
use crate::utils::Key;

use std::os::fd::RawFd;

/// Opaque handle identifying a watch.
///
/// Returned to the engine exactly once, via
/// [`set_socket_data`](crate::EventListener::set_socket_data), when a
/// watch is first created, and accepted back on subsequent requests
/// for the same descriptor. The registry keeps its own
/// descriptor-to-watch mapping, so a stale token can be detected
/// rather than trusted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WatchToken(pub(crate) Key);

/// Per-descriptor watch record.
///
/// The arena slot holding a `Watch` is its single owning reference;
/// every readiness wait scheduled against it carries only the packed
/// arena key, which must be re-resolved before use.
pub(crate) struct Watch {
    /// The watched descriptor. Its lifetime is owned by the engine,
    /// never by the registry.
    pub(crate) fd: RawFd,

    /// Directions the engine currently wants notifications for.
    pub(crate) interest: Interest,

    /// Directions with a readiness wait currently scheduled.
    pub(crate) armed: Armed,
}

impl Watch {
    /// Creates a watch with every requested direction armed.
    pub(crate) fn new(fd: RawFd, interest: Interest) -> Self {
        Self {
            fd,
            interest,
            armed: Armed::from_interest(interest),
        }
    }
}

/// Readiness-wait state of a watch.
///
/// Requests and completion firings drive explicit transitions;
/// re-arming after a firing is an explicit action taken before the
/// listener callback, never an implicit side effect of the callback
/// itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Armed {
    /// No wait scheduled.
    Idle,

    /// A read wait is scheduled.
    AwaitingRead,

    /// A write wait is scheduled.
    AwaitingWrite,

    /// Both directions have waits scheduled.
    AwaitingBoth,
}

impl Armed {
    pub(crate) fn from_interest(interest: Interest) -> Self {
        match (interest.read, interest.write) {
            (false, false) => Armed::Idle,
            (true, false) => Armed::AwaitingRead,
            (false, true) => Armed::AwaitingWrite,
            (true, true) => Armed::AwaitingBoth,
        }
    }

    pub(crate) fn as_interest(self) -> Interest {
        match self {
            Armed::Idle => Interest::NONE,
            Armed::AwaitingRead => Interest::READ,
            Armed::AwaitingWrite => Interest::WRITE,
            Armed::AwaitingBoth => Interest::BOTH,
        }
    }

    pub(crate) fn contains(self, direction: Direction) -> bool {
        self.as_interest().contains(direction)
    }

    /// Schedules a wait for `direction`.
    pub(crate) fn arm(&mut self, direction: Direction) {
        let mut interest = self.as_interest();
        match direction {
            Direction::Read => interest.read = true,
            Direction::Write => interest.write = true,
        }
        *self = Armed::from_interest(interest);
    }

    /// Consumes the wait for `direction` after it fired.
    pub(crate) fn disarm(&mut self, direction: Direction) {
        let mut interest = self.as_interest();
        match direction {
            Direction::Read => interest.read = false,
            Direction::Write => interest.write = false,
        }
        *self = Armed::from_interest(interest);
    }
}
