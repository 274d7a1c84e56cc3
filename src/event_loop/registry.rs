use crate::event_loop::watch::Watch;
use crate::listener::Interest;
use crate::utils::{Arena, Key};

use std::collections::HashMap;
use std::os::fd::RawFd;

/// Per-descriptor watch state.
///
/// Watches live in a generational arena; the registry additionally
/// owns an explicit descriptor-to-key map, so requests are resolved
/// from the registry's own state rather than from the token the
/// caller hands back.
pub(crate) struct Registry {
    /// Watch records, indexed by the keys that readiness waits carry.
    watches: Arena<Watch>,

    /// Descriptor lookup for incoming requests.
    by_fd: HashMap<RawFd, Key>,
}

impl Registry {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            watches: Arena::with_capacity(capacity),
            by_fd: HashMap::with_capacity(capacity),
        }
    }

    /// Returns the key of the watch tracking `fd`, if any.
    pub(crate) fn lookup(&self, fd: RawFd) -> Option<Key> {
        self.by_fd.get(&fd).copied()
    }

    /// Creates a watch for `fd` with every requested direction armed.
    pub(crate) fn insert(&mut self, fd: RawFd, interest: Interest) -> Key {
        let key = self.watches.insert(Watch::new(fd, interest));
        self.by_fd.insert(fd, key);
        key
    }

    /// Releases the watch tracking `fd`.
    ///
    /// Bumps the slot generation, so every wait still scheduled
    /// against the watch resolves to nothing from now on. Returns
    /// `None` if the descriptor was not tracked.
    pub(crate) fn remove(&mut self, fd: RawFd) -> Option<Watch> {
        let key = self.by_fd.remove(&fd)?;
        self.watches.remove(key)
    }

    /// Resolves a wait's key back to its watch.
    ///
    /// Fails when the watch was removed after the wait was scheduled;
    /// the caller must then drop the completion without touching the
    /// descriptor.
    pub(crate) fn resolve(&mut self, key: Key) -> Option<&mut Watch> {
        self.watches.get_mut(key)
    }
}
