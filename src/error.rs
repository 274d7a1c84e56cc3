//! Error type for event-loop requests.

use std::io;
use std::os::fd::RawFd;

/// An error returned by an event-loop request.
///
/// No request panics or unwinds across the multiplexer boundary:
/// failures either come back as one of these variants (after being
/// logged) or are absorbed silently where the contract demands it.
/// Removing an unknown descriptor is `Ok`, and a completion that
/// fires after its watch was removed is dropped without a trace
/// beyond logging.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller supplied a descriptor that can never be watched.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(RawFd),

    /// A watch was requested before a listener was installed.
    #[error("no event listener installed")]
    ListenerMissing,

    /// The OS polling facility rejected the request.
    #[error(transparent)]
    Io(#[from] io::Error),
}
