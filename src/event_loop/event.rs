/// An I/O event reported by the poller.
///
/// An `Event` carries readiness information for a registered watch.
/// It is produced by the poller and consumed by the dispatcher, which
/// re-resolves the token before acting on it.
pub(crate) struct Event {
    /// Packed watch key the descriptor was registered under.
    ///
    /// Resolution can fail: the watch may have been removed between
    /// the readiness report and dispatch.
    pub(crate) token: u64,

    /// Indicates that the descriptor is readable.
    pub(crate) readable: bool,

    /// Indicates that the descriptor is writable.
    pub(crate) writable: bool,

    /// Indicates that the OS reported an error condition alongside
    /// readiness. Logged, but delivered as ordinary readiness.
    pub(crate) error: bool,
}
