use std::os::fd::RawFd;

/// Handle used to interrupt a blocking poll from another thread.
///
/// The wrapped descriptor is platform-specific: an `eventfd` on
/// Linux, the kqueue descriptor itself on macOS. The `wake`
/// implementation lives in the corresponding backend module.
pub(crate) struct Waker(pub(crate) RawFd);

unsafe impl Send for Waker {}
unsafe impl Sync for Waker {}
