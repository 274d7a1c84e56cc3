use super::EventLoop;

/// Builder for configuring and creating an event loop.
///
/// `EventLoopBuilder` allows customizing loop parameters before
/// construction: the capacity of the kernel event buffer drained per
/// poll, and the initial capacity of the watch arena.
///
/// # Examples
///
/// ```rust,ignore
/// let event_loop = EventLoopBuilder::new()
///     .event_capacity(256)
///     .watch_capacity(128)
///     .build();
/// ```
pub struct EventLoopBuilder {
    /// Kernel events drained per poll.
    event_capacity: usize,

    /// Initial number of watch slots.
    watch_capacity: usize,
}

impl EventLoopBuilder {
    /// Creates a new `EventLoopBuilder` with default configuration.
    pub fn new() -> Self {
        Self {
            event_capacity: 64,
            watch_capacity: 64,
        }
    }

    /// Sets the capacity of the kernel event buffer.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn event_capacity(mut self, n: usize) -> Self {
        assert!(n > 0, "event_capacity must be > 0");

        self.event_capacity = n;
        self
    }

    /// Sets the initial capacity of the watch arena.
    pub fn watch_capacity(mut self, n: usize) -> Self {
        self.watch_capacity = n;
        self
    }

    /// Builds the event loop with the configured options.
    ///
    /// This creates the OS polling instance and its wake-up source.
    pub fn build(self) -> EventLoop {
        EventLoop::with_capacities(self.event_capacity, self.watch_capacity)
    }
}

impl Default for EventLoopBuilder {
    /// Creates a default `EventLoopBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
