use std::time::{Duration, Instant};

/// The single logical timer of an event loop.
///
/// At most one deadline is outstanding at a time: scheduling always
/// replaces (and thereby silently cancels) the previous request, so
/// only the most recently requested timer can ever fire.
pub(crate) struct TimerSlot {
    /// Pending deadline, if a timer is scheduled.
    deadline: Option<Instant>,
}

impl TimerSlot {
    pub(crate) fn new() -> Self {
        Self { deadline: None }
    }

    /// Schedules the timer, cancelling any previous request.
    ///
    /// A zero timeout resolves to a deadline of "now": the firing is
    /// delivered on the next loop turn, never inline in the caller's
    /// stack frame.
    pub(crate) fn schedule(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    /// Time remaining until the pending deadline, saturating at zero.
    ///
    /// `None` when no timer is scheduled.
    pub(crate) fn time_until(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Takes the deadline if it has passed.
    ///
    /// The slot is cleared before the caller delivers the firing, so
    /// a listener that schedules a new timer from inside `on_timer`
    /// starts a fresh request instead of re-firing this one.
    pub(crate) fn take_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
