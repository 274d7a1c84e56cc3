//! Event loop core: watch registry, dispatch, and timer.
//!
//! This module implements the multiplexer that lets a poll-driven
//! engine run on top of the OS readiness facility. The loop is
//! responsible for:
//! - translating watch requests into one-shot readiness waits,
//! - resolving fired waits back to live watches and delivering
//!   listener callbacks,
//! - maintaining the single logical timer,
//! - draining tasks posted from other threads.
//!
//! All state mutation happens on the thread driving
//! [`EventLoop::turn`]; the only cross-thread entry point is
//! [`LoopHandle`].

mod builder;
mod registry;
mod tasks;
mod timer;
mod watch;

pub(crate) mod event;

use crate::error::Error;
use crate::listener::{Direction, EventListener, Interest};
use crate::poller::{Poller, Waker};
use crate::utils::Key;

use event::Event;
use registry::Registry;
use tasks::TaskQueue;
use timer::TimerSlot;

use std::cell::RefCell;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

pub use builder::EventLoopBuilder;
pub use watch::WatchToken;

/// The socket/timer multiplexer.
///
/// An `EventLoop` owns the OS polling instance, the watch registry,
/// the single logical timer, and the posted-task queue. It is
/// deliberately not `Send`: every request and every callback runs on
/// the one thread that drives [`turn`](Self::turn), and no internal
/// locks exist. Other threads interact exclusively through a
/// [`LoopHandle`].
pub struct EventLoop {
    /// Platform poller (epoll, kqueue).
    poller: RefCell<Poller>,

    /// Per-descriptor watch state.
    registry: RefCell<Registry>,

    /// The single logical timer.
    timer: RefCell<TimerSlot>,

    /// Engine callback surface, installed via
    /// [`set_listener`](Self::set_listener).
    listener: RefCell<Option<Rc<dyn EventListener>>>,

    /// Tasks posted for deferred execution.
    tasks: Arc<TaskQueue>,

    /// Interrupts a blocking poll from other threads.
    waker: Arc<Waker>,

    /// Set by [`stop`](Self::stop) / [`LoopHandle::shutdown`].
    stopped: Arc<AtomicBool>,

    /// Buffer of events collected by the last poll.
    events: RefCell<Vec<Event>>,
}

impl EventLoop {
    /// Creates an event loop with default capacities.
    pub fn new() -> Self {
        EventLoopBuilder::new().build()
    }

    pub(crate) fn with_capacities(event_capacity: usize, watch_capacity: usize) -> Self {
        let poller = Poller::new(event_capacity);
        let waker = poller.waker();

        Self {
            poller: RefCell::new(poller),
            registry: RefCell::new(Registry::with_capacity(watch_capacity)),
            timer: RefCell::new(TimerSlot::new()),
            listener: RefCell::new(None),
            tasks: Arc::new(TaskQueue::new()),
            waker,
            stopped: Arc::new(AtomicBool::new(false)),
            events: RefCell::new(Vec::with_capacity(event_capacity)),
        }
    }

    /// Installs the engine's listener.
    ///
    /// Must be called before the first watch request; callbacks are
    /// delivered to this listener from [`turn`](Self::turn).
    pub fn set_listener(&self, listener: Rc<dyn EventListener>) {
        *self.listener.borrow_mut() = Some(listener);
    }

    /// Returns a cloneable, `Send` handle for posting tasks and
    /// requesting shutdown from other threads.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            tasks: self.tasks.clone(),
            waker: self.waker.clone(),
            stopped: self.stopped.clone(),
        }
    }

    /// Requests, updates, or removes a watch on `fd`.
    ///
    /// An empty `interest` removes the watch; removal is idempotent
    /// and unknown descriptors succeed with no effect. A non-empty
    /// `interest` creates the watch on first request (delivering its
    /// token via [`set_socket_data`](EventListener::set_socket_data))
    /// and otherwise replaces the watched direction set, scheduling a
    /// wait for every newly requested direction not already pending.
    ///
    /// `token` is the handle the engine got for this descriptor, or
    /// `None` on the first request. The registry resolves the
    /// descriptor through its own mapping; a mismatching token is
    /// logged and ignored.
    ///
    /// Never blocks. Errors are logged before being returned; no
    /// half-created watch survives a rejection.
    pub fn socket_request(
        &self,
        token: Option<WatchToken>,
        fd: RawFd,
        interest: Interest,
    ) -> Result<(), Error> {
        if interest.is_empty() {
            return self.remove_watch(token, fd);
        }

        if fd < 0 {
            warn!(fd, "watch requested for an invalid descriptor");
            return Err(Error::InvalidDescriptor(fd));
        }

        let mut registry = self.registry.borrow_mut();

        if let Some(key) = registry.lookup(fd) {
            self.check_token(token, key, fd);

            let watch = match registry.resolve(key) {
                Some(watch) => watch,
                None => {
                    debug!(fd, "descriptor mapping pointed at a vacant slot");
                    return Err(Error::InvalidDescriptor(fd));
                }
            };

            watch.interest = interest;
            for direction in [Direction::Read, Direction::Write] {
                if interest.contains(direction) && !watch.armed.contains(direction) {
                    watch.armed.arm(direction);
                }
            }
            let armed = watch.armed.as_interest();

            trace!(fd, ?interest, "updated watch");

            if let Err(e) = self.poller.borrow().rearm(fd, key.pack(), armed) {
                debug!(fd, error = %e, "poller rejected watch update");
                return Err(e.into());
            }

            Ok(())
        } else {
            let listener = match self.listener.borrow().clone() {
                Some(listener) => listener,
                None => {
                    warn!(fd, "watch requested before a listener was installed");
                    return Err(Error::ListenerMissing);
                }
            };

            let key = registry.insert(fd, interest);

            if let Err(e) = self.poller.borrow().register(fd, key.pack(), interest) {
                registry.remove(fd);
                debug!(fd, error = %e, "poller rejected descriptor");
                return Err(e.into());
            }

            trace!(fd, ?interest, "created watch");

            // The listener may reenter the registry from this call.
            drop(registry);
            listener.set_socket_data(fd, WatchToken(key));

            Ok(())
        }
    }

    /// Schedules the logical timer, cancelling any previous request.
    ///
    /// A zero timeout delivers [`on_timer`](EventListener::on_timer)
    /// on the next loop turn, never inline in the calling stack
    /// frame. Cancellation by replacement is silent: only a firing
    /// invokes the listener. Never blocks.
    pub fn timer_request(&self, timeout: Duration) -> Result<(), Error> {
        self.timer.borrow_mut().schedule(timeout);
        trace!(?timeout, "timer scheduled");

        Ok(())
    }

    /// Posts a task for deferred, non-reentrant execution on the
    /// loop thread, FIFO with respect to other posted tasks.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.push(Box::new(task));
        self.waker.wake();
    }

    /// Performs one loop turn.
    ///
    /// A turn polls the OS (bounded by `max_wait` and the pending
    /// timer deadline), drains posted tasks, dispatches readiness
    /// events, and fires the timer if its deadline passed. Returns
    /// the number of listener callbacks delivered.
    ///
    /// With `max_wait` of `None` the poll blocks until readiness, a
    /// posted task, or shutdown wakes it.
    pub fn turn(&self, max_wait: Option<Duration>) -> Result<usize, Error> {
        let timeout = {
            let timer_wait = self.timer.borrow().time_until(Instant::now());
            match (timer_wait, max_wait) {
                (Some(t), Some(w)) => Some(t.min(w)),
                (Some(t), None) => Some(t),
                (None, w) => w,
            }
        };

        {
            let mut poller = self.poller.borrow_mut();
            let mut events = self.events.borrow_mut();
            poller.poll(&mut events, timeout)?;
        }

        let mut delivered = 0;

        // Posted tasks may reenter the facade; run them unborrowed.
        for task in self.tasks.drain() {
            task();
        }

        let mut events = self.events.take();
        for event in &events {
            delivered += self.dispatch(event);
        }
        events.clear();
        self.events.replace(events);

        if self.timer.borrow_mut().take_expired(Instant::now()) {
            let listener = self.listener.borrow().clone();
            match listener {
                Some(listener) => {
                    trace!("timer fired");
                    listener.on_timer();
                    delivered += 1;
                }
                None => debug!("timer fired with no listener installed"),
            }
        }

        Ok(delivered)
    }

    /// Runs the loop until [`stop`](Self::stop) or
    /// [`LoopHandle::shutdown`] is observed.
    pub fn run(&self) -> Result<(), Error> {
        while !self.stopped.load(Ordering::Acquire) {
            self.turn(None)?;
        }

        Ok(())
    }

    /// Stops [`run`](Self::run) after the current turn.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.waker.wake();
    }

    /// Dispatches one poller event, direction by direction.
    ///
    /// Each direction re-resolves the watch key from scratch: the
    /// listener callback for the first direction may have removed or
    /// replaced the watch before the second is processed.
    fn dispatch(&self, event: &Event) -> usize {
        let key = Key::unpack(event.token);
        let mut delivered = 0;

        if event.error {
            debug!(
                token = event.token,
                "poller reported an error condition; delivering as readiness"
            );
        }

        for (ready, direction) in [
            (event.readable, Direction::Read),
            (event.writable, Direction::Write),
        ] {
            if !ready {
                continue;
            }

            let fire = {
                let mut registry = self.registry.borrow_mut();
                match registry.resolve(key) {
                    None => {
                        trace!(token = event.token, "completion for a removed watch; dropping");
                        None
                    }
                    Some(watch) => {
                        let fd = watch.fd;
                        watch.armed.disarm(direction);

                        let wanted = watch.interest.contains(direction);
                        if wanted {
                            watch.armed.arm(direction);
                        } else {
                            trace!(fd, ?direction, "direction no longer watched; dropping");
                        }

                        // Re-arm before the callback: the listener may
                        // mutate or remove this watch from inside it.
                        let armed = watch.armed.as_interest();
                        if let Err(e) = self.poller.borrow().rearm(fd, key.pack(), armed) {
                            debug!(fd, error = %e, "failed to re-arm watch");
                        }

                        wanted.then_some(fd)
                    }
                }
            };

            if let Some(fd) = fire {
                let listener = self.listener.borrow().clone();
                if let Some(listener) = listener {
                    listener.on_socket_event(fd, direction);
                    delivered += 1;
                }
            }
        }

        delivered
    }

    /// Releases the watch on `fd`.
    ///
    /// In-flight completions are not cancelled synchronously; they
    /// self-neutralize when their key no longer resolves.
    fn remove_watch(&self, token: Option<WatchToken>, fd: RawFd) -> Result<(), Error> {
        let mut registry = self.registry.borrow_mut();

        match registry.lookup(fd) {
            Some(key) => {
                self.check_token(token, key, fd);
                registry.remove(fd);
                self.poller.borrow().deregister(fd);
                trace!(fd, "removed watch");
            }
            None => {
                trace!(fd, "remove for an untracked descriptor");
            }
        }

        Ok(())
    }

    /// Compares a caller-held token against the registry's own
    /// mapping. The mapping always wins; a mismatch is only logged.
    fn check_token(&self, token: Option<WatchToken>, key: Key, fd: RawFd) {
        if let Some(WatchToken(held)) = token {
            if held != key {
                warn!(fd, "stale watch token supplied; using registry entry");
            }
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle used to communicate with the loop from other threads.
///
/// Cloning this handle allows multiple threads to post tasks and to
/// request shutdown; both wake a blocked poll. This is the sole
/// sanctioned cross-thread entry point; every other operation must
/// run on the loop thread itself.
#[derive(Clone)]
pub struct LoopHandle {
    /// Shared task queue.
    tasks: Arc<TaskQueue>,

    /// Waker used to interrupt the poller.
    waker: Arc<Waker>,

    /// Shared stop flag.
    stopped: Arc<AtomicBool>,
}

impl LoopHandle {
    /// Posts a task onto the loop, FIFO with respect to other posted
    /// tasks, and wakes a blocked poll.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.push(Box::new(task));
        self.waker.wake();
    }

    /// Stops [`EventLoop::run`] after its current turn.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::Release);
        self.waker.wake();
    }
}
