//! # Pollux
//!
//! **Pollux** is a socket and timer multiplexer for Rust, designed to let
//! poll-driven I/O engines run on top of an asynchronous reactor within the
//! **Nebula** ecosystem.
//!
//! A poll-driven engine (a multi-connection HTTP client is the typical
//! case) owns its descriptors but delegates readiness notification to the
//! host process: "watch descriptor D for condition C and call me back".
//! Pollux translates those requests into the one-shot callback idiom of an
//! OS readiness facility (epoll on Linux, kqueue on macOS), and deals with
//! the three problems that make the translation hard:
//!
//! - **Externally-owned descriptors** — the registry finds its per-descriptor
//!   state again on every call without ever owning the descriptor itself
//! - **Safe cancellation** — a completion that fires after its watch was
//!   removed resolves to nothing and is dropped, never delivered
//! - **Synchronous reentrancy** — the engine may mutate or remove a watch
//!   from inside the very callback being delivered to it
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pollux::{EventLoop, EventListener, Interest};
//! use std::rc::Rc;
//!
//! let event_loop = EventLoop::new();
//! event_loop.set_listener(Rc::new(MyEngine::new()));
//!
//! // Watch a descriptor for readability; the engine's
//! // on_socket_event fires every time it becomes ready.
//! event_loop.socket_request(None, fd, Interest::READ)?;
//!
//! // Single logical timer; scheduling replaces the previous request.
//! event_loop.timer_request(std::time::Duration::from_millis(100))?;
//!
//! event_loop.run()?;
//! ```
//!
//! ## Threading model
//!
//! All requests, callbacks, and timer operations run on the one thread
//! driving the loop; [`EventLoop`] is intentionally not `Send`. Other
//! threads interact exclusively through [`LoopHandle::post`] and
//! [`LoopHandle::shutdown`].

mod error;
mod event_loop;
mod listener;
mod poller;
mod utils;

pub use error::Error;
pub use event_loop::{EventLoop, EventLoopBuilder, LoopHandle, WatchToken};
pub use listener::{Direction, EventListener, Interest};
