//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the
//! event loop. In particular, it exposes a generational [`Arena`] used
//! for indexed storage whose keys can be safely resolved after the
//! underlying slot has been freed and reused.

mod arena;

pub(crate) use arena::{Arena, Key};
