//! Rendering
//!
//! This module turns trees of virtual [`Node`]s into native nodes on a
//! [`Document`](crate::host::Document) and keeps them in sync across
//! renders.
//!
//! # How Patching Works
//!
//! 1. A render produces a fresh tree. The [`Reconciler`] walks it alongside
//!    the previous tree and the native nodes the previous tree produced.
//!
//! 2. Thunks are unwrapped first. A thunk whose name and arguments match the
//!    previous thunk adopts the previous result, which makes the next step
//!    an identity hit and skips the subtree entirely.
//!
//! 3. A pair that can be patched in place (same variant, same tag, no raw
//!    markup) has its children, attributes, events, id, classes and style
//!    diffed. Anything else is realized from scratch and swapped in.
//!
//! 4. Native nodes that leave the tree go to a per-kind pool, so the next
//!    node of the same kind is made by patching a detached one instead of
//!    asking the host for a new one.

mod attributes;
mod builder;
mod children;
mod events;
mod node;
mod pool;
mod reconciler;

use serde::Serialize;

pub use builder::{el, value_child, Child, ElementBuilder};
pub use events::{
    composite_key, run_handlers, split_name, Event, EventRegistry, DEFAULT_SUBTYPE,
};
pub use node::{
    args_changed, comment, keyed_text, text, Arg, Comment, Element, Handler, Hook, Node, Style,
    Text, Thunk, ThunkFn,
};
pub use pool::Pool;
pub use reconciler::Reconciler;

/// Work the reconciler did, accumulated over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Nodes made by waking a pooled native node.
    pub cache_hits: u64,
    /// Nodes the host had to construct.
    pub native_creates: u64,
    /// Thunk function invocations.
    pub thunk_calls: u64,
}
