//! Reactive State
//!
//! This module implements the path-addressed state store that drives
//! re-rendering.
//!
//! # Concepts
//!
//! ## Store
//!
//! A [`Store`] owns a tree of [`Value`]s. Every committed write bumps a
//! monotonic tick and records the written path in a bounded change log, so
//! any consumer that remembers a tick can later ask whether a path changed
//! since then.
//!
//! ## Proxies
//!
//! A [`Proxy`] names one path of the store. Render functions receive the root
//! proxy and walk it with `field`/`index`; thunks keep proxies as arguments
//! and use `changed_since` to decide whether to rebuild.
//!
//! ## References
//!
//! A [`Reference`] stored in the tree makes one path an alias of another.
//! Reads and writes through the alias reach the target, and a change to the
//! target is logged for every alias that can see it.
//!
//! # Implementation Notes
//!
//! Path resolutions are interned in a table keyed by the requested path and
//! evicted when the state under that path changes. Reference chains are
//! followed with an explicit work-list and a visited set, so a cycle is
//! reported as an error instead of looping.

mod change_log;
mod proxy;
mod store;
mod value;

pub use change_log::{Change, ChangeLog};
pub use proxy::Proxy;
pub use store::{ChangeCallback, Store};
pub use value::{format_number, reference, Function, Reference, Value, ValueKind};
