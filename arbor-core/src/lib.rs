//! Arbor Core
//!
//! This crate provides the core runtime for Arbor, a small view layer that
//! keeps a tree of native nodes in sync with a tree of state. It implements:
//!
//! - A path-addressed state store with change ticks and aliases
//! - Virtual nodes, memoized thunks and an element builder
//! - A reconciler that patches native nodes and recycles detached ones
//! - An app driver that re-renders until the state settles
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `path`: Slash-separated path arithmetic
//! - `reactive`: The state store, its values and proxies
//! - `render`: Virtual nodes, the builder and the reconciler
//! - `host`: The native document interface and an in-memory document
//! - `app`: The mount point and update loop
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{el, AppBuilder, MemoryDocument, Value};
//!
//! let mut doc = MemoryDocument::new();
//! let root = doc.mount_point();
//!
//! let app = AppBuilder::new()
//!     .root(root)
//!     .state(Value::from(serde_json::json!({"name": "world"})))
//!     .render(|state| el("h1").text("hello ").child(&state.field("name")).build())
//!     .mount(doc)
//!     .unwrap();
//!
//! app.state().field("name").set("arbor").unwrap();
//! assert_eq!(app.document().outer_markup(app.root()), "<h1>hello arbor</h1>");
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod host;
pub mod path;
pub mod reactive;
pub mod render;

pub use app::{App, AppBuilder, RenderFn};
pub use config::{Config, RenderConfig, StoreConfig};
pub use error::{Error, Result};
pub use host::{AttrValue, Document, MemoryDocument, Mutation, NativeId, NativeKind};
pub use reactive::{reference, Proxy, Store, Value, ValueKind};
pub use render::{comment, el, keyed_text, text, Arg, Counters, Event, Node, Reconciler, Thunk};
