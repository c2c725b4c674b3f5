//! Host Contract
//!
//! The reconciler never owns native nodes directly. It talks to a host
//! through the [`Document`] trait, naming nodes by [`NativeId`]s that the
//! host hands out. A browser binding would map ids to DOM nodes; the
//! bundled [`MemoryDocument`] keeps them in an arena, which is what the
//! tests and benches run against.
//!
//! # Invariants
//!
//! - A node has at most one parent. Inserting a node that already has a
//!   parent moves it.
//! - Tag names are reported in ASCII lowercase.
//! - Setting a style property to the empty string clears it.

mod memory;

use std::fmt;

use crate::reactive::format_number;

pub use memory::{MemoryDocument, Mutation};

/// Opaque, copyable key for a native node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeId(u64);

impl NativeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NativeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime kind of a native node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Element,
    Text,
    Comment,
}

/// Attribute and live property values.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Number(f64),
    Bool(bool),
}

impl AttrValue {
    /// Markup form of the value. Booleans render as their own name when
    /// set, which the caller handles, so this is only used for strings and
    /// numbers.
    pub fn to_markup(&self) -> String {
        match self {
            AttrValue::Str(s) => s.clone(),
            AttrValue::Number(n) => format_number(*n),
            AttrValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Number(n as f64)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// Native tree operations the reconciler relies on.
pub trait Document {
    fn create_element(&mut self, tag: &str) -> NativeId;
    fn create_text(&mut self, text: &str) -> NativeId;
    fn create_comment(&mut self, text: &str) -> NativeId;

    /// `None` for ids the host does not know.
    fn kind(&self, node: NativeId) -> Option<NativeKind>;
    /// Lowercase tag name of an element.
    fn tag_name(&self, node: NativeId) -> Option<String>;

    fn parent(&self, node: NativeId) -> Option<NativeId>;
    fn child_at(&self, parent: NativeId, index: usize) -> Option<NativeId>;
    fn child_count(&self, parent: NativeId) -> usize;

    /// Insert `child` before `reference`, or append when `reference` is
    /// `None`.
    fn insert_before(&mut self, parent: NativeId, child: NativeId, reference: Option<NativeId>);
    fn append_child(&mut self, parent: NativeId, child: NativeId) {
        self.insert_before(parent, child, None);
    }
    fn remove_child(&mut self, parent: NativeId, child: NativeId);

    /// Text content of a text or comment node.
    fn text(&self, node: NativeId) -> Option<String>;
    fn set_text(&mut self, node: NativeId, text: &str);

    fn attribute(&self, node: NativeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NativeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NativeId, name: &str);

    /// Live property, which may drift from the attribute (e.g. a checkbox
    /// the user clicked).
    fn property(&self, node: NativeId, name: &str) -> Option<AttrValue>;
    fn set_property(&mut self, node: NativeId, name: &str, value: AttrValue);

    fn add_class(&mut self, node: NativeId, class: &str);
    fn remove_class(&mut self, node: NativeId, class: &str);

    fn set_style_property(&mut self, node: NativeId, name: &str, value: &str);
    /// Replace the whole inline style.
    fn set_style_text(&mut self, node: NativeId, css: &str);

    fn set_inner_markup(&mut self, node: NativeId, markup: &str);

    /// Start forwarding native events of `event_type` on `node`.
    fn listen(&mut self, node: NativeId, event_type: &str);
    fn unlisten(&mut self, node: NativeId, event_type: &str);
}
