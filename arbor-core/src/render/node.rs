//! Virtual Nodes
//!
//! A [`Node`] is a cheap handle over a shared allocation. Identity is pointer
//! identity: two handles are "the same node" only when they point at the
//! same allocation, which is how the reconciler skips subtrees a memoized
//! thunk returned unchanged.
//!
//! # Thunks
//!
//! A [`Thunk`] defers building a subtree. It carries a name, its arguments
//! and a function. On patch the reconciler compares the arguments with the
//! previous thunk's (see [`args_changed`]); when nothing changed the new
//! thunk adopts the previous result instead of calling its function.
//!
//! State arguments compare by path and by the store's change log, so a
//! thunk that receives a [`Proxy`] rebuilds exactly when something at or
//! around that path changed since the tick it last resolved at.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::events::Event;
use super::Counters;
use crate::error::{Error, Result};
use crate::host::{AttrValue, NativeId, NativeKind};
use crate::reactive::{Proxy, Value};

/// Event handler. A returned value is reported back to the dispatcher.
pub type Handler = Rc<dyn Fn(&Event) -> Option<Value>>;

/// Lifecycle hook, called with the element's native handle.
pub type Hook = Rc<dyn Fn(NativeId)>;

/// Thunk body. `None` renders as a ` none ` comment.
pub type ThunkFn = Rc<dyn Fn(&[Arg]) -> Option<Node>>;

/// A virtual node.
#[derive(Clone)]
pub enum Node {
    Element(Rc<Element>),
    Text(Rc<Text>),
    Comment(Rc<Comment>),
    Thunk(Rc<Thunk>),
}

impl Node {
    pub fn key(&self) -> Option<&str> {
        match self {
            Node::Element(e) => e.key.as_deref(),
            Node::Text(t) => t.key.as_deref(),
            Node::Comment(c) => c.key.as_deref(),
            Node::Thunk(t) => t.key.as_deref(),
        }
    }

    /// Native handle this node was last realized or patched into.
    pub fn handle(&self) -> Option<NativeId> {
        self.handle_cell().get()
    }

    pub(crate) fn set_handle(&self, handle: NativeId) {
        self.handle_cell().set(Some(handle));
    }

    fn handle_cell(&self) -> &Cell<Option<NativeId>> {
        match self {
            Node::Element(e) => &e.handle,
            Node::Text(t) => &t.handle,
            Node::Comment(c) => &c.handle,
            Node::Thunk(t) => &t.handle,
        }
    }

    /// Pointer identity.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Element(a), Node::Element(b)) => Rc::ptr_eq(a, b),
            (Node::Text(a), Node::Text(b)) => Rc::ptr_eq(a, b),
            (Node::Comment(a), Node::Comment(b)) => Rc::ptr_eq(a, b),
            (Node::Thunk(a), Node::Thunk(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Native kind this node realizes as. Thunks have none of their own.
    pub fn native_kind(&self) -> Option<NativeKind> {
        match self {
            Node::Element(_) => Some(NativeKind::Element),
            Node::Text(_) => Some(NativeKind::Text),
            Node::Comment(_) => Some(NativeKind::Comment),
            Node::Thunk(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_thunk(&self) -> Option<&Thunk> {
        match self {
            Node::Thunk(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => fmt::Debug::fmt(&**e, f),
            Node::Text(t) => f.debug_tuple("Text").field(&t.text).finish(),
            Node::Comment(c) => f.debug_tuple("Comment").field(&c.text).finish(),
            Node::Thunk(t) => fmt::Debug::fmt(&**t, f),
        }
    }
}

impl From<Thunk> for Node {
    fn from(thunk: Thunk) -> Self {
        Node::Thunk(Rc::new(thunk))
    }
}

// ----------------------------------------------------------------------------
// Elements
// ----------------------------------------------------------------------------

/// Inline style: a raw string or a property map, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Style {
    Text(String),
    Map(IndexMap<String, String>),
}

/// An element node. Built with [`el`](super::el).
#[derive(Default)]
pub struct Element {
    /// Lowercase tag name.
    pub(crate) tag: String,
    pub(crate) id: Option<String>,
    pub(crate) style: Option<Style>,
    /// Class flags in declaration order. `false` entries are removed.
    pub(crate) classes: IndexMap<String, bool>,
    pub(crate) children: Vec<Node>,
    pub(crate) attributes: IndexMap<String, AttrValue>,
    /// Declared event name (`type`, `type:sub` or `type$sub`) to handler.
    pub(crate) events: IndexMap<String, Handler>,
    /// Raw markup replacing the children.
    pub(crate) inner_markup: Option<String>,
    pub(crate) created: Vec<Hook>,
    pub(crate) patched: Vec<Hook>,
    pub(crate) key: Option<String>,
    pub(crate) handle: Cell<Option<NativeId>>,
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    pub fn classes(&self) -> &IndexMap<String, bool> {
        &self.classes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn attributes(&self) -> &IndexMap<String, AttrValue> {
        &self.attributes
    }

    pub fn inner_markup(&self) -> Option<&str> {
        self.inner_markup.as_deref()
    }

    /// Whether raw markup replaces the children.
    pub(crate) fn has_markup(&self) -> bool {
        self.inner_markup.as_deref().map_or(false, |m| !m.is_empty())
    }

    /// Names of the declared event handlers.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag)
            .field("id", &self.id)
            .field("key", &self.key)
            .field("classes", &self.classes)
            .field("attributes", &self.attributes)
            .field("style", &self.style)
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("children", &self.children)
            .finish()
    }
}

/// A text node.
pub struct Text {
    pub(crate) text: String,
    pub(crate) key: Option<String>,
    pub(crate) handle: Cell<Option<NativeId>>,
}

impl Text {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A comment node.
pub struct Comment {
    pub(crate) text: String,
    pub(crate) key: Option<String>,
    pub(crate) handle: Cell<Option<NativeId>>,
}

impl Comment {
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Create a text node.
pub fn text(content: impl Into<String>) -> Node {
    Node::Text(Rc::new(Text {
        text: content.into(),
        key: None,
        handle: Cell::new(None),
    }))
}

/// Create a keyed text node.
pub fn keyed_text(key: impl Into<String>, content: impl Into<String>) -> Node {
    Node::Text(Rc::new(Text {
        text: content.into(),
        key: Some(key.into()),
        handle: Cell::new(None),
    }))
}

/// Create a comment node.
pub fn comment(content: impl Into<String>) -> Node {
    Node::Comment(Rc::new(Comment {
        text: content.into(),
        key: None,
        handle: Cell::new(None),
    }))
}

// ----------------------------------------------------------------------------
// Thunks
// ----------------------------------------------------------------------------

/// A thunk argument.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A state handle, compared through the change log.
    State(Proxy),
    /// A plain value, compared structurally.
    Value(Value),
    List(Vec<Arg>),
    Map(IndexMap<String, Arg>),
}

impl Arg {
    pub fn as_state(&self) -> Option<&Proxy> {
        match self {
            Arg::State(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Proxy> for Arg {
    fn from(proxy: Proxy) -> Self {
        Arg::State(proxy)
    }
}

impl From<&Proxy> for Arg {
    fn from(proxy: &Proxy) -> Self {
        Arg::State(proxy.clone())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Value(Value::from(s))
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Value(Value::from(s))
    }
}

impl From<f64> for Arg {
    fn from(n: f64) -> Self {
        Arg::Value(Value::from(n))
    }
}

impl From<i32> for Arg {
    fn from(n: i32) -> Self {
        Arg::Value(Value::from(n))
    }
}

impl From<bool> for Arg {
    fn from(b: bool) -> Self {
        Arg::Value(Value::from(b))
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Self {
        Arg::List(items)
    }
}

impl From<IndexMap<String, Arg>> for Arg {
    fn from(map: IndexMap<String, Arg>) -> Self {
        Arg::Map(map)
    }
}

/// Whether `arg` differs from `last` for memoization purposes.
///
/// State handles differ when they name different canonical paths or when
/// their path changed after `tick`.
pub fn args_changed(arg: &Arg, last: &Arg, tick: u64) -> bool {
    match (arg, last) {
        (Arg::State(a), Arg::State(b)) => {
            if !a.store().ptr_eq(b.store()) {
                return true;
            }
            let same_path = match (a.canonical(), b.canonical()) {
                (Ok(x), Ok(y)) => x == y,
                _ => a.path() == b.path(),
            };
            !same_path || a.changed_since(tick)
        }
        (Arg::Value(a), Arg::Value(b)) => a != b,
        (Arg::List(a), Arg::List(b)) => {
            a.len() != b.len() || a.iter().zip(b).any(|(x, y)| args_changed(x, y, tick))
        }
        (Arg::Map(a), Arg::Map(b)) => {
            a.len() != b.len()
                || a.iter().any(|(key, x)| match b.get(key) {
                    Some(y) => args_changed(x, y, tick),
                    None => true,
                })
        }
        _ => true,
    }
}

/// A deferred subtree.
pub struct Thunk {
    name: String,
    args: Vec<Arg>,
    key: Option<String>,
    func: Option<ThunkFn>,
    /// Resolved node, once evaluated or adopted.
    cached: RefCell<Option<Node>>,
    handle: Cell<Option<NativeId>>,
    /// Store tick read from the last state argument at evaluation time.
    tick: Cell<Option<u64>>,
}

impl Thunk {
    pub fn new<F>(name: impl Into<String>, args: Vec<Arg>, func: F) -> Self
    where
        F: Fn(&[Arg]) -> Option<Node> + 'static,
    {
        Self {
            name: name.into(),
            args,
            key: None,
            func: Some(Rc::new(func)),
            cached: RefCell::new(None),
            handle: Cell::new(None),
            tick: Cell::new(None),
        }
    }

    /// Set the sibling key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// A thunk with no function, spliced into a working child list to
    /// stand in for a freshly inserted child.
    pub(crate) fn placeholder() -> Node {
        Node::Thunk(Rc::new(Self {
            name: String::new(),
            args: Vec::new(),
            key: None,
            func: None,
            cached: RefCell::new(None),
            handle: Cell::new(None),
            tick: Cell::new(None),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// The resolved node, if evaluated.
    pub fn cached(&self) -> Option<Node> {
        self.cached.borrow().clone()
    }

    /// Tick captured at evaluation, if a state argument was present.
    pub fn tick(&self) -> Option<u64> {
        self.tick.get()
    }

    /// Whether the previous thunk's result can be reused.
    pub(crate) fn should_rebuild(&self, last: Option<&Thunk>, now: u64) -> bool {
        let Some(last) = last else {
            return true;
        };
        if self.name != last.name || self.args.len() != last.args.len() {
            return true;
        }
        let tick = last.tick.get().unwrap_or(now);
        self.args
            .iter()
            .zip(&last.args)
            .any(|(arg, prev)| args_changed(arg, prev, tick))
    }

    /// Take over the previous thunk's result.
    pub(crate) fn adopt(&self, last: &Thunk) {
        *self.cached.borrow_mut() = last.cached();
        self.handle.set(last.handle.get());
        self.tick.set(last.tick.get());
    }

    /// The resolved node, calling the function when there is none yet.
    pub(crate) fn resolve(&self, counters: &mut Counters) -> Result<Node> {
        if let Some(node) = self.cached() {
            return Ok(node);
        }
        let func = self.func.as_ref().ok_or_else(|| Error::ThunkResolution {
            name: self.name.clone(),
        })?;
        if let Some(tick) = self.args.iter().rev().find_map(|a| a.as_state().map(Proxy::tick)) {
            self.tick.set(Some(tick));
        }
        let node = func(&self.args).unwrap_or_else(|| comment(" none "));
        counters.thunk_calls += 1;
        *self.cached.borrow_mut() = Some(node.clone());
        Ok(node)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("args", &self.args)
            .field("tick", &self.tick.get())
            .field("resolved", &self.cached.borrow().is_some())
            .finish()
    }
}
