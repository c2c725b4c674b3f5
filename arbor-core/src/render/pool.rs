//! Recycling pool.
//!
//! Native nodes that leave the tree are kept with the virtual node they
//! last rendered, so waking one is an ordinary in-place patch. Text and
//! comment nodes share one queue each; elements are queued per lowercase
//! tag. Queues are FIFO and bounded.

use std::collections::{HashMap, VecDeque};

use tracing::{trace, warn};

use super::node::Node;
use super::reconciler::Reconciler;
use crate::config::RenderConfig;
use crate::host::{Document, NativeId};

type Entry = (NativeId, Node);

/// Detached native nodes ready for reuse.
#[derive(Debug)]
pub struct Pool {
    texts: VecDeque<Entry>,
    comments: VecDeque<Entry>,
    elements: HashMap<String, VecDeque<Entry>>,
    /// Entries kept per queue.
    capacity: usize,
}

impl Pool {
    pub fn new(capacity: usize) -> Self {
        Self {
            texts: VecDeque::new(),
            comments: VecDeque::new(),
            elements: HashMap::new(),
            capacity,
        }
    }

    /// Queue a detached pair. Returns `false` when the queue is full and the
    /// pair was not kept.
    pub fn put(&mut self, tag: Option<&str>, handle: NativeId, node: Node) -> bool {
        let queue = match (&node, tag) {
            (Node::Text(_), _) => &mut self.texts,
            (Node::Comment(_), _) => &mut self.comments,
            (Node::Element(_), Some(tag)) => self.elements.entry(tag.to_string()).or_default(),
            _ => return false,
        };
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back((handle, node));
        true
    }

    /// Oldest pooled pair that can stand in for `node`.
    pub fn take(&mut self, node: &Node) -> Option<Entry> {
        match node {
            Node::Text(_) => self.texts.pop_front(),
            Node::Comment(_) => self.comments.pop_front(),
            Node::Element(e) => self.elements.get_mut(&e.tag).and_then(VecDeque::pop_front),
            Node::Thunk(_) => None,
        }
    }

    /// Total pooled entries.
    pub fn len(&self) -> usize {
        let elements: usize = self.elements.values().map(VecDeque::len).sum();
        self.texts.len() + self.comments.len() + elements
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new(RenderConfig::default().pool_capacity)
    }
}

impl Reconciler {
    /// Hand a detached native node to the pool.
    ///
    /// Thunks are followed through their resolved node; an unresolved thunk
    /// or a node whose kind no longer matches the native node is dropped, as
    /// are elements carrying raw markup.
    pub(super) fn recycle<D: Document>(&mut self, doc: &D, handle: NativeId, node: &Node) {
        let mut node = node.clone();
        while let Node::Thunk(thunk) = &node {
            match thunk.cached() {
                Some(resolved) => node = resolved,
                None => {
                    self.events.release(handle);
                    return;
                }
            }
        }
        if doc.kind(handle) != node.native_kind() {
            self.events.release(handle);
            return;
        }
        if let Node::Element(element) = &node {
            if element.has_markup() {
                self.events.release(handle);
                return;
            }
        }

        let tag = doc.tag_name(handle);
        if self.pool.put(tag.as_deref(), handle, node) {
            trace!(node = %handle, "pooled");
        } else {
            warn!(node = %handle, capacity = self.config.pool_capacity, "pool full, dropping node");
            self.events.release(handle);
        }
    }
}
