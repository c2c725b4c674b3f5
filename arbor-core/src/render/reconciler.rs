//! Reconciler
//!
//! The [`Reconciler`] owns everything that has to outlive a single render:
//! the recycling pool, the per-node event handler tables and the counters.
//! One reconciler serves one mounted root.
//!
//! # How It Works
//!
//! 1. [`Reconciler::realize`] builds native nodes for a tree that has none,
//!    waking pooled nodes where it can.
//!
//! 2. [`Reconciler::patch`] takes a native node, the node it currently
//!    renders, and the node it should render. Thunks are unwrapped, identical
//!    nodes are skipped, compatible pairs are patched in place and anything
//!    else is realized and swapped in.
//!
//! 3. Nodes that leave the tree are recycled into the pool.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::trace;

use super::attributes::{patch_attributes, patch_classes, patch_id, patch_style};
use super::events::EventRegistry;
use super::node::{Element, Handler, Hook, Node, Thunk};
use super::pool::Pool;
use super::Counters;
use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::host::{Document, NativeId};

/// Realizes and patches virtual trees against a [`Document`].
pub struct Reconciler {
    pub(super) pool: Pool,
    pub(super) events: EventRegistry,
    pub(super) counters: Counters,
    /// Stand-in spliced into child lists for inserted children.
    pub(super) placeholder: Node,
    pub(super) config: RenderConfig,
}

impl Reconciler {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            pool: Pool::new(config.pool_capacity),
            events: EventRegistry::default(),
            counters: Counters::default(),
            placeholder: Thunk::placeholder(),
            config,
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Detached native nodes waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    /// Handlers registered on `node` for a native event type.
    pub fn handlers(&self, node: NativeId, event_type: &str) -> Vec<(String, Handler)> {
        self.events.handlers(node, event_type)
    }

    /// Build the native node for `node`, detached.
    pub fn realize<D: Document>(&mut self, doc: &mut D, node: &Node, now: u64) -> Result<NativeId> {
        if let Node::Thunk(thunk) = node {
            let resolved = thunk.resolve(&mut self.counters)?;
            let handle = self.realize(doc, &resolved, now)?;
            node.set_handle(handle);
            return Ok(handle);
        }

        if let Some((handle, last)) = self.pool.take(node) {
            self.counters.cache_hits += 1;
            trace!(node = %handle, "woke pooled node");
            self.patch_in_place(doc, handle, node, &last, now)?;
            if let Node::Element(element) = node {
                run_hooks(&element.created, handle);
            }
            return Ok(handle);
        }

        let handle = match node {
            Node::Text(t) => doc.create_text(&t.text),
            Node::Comment(c) => doc.create_comment(&c.text),
            Node::Element(element) => {
                let handle = doc.create_element(&element.tag);
                self.populate(doc, handle, element, now)?;
                handle
            }
            Node::Thunk(thunk) => {
                return Err(Error::ThunkResolution {
                    name: thunk.name().to_string(),
                })
            }
        };
        self.counters.native_creates += 1;
        node.set_handle(handle);
        if let Node::Element(element) = node {
            run_hooks(&element.created, handle);
        }
        Ok(handle)
    }

    fn populate<D: Document>(
        &mut self,
        doc: &mut D,
        handle: NativeId,
        element: &Element,
        now: u64,
    ) -> Result<()> {
        if let Some(markup) = element.inner_markup.as_deref().filter(|_| element.has_markup()) {
            doc.set_inner_markup(handle, markup);
        } else {
            for child in &element.children {
                let native = self.realize(doc, child, now)?;
                doc.append_child(handle, native);
            }
        }
        patch_id(doc, handle, element, None);
        patch_style(doc, handle, element, None);
        patch_classes(doc, handle, element, None);
        patch_attributes(doc, handle, element, None);
        self.patch_events(doc, handle, element);
        Ok(())
    }

    /// Bring `handle` from rendering `last` to rendering `node`.
    ///
    /// Returns the native node that now renders `node` (a new one when the
    /// pair could not be patched in place) and the resolved node.
    pub fn patch<D: Document>(
        &mut self,
        doc: &mut D,
        handle: NativeId,
        node: &Node,
        last: Option<&Node>,
        now: u64,
    ) -> Result<(NativeId, Node)> {
        let (last_thunk, last_node): (Option<Rc<Thunk>>, Option<Node>) = match last {
            Some(Node::Thunk(thunk)) => (Some(thunk.clone()), thunk.cached()),
            other => (None, other.cloned()),
        };

        if let Node::Thunk(thunk) = node {
            match last_thunk.as_deref() {
                Some(prev) if !thunk.should_rebuild(Some(prev), now) => thunk.adopt(prev),
                _ => trace!(thunk = thunk.name(), "rebuilding thunk"),
            }
            let resolved = thunk.resolve(&mut self.counters)?;
            let (native, resolved) = self.patch(doc, handle, &resolved, last_node.as_ref(), now)?;
            node.set_handle(native);
            return Ok((native, resolved));
        }

        if let Some(last) = &last_node {
            if node.ptr_eq(last) {
                node.set_handle(handle);
                return Ok((handle, node.clone()));
            }
        }

        let last = match last_node {
            Some(last) if patchable(doc, handle, node, &last) => last,
            last => {
                trace!(node = %handle, "replacing node");
                let native = self.realize(doc, node, now)?;
                if let Some(parent) = doc.parent(handle) {
                    doc.insert_before(parent, native, Some(handle));
                    doc.remove_child(parent, handle);
                }
                if let Some(last) = last {
                    self.recycle(doc, handle, &last);
                }
                return Ok((native, node.clone()));
            }
        };

        self.patch_in_place(doc, handle, node, &last, now)?;
        Ok((handle, node.clone()))
    }

    /// Patch a pair already known to be compatible.
    pub(super) fn patch_in_place<D: Document>(
        &mut self,
        doc: &mut D,
        handle: NativeId,
        node: &Node,
        last: &Node,
        now: u64,
    ) -> Result<()> {
        node.set_handle(handle);
        match (node, last) {
            (Node::Text(a), Node::Text(b)) => {
                if a.text != b.text {
                    doc.set_text(handle, &a.text);
                }
            }
            (Node::Comment(a), Node::Comment(b)) => {
                if a.text != b.text {
                    doc.set_text(handle, &a.text);
                }
            }
            (Node::Element(a), Node::Element(b)) => {
                self.patch_children(doc, handle, a, b, now)?;
                if let Some(markup) = a.inner_markup.as_deref().filter(|_| a.has_markup()) {
                    if b.inner_markup.as_deref() != Some(markup) {
                        doc.set_inner_markup(handle, markup);
                    }
                }
                patch_attributes(doc, handle, a, Some(&**b));
                self.patch_events(doc, handle, a);
                patch_id(doc, handle, a, Some(&**b));
                patch_classes(doc, handle, a, Some(&**b));
                patch_style(doc, handle, a, Some(&**b));
                run_hooks(&a.patched, handle);
            }
            _ => {}
        }
        Ok(())
    }

    fn patch_events<D: Document>(&mut self, doc: &mut D, handle: NativeId, element: &Element) {
        let mut keep = HashSet::with_capacity(element.events.len());
        for (name, handler) in &element.events {
            keep.insert(self.events.set(doc, handle, name, handler.clone()));
        }
        self.events.retain(doc, handle, &keep);
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

/// Whether `handle`, currently rendering `last`, can be patched into `node`.
fn patchable<D: Document>(doc: &D, handle: NativeId, node: &Node, last: &Node) -> bool {
    if doc.kind(handle) != node.native_kind() {
        return false;
    }
    match (node, last) {
        (Node::Element(a), Node::Element(b)) => {
            a.tag == b.tag
                && !(a.tag.eq_ignore_ascii_case("input")
                    && a.attributes.get("type") != b.attributes.get("type"))
                && !a.has_markup()
                && !b.has_markup()
        }
        (Node::Text(_), Node::Text(_)) | (Node::Comment(_), Node::Comment(_)) => true,
        _ => false,
    }
}

fn run_hooks(hooks: &[Hook], handle: NativeId) {
    for hook in hooks {
        hook(handle);
    }
}
