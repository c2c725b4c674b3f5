//! Child list reconciliation.
//!
//! Children are matched by position, except that a keyed child whose
//! previous counterpart carries a different key searches a short window
//! ahead for its key. A hit removes the siblings in between; a miss inserts
//! a fresh node and shifts the working copy of the previous list with a
//! placeholder so positions keep lining up with the native children.

use tracing::trace;

use super::node::{Element, Node};
use super::reconciler::Reconciler;
use crate::error::Result;
use crate::host::{Document, NativeId};

impl Reconciler {
    pub(super) fn patch_children<D: Document>(
        &mut self,
        doc: &mut D,
        parent: NativeId,
        node: &Element,
        last: &Element,
        now: u64,
    ) -> Result<()> {
        let mut previous: Vec<Node> = last.children.clone();

        for (i, child) in node.children.iter().enumerate() {
            let key = child.key();
            let moved = match (key, previous.get(i)) {
                (Some(key), Some(prev)) => prev.key() != Some(key),
                _ => false,
            };

            if !moved {
                match doc.child_at(parent, i) {
                    Some(native) => {
                        self.patch(doc, native, child, previous.get(i), now)?;
                    }
                    None => {
                        let native = self.realize(doc, child, now)?;
                        doc.append_child(parent, native);
                    }
                }
                continue;
            }

            let window = self.config.key_window;
            let found = (0..window).find(|&offset| {
                previous
                    .get(i + offset)
                    .map_or(false, |prev| prev.key() == key)
            });

            match found {
                Some(offset) => {
                    trace!(key = ?key, offset, "keyed child found ahead");
                    for _ in 0..offset {
                        let removed = previous.remove(i);
                        if let Some(native) = doc.child_at(parent, i) {
                            doc.remove_child(parent, native);
                            self.recycle(doc, native, &removed);
                        }
                    }
                    if let Some(native) = doc.child_at(parent, i) {
                        self.patch(doc, native, child, previous.get(i), now)?;
                    }
                }
                None => {
                    trace!(key = ?key, "keyed child inserted");
                    let native = self.realize(doc, child, now)?;
                    let before = doc.child_at(parent, i);
                    doc.insert_before(parent, native, before);
                    previous.insert(i, self.placeholder.clone());
                }
            }
        }

        let len = node.children.len();
        for removed in previous.iter().skip(len) {
            if let Some(native) = doc.child_at(parent, len) {
                doc.remove_child(parent, native);
                self.recycle(doc, native, removed);
            }
        }
        Ok(())
    }
}
