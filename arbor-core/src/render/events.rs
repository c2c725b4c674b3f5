//! Event registry.
//!
//! Handlers live in a table per native node rather than on the virtual
//! node, so a patched element keeps one native listener per event type no
//! matter how many renders replaced its handlers.
//!
//! A declared name is `type`, `type:subtype` or `type$subtype`. Subtypes let
//! several handlers share one native event; without one the subtype is
//! `__default`.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::trace;

use super::node::Handler;
use crate::error::{Error, Result};
use crate::host::{Document, NativeId};
use crate::reactive::Value;

/// Subtype used when a declared name has none.
pub const DEFAULT_SUBTYPE: &str = "__default";

/// A dispatched native event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Node the event fired on.
    pub target: NativeId,
    /// Native event type, e.g. `click`.
    pub event_type: String,
    /// Host-supplied payload.
    pub detail: Value,
}

/// Split a declared name into `(type, subtype)` at the first `:` or `$`.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.find(|c: char| c == ':' || c == '$') {
        Some(at) => {
            let subtype = &name[at + 1..];
            if subtype.is_empty() {
                (&name[..at], DEFAULT_SUBTYPE)
            } else {
                (&name[..at], subtype)
            }
        }
        None => (name, DEFAULT_SUBTYPE),
    }
}

/// Composite `type:subtype` key for a declared name.
pub fn composite_key(name: &str) -> String {
    let (event_type, subtype) = split_name(name);
    format!("{}:{}", event_type, subtype)
}

type HandlerTable = IndexMap<String, IndexMap<String, Handler>>;

/// Handlers per native node, grouped by event type then subtype.
#[derive(Default)]
pub struct EventRegistry {
    tables: HashMap<NativeId, HandlerTable>,
}

impl EventRegistry {
    /// Register `handler` under a declared name, listening on the host when
    /// it is the first handler of its type. Returns the composite key.
    pub fn set<D: Document>(
        &mut self,
        doc: &mut D,
        node: NativeId,
        name: &str,
        handler: Handler,
    ) -> String {
        let (event_type, subtype) = split_name(name);
        let table = self.tables.entry(node).or_default();
        if !table.contains_key(event_type) {
            doc.listen(node, event_type);
        }
        table
            .entry(event_type.to_string())
            .or_default()
            .insert(subtype.to_string(), handler);
        format!("{}:{}", event_type, subtype)
    }

    /// Drop every handler whose composite key is not in `keep`, and stop
    /// listening on types left empty.
    pub fn retain<D: Document>(&mut self, doc: &mut D, node: NativeId, keep: &HashSet<String>) {
        let Some(table) = self.tables.get_mut(&node) else {
            return;
        };
        table.retain(|event_type, handlers| {
            handlers.retain(|subtype, _| keep.contains(&format!("{}:{}", event_type, subtype)));
            if handlers.is_empty() {
                trace!(node = %node, event_type = %event_type, "unlisten");
                doc.unlisten(node, event_type);
                false
            } else {
                true
            }
        });
        if table.is_empty() {
            self.tables.remove(&node);
        }
    }

    /// Forget a node entirely, without touching the host.
    pub fn release(&mut self, node: NativeId) {
        self.tables.remove(&node);
    }

    /// `(composite key, handler)` pairs registered for a type, in
    /// registration order.
    pub fn handlers(&self, node: NativeId, event_type: &str) -> Vec<(String, Handler)> {
        self.tables
            .get(&node)
            .and_then(|table| table.get(event_type))
            .map(|handlers| {
                handlers
                    .iter()
                    .map(|(subtype, h)| (format!("{}:{}", event_type, subtype), h.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_registered(&self, node: NativeId) -> bool {
        self.tables.contains_key(&node)
    }
}

/// Run handlers in order and merge their results.
///
/// Handlers returning `None` do not take part. Two handlers returning
/// different values are a conflict.
pub fn run_handlers(handlers: &[(String, Handler)], event: &Event) -> Result<Option<Value>> {
    let mut result: Option<(String, Value)> = None;
    for (key, handler) in handlers {
        let Some(value) = handler(event) else {
            continue;
        };
        match &result {
            None => result = Some((key.clone(), value)),
            Some((first, existing)) if *existing != value => {
                return Err(Error::ConflictingEventResult {
                    event_type: event.event_type.clone(),
                    first: first.clone(),
                    second: key.clone(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(result.map(|(_, value)| value))
}
