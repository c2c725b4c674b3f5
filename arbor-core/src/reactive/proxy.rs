//! Path Handles
//!
//! A [`Proxy`] is a lightweight handle naming one path of a [`Store`]. It
//! holds no value: every read and write goes back to the store, which
//! resolves references and keeps the interning table. Creating a child
//! handle is a string join, so render code can walk the state freely.

use std::fmt;
use std::rc::Rc;

use super::store::Store;
use super::value::{Value, ValueKind};
use crate::error::{Error, Result};
use crate::path;

/// Handle to a path inside a store.
#[derive(Clone)]
pub struct Proxy {
    store: Store,
    path: Rc<str>,
}

impl Proxy {
    pub(crate) fn new(store: Store, path: &str) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    /// The clean absolute path this handle names.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Handle to a direct child key.
    pub fn field(&self, key: &str) -> Proxy {
        Proxy::new(self.store.clone(), &path::child(&self.path, key))
    }

    /// Handle to a sequence element.
    pub fn index(&self, i: usize) -> Proxy {
        self.field(&i.to_string())
    }

    /// Handle to a path relative to this one (or absolute).
    pub fn at(&self, relative: &str) -> Proxy {
        self.store.proxy(&self.scoped(relative))
    }

    /// Current value, references followed.
    pub fn get(&self) -> Result<Value> {
        self.store.get(&self.path)
    }

    pub fn kind(&self) -> Result<ValueKind> {
        self.store.kind(&self.path)
    }

    /// Canonical path after following references.
    pub fn canonical(&self) -> Result<String> {
        self.store.canonical(&self.path)
    }

    /// Text form of a scalar value.
    pub fn text(&self) -> Result<String> {
        let value = self.get()?;
        value.display_text().ok_or(Error::BadChild { kind: value.kind() })
    }

    /// Write this path.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        self.store.set(&self.path, value)
    }

    /// Batched scoped write.
    ///
    /// Relative paths resolve against this handle. Every path must stay
    /// inside this handle's subtree; the whole batch is checked before the
    /// first write. Each pair commits (and ticks) on its own.
    pub fn assign<I, P>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (P, Value)>,
        P: AsRef<str>,
    {
        let writes = pairs
            .into_iter()
            .map(|(relative, value)| {
                let target = self.scoped(relative.as_ref());
                if path::has_prefix(&target, &self.path) {
                    Ok((target, value))
                } else {
                    Err(Error::out_of_scope(target, self.path.as_ref()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        for (target, value) in writes {
            self.store.set(&target, value)?;
        }
        Ok(())
    }

    /// Current store tick.
    pub fn tick(&self) -> u64 {
        self.store.tick()
    }

    /// Whether this path (or anything under or above it) changed after
    /// `from_tick`.
    pub fn changed_since(&self, from_tick: u64) -> bool {
        self.store.changed_since(&self.path, from_tick)
    }

    /// Number of elements of a sequence or entries of a mapping.
    pub fn len(&self) -> Result<usize> {
        match self.get()? {
            Value::Sequence(items) => Ok(items.len()),
            Value::Mapping(map) => Ok(map.len()),
            _ => Err(Error::not_a_sequence(self.path.as_ref())),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Handles to every element of a sequence.
    pub fn items(&self) -> Result<Vec<Proxy>> {
        match self.get()? {
            Value::Sequence(items) => Ok((0..items.len()).map(|i| self.index(i)).collect()),
            _ => Err(Error::not_a_sequence(self.path.as_ref())),
        }
    }

    /// Append to a sequence.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.store.edit_sequence(&self.path, |items| {
            items.push(value);
            ((), true)
        })
    }

    /// Remove the last element of a sequence.
    pub fn pop(&self) -> Result<Option<Value>> {
        self.store.edit_sequence(&self.path, |items| {
            let popped = items.pop();
            let changed = popped.is_some();
            (popped, changed)
        })
    }

    /// Prepend to a sequence.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.store.edit_sequence(&self.path, |items| {
            items.insert(0, value);
            ((), true)
        })
    }

    /// Remove the first element of a sequence.
    pub fn shift(&self) -> Result<Option<Value>> {
        self.store.edit_sequence(&self.path, |items| {
            if items.is_empty() {
                (None, false)
            } else {
                (Some(items.remove(0)), true)
            }
        })
    }

    /// Remove `delete_count` elements from `start` and insert `insert` in
    /// their place. Out-of-range bounds are clamped. Returns the removed
    /// elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        insert: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>> {
        let insert: Vec<Value> = insert.into_iter().collect();
        self.store.edit_sequence(&self.path, |items| {
            let start = start.min(items.len());
            let end = start + delete_count.min(items.len() - start);
            let changed = end > start || !insert.is_empty();
            let removed: Vec<Value> = items.splice(start..end, insert).collect();
            (removed, changed)
        })
    }

    fn scoped(&self, relative: &str) -> String {
        if path::is_absolute(relative) {
            path::clean(relative)
        } else {
            path::join(&[self.path.as_ref(), relative])
        }
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.store.ptr_eq(&other.store) && self.path == other.path
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("path", &self.path)
            .field("tick", &self.store.tick())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> Store {
        Store::new(Value::from(json!({
            "todo": {"items": ["a", "b", "c"], "title": "list"},
            "other": 1,
        })))
    }

    #[test]
    fn child_handles_address_nested_values() {
        let root = store().root();
        let items = root.field("todo").field("items");
        assert_eq!(items.path(), "/todo/items");
        assert_eq!(items.index(1).get().unwrap(), Value::from("b"));
        assert_eq!(items.len().unwrap(), 3);
        assert_eq!(root.at("todo/../other").path(), "/other");
    }

    #[test]
    fn assign_writes_relative_paths() {
        let todo = store().root().field("todo");
        let before = todo.tick();
        todo.assign([("title", Value::from("done")), ("items/0", Value::from("z"))])
            .unwrap();
        assert_eq!(todo.field("title").get().unwrap(), Value::from("done"));
        assert_eq!(todo.at("items/0").get().unwrap(), Value::from("z"));
        // One tick per pair.
        assert_eq!(todo.tick(), before + 2);
    }

    #[test]
    fn assign_rejects_paths_outside_the_scope() {
        let todo = store().root().field("todo");
        let err = todo
            .assign([("title", Value::from("x")), ("../other", Value::from(2))])
            .unwrap_err();
        assert_eq!(err, Error::out_of_scope("/other", "/todo"));
        // Nothing from the batch was applied.
        assert_eq!(todo.field("title").get().unwrap(), Value::from("list"));
    }

    #[test]
    fn sequence_mutators_tick_once_on_the_sequence_path() {
        let store = store();
        let items = store.proxy("/todo/items");

        let tick = store.tick();
        items.push("d").unwrap();
        assert_eq!(store.tick(), tick + 1);
        assert!(store.changed_since("/todo/items", tick));
        assert_eq!(items.len().unwrap(), 4);

        items.unshift("start").unwrap();
        assert_eq!(items.index(0).get().unwrap(), Value::from("start"));
        assert_eq!(items.shift().unwrap(), Some(Value::from("start")));
        assert_eq!(items.pop().unwrap(), Some(Value::from("d")));
        assert_eq!(store.tick(), tick + 4);

        let removed = items
            .splice(1, 1, vec![Value::from("x"), Value::from("y")])
            .unwrap();
        assert_eq!(removed, vec![Value::from("b")]);
        assert_eq!(
            items.get().unwrap(),
            Value::from(vec!["a", "x", "y", "c"])
        );
    }

    #[test]
    fn empty_pops_do_not_tick() {
        let store = Store::new(Value::from(json!({"list": []})));
        let list = store.proxy("/list");
        assert_eq!(list.pop().unwrap(), None);
        assert_eq!(list.shift().unwrap(), None);
        assert_eq!(list.splice(5, 2, Vec::new()).unwrap(), Vec::<Value>::new());
        assert_eq!(store.tick(), 0);
    }

    #[test]
    fn sequence_mutators_reject_other_kinds() {
        let store = store();
        assert!(matches!(
            store.proxy("/todo/title").push("x"),
            Err(Error::NotASequence { .. })
        ));
    }

    #[test]
    fn handles_compare_by_store_and_path() {
        let a = store();
        let b = store();
        assert_eq!(a.proxy("/todo"), a.root().field("todo"));
        assert_ne!(a.proxy("/todo"), b.proxy("/todo"));
    }
}
