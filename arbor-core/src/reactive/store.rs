//! Reactive Store
//!
//! The store owns the state tree and everything needed to answer "did this
//! part of the state change since tick N?".
//!
//! # How Writes Work
//!
//! 1. The requested path is cleaned and resolved to a canonical path,
//!    following references at every segment (including the last one, so a
//!    write to an alias lands on its target).
//!
//! 2. The new value must be kind-compatible with the old one.
//!
//! 3. The tick is bumped once, the written path is logged, and every alias
//!    whose target is related to the written path is logged at the same
//!    tick. Aliases of aliases are found by a work-list search.
//!
//! 4. Cached proxy entries under any affected path are evicted, references
//!    inside the new value are indexed, and the change callback runs once.
//!
//! # Ownership
//!
//! A [`Store`] is a cheap, shared handle (`Rc<RefCell<..>>`). The store is
//! single-threaded; the change callback is invoked after the internal borrow
//! is released so it may read the store again.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::change_log::ChangeLog;
use super::proxy::Proxy;
use super::value::{Value, ValueKind};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::path;

/// Upper bound on reference hops while resolving one path.
const MAX_REFERENCE_HOPS: usize = 64;

/// Callback invoked once per committed mutation.
pub type ChangeCallback = Rc<dyn Fn() -> Result<()>>;

/// An interned path resolution.
#[derive(Debug, Clone)]
struct ProxyEntry {
    canonical: Rc<str>,
    kind: ValueKind,
    /// Reference cells followed on the way to `canonical`.
    hops: Vec<String>,
}

struct StoreInner {
    root: Value,
    tick: u64,
    log: ChangeLog,
    /// Requested path to resolved entry.
    proxies: HashMap<String, ProxyEntry>,
    /// Alias path to absolute target path, for readable references.
    redirects: IndexMap<String, String>,
    on_change: Option<ChangeCallback>,
}

/// Shared handle to a state tree.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<StoreInner>>,
}

impl Store {
    /// Create a store with default configuration.
    pub fn new(root: impl Into<Value>) -> Self {
        Self::with_config(root, &StoreConfig::default())
    }

    pub fn with_config(root: impl Into<Value>, config: &StoreConfig) -> Self {
        let mut inner = StoreInner {
            root: root.into(),
            tick: 0,
            log: ChangeLog::new(config.change_log_cap, config.change_log_trim),
            proxies: HashMap::new(),
            redirects: IndexMap::new(),
            on_change: None,
        };
        inner.index_references(path::ROOT);
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    /// Register the change callback, replacing any previous one.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.inner.borrow_mut().on_change = Some(Rc::new(callback));
    }

    /// Current mutation counter.
    pub fn tick(&self) -> u64 {
        self.inner.borrow().tick
    }

    /// Handle to the root of the tree.
    pub fn root(&self) -> Proxy {
        Proxy::new(self.clone(), path::ROOT)
    }

    /// Handle to an arbitrary path.
    pub fn proxy(&self, path: &str) -> Proxy {
        Proxy::new(self.clone(), &absolute(path))
    }

    /// Value at a path, with references followed.
    pub fn get(&self, path: &str) -> Result<Value> {
        let mut inner = self.inner.borrow_mut();
        let canonical = inner.canonical(&absolute(path))?;
        lookup(&inner.root, &canonical)
            .cloned()
            .ok_or_else(|| Error::path_not_found(canonical.as_ref()))
    }

    /// Kind of the value at a path.
    pub fn kind(&self, path: &str) -> Result<ValueKind> {
        let requested = absolute(path);
        let mut inner = self.inner.borrow_mut();
        if let Some(entry) = inner.proxies.get(&requested) {
            return Ok(entry.kind);
        }
        let canonical = inner.canonical(&requested)?;
        lookup(&inner.root, &canonical)
            .map(Value::kind)
            .ok_or_else(|| Error::path_not_found(canonical.as_ref()))
    }

    /// Canonical path after following references.
    pub fn canonical(&self, path: &str) -> Result<String> {
        let mut inner = self.inner.borrow_mut();
        inner.canonical(&absolute(path)).map(|p| p.to_string())
    }

    /// Write a value at a path.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        let committed = self.inner.borrow_mut().write(&absolute(path), value.into())?;
        if committed {
            self.notify()
        } else {
            Ok(())
        }
    }

    /// Whether anything related to `path` changed after `from_tick`.
    pub fn changed_since(&self, path: &str, from_tick: u64) -> bool {
        let requested = absolute(path);
        let mut inner = self.inner.borrow_mut();
        if inner.log.changed_since(&requested, from_tick) {
            return true;
        }
        match inner.canonical(&requested) {
            Ok(canonical) if canonical.as_ref() != requested => {
                inner.log.changed_since(&canonical, from_tick)
            }
            _ => false,
        }
    }

    /// Replace the whole tree. Reserved for the driver.
    pub fn replace_root(&self, root: impl Into<Value>) -> Result<()> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.root = root.into();
            inner.tick += 1;
            let tick = inner.tick;
            inner.log.record(tick, path::ROOT);
            inner.log.enforce_cap();
            inner.proxies.clear();
            inner.redirects.clear();
            inner.index_references(path::ROOT);
            debug!(tick, "state root replaced");
        }
        self.notify()
    }

    /// Copy of the whole tree.
    pub fn snapshot(&self) -> Value {
        self.inner.borrow().root.clone()
    }

    /// Number of interned proxy entries.
    pub fn cached_proxies(&self) -> usize {
        self.inner.borrow().proxies.len()
    }

    /// Whether a path currently has an interned entry.
    pub fn is_cached(&self, path: &str) -> bool {
        self.inner.borrow().proxies.contains_key(&absolute(path))
    }

    /// Alias paths and their targets, in registration order.
    pub fn redirects(&self) -> Vec<(String, String)> {
        self.inner
            .borrow()
            .redirects
            .iter()
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect()
    }

    /// Number of retained change log entries.
    pub fn change_log_len(&self) -> usize {
        self.inner.borrow().log.len()
    }

    /// Apply an in-place edit to the sequence at `path`.
    ///
    /// `edit` reports whether it changed anything; only a change is
    /// committed.
    pub(crate) fn edit_sequence<R>(
        &self,
        path: &str,
        edit: impl FnOnce(&mut Vec<Value>) -> (R, bool),
    ) -> Result<R> {
        let (result, committed) = {
            let mut inner = self.inner.borrow_mut();
            let canonical = inner.canonical(&absolute(path))?;
            let items = match lookup_mut(&mut inner.root, &canonical) {
                Some(Value::Sequence(items)) => items,
                Some(_) => return Err(Error::not_a_sequence(canonical.as_ref())),
                None => return Err(Error::path_not_found(canonical.as_ref())),
            };
            let (result, changed) = edit(items);
            if changed {
                inner.path_changed(&canonical);
            }
            (result, changed)
        };
        if committed {
            self.notify()?;
        }
        Ok(result)
    }

    pub(crate) fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self) -> Result<()> {
        let callback = self.inner.borrow().on_change.clone();
        match callback {
            Some(callback) => callback(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("tick", &inner.tick)
            .field("changes", &inner.log.len())
            .field("proxies", &inner.proxies.len())
            .field("redirects", &inner.redirects.len())
            .finish()
    }
}

impl StoreInner {
    /// Resolve a clean absolute path to its canonical form.
    fn canonical(&mut self, requested: &str) -> Result<Rc<str>> {
        if let Some(entry) = self.proxies.get(requested) {
            return Ok(entry.canonical.clone());
        }

        let (canonical, hops) = self.resolve(requested)?;
        let canonical: Rc<str> = canonical.into();
        if let Some(value) = lookup(&self.root, &canonical) {
            self.proxies.insert(
                requested.to_string(),
                ProxyEntry {
                    canonical: canonical.clone(),
                    kind: value.kind(),
                    hops,
                },
            );
        }
        Ok(canonical)
    }

    /// Follow references along `requested`, returning the canonical path
    /// and every reference cell passed through.
    fn resolve(&mut self, requested: &str) -> Result<(String, Vec<String>)> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut followed = Vec::new();
        let mut hops = 0;
        let mut current = path::ROOT.to_string();
        let mut remaining: Vec<String> = path::segments(requested)
            .iter()
            .rev()
            .map(|s| s.to_string())
            .collect();

        while let Some(segment) = remaining.pop() {
            let candidate = path::child(&current, &segment);
            let target = match lookup(&self.root, &candidate) {
                Some(Value::Reference(reference)) => {
                    let target = path::resolve(&candidate, &reference.target);
                    if reference.read {
                        self.redirects.insert(candidate.clone(), target.clone());
                    }
                    followed.push(candidate.clone());
                    target
                }
                _ => {
                    current = candidate;
                    continue;
                }
            };

            // Everything still to walk, spelled from the root.
            let mut expanded = target.clone();
            for rest in remaining.iter().rev() {
                expanded = path::child(&expanded, rest);
            }
            hops += 1;
            if hops > MAX_REFERENCE_HOPS || !seen.insert(expanded) {
                return Err(Error::cyclic(candidate));
            }
            trace!(alias = %candidate, %target, "following reference");

            current = path::ROOT.to_string();
            remaining.extend(path::segments(&target).iter().rev().map(|s| s.to_string()));
        }
        Ok((current, followed))
    }

    /// Write a value, returning whether a mutation was committed.
    fn write(&mut self, requested: &str, value: Value) -> Result<bool> {
        if requested == path::ROOT {
            return Err(Error::InvalidRootWrite);
        }
        let canonical = self.canonical(requested)?;
        if canonical.as_ref() == path::ROOT {
            return Err(Error::InvalidRootWrite);
        }

        let (parent_path, key) = path::split(&canonical);
        let parent_path = path::clean(parent_path);
        let parent = lookup_mut(&mut self.root, &parent_path)
            .ok_or_else(|| Error::path_not_found(canonical.as_ref()))?;

        let found = value.kind();
        match parent.child_mut(key) {
            Some(existing) => {
                if !existing.kind().compatible_with(found) {
                    return Err(Error::incompatible(canonical.as_ref(), existing.kind(), found));
                }
                if *existing == value {
                    return Ok(false);
                }
                *existing = value;
            }
            None => match parent {
                Value::Mapping(map) => {
                    map.insert(key.to_string(), value);
                }
                _ => return Err(Error::path_not_found(canonical.as_ref())),
            },
        }

        self.path_changed(&canonical);
        Ok(true)
    }

    /// Run the change bookkeeping for a committed write at a canonical path.
    fn path_changed(&mut self, written: &str) {
        self.tick += 1;
        let tick = self.tick;
        self.log.record(tick, written);

        let aliases = self.affected_aliases(written);
        for alias in &aliases {
            self.log.record(tick, alias.clone());
        }
        self.log.enforce_cap();

        let evicted_before = self.proxies.len();
        self.proxies.retain(|key, entry| {
            !std::iter::once(written)
                .chain(aliases.iter().map(String::as_str))
                .any(|p| {
                    path::has_prefix(key, p)
                        || path::has_prefix(&entry.canonical, p)
                        || entry.hops.iter().any(|hop| path::has_prefix(hop, p))
                })
        });

        self.redirects.retain(|from, _| !path::has_prefix(from, written));
        self.index_references(written);

        debug!(
            tick,
            path = written,
            aliases = aliases.len(),
            evicted = evicted_before - self.proxies.len(),
            "state changed"
        );
    }

    /// Every alias transitively affected by a change at `written`.
    fn affected_aliases(&self, written: &str) -> Vec<String> {
        let mut affected = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut work = vec![written.to_string()];

        while let Some(changed) = work.pop() {
            for (from, to) in &self.redirects {
                if from == written || seen.contains(from.as_str()) {
                    continue;
                }
                if path::related(&changed, to) {
                    seen.insert(from.as_str());
                    affected.push(from.clone());
                    work.push(from.clone());
                }
            }
        }
        affected
    }

    /// Record redirects for readable references inside the value at `base`.
    fn index_references(&mut self, base: &str) {
        let Some(value) = lookup(&self.root, base) else {
            return;
        };
        let mut found = Vec::new();
        let mut stack = vec![(base.to_string(), value)];
        while let Some((at, value)) = stack.pop() {
            match value {
                Value::Reference(reference) if reference.read => {
                    let target = path::resolve(&at, &reference.target);
                    found.push((at, target));
                }
                Value::Mapping(map) => {
                    for (key, child) in map {
                        stack.push((path::child(&at, key), child));
                    }
                }
                Value::Sequence(items) => {
                    for (i, child) in items.iter().enumerate() {
                        stack.push((path::child(&at, &i.to_string()), child));
                    }
                }
                _ => {}
            }
        }
        self.redirects.extend(found);
    }
}

/// Clean a path and anchor it at the root.
fn absolute(path: &str) -> String {
    if path::is_absolute(path) {
        path::clean(path)
    } else {
        path::clean(&format!("/{path}"))
    }
}

/// Walk a clean absolute path without following references.
fn lookup<'a>(root: &'a Value, at: &str) -> Option<&'a Value> {
    path::segments(at)
        .iter()
        .try_fold(root, |value, segment| value.child(segment))
}

fn lookup_mut<'a>(root: &'a mut Value, at: &str) -> Option<&'a mut Value> {
    path::segments(at)
        .iter()
        .try_fold(root, |value, segment| value.child_mut(segment))
}
