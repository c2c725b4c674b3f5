//! App Driver
//!
//! An [`App`] ties a [`Store`], a render function and a [`Reconciler`] to a
//! root native node, and re-renders whenever the state changes.
//!
//! # How the Update Loop Works
//!
//! 1. Capture the store tick.
//!
//! 2. Call the render function with the root state handle. The first pass
//!    realizes the result and swaps it in for the mount point; later passes
//!    patch the previous tree.
//!
//! 3. Remember the tick captured in step 1. If rendering itself moved the
//!    tick (a thunk or hook wrote state), go again.
//!
//! 4. Give up with [`Error::InfiniteUpdateLoop`] when the last allowed pass
//!    still moved the tick.
//!
//! A state change made while a pass is running does not start a nested pass;
//! the running loop sees the moved tick instead.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::{Document, NativeId};
use crate::reactive::{Proxy, Store, Value};
use crate::render::{run_handlers, Counters, Event, Node, Reconciler};

/// Render function: root state handle in, tree out.
pub type RenderFn = Rc<dyn Fn(&Proxy) -> Result<Node>>;

/// Collects the parts of an [`App`] in any order.
#[derive(Default)]
pub struct AppBuilder {
    root: Option<NativeId>,
    render: Option<RenderFn>,
    state: Option<Value>,
    config: Config,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Native node the app replaces on first render.
    pub fn root(mut self, root: NativeId) -> Self {
        self.root = Some(root);
        self
    }

    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Proxy) -> Result<Node> + 'static,
    {
        self.render = Some(Rc::new(render));
        self
    }

    /// Initial state tree.
    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Take ownership of `doc`, run the first render and start following
    /// state changes.
    pub fn mount<D: Document + 'static>(self, doc: D) -> Result<App<D>> {
        let root = self.root.ok_or(Error::MissingPart { part: "root" })?;
        let render = self.render.ok_or(Error::MissingPart { part: "render" })?;
        let state = self.state.ok_or(Error::MissingPart { part: "state" })?;

        let store = Store::with_config(state, &self.config.store);
        let inner = Rc::new(RefCell::new(AppInner {
            doc,
            root,
            node: None,
            render,
            state: store.root(),
            reconciler: Reconciler::new(self.config.render),
            updated_tick: 0,
        }));
        let app = App {
            inner,
            state: store.root(),
            flags: Rc::new(UpdateFlags::default()),
            failure: Rc::new(RefCell::new(None)),
        };

        let weak = Rc::downgrade(&app.inner);
        let flags = app.flags.clone();
        let failure = app.failure.clone();
        store.on_change(move || {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            let result = update(&inner, &flags);
            if let Err(err) = &result {
                *failure.borrow_mut() = Some(err.clone());
            }
            result
        });

        app.update()?;
        debug!(root = %app.root(), "app mounted");
        Ok(app)
    }
}

struct AppInner<D> {
    doc: D,
    /// Native node currently rendering the tree.
    root: NativeId,
    /// Previous render output, thunks included.
    node: Option<Node>,
    render: RenderFn,
    state: Proxy,
    reconciler: Reconciler,
    updated_tick: u64,
}

impl<D: Document> AppInner<D> {
    fn run(&mut self) -> Result<()> {
        let limit = self.reconciler.config().max_update_iterations;
        for pass in 1..=limit {
            let tick = self.state.tick();
            let node = (self.render)(&self.state)?;
            match &self.node {
                None => {
                    let native = self.reconciler.realize(&mut self.doc, &node, tick)?;
                    if let Some(parent) = self.doc.parent(self.root) {
                        self.doc.insert_before(parent, native, Some(self.root));
                        self.doc.remove_child(parent, self.root);
                    }
                    self.root = native;
                }
                Some(previous) => {
                    let (native, _) = self.reconciler.patch(
                        &mut self.doc,
                        self.root,
                        &node,
                        Some(previous),
                        self.updated_tick,
                    )?;
                    self.root = native;
                }
            }
            self.node = Some(node);
            self.updated_tick = tick;

            if self.state.tick() == tick {
                debug!(passes = pass, tick, "update settled");
                return Ok(());
            }
        }
        warn!(passes = limit, "state kept changing while rendering");
        Err(Error::InfiniteUpdateLoop { iterations: limit })
    }
}

#[derive(Default)]
struct UpdateFlags {
    /// A pass is running.
    updating: Cell<bool>,
    /// An update was requested while the document was borrowed.
    deferred: Cell<bool>,
}

/// Clears the updating flag however the pass ends.
struct UpdateGuard<'a>(&'a Cell<bool>);

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

fn update<D: Document>(inner: &RefCell<AppInner<D>>, flags: &UpdateFlags) -> Result<()> {
    if flags.updating.get() {
        return Ok(());
    }
    let Ok(mut inner) = inner.try_borrow_mut() else {
        trace!("document borrowed, update deferred");
        flags.deferred.set(true);
        return Ok(());
    };
    flags.deferred.set(false);
    flags.updating.set(true);
    let _guard = UpdateGuard(&flags.updating);
    inner.run()
}

/// A mounted application.
pub struct App<D: Document> {
    inner: Rc<RefCell<AppInner<D>>>,
    state: Proxy,
    flags: Rc<UpdateFlags>,
    /// Last error raised by an update the store triggered.
    failure: Rc<RefCell<Option<Error>>>,
}

impl<D: Document + 'static> App<D> {
    /// Root state handle.
    pub fn state(&self) -> Proxy {
        self.state.clone()
    }

    /// Native node currently rendering the tree.
    pub fn root(&self) -> NativeId {
        self.inner.borrow().root
    }

    /// Render until the state settles.
    pub fn update(&self) -> Result<()> {
        update(&self.inner, &self.flags)
    }

    /// Run an update deferred by a document borrow, if any.
    fn flush(&self) -> Result<()> {
        if self.flags.deferred.get() {
            self.update()
        } else {
            Ok(())
        }
    }

    /// Replace the whole state tree and re-render.
    pub fn replace_state(&self, state: impl Into<Value>) -> Result<()> {
        self.state.store().replace_root(state)
    }

    pub fn counters(&self) -> Counters {
        self.inner.borrow().reconciler.counters()
    }

    /// Borrow the document.
    ///
    /// A state change made while the borrow is held does not re-render; the
    /// update runs on the next [`update`](Self::update),
    /// [`with_document`](Self::with_document) or [`dispatch`](Self::dispatch).
    pub fn document(&self) -> Ref<'_, D> {
        Ref::map(self.inner.borrow(), |inner| &inner.doc)
    }

    /// Mutable access to the document, e.g. to simulate user input.
    ///
    /// State changes made inside `f` re-render once `f` returns.
    pub fn with_document<R>(&self, f: impl FnOnce(&mut D) -> R) -> Result<R> {
        let out = {
            let mut doc = RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.doc);
            f(&mut doc)
        };
        self.flush()?;
        Ok(out)
    }

    /// Deliver a native event to the handlers registered on `target`.
    ///
    /// Returns the value the handlers agreed on, if any returned one. An
    /// update the handlers triggered that failed is reported here.
    pub fn dispatch(
        &self,
        target: NativeId,
        event_type: &str,
        detail: impl Into<Value>,
    ) -> Result<Option<Value>> {
        self.flush()?;
        let handlers = self.inner.borrow().reconciler.handlers(target, event_type);
        let event = Event {
            target,
            event_type: event_type.to_string(),
            detail: detail.into(),
        };
        self.failure.borrow_mut().take();
        let result = run_handlers(&handlers, &event);
        if let Some(err) = self.failure.borrow_mut().take() {
            return Err(err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryDocument;
    use crate::render::{el, Arg, Thunk};
    use serde_json::json;

    fn counter_view(state: &Proxy) -> Result<Node> {
        let count = state.field("count");
        let target = count.clone();
        el("button")
            .child(&count)
            .on("click", move |_| {
                let next = target.get().ok()?.as_f64()? + 1.0;
                target.set(next).ok()?;
                None
            })
            .build()
    }

    fn mount_counter() -> App<MemoryDocument> {
        let mut doc = MemoryDocument::new();
        let root = doc.mount_point();
        AppBuilder::new()
            .state(Value::from(json!({"count": 0})))
            .render(counter_view)
            .root(root)
            .mount(doc)
            .unwrap()
    }

    #[test]
    fn mount_replaces_the_mount_point() {
        let app = mount_counter();
        let doc = app.document();
        let body = doc.parent(app.root()).unwrap();
        assert_eq!(doc.inner_markup(body), "<button>0</button>");
        assert_eq!(doc.child_count(body), 1);
    }

    #[test]
    fn missing_parts_are_reported() {
        let err = AppBuilder::new()
            .state(Value::Null)
            .mount(MemoryDocument::new())
            .err()
            .unwrap();
        assert_eq!(err, Error::MissingPart { part: "root" });
    }

    #[test]
    fn state_writes_rerender() {
        let app = mount_counter();
        app.state().field("count").set(5).unwrap();
        assert_eq!(app.document().outer_markup(app.root()), "<button>5</button>");
    }

    #[test]
    fn dispatch_runs_handlers_and_rerenders() {
        let app = mount_counter();
        let button = app.root();
        assert_eq!(app.dispatch(button, "click", Value::Null).unwrap(), None);
        assert_eq!(app.dispatch(button, "click", Value::Null).unwrap(), None);
        assert_eq!(app.document().outer_markup(button), "<button>2</button>");
        assert_eq!(app.dispatch(button, "keydown", Value::Null).unwrap(), None);
    }

    #[test]
    fn render_writes_settle_in_a_few_passes() {
        let passes = Rc::new(Cell::new(0));
        let counted = passes.clone();
        let mut doc = MemoryDocument::new();
        let root = doc.mount_point();
        let app = AppBuilder::new()
            .root(root)
            .state(Value::from(json!({"n": 0})))
            .render(move |state| {
                counted.set(counted.get() + 1);
                let n = state.field("n").get()?.as_f64().unwrap_or(0.0);
                if n < 3.0 {
                    state.field("n").set(n + 1.0)?;
                }
                el("p").child(&state.field("n")).build()
            })
            .mount(doc)
            .unwrap();
        assert_eq!(passes.get(), 4);
        assert_eq!(app.document().outer_markup(app.root()), "<p>3</p>");
    }

    #[test]
    fn endless_render_writes_stop_after_the_limit() {
        let passes = Rc::new(Cell::new(0usize));
        let counted = passes.clone();
        let mut doc = MemoryDocument::new();
        let root = doc.mount_point();
        let err = AppBuilder::new()
            .root(root)
            .state(Value::from(json!({"n": 0})))
            .render(move |state| {
                counted.set(counted.get() + 1);
                state.field("n").set(counted.get() as f64)?;
                el("p").build()
            })
            .mount(doc)
            .err()
            .unwrap();
        assert_eq!(err, Error::InfiniteUpdateLoop { iterations: 256 });
        assert_eq!(passes.get(), 256);
    }

    #[test]
    fn root_thunks_stay_memoized() {
        let calls = Rc::new(Cell::new(0));
        let counted = calls.clone();
        let mut doc = MemoryDocument::new();
        let root = doc.mount_point();
        let app = AppBuilder::new()
            .root(root)
            .state(Value::from(json!({"title": "a", "other": 0})))
            .render(move |state| {
                let counted = counted.clone();
                Ok(Thunk::new("title", vec![Arg::from(state.field("title"))], move |args| {
                    counted.set(counted.get() + 1);
                    el("h1").child(args[0].as_state()?).build().ok()
                })
                .into())
            })
            .mount(doc)
            .unwrap();
        assert_eq!(calls.get(), 1);

        app.state().field("other").set(1).unwrap();
        assert_eq!(calls.get(), 1);
        app.state().field("title").set("b").unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(app.document().outer_markup(app.root()), "<h1>b</h1>");
        assert_eq!(app.counters().thunk_calls, 2);
    }

    #[test]
    fn writes_during_a_document_borrow_are_deferred() {
        let app = mount_counter();
        let count = app.state().field("count");
        app.with_document(|_| count.set(3).unwrap()).unwrap();
        assert_eq!(app.document().outer_markup(app.root()), "<button>3</button>");

        {
            let _doc = app.document();
            count.set(4).unwrap();
        }
        assert_eq!(app.document().outer_markup(app.root()), "<button>3</button>");
        app.update().unwrap();
        assert_eq!(app.document().outer_markup(app.root()), "<button>4</button>");
    }

    #[test]
    fn replace_state_rerenders() {
        let app = mount_counter();
        app.replace_state(Value::from(json!({"count": 9}))).unwrap();
        assert_eq!(app.document().outer_markup(app.root()), "<button>9</button>");
    }

    #[test]
    fn failing_updates_surface_from_dispatch() {
        let mut doc = MemoryDocument::new();
        let root = doc.mount_point();
        let app = AppBuilder::new()
            .root(root)
            .state(Value::from(json!({"broken": false})))
            .render(|state| {
                if state.field("broken").get()?.as_bool() == Some(true) {
                    return Err(Error::MissingPart { part: "view" });
                }
                let flag = state.field("broken");
                el("a")
                    .on("click", move |_| {
                        let _ = flag.set(true);
                        None
                    })
                    .build()
            })
            .mount(doc)
            .unwrap();
        let err = app.dispatch(app.root(), "click", Value::Null).unwrap_err();
        assert_eq!(err, Error::MissingPart { part: "view" });
    }
}
