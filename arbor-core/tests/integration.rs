//! Integration Tests for the App Driver
//!
//! These tests mount whole apps on an in-memory document and check what the
//! reconciler does to it as the state changes.

use std::cell::Cell;
use std::rc::Rc;

use arbor_core::{
    el, App, AppBuilder, Arg, Config, Error, MemoryDocument, Mutation, Node, Proxy, Result,
    Thunk, Value,
};
use serde_json::json;

fn mount<F>(state: serde_json::Value, render: F) -> App<MemoryDocument>
where
    F: Fn(&Proxy) -> Result<Node> + 'static,
{
    try_mount(state, Config::default(), render).unwrap()
}

fn try_mount<F>(state: serde_json::Value, config: Config, render: F) -> Result<App<MemoryDocument>>
where
    F: Fn(&Proxy) -> Result<Node> + 'static,
{
    let mut doc = MemoryDocument::new();
    let root = doc.mount_point();
    AppBuilder::new()
        .root(root)
        .state(Value::from(state))
        .config(config)
        .render(render)
        .mount(doc)
}

fn markup(app: &App<MemoryDocument>) -> String {
    app.document().outer_markup(app.root())
}

fn take_mutations(app: &App<MemoryDocument>) -> Vec<Mutation> {
    app.with_document(|doc| doc.take_mutations()).unwrap()
}

fn keyed_list(state: &Proxy) -> Result<Node> {
    let items = state.field("items").items()?;
    let mut list = el("ul");
    for item in items {
        let label = item.text()?;
        list = list.child(el("li").key(label.clone()).text(label));
    }
    list.build()
}

/// Re-rendering an unchanged state touches nothing.
#[test]
fn unchanged_state_produces_no_mutations() {
    let app = mount(json!({"name": "x", "on": true}), |state| {
        el("form")
            .selector("#f.wide")
            .style_prop("color", "red")
            .child(el("input").attr("value", "abc").attr("checked", true))
            .child(el("label").child(&state.field("name")))
            .on("submit", |_| None)
            .build()
    });
    take_mutations(&app);

    app.update().unwrap();
    app.update().unwrap();
    assert!(take_mutations(&app).is_empty());
}

/// Only thunks whose state arguments changed call their function again.
#[test]
fn list_thunks_rebuild_only_changed_rows() {
    let calls = Rc::new(Cell::new(0));
    let counted = calls.clone();
    let app = mount(json!({"rows": ["a", "b", "c"], "title": "t"}), move |state| {
        let mut list = el("ul").child(el("li").child(&state.field("title")));
        for row in state.field("rows").items()? {
            let counted = counted.clone();
            list = list.child(Thunk::new("row", vec![Arg::from(row)], move |args| {
                counted.set(counted.get() + 1);
                el("li").child(args[0].as_state()?).build().ok()
            }));
        }
        list.build()
    });
    assert_eq!(calls.get(), 3);

    app.state().field("title").set("T").unwrap();
    assert_eq!(calls.get(), 3);

    app.state().field("rows").index(1).set("B").unwrap();
    assert_eq!(calls.get(), 4);
    assert_eq!(
        markup(&app),
        "<ul><li>T</li><li>a</li><li>B</li><li>c</li></ul>"
    );
}

/// Dropping the first keyed row keeps the other rows' native nodes.
#[test]
fn keyed_rows_survive_a_shift() {
    let app = mount(json!({"items": ["1", "2", "3"]}), keyed_list);
    let ul = app.root();
    let (li2, li3) = {
        let doc = app.document();
        (doc.children(ul)[1], doc.children(ul)[2])
    };

    app.state().field("items").shift().unwrap();
    app.state().field("items").push("4").unwrap();

    assert_eq!(markup(&app), "<ul><li>2</li><li>3</li><li>4</li></ul>");
    let doc = app.document();
    assert_eq!(doc.children(ul)[0], li2);
    assert_eq!(doc.children(ul)[1], li3);
}

/// Switching between string and mapping styles leaves no stale property.
#[test]
fn style_kind_switch_starts_clean() {
    let app = mount(json!({"map": true}), |state| {
        let builder = el("div");
        if state.field("map").get()?.as_bool() == Some(true) {
            builder.style_prop("color", "red").style_prop("margin", "0").build()
        } else {
            builder.style("padding: 2px").build()
        }
    });
    let div = app.root();
    assert_eq!(app.document().style_text(div), "color: red; margin: 0;");

    app.state().field("map").set(false).unwrap();
    assert_eq!(app.document().style_text(div), "padding: 2px;");
    assert_eq!(app.document().style_property(div, "color"), None);

    app.state().field("map").set(true).unwrap();
    assert_eq!(app.document().style_text(div), "color: red; margin: 0;");
}

/// A removed element is woken from the pool for the next element of its tag.
#[test]
fn removed_elements_are_recycled() {
    let app = mount(json!({"show": true}), |state| {
        let show = state.field("show").get()?.as_bool() == Some(true);
        let mut main = el("main");
        if show {
            main = main.child(el("div").class("panel").text("x"));
        }
        main.build()
    });
    let before = app.counters();

    app.state().field("show").set(false).unwrap();
    assert_eq!(markup(&app), "<main></main>");

    app.state().field("show").set(true).unwrap();
    assert_eq!(markup(&app), r#"<main><div class="panel">x</div></main>"#);
    let after = app.counters();
    assert_eq!(after.cache_hits, before.cache_hits + 1);
    assert_eq!(after.native_creates, before.native_creates);
}

/// A write through the target re-renders a view reading through an alias.
#[test]
fn alias_writes_reach_memoized_views() {
    let state = json!({
        "Index": {"Ann": {"$ref": "/Ann"}},
        "Ann": {"foo": "foo"},
    });
    let calls = Rc::new(Cell::new(0));
    let counted = calls.clone();
    let app = mount(state, move |state| {
        let counted = counted.clone();
        let person = state.field("Index").field("Ann");
        Ok(Thunk::new("person", vec![Arg::from(person)], move |args| {
            counted.set(counted.get() + 1);
            el("span")
                .child(&args[0].as_state()?.field("foo"))
                .build()
                .ok()
        })
        .into())
    });
    assert_eq!(markup(&app), "<span>foo</span>");

    app.state().at("Ann/foo").set("FOO").unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(markup(&app), "<span>FOO</span>");
}

/// A render that writes state on every pass stops at the configured limit.
#[test]
fn endless_renders_hit_the_iteration_limit() {
    for (config, limit) in [
        (Config::default(), 256),
        (Config::from_json(r#"{"render": {"max_update_iterations": 8}}"#).unwrap(), 8),
    ] {
        let passes = Rc::new(Cell::new(0usize));
        let counted = passes.clone();
        let err = try_mount(json!({"n": 0}), config, move |state| {
            counted.set(counted.get() + 1);
            state.field("n").set(counted.get() as f64)?;
            el("p").build()
        })
        .err()
        .unwrap();
        assert_eq!(err, Error::InfiniteUpdateLoop { iterations: limit });
        assert_eq!(passes.get(), limit);
    }
}

/// Handlers sharing an event type must agree on their result.
#[test]
fn disagreeing_handlers_fail_dispatch() {
    let app = mount(json!({}), |_| {
        el("a")
            .on("click:first", |_| Some(Value::from(1)))
            .on("click:second", |_| Some(Value::from(2)))
            .on("focus:first", |_| Some(Value::from(true)))
            .on("focus$second", |_| Some(Value::from(true)))
            .on("focus:third", |_| None)
            .build()
    });
    let a = app.root();

    let err = app.dispatch(a, "click", Value::Null).unwrap_err();
    assert!(matches!(err, Error::ConflictingEventResult { .. }));
    assert_eq!(
        app.dispatch(a, "focus", Value::Null).unwrap(),
        Some(Value::from(true))
    );
}

/// Handlers see the event and can write state.
#[test]
fn events_drive_state() {
    let app = mount(json!({"text": ""}), |state| {
        let text = state.field("text");
        el("div")
            .child(el("input").on("input", move |event| {
                let _ = text.set(event.detail.clone());
                None
            }))
            .child(el("p").child(&state.field("text")))
            .build()
    });
    let input = app.document().children(app.root())[0];
    app.dispatch(input, "input", "hello").unwrap();
    assert_eq!(markup(&app), "<div><input></input><p>hello</p></div>");
}

/// Reference cycles are reported to whoever reads them.
#[test]
fn reference_cycles_fail_the_render() {
    let err = try_mount(
        json!({"a": {"$ref": "/b"}, "b": {"$ref": "/a"}}),
        Config::default(),
        |state| el("p").child(&state.field("a")).build(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::CyclicReference { .. }));
}
